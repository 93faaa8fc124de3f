//! Navigation tree extraction from SharePoint page markup.
//!
//! Modern SharePoint pages ship their client-side context as a JSON object
//! inside a `<script>` tag. The quick launch menu lives at
//! `"navigationInfo": { "quickLaunch": [ ... ] }`. Only that object is
//! isolated and parsed; the rest of the script is never interpreted.

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{NavError, Result};
use crate::model::NavigationNode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// The key that introduces the navigation state in page markup.
pub const NAVIGATION_MARKER: &str = r#""navigationInfo":"#;

/// The menu inside the navigation state that describes the site tree.
pub const QUICK_LAUNCH_KEY: &str = "quickLaunch";

/// A navigation entry that was skipped during decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeWarning {
    /// Location in the payload, e.g. `quickLaunch[2].Children[0]`.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub roots: Vec<NavigationNode>,
    pub warnings: Vec<DecodeWarning>,
}

impl Extraction {
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(NavigationNode::node_count).sum()
    }
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(rename = "Title", alias = "title", default)]
    title: Option<String>,
    #[serde(rename = "Url", alias = "url", default)]
    url: Option<String>,
    // Informational only; a value of the wrong type is ignored
    #[serde(rename = "IsExternal", alias = "isExternal", default)]
    is_external: Option<Value>,
    #[serde(rename = "Children", alias = "children", default)]
    children: Option<Vec<Value>>,
}

struct Pending {
    value: Value,
    path: String,
    depth: usize,
    parent: Option<usize>,
}

struct Slot {
    title: String,
    url: String,
    is_external: Option<bool>,
    children: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct NavTreeExtractor {
    max_depth: usize,
}

impl Default for NavTreeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl NavTreeExtractor {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Entries nested deeper than `max_depth` levels are dropped as malformed.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn extract(&self, raw_markup: &str) -> Result<Extraction> {
        let payload = isolate_payload(raw_markup)?;
        debug!("Found navigation payload ({} bytes)", payload.len());

        let navigation: Value = serde_json::from_str(payload)
            .map_err(|e| NavError::malformed(format!("invalid JSON: {}", e), payload))?;

        let quick_launch = match navigation {
            Value::Object(mut map) => map.remove(QUICK_LAUNCH_KEY),
            _ => return Err(NavError::malformed("navigation state is not an object", payload)),
        };

        let entries = match quick_launch {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(NavError::malformed(
                    format!("`{}` is not an array", QUICK_LAUNCH_KEY),
                    payload,
                ));
            }
            None => {
                return Err(NavError::malformed(
                    format!("no `{}` menu in navigation state", QUICK_LAUNCH_KEY),
                    payload,
                ));
            }
        };

        let extraction = self.decode_entries(entries);
        info!(
            "Extracted {} navigation nodes ({} skipped)",
            extraction.node_count(),
            extraction.warnings.len()
        );
        Ok(extraction)
    }

    /// Decode with an explicit work list so hostile nesting cannot exhaust
    /// the call stack. Nodes are allocated in pre-order, so every child slot
    /// has a higher index than its parent.
    fn decode_entries(&self, entries: Vec<Value>) -> Extraction {
        let mut warnings = Vec::new();
        let mut slots: Vec<Slot> = Vec::new();
        let mut root_slots = Vec::new();

        let mut stack: Vec<Pending> = entries
            .into_iter()
            .enumerate()
            .rev()
            .map(|(i, value)| Pending {
                value,
                path: format!("{}[{}]", QUICK_LAUNCH_KEY, i),
                depth: 0,
                parent: None,
            })
            .collect();

        while let Some(pending) = stack.pop() {
            if pending.depth >= self.max_depth {
                skip(
                    &mut warnings,
                    pending.path,
                    format!("nested deeper than {} levels", self.max_depth),
                );
                continue;
            }

            let raw: RawEntry = match serde_json::from_value(pending.value) {
                Ok(raw) => raw,
                Err(e) => {
                    skip(&mut warnings, pending.path, e.to_string());
                    continue;
                }
            };

            let title = match raw.title.as_deref().map(str::trim) {
                Some(title) if !title.is_empty() => title.to_string(),
                _ => {
                    skip(&mut warnings, pending.path, "missing title".to_string());
                    continue;
                }
            };

            let idx = slots.len();
            slots.push(Slot {
                title,
                url: raw.url.unwrap_or_default(),
                is_external: raw.is_external.as_ref().and_then(Value::as_bool),
                children: Vec::new(),
            });
            match pending.parent {
                Some(parent) => slots[parent].children.push(idx),
                None => root_slots.push(idx),
            }

            let children = raw.children.unwrap_or_default();
            for (i, child) in children.into_iter().enumerate().rev() {
                stack.push(Pending {
                    value: child,
                    path: format!("{}.Children[{}]", pending.path, i),
                    depth: pending.depth + 1,
                    parent: Some(idx),
                });
            }
        }

        let mut built: Vec<Option<NavigationNode>> = Vec::with_capacity(slots.len());
        built.resize_with(slots.len(), || None);
        for (idx, slot) in slots.into_iter().enumerate().rev() {
            let children = slot
                .children
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[idx] = Some(NavigationNode {
                title: slot.title,
                url: slot.url,
                is_external: slot.is_external,
                children,
            });
        }

        let roots = root_slots
            .into_iter()
            .filter_map(|idx| built[idx].take())
            .collect();

        Extraction { roots, warnings }
    }
}

fn skip(warnings: &mut Vec<DecodeWarning>, path: String, message: String) {
    warn!("Skipping navigation entry {}: {}", path, message);
    warnings.push(DecodeWarning { path, message });
}

/// Extract the quick launch tree with default settings.
pub fn extract(raw_markup: &str) -> Result<Extraction> {
    NavTreeExtractor::new().extract(raw_markup)
}

/// Locate the navigation marker and return the JSON object that follows it,
/// up to and including its matching closing brace. Anything after that
/// (sibling keys, `;`, `</script>`) is left alone.
pub fn isolate_payload(raw_markup: &str) -> Result<&str> {
    let start = raw_markup
        .find(NAVIGATION_MARKER)
        .ok_or_else(|| NavError::malformed("navigation marker not found", ""))?;

    let rest = raw_markup[start + NAVIGATION_MARKER.len()..].trim_start();
    if !rest.starts_with('{') {
        return Err(NavError::malformed(
            "navigation marker is not followed by an object",
            rest,
        ));
    }

    let mut nesting = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in rest.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => nesting += 1,
            '}' | ']' => {
                nesting = nesting.saturating_sub(1);
                if nesting == 0 {
                    return Ok(&rest[..=idx]);
                }
            }
            _ => {}
        }
    }

    Err(NavError::malformed("unterminated navigation object", rest))
}
