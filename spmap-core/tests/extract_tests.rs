// Tests for navigation payload extraction

use spmap_core::error::NavError;
use spmap_core::extract::{NavTreeExtractor, extract};

fn page_with(navigation: &str) -> String {
    format!(
        r#"<html><head><script type="text/javascript">
var _spPageContextInfo = {{"webAbsoluteUrl":"https://example.org/sites/demo","navigationInfo":{},"appBarParams":{{"isOn":false}}}};
</script></head><body><div id="spPageCanvasContent"></div></body></html>"#,
        navigation
    )
}

// ============================================================================
// Payload Location Tests
// ============================================================================

#[test]
fn test_extract_from_full_page() {
    let markup = page_with(
        r#"{"quickLaunch":[
            {"Id":2003,"Title":"Home","Url":"/sites/demo/SitePages/Home.aspx","IsExternal":false,"Children":[]},
            {"Id":2004,"Title":"Documents","Url":"/sites/demo/Shared Documents/Forms/AllItems.aspx","IsExternal":false,"Children":[]}
        ],"topNav":[]}"#,
    );

    let extraction = extract(&markup).unwrap();

    assert_eq!(extraction.roots.len(), 2);
    assert!(extraction.warnings.is_empty());
    assert_eq!(extraction.roots[0].title, "Home");
    assert_eq!(extraction.roots[0].url, "/sites/demo/SitePages/Home.aspx");
    assert_eq!(extraction.roots[0].is_external, Some(false));
}

#[test]
fn test_missing_marker_is_malformed() {
    let markup = "<html><script>var ctx = {\"webTitle\":\"Demo\"};</script></html>";
    let err = extract(markup).unwrap_err();
    assert!(matches!(err, NavError::MalformedNavigationPayload { .. }));
}

#[test]
fn test_invalid_json_is_malformed() {
    let markup = page_with(r#"{"quickLaunch":[{"Title":"Home",,}]}"#);
    let err = extract(&markup).unwrap_err();
    match err {
        NavError::MalformedNavigationPayload { reason, excerpt } => {
            assert!(reason.contains("invalid JSON"));
            assert!(excerpt.contains("quickLaunch"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_missing_quick_launch_is_malformed() {
    let markup = page_with(r#"{"topNav":[]}"#);
    let err = extract(&markup).unwrap_err();
    assert!(matches!(err, NavError::MalformedNavigationPayload { .. }));
}

#[test]
fn test_quick_launch_not_an_array_is_malformed() {
    let markup = page_with(r#"{"quickLaunch":{"Title":"Home"}}"#);
    assert!(extract(&markup).is_err());
}

#[test]
fn test_empty_quick_launch() {
    let markup = page_with(r#"{"quickLaunch":[]}"#);
    let extraction = extract(&markup).unwrap();
    assert!(extraction.roots.is_empty());
    assert!(extraction.warnings.is_empty());
}

// ============================================================================
// Entry Decoding Tests
// ============================================================================

#[test]
fn test_missing_url_and_children_default() {
    let markup = page_with(r#"{"quickLaunch":[{"Title":"Heading"},{"Title":"Null url","Url":null,"Children":null}]}"#);
    let extraction = extract(&markup).unwrap();

    assert_eq!(extraction.roots.len(), 2);
    assert_eq!(extraction.roots[0].url, "");
    assert!(extraction.roots[0].children.is_empty());
    assert_eq!(extraction.roots[1].url, "");
    assert!(extraction.warnings.is_empty());
}

#[test]
fn test_lowercase_keys_are_accepted() {
    let markup = page_with(r#"{"quickLaunch":[{"title":"About","url":"/about","children":[{"title":"Team","url":"/team"}]}]}"#);
    let extraction = extract(&markup).unwrap();
    assert_eq!(extraction.roots[0].title, "About");
    assert_eq!(extraction.roots[0].children[0].title, "Team");
}

#[test]
fn test_one_malformed_sibling_of_three() {
    let markup = page_with(
        r#"{"quickLaunch":[
            {"Title":"First","Url":"/first"},
            {"Title":42,"Url":"/broken"},
            {"Title":"Third","Url":"/third"}
        ]}"#,
    );

    let extraction = extract(&markup).unwrap();

    let titles: Vec<&str> = extraction.roots.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Third"]);
    assert_eq!(extraction.warnings.len(), 1);
    assert_eq!(extraction.warnings[0].path, "quickLaunch[1]");
}

#[test]
fn test_malformed_child_keeps_siblings_and_parent() {
    let markup = page_with(
        r#"{"quickLaunch":[
            {"Title":"Parent","Url":"/p","Children":[
                {"Title":"Good","Url":"/g"},
                "not an object",
                {"Title":null,"Url":"/untitled"},
                {"Title":"Also good","Url":"/ag","Children":"nope"},
                {"Title":"Last","Url":"/l"}
            ]},
            {"Title":"Next","Url":"/n"}
        ]}"#,
    );

    let extraction = extract(&markup).unwrap();

    assert_eq!(extraction.roots.len(), 2);
    let children: Vec<&str> = extraction.roots[0]
        .children
        .iter()
        .map(|n| n.title.as_str())
        .collect();
    assert_eq!(children, vec!["Good", "Last"]);

    let paths: Vec<&str> = extraction.warnings.iter().map(|w| w.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "quickLaunch[0].Children[1]",
            "quickLaunch[0].Children[2]",
            "quickLaunch[0].Children[3]",
        ]
    );
}

#[test]
fn test_mistyped_external_flag_keeps_entry_and_children() {
    let markup = page_with(
        r#"{"quickLaunch":[{"Title":"P","Url":"/p","IsExternal":"false","Children":[{"Title":"C","Url":"/c"}]}]}"#,
    );
    let extraction = extract(&markup).unwrap();

    assert!(extraction.warnings.is_empty());
    assert_eq!(extraction.roots.len(), 1);
    assert_eq!(extraction.roots[0].title, "P");
    assert_eq!(extraction.roots[0].is_external, None);
    assert_eq!(extraction.roots[0].children[0].title, "C");
}

#[test]
fn test_blank_title_is_skipped() {
    let markup = page_with(r#"{"quickLaunch":[{"Title":"   ","Url":"/x"},{"Title":"Kept","Url":"/k"}]}"#);
    let extraction = extract(&markup).unwrap();
    assert_eq!(extraction.roots.len(), 1);
    assert_eq!(extraction.warnings[0].message, "missing title");
}

// ============================================================================
// Depth Limit Tests
// ============================================================================

fn nested_payload(levels: usize) -> String {
    let mut entry = String::from(r#"{"Title":"leaf","Url":"/leaf"}"#);
    for level in (0..levels - 1).rev() {
        entry = format!(
            r#"{{"Title":"level {}","Url":"/l{}","Children":[{}]}}"#,
            level, level, entry
        );
    }
    format!(r#"{{"quickLaunch":[{}]}}"#, entry)
}

#[test]
fn test_depth_limit_drops_deep_subtree() {
    let markup = page_with(&nested_payload(8));
    let extraction = NavTreeExtractor::new()
        .with_max_depth(5)
        .extract(&markup)
        .unwrap();

    assert_eq!(extraction.node_count(), 5);
    assert_eq!(extraction.warnings.len(), 1);
    assert!(extraction.warnings[0].message.contains("deeper than 5"));
}

#[test]
fn test_default_depth_accepts_realistic_menus() {
    let markup = page_with(&nested_payload(4));
    let extraction = extract(&markup).unwrap();
    assert_eq!(extraction.node_count(), 4);
    assert!(extraction.warnings.is_empty());
}

#[test]
fn test_hostile_nesting_fails_without_overflow() {
    let depth = 20_000;
    let payload = format!(
        r#"{{"quickLaunch":[{}{}]}}"#,
        "[".repeat(depth),
        "]".repeat(depth)
    );
    let markup = page_with(&payload);
    let err = extract(&markup).unwrap_err();
    assert!(matches!(err, NavError::MalformedNavigationPayload { .. }));
}
