use docsearch_core::sanitize::{
    sanitize_content, sanitize_metadata, sanitize_query, MAX_QUERY_CHARS,
};
use docsearch_core::types::Metadata;
use serde_json::json;

fn metadata(value: serde_json::Value) -> Metadata {
    value.as_object().cloned().expect("object")
}

#[test]
fn script_blocks_are_removed_with_their_body() {
    let out = sanitize_content("Hello <script>alert('x')</script> world");
    assert_eq!(out, "Hello world");
}

#[test]
fn tag_matching_ignores_case_and_spans_lines() {
    let out = sanitize_content(
        "a<SCRIPT type=\"text/javascript\">\nvar x = 1;\n</Script >b <iframe src=x></iframe>c",
    );
    assert_eq!(out, "ab c");
}

#[test]
fn no_opening_tag_survives() {
    let inputs = [
        "<style>body{}</style><form action=x><input></form>tail",
        "<object data=x></object><embed src=y></embed>",
        "plain <b>bold</b> text",
        "<scr<script>x</script>ipt>alert(1)</script>",
    ];
    for input in inputs {
        let out = sanitize_content(input);
        assert!(!out.contains('<'), "{input:?} -> {out:?}");
        assert!(!out.contains('>'), "{input:?} -> {out:?}");
    }
}

#[test]
fn remaining_markup_is_escaped() {
    assert_eq!(sanitize_content("price < 5 & \"cheap\""), "price &lt; 5 &amp; &quot;cheap&quot;");
}

#[test]
fn control_characters_dropped_and_whitespace_collapsed() {
    let out = sanitize_content("  one\u{0}\u{7}two \n\n\t three  ");
    assert_eq!(out, "onetwo three");
}

#[test]
fn content_sanitization_is_idempotent() {
    let inputs = [
        "Tom & Jerry's <b>show</b>",
        "<script>x</script>The annual price is $500.",
        "already &amp; escaped &lt;tag&gt;",
        "mixed\u{1}\tcontrol\n\nand   spaces",
    ];
    for input in inputs {
        let once = sanitize_content(input);
        assert_eq!(sanitize_content(&once), once, "not idempotent for {input:?}");
    }
}

#[test]
fn metadata_keeps_only_allowed_keys() {
    let raw = metadata(json!({"source": "a.txt", "evil": "<script>x</script>"}));
    assert_eq!(sanitize_metadata(&raw), metadata(json!({"source": "a.txt"})));
}

#[test]
fn metadata_values_are_cleaned_by_type() {
    let raw = metadata(json!({
        "title": "<b>Report</b>",
        "date": 2024,
        "type": true,
        "tags": ["a", "<script>b</script>"],
        "author": null,
    }));
    let safe = sanitize_metadata(&raw);
    assert_eq!(safe["title"], json!("&lt;b&gt;Report&lt;/b&gt;"));
    assert_eq!(safe["date"], json!(2024));
    assert_eq!(safe["type"], json!(true));
    assert_eq!(safe["author"], json!("null"));
    let tags = safe["tags"].as_str().expect("tags rendered as text");
    assert!(!tags.contains("script"));
}

#[test]
fn query_is_filtered_and_truncated() {
    assert_eq!(sanitize_query("  what's the <price>?  "), "whats the price?");
    assert_eq!(sanitize_query("a. b, c! d? e-f"), "a. b, c! d? e-f");
    let long = "a".repeat(2000);
    assert_eq!(sanitize_query(&long).chars().count(), MAX_QUERY_CHARS);
    assert_eq!(sanitize_query("<>{}[]"), "");
}
