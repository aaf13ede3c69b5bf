use super::{build, specificity_key, CompiledPattern, Params, Segment};
use crate::error::RouteError;

#[test]
fn test_literal_pattern() {
    let p = CompiledPattern::compile("/about", false).unwrap();
    assert!(p.matches("/about").is_some());
    assert!(p.matches("/about/").is_some());
    assert!(p.matches("/about/team").is_none());
    assert!(p.matches("/About").is_none());
}

#[test]
fn test_caseless_pattern() {
    let p = CompiledPattern::compile("/About", true).unwrap();
    assert!(p.matches("/about").is_some());
    assert!(p.matches("/ABOUT/").is_some());
}

#[test]
fn test_named_tokens() {
    let p = CompiledPattern::compile("/users/@user/posts/@post", false).unwrap();
    let params = p.matches("/users/7/posts/hello-world").unwrap();
    assert_eq!(params.get("user"), Some("7"));
    assert_eq!(params.get("post"), Some("hello-world"));
    assert!(params.wildcard().is_empty());
    assert!(p.matches("/users/7/posts/a/b").is_none());
}

#[test]
fn test_braced_and_inline_tokens() {
    let p = CompiledPattern::compile("/files/{@name}.@ext", false).unwrap();
    let params = p.matches("/files/report.pdf").unwrap();
    assert_eq!(params.get("name"), Some("report"));
    assert_eq!(params.get("ext"), Some("pdf"));
}

#[test]
fn test_wildcards_merge_in_order() {
    let p = CompiledPattern::compile("/a/*/b/*", false).unwrap();
    let params = p.matches("/a/one/two/b/three").unwrap();
    assert_eq!(params.wildcard(), &["one/two".to_string(), "three".to_string()]);
}

#[test]
fn test_segments() {
    let p = CompiledPattern::compile("/x/@id/*", false).unwrap();
    assert_eq!(p.segments().len(), 4);
    assert!(matches!(p.segments()[1], Segment::Named(ref n) if n.as_ref() == "id"));
    assert!(p.has_wildcard());
}

#[test]
fn test_malformed_patterns() {
    for bad in ["", "  ", "/a/@", "/a/{@id", "/a/@id/@id"] {
        let err = CompiledPattern::compile(bad, false).unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }), "{bad:?} -> {err:?}");
    }
}

#[test]
fn test_specificity_key() {
    assert_eq!(specificity_key("/items/@id"), "/items/*@+");
    assert_eq!(specificity_key("/items/*"), "/items/*");
    assert!(specificity_key("/a/b") > specificity_key("/a/*"));
    assert!(specificity_key("/items/new") > specificity_key("/items/@id"));
    assert!(specificity_key("/items/@id") > specificity_key("/items/*"));
}

#[test]
fn test_build_round_trip() {
    let p = CompiledPattern::compile("/items/@id", false).unwrap();
    let url = build("/items/@id", &Params::new().with("id", "42"));
    assert_eq!(url, "/items/42");
    assert_eq!(p.matches(&url).unwrap().get("id"), Some("42"));
}

#[test]
fn test_build_encodes_per_segment() {
    let url = build(
        "/docs/@section/*",
        &Params::new()
            .with("section", "a b")
            .with_wildcard(["x/y z"]),
    );
    assert_eq!(url, "/docs/a%20b/x/y%20z");
}

#[test]
fn test_build_leaves_unresolved_tokens() {
    let url = build("/users/@id/{@tab}/*", &Params::new());
    assert_eq!(url, "/users/@id/{@tab}/*");
}

#[test]
fn test_build_wildcards_positional() {
    let url = build("/*/and/*", &Params::new().with_wildcard(["first", "second"]));
    assert_eq!(url, "/first/and/second");
}
