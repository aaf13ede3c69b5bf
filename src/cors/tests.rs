use super::*;

#[test]
fn test_disabled_by_default() {
    let policy = CorsPolicy::default();
    assert!(!policy.is_enabled());
    assert!(!policy.applies(Some("https://a.example")));
    let res = policy.apply_origin(Response::new());
    assert!(res.header("Access-Control-Allow-Origin").is_none());
}

#[test]
fn test_wildcard_with_credentials_rejected() {
    let err = CorsPolicy::builder().origin("*").credentials(true).build().unwrap_err();
    assert_eq!(err, CorsConfigError::WildcardWithCredentials);
}

#[test]
fn test_invalid_origin_rejected() {
    for origin in ["example.com", "https://example.com/", "https://example.com/app"] {
        let err = CorsPolicy::builder().origin(origin).build().unwrap_err();
        assert!(matches!(err, CorsConfigError::InvalidOriginFormat { .. }), "{origin}");
    }
    assert!(CorsPolicy::builder().origin("http://localhost:8080").build().is_ok());
}

#[test]
fn test_invalid_header_name_rejected() {
    let err = CorsPolicy::builder()
        .origin("https://a.example")
        .headers(&["X Bad"])
        .build()
        .unwrap_err();
    assert_eq!(err, CorsConfigError::InvalidHeaderName { header: "X Bad".into() });
}

#[test]
fn test_headers_applied() {
    let policy = CorsPolicy::builder()
        .origin("https://a.example")
        .credentials(true)
        .headers(&["Content-Type", "X-Token"])
        .expose(&["X-Total"])
        .ttl(60)
        .build()
        .unwrap();
    assert!(policy.applies(Some("https://b.example")));
    assert!(!policy.applies(None));

    let res = policy.apply_expose(policy.apply_origin(Response::new()));
    assert_eq!(res.header("Access-Control-Allow-Origin"), Some("https://a.example"));
    assert_eq!(res.header("Access-Control-Allow-Credentials"), Some("true"));
    assert_eq!(res.header("Access-Control-Expose-Headers"), Some("X-Total"));

    let pre = policy.apply_preflight(Response::new(), "GET,POST");
    assert_eq!(pre.header("Access-Control-Allow-Methods"), Some("OPTIONS,GET,POST"));
    assert_eq!(pre.header("Access-Control-Allow-Headers"), Some("Content-Type,X-Token"));
    assert_eq!(pre.header("Access-Control-Max-Age"), Some("60"));
}

#[test]
fn test_preflight_omits_empty_parts() {
    let policy = CorsPolicy::builder().origin("*").build().unwrap();
    let pre = policy.apply_preflight(Response::new(), "GET");
    assert!(pre.header("Access-Control-Allow-Headers").is_none());
    assert!(pre.header("Access-Control-Max-Age").is_none());
}
