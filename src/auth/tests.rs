//! Tests for the auth module

use super::*;
use crate::types::ApiVersion;

#[test]
fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None);
    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/api"));

    let built = req.build().unwrap();
    assert!(built.headers().get("Authorization").is_none());
}

#[test]
fn test_basic_auth() {
    let auth = Authenticator::new(AuthConfig::Basic {
        username: "site-1".to_string(),
        password: "secret-1".to_string(),
    });

    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/api"));

    let built = req.build().unwrap();
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Basic c2l0ZS0xOnNlY3JldC0x"
    );
}

#[test]
fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "app-key".to_string(),
    });

    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/api"));

    let built = req.build().unwrap();
    assert_eq!(
        built.headers().get("Authorization").unwrap(),
        "Bearer app-key"
    );
}

#[test]
fn test_for_api_picks_scheme() {
    let basic = AuthConfig::for_api(ApiVersion::V1, Some("site"), "secret");
    assert!(matches!(basic, AuthConfig::Basic { .. }));

    let bearer = AuthConfig::for_api(ApiVersion::App, Some("site"), "secret");
    assert!(matches!(bearer, AuthConfig::Bearer { .. }));

    // no site id on v1 falls back to the secret alone
    let bearer = AuthConfig::for_api(ApiVersion::V1, None, "secret");
    assert!(matches!(bearer, AuthConfig::Bearer { .. }));
}

#[test]
fn test_debug_hides_secrets() {
    let auth = AuthConfig::Basic {
        username: "site".to_string(),
        password: "top-secret".to_string(),
    };
    let rendered = format!("{auth:?}");
    assert!(rendered.contains("site"));
    assert!(!rendered.contains("top-secret"));
}
