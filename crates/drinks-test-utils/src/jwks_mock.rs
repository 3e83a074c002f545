//! Mock JWKS endpoint helpers on top of `wiremock`.

use crate::rsa_fixtures::TestKeypair;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the identity provider publishes its key set under.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// JWKS document containing the public keys of `keypairs`.
pub fn jwks_body(keypairs: &[&TestKeypair]) -> Value {
    json!({
        "keys": keypairs.iter().map(|keypair| keypair.jwk_json()).collect::<Vec<_>>()
    })
}

/// Full JWKS URL served by `mock_server`.
pub fn jwks_url(mock_server: &MockServer) -> String {
    format!("{}{}", mock_server.uri(), JWKS_PATH)
}

/// Serve `keypairs` from `mock_server` for every request.
pub async fn mount_jwks(mock_server: &MockServer, keypairs: &[&TestKeypair]) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(keypairs)))
        .mount(mock_server)
        .await;
}

/// Serve `keypairs` and verify on drop that exactly `times` fetches happened.
pub async fn mount_jwks_expecting(mock_server: &MockServer, keypairs: &[&TestKeypair], times: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(keypairs)))
        .expect(times)
        .mount(mock_server)
        .await;
}

/// Replace whatever `mock_server` serves with `keypairs`.
pub async fn rotate_jwks(mock_server: &MockServer, keypairs: &[&TestKeypair]) {
    mock_server.reset().await;
    mount_jwks(mock_server, keypairs).await;
}
