//! End-to-end scenarios: engine and validator working together.

use serde_json::json;

use crate::engine::{EngineHandle, TokenEngine};
use crate::error::SsoError;
use crate::providers::Identity;
use crate::testing::{Fixture, OTHER_PRIVATE_PEM, SIGNING_PUBLIC_PEM};
use crate::token::unix_now;
use crate::validator::TokenValidator;

fn validator() -> TokenValidator {
    TokenValidator::from_public_key_pem(SIGNING_PUBLIC_PEM.as_bytes()).unwrap()
}

fn bearer(access_token: &str) -> String {
    format!("Bearer {}", access_token)
}

#[tokio::test]
async fn test_login_then_identify() {
    let fixture = Fixture::new();
    let engine = TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap();

    let identity = engine.authenticate("alice", "wonderland").await.unwrap();
    let response = engine.enroll(identity.clone()).await.unwrap();

    let recovered = validator()
        .identify_authorization(Some(&bearer(&response.access_token)), unix_now())
        .unwrap();
    assert_eq!(recovered, identity);
}

#[tokio::test]
async fn test_refresh_then_identify() {
    let fixture = Fixture::new();
    let engine = TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap();
    let identity = engine.authenticate("bob", "pw").await.unwrap();
    let first = engine.enroll(identity.clone()).await.unwrap();

    assert_eq!(
        engine.refresh("does-not-exist").await,
        Err(SsoError::RefreshTokenNotFound)
    );

    let second = engine.refresh(first.refresh_token.as_str()).await.unwrap();
    let recovered = validator()
        .identify_authorization(Some(&bearer(&second.access_token)), unix_now())
        .unwrap();
    assert_eq!(recovered, identity);
}

#[tokio::test]
async fn test_expired_access_token_is_too_old() {
    let fixture = Fixture::new();
    let engine = TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap();
    let identity = engine.authenticate("alice", "wonderland").await.unwrap();
    let response = engine.enroll(identity).await.unwrap();

    let later = unix_now() + Fixture::TOKEN_SECONDS + 5;
    assert_eq!(
        validator().identify_authorization(Some(&bearer(&response.access_token)), later),
        Err(SsoError::TokenTooOld)
    );
}

#[tokio::test]
async fn test_token_from_another_key_pair_is_rejected() {
    let fixture = Fixture::new();
    let foreign_key = fixture.write_file("other_private.pem", OTHER_PRIVATE_PEM);
    let engine = TokenEngine::new(
        &fixture.basic_configuration(json!({ "privateKeyPath": foreign_key })),
    )
    .unwrap();
    let identity = engine.authenticate("alice", "wonderland").await.unwrap();
    let response = engine.enroll(identity).await.unwrap();

    assert_eq!(
        validator().identify_authorization(Some(&bearer(&response.access_token)), unix_now()),
        Err(SsoError::SignatureInvalid)
    );
}

#[tokio::test]
async fn test_refresh_token_survives_rebuild() {
    let fixture = Fixture::new();
    let first = TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap();
    let identity = first.authenticate("alice", "wonderland").await.unwrap();
    let issued = first.enroll(identity.clone()).await.unwrap();

    // New lifetimes and issuer, same refresh table
    let second = TokenEngine::rebuild(
        &fixture.basic_configuration(json!({
            "issuer": "rebuilt",
            "tokenSecondsToLive": 30,
            "refreshSecondsToLive": 300
        })),
        &first,
    )
    .unwrap();

    let response = second.refresh(issued.refresh_token.as_str()).await.unwrap();
    let recovered = validator()
        .identify_authorization(Some(&bearer(&response.access_token)), unix_now())
        .unwrap();
    assert_eq!(recovered, identity);

    // A fresh engine does not know the token
    let unrelated = TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap();
    assert_eq!(
        unrelated.refresh(issued.refresh_token.as_str()).await,
        Err(SsoError::RefreshTokenNotFound)
    );
}

#[tokio::test]
async fn test_basic_before_unreachable_directory() {
    let fixture = Fixture::new();
    let engine = TokenEngine::new(&fixture.chained_configuration(json!({}))).unwrap();

    let identity = engine.authenticate("bob", "pw").await.unwrap();
    assert_eq!(identity.user_name().as_str(), "bob");
    assert_eq!(identity.roles(), ["user".to_string()]);

    // Wrong password falls through to the directory, which cannot be reached
    assert_eq!(
        engine.authenticate("bob", "nope").await,
        Err(SsoError::UserNotFound)
    );
}

#[tokio::test]
async fn test_concurrent_requests_across_reload() {
    let fixture = Fixture::new();
    let handle =
        EngineHandle::new(TokenEngine::new(&fixture.basic_configuration(json!({}))).unwrap());

    let issued = handle
        .current()
        .await
        .enroll(Identity::new("alice", vec![]))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let handle = handle.clone();
        let refresh_token = issued.refresh_token.clone();
        let configuration = fixture.basic_configuration(json!({ "issuer": format!("gen-{}", i) }));
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                handle.reload(&configuration).await.map(|_| ())
            } else {
                let engine = handle.current().await;
                engine.refresh(refresh_token.as_str()).await.map(|_| ())
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let engine = handle.current().await;
    assert!(engine.issuer().starts_with("gen-"));
    // One initial record plus one per refresh
    assert_eq!(engine.refresh_store().len().await, 5);
}

#[tokio::test]
async fn test_client_credentials_gate() {
    let fixture = Fixture::new();
    let engine = TokenEngine::new(&fixture.basic_configuration(json!({
        "clientId": "portal",
        "clientPassword": "${SSO_IT_UNSET_CLIENT_PASSWORD}"
    })))
    .unwrap();

    // Unset variables are kept literally
    assert!(
        engine
            .check_client(Some(("portal", "${SSO_IT_UNSET_CLIENT_PASSWORD}")))
            .is_ok()
    );
    assert!(engine.check_client(Some(("portal", ""))).is_err());
}
