// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Vault reader against a mock Vault server.
//!
//! The Vault client is blocking, so all client work runs on the blocking pool.

#![cfg(all(feature = "vault", feature = "derive"))]

mod common;

use cfgbind::adapters::vault::auth::aws_iam::SERVER_ID_HEADER;
use cfgbind::adapters::vault::{
    AwsIamAuth, KubernetesAuth, TokenAuth, VaultClient, VaultConfig, VaultReader, VaultStorage,
};
use cfgbind::domain::ConfigError;
use cfgbind::ports::{IamRequestSigner, SignedRequest};
use cfgbind::prelude::*;
use cfgbind::service::read_and_validate;
use common::init_tracing;
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Default, Record)]
struct Database {
    #[config(vault = "secret/data/app:username")]
    username: String,
    #[config(vault = "secret/data/app:port")]
    port: u16,
    #[config(vault = "secret/data/app:debug")]
    debug: bool,
    #[config(vault = "secret/data/app:password", sensitive)]
    password: String,
}

fn client(uri: &str) -> VaultClient {
    VaultClient::new(&VaultConfig::new(uri)).unwrap()
}

fn token_reader(uri: &str, token: &str) -> (Arc<TokenAuth>, VaultReader) {
    let client = client(uri);
    let auth = Arc::new(TokenAuth::new(client.clone(), token));
    let storage = VaultStorage::new(client, auth.clone()).with_data_key("data");
    (auth, VaultReader::new(Arc::new(storage)))
}

async fn mount_lookup(server: &MockServer, token: &str, data: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("X-Vault-Token", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
        .mount(server)
        .await;
}

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kv2_secret_is_read_once_per_pass() {
    init_tracing();
    let server = MockServer::start().await;
    mount_lookup(&server, "s.root", json!({ "ttl": 0, "renewable": false })).await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .and(header("X-Vault-Token", "s.root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "data": {
                    "username": "admin",
                    "port": 5432,
                    "debug": true,
                    "password": "hunter2"
                },
                "metadata": { "version": 3 }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let (auth, reader) = token_reader(&uri, "s.root");
        let mut db = Database::default();
        let outcome = read_and_validate(&mut db, &[Box::new(reader)], None);
        assert!(outcome.is_clean(), "{}", outcome);

        assert_eq!(db.username, "admin");
        assert_eq!(db.port, 5432);
        assert!(db.debug);
        assert_eq!(db.password, "hunter2");
        assert!(!auth.is_renewing());
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_fetch_is_reported_for_every_field() {
    let server = MockServer::start().await;
    mount_lookup(&server, "s.root", json!({ "ttl": 0, "renewable": false })).await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let (_auth, reader) = token_reader(&uri, "s.root");
        let mut db = Database::default();
        let outcome = read_and_validate(&mut db, &[Box::new(reader)], None);
        assert!(outcome.valid);

        let Some(ConfigError::Multiple(errors)) = outcome.error else {
            panic!("expected aggregated errors");
        };
        assert_eq!(errors.len(), 4);
        assert!(errors
            .iter()
            .all(|e| e.to_string().contains("failed to read secret/data/app")));
    })
    .await
    .unwrap();
}

#[derive(Debug, Default, Record)]
struct Formatted {
    #[config(vault = "secret/{env}/db:user")]
    user: String,
    #[config(vault = "secret/{env}/db:password", default = "changeme")]
    password: String,
}

#[tokio::test(flavor = "multi_thread")]
async fn test_formatter_and_missing_key() {
    let server = MockServer::start().await;
    mount_lookup(&server, "s.root", json!({ "ttl": 0, "renewable": false })).await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/prod/db"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "user": "svc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let client = client(&uri);
        let auth = Arc::new(TokenAuth::new(client.clone(), "s.root"));
        let storage = Arc::new(VaultStorage::new(client, auth));
        let reader = VaultReader::new(storage)
            .with_formatter(Arc::new(|p: &str| p.replace("{env}", "prod")));

        let mut cfg = Formatted::default();
        let outcome = read_and_validate(&mut cfg, &[Box::new(reader)], None);
        assert!(outcome.valid);
        assert_eq!(cfg.user, "svc");
        assert_eq!(cfg.password, "changeme");

        let message = outcome.error.unwrap().to_string();
        assert!(
            message.contains("vault: secret/prod/db:password is not set"),
            "{}",
            message
        );
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kubernetes_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/kubernetes/login"))
        .and(body_json(json!({ "role": "billing", "jwt": "jwt-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth": { "client_token": "s.k8s", "renewable": false }
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_lookup(&server, "s.k8s", json!({ "ttl": 0, "renewable": false })).await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .and(header("X-Vault-Token", "s.k8s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "data": { "username": "k8s", "port": "6432", "debug": "false", "password": "x" }
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut jwt = tempfile::NamedTempFile::new().unwrap();
    writeln!(jwt, "jwt-token").unwrap();
    let jwt_path = jwt.path().to_path_buf();

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let client = client(&uri);
        let auth = Arc::new(KubernetesAuth::new(client.clone(), "billing").with_jwt_path(jwt_path));
        let storage = Arc::new(VaultStorage::new(client, auth.clone()).with_data_key("data"));
        let readers: Vec<Box<dyn Reader>> = vec![Box::new(VaultReader::new(storage))];

        let mut db = Database::default();
        assert!(read_and_validate(&mut db, &readers, None).is_clean());
        assert_eq!(db.username, "k8s");
        assert_eq!(db.port, 6432);
        assert!(!db.debug);

        // the token is reused by later passes
        assert!(read_and_validate(&mut db, &readers, None).is_clean());
        assert_eq!(auth.token().as_deref(), Some("s.k8s"));
    })
    .await
    .unwrap();

    drop(jwt);
}

struct StaticSigner;

impl IamRequestSigner for StaticSigner {
    fn sign(&self, server_id: Option<&str>) -> std::result::Result<SignedRequest, BoxError> {
        let mut headers = std::collections::BTreeMap::new();
        if let Some(id) = server_id {
            headers.insert(SERVER_ID_HEADER.to_string(), vec![id.to_string()]);
        }
        Ok(SignedRequest {
            method: "POST".to_string(),
            url: "https://sts.amazonaws.com/".to_string(),
            headers,
            body: b"Action=GetCallerIdentity&Version=2011-06-15".to_vec(),
        })
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_aws_iam_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/aws-prod/login"))
        .and(header(SERVER_ID_HEADER, "vault.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth": { "client_token": "s.aws" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_lookup(&server, "s.aws", json!({ "ttl": 0, "renewable": false })).await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let auth = AwsIamAuth::new(client(&uri), Arc::new(StaticSigner), "web")
            .with_mount("aws-prod")
            .with_server_id("vault.example.com");
        auth.authenticate().unwrap();
        assert_eq!(auth.token().as_deref(), Some("s.aws"));

        // a held, non-expiring token needs no second login
        auth.authenticate().unwrap();
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_without_client_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/aws/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "auth": null })))
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let auth = AwsIamAuth::new(client(&uri), Arc::new(StaticSigner), "web");
        let err = auth.authenticate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "empty auth.client_token property in response body"
        );
        assert!(auth.token().is_none());
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_renewal_failure_ends_loop() {
    let server = MockServer::start().await;
    mount_lookup(&server, "s.short", json!({ "ttl": 1, "renewable": true })).await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/token/renew-self"))
        .and(header("X-Vault-Token", "s.short"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let auth = TokenAuth::new(client(&uri), "s.short");
        auth.authenticate().unwrap();
        assert!(auth.is_renewing());

        assert!(wait_for(Duration::from_secs(2), || !auth.is_renewing()));
        auth.stop();
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_renewal_refreshes_credential() {
    init_tracing();
    let server = MockServer::start().await;
    mount_lookup(&server, "s.short", json!({ "ttl": 1, "renewable": true })).await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/token/renew-self"))
        .and(header("X-Vault-Token", "s.short"))
        .and(body_json(json!({ "increment": "1s" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth": { "client_token": "s.short", "lease_duration": 1, "renewable": true }
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let credential = tokio::task::spawn_blocking(move || {
        let auth = TokenAuth::new(client(&uri), "s.short");
        auth.authenticate().unwrap();
        let initial = auth.credential().unwrap();
        assert!(auth.is_renewing());

        assert!(wait_for(Duration::from_secs(3), || {
            auth.credential().map_or(false, |c| c.acquired_at > initial.acquired_at)
        }));
        thread::sleep(Duration::from_millis(250));
        assert!(auth.is_renewing());

        auth.stop();
        assert!(!auth.is_renewing());
        auth.credential().unwrap()
    })
    .await
    .unwrap();

    assert_eq!(credential.token, "s.short");
    assert_eq!(credential.ttl, Duration::from_secs(1));

    let renewals = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/v1/auth/token/renew-self")
        .count();
    assert!(renewals >= 2, "{} renewals", renewals);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_renewal_ends_when_ttl_drops_to_zero() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "ttl": 1, "renewable": true }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "ttl": 0, "renewable": true }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/token/renew-self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "auth": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let auth = TokenAuth::new(client(&uri), "s.fading");
        auth.authenticate().unwrap();
        let initial = auth.credential().unwrap();
        assert!(auth.is_renewing());

        assert!(wait_for(Duration::from_secs(2), || !auth.is_renewing()));
        // the zero TTL is never adopted
        assert_eq!(auth.credential(), Some(initial));
        auth.stop();
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_namespace_is_sent_with_every_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("X-Vault-Namespace", "team-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "ttl": 0, "renewable": false }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .and(header("X-Vault-Namespace", "team-a"))
        .and(header("X-Vault-Token", "s.ns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "data": { "username": "ns", "port": 1, "debug": false, "password": "p" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let client = VaultClient::new(&VaultConfig::new(uri).with_namespace("team-a")).unwrap();
        let auth = Arc::new(TokenAuth::new(client.clone(), "s.ns"));
        let storage = VaultStorage::new(client, auth).with_data_key("data");
        let reader = VaultReader::new(Arc::new(storage));

        let mut db = Database::default();
        let outcome = read_and_validate(&mut db, &[Box::new(reader)], None);
        assert!(outcome.is_clean(), "{}", outcome);
        assert_eq!(db.username, "ns");
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_renewable_token_with_zero_ttl_is_rejected() {
    let server = MockServer::start().await;
    mount_lookup(&server, "s.zero", json!({ "ttl": 0, "renewable": true })).await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let auth = TokenAuth::new(client(&uri), "s.zero");
        let err = auth.authenticate().unwrap_err();
        assert_eq!(err.to_string(), "invalid token TTL");
        assert!(!auth.is_renewing());
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_service_stop_ends_renewal() {
    let server = MockServer::start().await;
    mount_lookup(&server, "s.long", json!({ "ttl": 3600, "renewable": true })).await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/data/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "data": { "username": "admin", "port": 1, "debug": false, "password": "p" } }
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let (auth, reader) = token_reader(&uri, "s.long");
        let record = Arc::new(RwLock::new(Database::default()));
        let service = ConfigService::<Database>::builder()
            .with_interval(Duration::from_secs(60))
            .build();

        let outcome = service.start(Arc::clone(&record), None, vec![Box::new(reader)]);
        assert!(outcome.is_clean(), "{}", outcome);
        assert!(auth.is_renewing());

        service.stop();
        assert!(!auth.is_renewing());
    })
    .await
    .unwrap();
}

#[test]
fn test_malformed_annotations() {
    #[derive(Debug, Default, Record)]
    struct Broken {
        #[config(vault = "secret/app")]
        missing_key: String,
        #[config(vault = "secret/app:a:b")]
        extra_key: String,
    }

    let (_auth, reader) = token_reader("http://127.0.0.1:1", "s.unused");
    let mut broken = Broken::default();
    let outcome = read_and_validate(&mut broken, &[Box::new(reader)], None);

    let Some(ConfigError::Multiple(errors)) = outcome.error else {
        panic!("expected aggregated errors");
    };
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, ConfigError::MalformedAnnotation { .. })));
}
