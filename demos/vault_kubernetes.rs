// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault with Kubernetes authentication example.
//!
//! This example demonstrates:
//! - Logging in to Vault with a Kubernetes service account token
//! - Reading KV v2 secrets with a path formatter
//! - Layering environment variables over secrets
//! - Background token renewal while the service runs
//!
//! To run this example inside a pod:
//! ```bash
//! VAULT_ADDR=https://vault:8200 VAULT_ROLE=billing DEPLOY_ENV=prod \
//!     cargo run --example vault_kubernetes
//! ```

use cfgbind::adapters::vault::{
    KubernetesAuth, VaultClient, VaultConfig, VaultReader, VaultStorage,
};
use cfgbind::prelude::*;
use std::env;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default, Record)]
struct Database {
    #[config(vault = "secret/data/{env}/db:host", env = "DB_HOST")]
    host: String,
    #[config(vault = "secret/data/{env}/db:port", default = "5432")]
    port: u16,
    #[config(vault = "secret/data/{env}/db:password", sensitive)]
    password: String,
}

fn main() -> std::result::Result<(), BoxError> {
    tracing_subscriber::fmt::init();

    let address = env::var("VAULT_ADDR").unwrap_or_else(|_| "http://127.0.0.1:8200".to_string());
    let role = env::var("VAULT_ROLE").unwrap_or_else(|_| "default".to_string());
    let deploy_env = env::var("DEPLOY_ENV").unwrap_or_else(|_| "dev".to_string());

    let mut config = VaultConfig::new(address);
    if let Ok(namespace) = env::var("VAULT_NAMESPACE") {
        config = config.with_namespace(namespace);
    }
    let client = VaultClient::new(&config)?;

    let auth = Arc::new(KubernetesAuth::new(client.clone(), role));
    let storage = Arc::new(VaultStorage::new(client, auth).with_data_key("data"));
    let vault = VaultReader::new(storage).with_formatter(Arc::new(move |path: &str| {
        path.replace("{env}", &deploy_env)
    }));

    // Environment variables override secrets
    let readers: Vec<Box<dyn Reader>> = vec![Box::new(vault), Box::new(EnvReader::new())];

    let database = Arc::new(RwLock::new(Database::default()));
    let service = ConfigService::<Database>::builder()
        .with_interval(Duration::from_secs(30))
        .build();

    let outcome = service.start(Arc::clone(&database), None, readers);
    println!("first pass: {}", outcome);
    if !outcome.valid {
        return Err(format!("configuration rejected: {}", outcome).into());
    }

    {
        let db = database.read().unwrap_or_else(|e| e.into_inner());
        println!("database: {}:{}", db.host, db.port);
    }

    thread::sleep(Duration::from_secs(90));
    service.stop();
    Ok(())
}
