// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment refresh example.
//!
//! This example demonstrates:
//! - Deriving a record with defaults, sequences, maps and a nested record
//! - Validating every pass
//! - Refreshing the record from the environment on a fixed interval
//!
//! To run this example:
//! ```bash
//! APP_WORKERS=8 APP_TAGS="a;b" cargo run --example env_refresh
//! ```

use cfgbind::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default, Record)]
struct Http {
    /// Address the server binds to
    #[config(env = "APP_HTTP_BIND", default = "0.0.0.0:8080")]
    bind: String,
    #[config(env = "APP_HTTP_TIMEOUT", default = "30s")]
    timeout: Duration,
}

#[derive(Debug, Default, Record)]
struct App {
    #[config(env = "APP_WORKERS", default = "4")]
    workers: u32,
    #[config(env = "APP_TAGS", separator = ";", default = "")]
    tags: Vec<String>,
    #[config(env = "APP_LIMITS", default = "read:100,write:10")]
    limits: HashMap<String, u32>,
    #[config(env = "APP_API_KEY", default = "dev", sensitive)]
    api_key: String,
    #[config(flatten)]
    http: Http,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== cfgbind: Environment Refresh Example ===\n");

    let app = Arc::new(RwLock::new(App::default()));
    let service = ConfigService::<App>::builder()
        .with_interval(Duration::from_secs(1))
        .with_validator(|app: &App| -> std::result::Result<(), BoxError> {
            if app.workers == 0 {
                return Err("APP_WORKERS must be positive".into());
            }
            Ok(())
        })
        .build();

    let callback: RefreshCallback = Arc::new(|outcome: &Outcome| {
        println!("refreshed: {}", outcome);
    });

    let readers: Vec<Box<dyn Reader>> = vec![Box::new(EnvReader::new())];
    service
        .start(Arc::clone(&app), Some(callback), readers)
        .into_result()?;

    {
        let app = app.read().unwrap_or_else(|e| e.into_inner());
        println!("workers: {}", app.workers);
        println!("tags:    {:?}", app.tags);
        println!("limits:  {:?}", app.limits);
        println!("bind:    {}", app.http.bind);
        println!("timeout: {:?}\n", app.http.timeout);
    }

    // Let a few refreshes run
    thread::sleep(Duration::from_secs(3));
    service.stop();

    println!("\n=== Example Complete ===");
    Ok(())
}
