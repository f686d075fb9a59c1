// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for reader precedence and default handling.

mod common;

use cfgbind::domain::{extract, Provider};
use cfgbind::prelude::*;
use cfgbind::service::read_and_validate;
use common::{EnvGuard, MockReader};
use std::collections::HashMap;

#[derive(Debug, Default, Record)]
struct Settings {
    #[config(env = "PRECEDENCE_HOST", file = "host", default = "localhost")]
    host: String,
    #[config(env = "PRECEDENCE_PORT", file = "port", default = "8080")]
    port: u16,
    #[config(file = "mode")]
    mode: String,
}

fn env_values(pairs: &[(&str, &str)]) -> Box<dyn Reader> {
    let values = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>();
    Box::new(EnvReader::with_values(values))
}

#[test]
fn test_later_reader_wins() {
    let file = MockReader::new("file")
        .with_value("host", "file-host")
        .with_value("port", "7000")
        .with_value("mode", "debug");
    let env = env_values(&[("PRECEDENCE_HOST", "env-host")]);

    let mut cfg = Settings::default();
    let outcome = read_and_validate(&mut cfg, &[file.boxed(), env], None);
    assert!(outcome.is_clean(), "{}", outcome);

    assert_eq!(cfg.host, "env-host");
    assert_eq!(cfg.port, 7000);
    assert_eq!(cfg.mode, "debug");
}

#[test]
fn test_reader_order_is_respected() {
    let file = MockReader::new("file").with_value("host", "file-host");
    let env = env_values(&[("PRECEDENCE_HOST", "env-host")]);

    let mut cfg = Settings::default();
    let outcome = read_and_validate(&mut cfg, &[env, file.boxed()], None);
    assert!(outcome.is_clean(), "{}", outcome);
    assert_eq!(cfg.host, "file-host");
}

#[test]
fn test_defaults_do_not_clobber_reader_values() {
    let file = MockReader::new("file")
        .with_value("port", "9000")
        .with_value("mode", "release");

    let mut cfg = Settings::default();
    let outcome = read_and_validate(&mut cfg, &[file.boxed()], None);
    assert!(outcome.is_clean(), "{}", outcome);

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "localhost");
}

#[test]
fn test_failed_reader_keeps_earlier_value() {
    let file = MockReader::new("file")
        .with_value("port", "7000")
        .with_value("mode", "debug");
    let env = env_values(&[("PRECEDENCE_PORT", "not-a-port")]);

    let mut cfg = Settings::default();
    let outcome = read_and_validate(&mut cfg, &[file.boxed(), env], None);
    assert!(outcome.valid);

    let message = outcome.error.unwrap().to_string();
    assert!(message.contains("port"), "{}", message);
    assert_eq!(cfg.port, 7000);
}

#[test]
fn test_provider_reports_winning_reader() {
    let file = MockReader::new("file")
        .with_value("host", "file-host")
        .with_value("mode", "debug");
    let env = env_values(&[("PRECEDENCE_HOST", "env-host")]);

    let mut cfg = Settings::default();
    let mut fields = extract(&mut cfg);
    file.read(&mut fields).unwrap();
    env.read(&mut fields).unwrap();
    for field in fields.iter_mut() {
        field.apply_default().unwrap();
    }

    assert_eq!(fields[0].provider(), &Provider::Source("env".to_string()));
    assert_eq!(fields[1].provider(), &Provider::Default);
    assert_eq!(fields[2].provider(), &Provider::Source("file".to_string()));
}

#[test]
fn test_passes_are_idempotent() {
    let file = MockReader::new("file")
        .with_value("port", "7000")
        .with_value("mode", "debug");
    let readers = vec![file.boxed(), env_values(&[("PRECEDENCE_HOST", "env-host")])];

    let mut cfg = Settings::default();
    assert!(read_and_validate(&mut cfg, &readers, None).is_clean());
    let first = format!("{:?}", cfg);

    assert!(read_and_validate(&mut cfg, &readers, None).is_clean());
    assert_eq!(format!("{:?}", cfg), first);
    assert_eq!(file.reads(), 2);
}

#[test]
fn test_removed_value_falls_back_to_default_on_fresh_record() {
    let file = MockReader::new("file")
        .with_value("port", "7000")
        .with_value("mode", "debug");

    let mut cfg = Settings::default();
    assert!(read_and_validate(&mut cfg, &[file.boxed()], None).is_clean());
    assert_eq!(cfg.port, 7000);

    file.remove("port");
    let mut fresh = Settings::default();
    assert!(read_and_validate(&mut fresh, &[file.boxed()], None).is_clean());
    assert_eq!(fresh.port, 8080);
}

#[test]
fn test_env_prefix() {
    let mut guard = EnvGuard::new();
    guard.set("PFX_PRECEDENCE_PORT", "6000");

    let reader = EnvReader::new().with_prefix("PFX_");
    let file = MockReader::new("file").with_value("mode", "debug");

    let mut cfg = Settings::default();
    let outcome = read_and_validate(&mut cfg, &[file.boxed(), Box::new(reader)], None);
    assert!(outcome.is_clean(), "{}", outcome);
    assert_eq!(cfg.port, 6000);
}

#[test]
fn test_verbose_env_reports_missing_with_default() {
    let reader = EnvReader::with_values(HashMap::new()).verbose(true);
    let file = MockReader::new("file").with_value("mode", "debug");

    let mut cfg = Settings::default();
    let outcome = read_and_validate(&mut cfg, &[file.boxed(), Box::new(reader)], None);
    assert!(outcome.valid);

    let message = outcome.error.unwrap().to_string();
    assert!(message.contains("env: PRECEDENCE_HOST is not set"), "{}", message);
    assert!(message.contains("env: PRECEDENCE_PORT is not set"), "{}", message);
    assert_eq!(cfg.host, "localhost");
    assert_eq!(cfg.port, 8080);
}

#[test]
fn test_no_readers_is_invalid() {
    let mut cfg = Settings::default();
    let outcome = read_and_validate(&mut cfg, &[], None);
    assert!(!outcome.valid);
    assert!(matches!(outcome.error, Some(ConfigError::NoReaders)));
}
