//! Typed presets for each [`Environment`].

use std::path::PathBuf;

use super::{Config, Environment, LogFormat};

const PUBLIC_GATEWAYS: [&str; 4] = [
    "https://ipfs.io",
    "https://cloudflare-ipfs.com",
    "https://nftstorage.link",
    "https://infura-ipfs.io",
];

const MIB: u64 = 1024 * 1024;

pub fn config_for(environment: Environment) -> Config {
    match environment {
        Environment::Production => production(),
        Environment::Staging => staging(),
        Environment::Development => development(),
        Environment::Test => test(),
    }
}

fn base(environment: Environment) -> Config {
    Config {
        environment,
        store_path: PathBuf::from("data/metaproc"),
        ipfs_gateways: PUBLIC_GATEWAYS.iter().map(|g| g.to_string()).collect(),
        ipfs_fallback_gateway: "http://backend-ipfs:8080".into(),
        processing_workers: 4,
        download_retries: 5,
        grid_size: 100.0,
        polygon_count_error: 100,
        http_timeout_seconds: 30,
        http_max_connections: 100,
        max_metadata_file_size: MIB,
        max_artifact_file_size: 64 * MIB,
        startup_wait_seconds: 0,
        store_retry_seconds: 10,
        poll_interval_millis: 1000,
        log_level: "info".into(),
        log_format: LogFormat::Pretty,
    }
}

fn production() -> Config {
    Config {
        store_path: PathBuf::from("/var/lib/metaproc"),
        processing_workers: 8,
        startup_wait_seconds: 20,
        log_format: LogFormat::Json,
        ..base(Environment::Production)
    }
}

fn staging() -> Config {
    Config {
        startup_wait_seconds: 10,
        ..base(Environment::Staging)
    }
}

fn development() -> Config {
    Config {
        ipfs_fallback_gateway: "http://localhost:8080".into(),
        processing_workers: 1,
        download_retries: 2,
        log_level: "debug".into(),
        ..base(Environment::Development)
    }
}

fn test() -> Config {
    Config {
        store_path: PathBuf::from("target/metaproc-test"),
        ipfs_gateways: vec!["http://gw.test".into()],
        ipfs_fallback_gateway: "http://fallback.test".into(),
        processing_workers: 2,
        download_retries: 1,
        http_timeout_seconds: 5,
        poll_interval_millis: 10,
        log_level: "warn".into(),
        ..base(Environment::Test)
    }
}
