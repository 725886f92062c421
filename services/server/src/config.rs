//! Server configuration (env-driven).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use wxviewer_object_store::{Credentials, S3Config};

use crate::cache::ImageCacheConfig;
use crate::fetch::FetchConfig;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Variables that positional arguments replace, in argument order.
const POSITIONAL_VARS: [&str; 5] = [
    "WXVIEWER_KEY_ID",
    "WXVIEWER_KEY_SECRET",
    "WXVIEWER_BUCKET_NAME",
    "WXVIEWER_BUCKET_REGION",
    "WXVIEWER_BUCKET_ENDPOINT",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,

    /// Directory holding the frontend.
    pub static_dir: PathBuf,

    pub s3: S3Config,

    pub cache: ImageCacheConfig,

    pub fetch: FetchConfig,

    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables and command-line
    /// arguments.
    ///
    /// `wxviewer <key-id> <key-secret> <bucket> <region> <endpoint>` takes
    /// the bucket settings from the arguments instead of the environment.
    pub fn from_env() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::from_args(&args, |name| std::env::var(name).ok())
    }

    /// Load configuration from `var`, with the bucket settings overridden by
    /// `args` when at least five are given.
    pub fn from_args(args: &[String], var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let positional = args.len() >= POSITIONAL_VARS.len();
        Self::from_lookup(|name| {
            if positional {
                if let Some(i) = POSITIONAL_VARS.iter().position(|v| *v == name) {
                    return args.get(i).cloned();
                }
            }
            var(name)
        })
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| -> Result<String> {
            var(name)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{name} must be set."))
        };

        let credentials = Credentials {
            access_key_id: required("WXVIEWER_KEY_ID")?,
            secret_access_key: required("WXVIEWER_KEY_SECRET")?,
        };
        let s3 = S3Config::new(
            required("WXVIEWER_BUCKET_ENDPOINT")?,
            required("WXVIEWER_BUCKET_NAME")?,
            required("WXVIEWER_BUCKET_REGION")?,
            credentials,
        );

        let listen_addr = var("WXVIEWER_LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:80".to_string())
            .parse()
            .context("WXVIEWER_LISTEN_ADDR must be a socket address (host:port).")?;

        let static_dir = var("WXVIEWER_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/static"));

        let max_entries: usize = var("WXVIEWER_IMAGE_CACHE_SIZE")
            .map(|v| v.parse())
            .transpose()
            .context("WXVIEWER_IMAGE_CACHE_SIZE must be an integer.")?
            .unwrap_or(100);
        if max_entries == 0 {
            bail!("WXVIEWER_IMAGE_CACHE_SIZE must be at least 1.");
        }

        let max_mb: u64 = var("WXVIEWER_IMAGE_CACHE_SIZE_MB")
            .map(|v| v.parse())
            .transpose()
            .context("WXVIEWER_IMAGE_CACHE_SIZE_MB must be an integer (megabytes).")?
            .unwrap_or(100);
        if max_mb == 0 {
            bail!("WXVIEWER_IMAGE_CACHE_SIZE_MB must be at least 1.");
        }

        let timeout_secs: u64 = var("WXVIEWER_FETCH_TIMEOUT_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("WXVIEWER_FETCH_TIMEOUT_SECS must be an integer (seconds).")?
            .unwrap_or(30);

        let max_concurrent: Option<usize> = var("WXVIEWER_MAX_CONCURRENT_FETCHES")
            .map(|v| v.parse())
            .transpose()
            .context("WXVIEWER_MAX_CONCURRENT_FETCHES must be an integer.")?;
        if max_concurrent == Some(0) {
            bail!("WXVIEWER_MAX_CONCURRENT_FETCHES must be at least 1.");
        }

        let log_level = var("WXVIEWER_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            listen_addr,
            static_dir,
            s3,
            cache: ImageCacheConfig {
                max_entries,
                max_bytes: max_mb.saturating_mul(BYTES_PER_MB),
            },
            fetch: FetchConfig {
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
                max_concurrent,
            },
            log_level,
        })
    }
}
