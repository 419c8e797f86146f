//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The
//! configuration file path defaults to `config.yaml` but can be specified via `-f` flag or
//! the `UPLINK_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier
//! ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `UPLINK_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `UPLINK_CORS__MAX_AGE=600` sets the `cors.max_age` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # The bearer credential for the downstream service
//! UPLINK_API_TOKEN="pat_..."
//!
//! # Override server port
//! UPLINK_PORT=8081
//!
//! # Include failure detail in 500 bodies (development runs)
//! UPLINK_EXPOSE_ERROR_DETAILS=true
//! ```
//!
//! The bearer credential is deliberately not required at startup: a missing `api_token`
//! makes every upload request fail with a configuration error (HTTP 500), matching
//! deployments that inject the token after the process is provisioned. `--validate` keeps
//! passing without it.

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "UPLINK_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Bearer token attached to outbound downstream requests.
    /// Read once at startup and held read-only for the process lifetime.
    pub api_token: Option<String>,
    /// Downstream contract selection: which endpoint to call and how to shape the body
    pub downstream: DownstreamConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Include failure detail (`details` field) in 500 response bodies.
    /// Intended for development runs; leave off in production.
    pub expose_error_details: bool,
}

/// Downstream contract configuration.
///
/// The two supported contracts are mutually exclusive ways of repackaging the inbound
/// payload for the workflow endpoint. Selecting one here parameterizes the single upload
/// handler instead of maintaining a duplicate handler per contract.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "contract", rename_all = "snake_case")]
pub enum DownstreamConfig {
    /// Send `{ file, filename, filetype }`, filling the optional fields from the defaults
    /// below when the client omits them.
    Workflow {
        /// Workflow endpoint URL
        #[serde(default = "default_workflow_url")]
        url: Url,
        /// Filename used when the client omits one
        #[serde(default = "default_filename")]
        default_filename: String,
        /// MIME type used when the client omits one
        #[serde(default = "default_filetype")]
        default_filetype: String,
    },
    /// Send `{ base64_str: <file content> }` and nothing else.
    Base64 {
        /// Endpoint URL for the base64 contract
        url: Url,
    },
}

fn default_workflow_url() -> Url {
    Url::parse("https://s54tdxkb8v.coze.site/run").unwrap()
}

fn default_filename() -> String {
    "upload.jpg".to_string()
}

fn default_filetype() -> String {
    "image/jpeg".to_string()
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        DownstreamConfig::Workflow {
            url: default_workflow_url(),
            default_filename: default_filename(),
            default_filetype: default_filetype(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
///
/// The caller is a browser page on a different origin than the relay, so permissive
/// cross-origin headers are attached to every response. Defaults to the wildcard origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_token: None,
            downstream: DownstreamConfig::default(),
            cors: CorsConfig::default(),
            expose_error_details: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values.
            // UPLINK_CONFIG belongs to Args, not to this structure.
            .merge(Env::prefixed("UPLINK_").ignore(&["config"]).split("__"))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Configuration {
                message: "CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        let scheme = self.downstream.url().scheme();
        if scheme != "http" && scheme != "https" {
            return Err(Error::Configuration {
                message: format!("downstream URL must use http or https, got '{scheme}'"),
            });
        }

        if let DownstreamConfig::Workflow {
            default_filename,
            default_filetype,
            ..
        } = &self.downstream
        {
            if default_filename.is_empty() || default_filetype.is_empty() {
                return Err(Error::Configuration {
                    message: "workflow contract defaults (default_filename, default_filetype) cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// The socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
