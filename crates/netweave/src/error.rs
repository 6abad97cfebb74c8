//! CLI error types with miette diagnostics.
//!
//! Maps `netweave_api::Error` and `ConfigureError` into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use netweave_core::ConfigureError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PARTIAL: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the control plane")]
    #[diagnostic(
        code(netweave::connection_failed),
        help(
            "Check the API URL and network connectivity.\n\
             Try: netweave export --insecure"
        )
    )]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {reason}")]
    #[diagnostic(
        code(netweave::tls_error),
        help(
            "The control plane may use a self-signed certificate.\n\
             Use --insecure (-k) to accept it, or configure ca_cert in your profile."
        )
    )]
    TlsError { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(netweave::auth_failed),
        help("Verify the API token for profile '{profile}'.")
    )]
    AuthFailed { profile: String, message: String },

    #[error("No API token configured for profile '{profile}'")]
    #[diagnostic(
        code(netweave::no_credentials),
        help(
            "Set api_token or api_token_env in the profile,\n\
             or export NETWEAVE_API_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Network '{identifier}' not found")]
    #[diagnostic(
        code(netweave::not_found),
        help("Run: netweave export to see available networks")
    )]
    NetworkNotFound { identifier: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({status}): {message}")]
    #[diagnostic(code(netweave::api_error))]
    ApiError { status: u16, message: String },

    // ── Documents ────────────────────────────────────────────────────
    #[error("Invalid network document in {path}: {reason}")]
    #[diagnostic(
        code(netweave::invalid_document),
        help("Each document needs a name, a topology, and a connections map.")
    )]
    InvalidDocument { path: String, reason: String },

    #[error("{failed} of {total} network documents failed to apply")]
    #[diagnostic(code(netweave::apply_incomplete))]
    ApplyIncomplete { failed: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netweave::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(netweave::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(netweave::no_config),
        help(
            "Create one at: {path}\n\
             Or pass --api-url and NETWEAVE_API_TOKEN directly."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(netweave::config))]
    Config(Box<figment::Error>),

    #[error("Failed to render configuration")]
    ConfigRender(#[from] toml::ser::Error),

    // ── IO / serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    #[diagnostic(code(netweave::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(netweave::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NetworkNotFound { .. } => exit_code::NOT_FOUND,
            Self::ApplyIncomplete { .. } => exit_code::PARTIAL,
            Self::Validation { .. } | Self::InvalidDocument { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Core error mapping ───────────────────────────────────────────────

impl From<netweave_api::Error> for CliError {
    fn from(err: netweave_api::Error) -> Self {
        match err {
            netweave_api::Error::Authentication { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            netweave_api::Error::Transport(source) => CliError::ConnectionFailed {
                source: source.into(),
            },
            netweave_api::Error::Tls(reason) => CliError::TlsError { reason },
            netweave_api::Error::InvalidUrl(source) => CliError::Validation {
                field: "api_url".into(),
                reason: source.to_string(),
            },
            netweave_api::Error::Api { message, status } => CliError::ApiError { status, message },
            netweave_api::Error::Deserialization { message, .. } => CliError::ApiError {
                status: 0,
                message: format!("unexpected response body: {message}"),
            },
        }
    }
}

impl From<ConfigureError> for CliError {
    fn from(err: ConfigureError) -> Self {
        match err {
            ConfigureError::ControlPlane(api) => api.into(),
            ConfigureError::Validation(reason) | ConfigureError::Resolution(reason) => {
                CliError::Validation {
                    field: "connections".into(),
                    reason,
                }
            }
            ConfigureError::TopologyMismatch {
                existing,
                configured,
            } => CliError::Validation {
                field: "topology".into(),
                reason: format!(
                    "network already uses {existing}, configured as {configured}; \
                     set ignore_configured_topology to override"
                ),
            },
            ConfigureError::AmbiguousNetwork { name, count } => CliError::Validation {
                field: "name".into(),
                reason: format!("{count} networks are named {name:?}; address it by id"),
            },
        }
    }
}
