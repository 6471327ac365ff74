//! Error taxonomy for the wallet integration layer.

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::Chain;

/// Transport-level failures: the call never produced a usable JSON payload.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The node could not be reached at all
    #[error("failed to reach node: {0}")]
    Connection(String),
    /// The call exceeded its deadline
    #[error("rpc call exceeded its deadline: {0}")]
    Timeout(String),
    /// The node answered with a non-2xx status
    #[error("node returned http {status}: {body}")]
    Http { status: u16, body: String },
    /// The configured endpoint URI is unusable
    #[error("invalid node endpoint: {0}")]
    InvalidEndpoint(String),
}

/// RPC-level failures: either the transport failed, or the node answered
/// but reported an application error or an unparseable payload.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The node set the conventional `error` field in its envelope
    #[error("node reported an error: {message}")]
    Application {
        message: String,
        /// Raw content of the error field, preserved for diagnostics
        raw: serde_json::Value,
    },
    /// The payload parsed as JSON but is missing an expected field
    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),
}

impl RpcError {
    /// Builds an application error from whatever the node put in its
    /// `error` field, keeping the raw value for diagnostics.
    #[must_use]
    pub fn application(raw: serde_json::Value) -> Self {
        let message = match &raw {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self::Application { message, raw }
    }
}

/// Exact-decimal conversion failures between chain base units and display units.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The amount carries more decimal places than the chain supports;
    /// submitting it would silently truncate value.
    #[error("amount {amount} carries more than {precision} decimal places")]
    PrecisionLoss { amount: Decimal, precision: u32 },
    #[error("amount {0} is negative")]
    Negative(Decimal),
    #[error("amount {0} does not fit the chain's base-unit range")]
    Overflow(Decimal),
}

/// What went wrong inside an adapter operation.
#[derive(Debug, Error)]
pub enum AdapterErrorKind {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// An adapter operation failed. Carries the chain and operation name so
/// callers can log and apply their own retry policy; the adapter itself
/// never retries.
#[derive(Debug, Error)]
#[error("{chain} adapter failed in {operation}: {kind}")]
pub struct AdapterError {
    pub chain: Chain,
    pub operation: &'static str,
    #[source]
    pub kind: AdapterErrorKind,
}

impl AdapterError {
    #[must_use]
    pub fn new(chain: Chain, operation: &'static str, kind: impl Into<AdapterErrorKind>) -> Self {
        Self {
            chain,
            operation,
            kind: kind.into(),
        }
    }

    #[must_use]
    pub fn invalid_address(
        chain: Chain,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            chain,
            operation,
            kind: AdapterErrorKind::InvalidAddress(message.into()),
        }
    }
}

/// The tag allocator gave up after its bounded retries.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("no free destination tag on {chain} after {attempts} attempts")]
    Exhausted { chain: Chain, attempts: u32 },
}

/// Failures of the address-registry store.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry connection failed: {0}")]
    Connection(String),
    #[error("registry query failed: {0}")]
    Query(String),
    #[error("registry migration failed: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Connection(err.to_string())
            }
            sqlx::Error::Migrate(_) => Self::Migration(err.to_string()),
            _ => Self::Query(err.to_string()),
        }
    }
}

/// Wallet configuration problems, reported at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid wallet configuration: {0}")]
    Invalid(String),
    #[error("unknown chain identifier: {0}")]
    UnknownChain(String),
    #[error("wallet has no secret configured but the operation requires one")]
    MissingSecret,
}

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}
