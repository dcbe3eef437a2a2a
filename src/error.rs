//! Typed precondition failures raised by the dispatch-and-cost engine.

use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a run before any simulation step executes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A physical or economic parameter is outside its valid range.
    #[error("invalid configuration: {field} {message}")]
    InvalidConfiguration {
        field: &'static str,
        message: String,
    },

    /// Two series that must line up step-for-step do not.
    #[error("length mismatch: {what} (expected {expected}, got {actual})")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The interval duration does not split a day into whole steps, or two
    /// series disagree on it.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("unknown tariff variant \"{0}\" (expected flat, day_night or dynamic)")]
    UnknownTariffVariant(String),

    #[error("unknown jurisdiction \"{0}\" (expected flat_fee or peak_billed)")]
    UnknownJurisdiction(String),

    /// Dynamic pricing requested without a price series or fallback provider.
    #[error("dynamic tariff requested but no price series or fallback provider is configured")]
    MissingDynamicPrices,
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            message: message.into(),
        }
    }
}
