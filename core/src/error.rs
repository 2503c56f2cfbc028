use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid period: {reason}")]
    InvalidPeriod { reason: String },

    #[error("Unknown currency code '{code}'")]
    UnknownCurrency { code: String },

    #[error("Branch id is required on every ledger query")]
    MissingBranch,

    #[error("Invalid amount '{value}'")]
    InvalidAmount { value: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnalyticsError {
    pub fn invalid_period(reason: impl Into<String>) -> Self {
        Self::InvalidPeriod { reason: reason.into() }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
