//! Shared primitive types used across the analytics engine.

use crate::error::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable identifier for a donor (member or external giver).
pub type DonorId = String;

/// The tenant partition key. Every ledger query is scoped to one branch.
pub type BranchId = String;

/// An ISO-4217 style currency code, always upper case.
///
/// Shape is checked here; whether the tenant actually supports the code is
/// checked against `AnalyticsConfig::supported_currencies`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn parse(raw: &str) -> AnalyticsResult<Self> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AnalyticsError::UnknownCurrency { code: raw.to_string() });
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_code_is_normalised_to_upper_case() {
        let code = CurrencyCode::parse(" ngn ").unwrap();
        assert_eq!(code.as_str(), "NGN");
    }

    #[test]
    fn malformed_currency_code_is_rejected() {
        for raw in ["", "US", "USDX", "U$D", "12A"] {
            assert!(
                matches!(CurrencyCode::parse(raw), Err(AnalyticsError::UnknownCurrency { .. })),
                "{raw:?} should be rejected"
            );
        }
    }
}
