//! Analytics configuration: thresholds, limits and the tenant currency list.
//!
//! Loaded from a JSON file by the host (`AnalyticsConfig::load`). Tests use
//! `AnalyticsConfig::default_test()`.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    types::CurrencyCode,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A century; longer lapse windows reach past the ledger floor.
pub const MAX_LAPSE_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Days without a gift before a donor counts as lapsing.
    pub lapse_days: u32,
    /// Maximum alerts returned per alert kind.
    pub alert_limit: usize,
    /// Declining when current < previous × this ratio.
    pub declining_ratio: Decimal,
    /// At-risk major when current < previous × this ratio.
    pub at_risk_major_ratio: Decimal,
    /// Potential major when current total >= this × the yearly average gift.
    pub potential_major_multiplier: Decimal,
    /// With no gifts yet this year the average is zero and every new donor
    /// clears the threshold. Off by default.
    pub flag_new_donors_without_baseline: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            lapse_days: 90,
            alert_limit: 10,
            declining_ratio: dec!(0.5),
            at_risk_major_ratio: dec!(0.75),
            potential_major_multiplier: dec!(3),
            flag_new_donors_without_baseline: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Share of ranked donors placed in the Major tier.
    pub major_donor_share: Decimal,
    /// Non-major donors with at most this many gifts are Occasional.
    pub occasional_max_donations: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            major_donor_share: dec!(0.10),
            occasional_max_donations: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub alerts: AlertConfig,
    pub segmentation: SegmentationConfig,
    /// Points in the rolling monthly retention series.
    pub trend_months: u32,
    pub supported_currencies: Vec<CurrencyCode>,
    pub default_currency: Option<CurrencyCode>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let supported_currencies = ["USD", "EUR", "GBP", "NGN", "GHS", "KES", "ZAR", "CAD"]
            .iter()
            .filter_map(|c| CurrencyCode::parse(c).ok())
            .collect();
        Self {
            alerts: AlertConfig::default(),
            segmentation: SegmentationConfig::default(),
            trend_months: 12,
            supported_currencies,
            default_currency: None,
        }
    }
}

impl AnalyticsConfig {
    /// Load from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalyticsConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        let mut config = Self::default();
        config.default_currency = CurrencyCode::parse("USD").ok();
        config
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        let unit = |name: &str, v: Decimal| -> AnalyticsResult<()> {
            if v <= Decimal::ZERO || v > Decimal::ONE {
                return Err(AnalyticsError::Config {
                    reason: format!("{name} must be in (0, 1], got {v}"),
                });
            }
            Ok(())
        };
        unit("alerts.declining_ratio", self.alerts.declining_ratio)?;
        unit("alerts.at_risk_major_ratio", self.alerts.at_risk_major_ratio)?;
        unit("segmentation.major_donor_share", self.segmentation.major_donor_share)?;

        if self.alerts.lapse_days == 0 || self.alerts.lapse_days > MAX_LAPSE_DAYS {
            return Err(AnalyticsError::Config {
                reason: format!("alerts.lapse_days must be in 1..={MAX_LAPSE_DAYS}"),
            });
        }
        if self.alerts.alert_limit == 0 {
            return Err(AnalyticsError::Config { reason: "alerts.alert_limit must be > 0".into() });
        }
        if self.alerts.potential_major_multiplier < Decimal::ZERO {
            return Err(AnalyticsError::Config {
                reason: "alerts.potential_major_multiplier must not be negative".into(),
            });
        }
        if self.trend_months == 0 {
            return Err(AnalyticsError::Config { reason: "trend_months must be > 0".into() });
        }
        if let Some(code) = &self.default_currency {
            self.ensure_supported(code)?;
        }
        Ok(())
    }

    /// Reject a currency the tenant configuration does not know about.
    pub fn ensure_supported(&self, code: &CurrencyCode) -> AnalyticsResult<()> {
        if self.supported_currencies.contains(code) {
            Ok(())
        } else {
            Err(AnalyticsError::UnknownCurrency { code: code.to_string() })
        }
    }

    /// Parse a raw code and check it is supported.
    pub fn resolve_currency(&self, raw: &str) -> AnalyticsResult<CurrencyCode> {
        let code = CurrencyCode::parse(raw)?;
        self.ensure_supported(&code)?;
        Ok(code)
    }
}
