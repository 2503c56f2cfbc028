//! Synthetic donation ledgers for demos and determinism tests.
//!
//! Donors get a giving profile (start month, monthly giving probability,
//! typical gift, drift, optional stop month); the generator walks the months
//! in order and draws gifts from that profile.

use crate::{
    ledger::DonationRecord,
    period::next_month,
    rng::{LedgerRng, LedgerStream},
    types::{BranchId, CurrencyCode},
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticLedgerConfig {
    pub branch_id: BranchId,
    pub currency: CurrencyCode,
    pub donors: usize,
    pub first_month: NaiveDate,
    pub last_month: NaiveDate,
    /// Share of gifts recorded without a donor (cash plate, anonymous card).
    pub anonymous_rate: f64,
    /// Smallest typical gift.
    pub gift_floor: f64,
    /// Pareto shape for typical gift sizes; lower is more skewed.
    pub gift_skew: f64,
}

impl SyntheticLedgerConfig {
    pub fn new(
        branch_id: &str,
        currency: CurrencyCode,
        first_month: NaiveDate,
        last_month: NaiveDate,
    ) -> Self {
        Self {
            branch_id: branch_id.to_string(),
            currency,
            donors: 120,
            first_month,
            last_month,
            anonymous_rate: 0.05,
            gift_floor: 20.0,
            gift_skew: 1.6,
        }
    }
}

struct DonorProfile {
    donor_id: String,
    start_index: u64,
    stop_index: Option<u64>,
    monthly_probability: f64,
    typical_gift: f64,
    monthly_drift: f64,
}

fn month_index(first: NaiveDate, date: NaiveDate) -> u64 {
    let months = (date.year() - first.year()) * 12 + date.month() as i32 - first.month() as i32;
    months.max(0) as u64
}

fn profile(
    rng: &mut LedgerRng,
    n: usize,
    months: u64,
    config: &SyntheticLedgerConfig,
) -> DonorProfile {
    let start_index = rng.next_u64_below(months.max(1));
    let stop_index = if rng.chance(0.25) {
        Some(start_index + rng.next_u64_below(months.saturating_sub(start_index).max(1)))
    } else {
        None
    };
    DonorProfile {
        donor_id: format!("donor-{n:04}"),
        start_index,
        stop_index,
        monthly_probability: 0.2 + rng.next_f64() * 0.75,
        typical_gift: rng
            .pareto(config.gift_floor, config.gift_skew)
            .min(config.gift_floor * 500.0),
        monthly_drift: (rng.next_f64() - 0.5) * 0.08,
    }
}

fn to_amount(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(2)).filter(|d| *d > Decimal::ZERO)
}

/// Generate a ledger. Same config, same seed, same records.
pub fn generate_ledger(config: &SyntheticLedgerConfig, seed: u64) -> Vec<DonationRecord> {
    let mut donor_rng = LedgerStream::Donors.rng(seed);
    let mut gift_rng = LedgerStream::Gifts.rng(seed);
    let mut anon_rng = LedgerStream::Anonymous.rng(seed);

    let first = config.first_month.with_day(1).unwrap_or(config.first_month);
    let months = month_index(first, config.last_month) + 1;
    let profiles: Vec<DonorProfile> = (0..config.donors)
        .map(|n| profile(&mut donor_rng, n, months, config))
        .collect();

    let mut records = Vec::new();
    let (mut year, mut month) = (first.year(), first.month());
    for index in 0..months {
        for p in &profiles {
            if index < p.start_index || p.stop_index.is_some_and(|stop| index > stop) {
                continue;
            }
            if !gift_rng.chance(p.monthly_probability) {
                continue;
            }
            let gifts = 1 + gift_rng.next_u64_below(2);
            for _ in 0..gifts {
                let day = 1 + gift_rng.next_u64_below(28) as u32;
                let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else { continue };
                let growth = (1.0 + p.monthly_drift).powi((index - p.start_index) as i32);
                let jitter = 0.7 + gift_rng.next_f64() * 0.6;
                let Some(amount) = to_amount(p.typical_gift * growth * jitter) else { continue };

                let is_anonymous = anon_rng.chance(config.anonymous_rate);
                records.push(DonationRecord {
                    branch_id: config.branch_id.clone(),
                    donor_id: if is_anonymous { None } else { Some(p.donor_id.clone()) },
                    amount,
                    currency: config.currency.clone(),
                    date,
                    is_anonymous,
                });
            }
        }
        (year, month) = next_month(year, month);
    }

    records.sort_by(|a, b| a.date.cmp(&b.date));
    log::debug!(
        "synthetic: {} gift(s) from {} donor(s) over {months} month(s)",
        records.len(),
        config.donors,
    );
    records
}
