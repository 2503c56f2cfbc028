//! Giving trend classification: per-donor change between two periods.
//!
//! Only donors with a nonzero total in both periods are classified. Donors
//! missing from either side belong to the new or lapsed cohorts instead.

use crate::{
    error::AnalyticsResult,
    ledger::{DonationSource, DonorAggregates, DonorLedgerView},
    period::PeriodWindow,
    ratio::{mean, percent_change, round_pct},
    types::{CurrencyCode, DonorId},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Strictly above this change (in percent) a donor is increasing.
pub const INCREASING_THRESHOLD_PCT: Decimal = dec!(25);
/// Strictly below this change (in percent) a donor is declining.
pub const DECLINING_THRESHOLD_PCT: Decimal = dec!(-25);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GivingTrend {
    Increasing,
    Declining,
    Consistent,
}

impl GivingTrend {
    /// Classify an unrounded percentage change.
    pub fn classify(pct_change: Decimal) -> Self {
        if pct_change > INCREASING_THRESHOLD_PCT {
            Self::Increasing
        } else if pct_change < DECLINING_THRESHOLD_PCT {
            Self::Declining
        } else {
            Self::Consistent
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorTrend {
    pub donor_id: DonorId,
    pub previous_total: Decimal,
    pub current_total: Decimal,
    pub pct_change: Decimal,
    pub trend: GivingTrend,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendBucket {
    pub count: usize,
    pub total_current_amount: Decimal,
    pub average_pct_change: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GivingTrendBuckets {
    pub currency: CurrencyCode,
    pub increasing: TrendBucket,
    pub declining: TrendBucket,
    pub consistent: TrendBucket,
    /// Every classified donor, ordered by donor id.
    pub donors: Vec<DonorTrend>,
}

impl GivingTrendBuckets {
    pub fn bucket(&self, trend: GivingTrend) -> &TrendBucket {
        match trend {
            GivingTrend::Increasing => &self.increasing,
            GivingTrend::Declining => &self.declining,
            GivingTrend::Consistent => &self.consistent,
        }
    }

    pub fn classified_count(&self) -> usize {
        self.increasing.count + self.declining.count + self.consistent.count
    }
}

#[derive(Default)]
struct BucketAccumulator {
    count: usize,
    total_current: Decimal,
    pct_sum: Decimal,
}

impl BucketAccumulator {
    fn add(&mut self, donor: &DonorTrend) {
        self.count += 1;
        self.total_current += donor.current_total;
        self.pct_sum += donor.pct_change;
    }

    fn finish(self) -> TrendBucket {
        TrendBucket {
            count: self.count,
            total_current_amount: self.total_current,
            average_pct_change: round_pct(mean(self.pct_sum, self.count)),
        }
    }
}

/// Classify donors present (with nonzero totals) in both aggregate maps.
pub fn classify_trends(
    currency: &CurrencyCode,
    current: &DonorAggregates,
    previous: &DonorAggregates,
) -> GivingTrendBuckets {
    let mut increasing = BucketAccumulator::default();
    let mut declining = BucketAccumulator::default();
    let mut consistent = BucketAccumulator::default();
    let mut donors = Vec::new();

    for (donor_id, cur) in current {
        let Some(prev) = previous.get(donor_id) else { continue };
        if cur.total.is_zero() || prev.total.is_zero() {
            continue;
        }

        let pct_change = percent_change(prev.total, cur.total);
        let donor = DonorTrend {
            donor_id: donor_id.clone(),
            previous_total: prev.total,
            current_total: cur.total,
            pct_change,
            trend: GivingTrend::classify(pct_change),
        };
        match donor.trend {
            GivingTrend::Increasing => increasing.add(&donor),
            GivingTrend::Declining => declining.add(&donor),
            GivingTrend::Consistent => consistent.add(&donor),
        }
        donors.push(donor);
    }

    // Raw changes were needed for the averages; round only what is shown.
    for donor in &mut donors {
        donor.pct_change = round_pct(donor.pct_change);
    }

    GivingTrendBuckets {
        currency: currency.clone(),
        increasing: increasing.finish(),
        declining: declining.finish(),
        consistent: consistent.finish(),
        donors,
    }
}

pub fn giving_trends<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    window: &PeriodWindow,
) -> AnalyticsResult<GivingTrendBuckets> {
    let current = view.aggregate(&window.current)?;
    let previous = view.aggregate(&window.previous)?;
    let buckets = classify_trends(view.currency(), &current, &previous);
    log::debug!(
        "trends: branch={} increasing={} declining={} consistent={}",
        view.branch(),
        buckets.increasing.count,
        buckets.declining.count,
        buckets.consistent.count,
    );
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DonorAggregate;
    use chrono::NaiveDate;

    fn aggs(rows: &[(&str, Decimal)]) -> DonorAggregates {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        rows.iter()
            .map(|(id, total)| {
                (
                    id.to_string(),
                    DonorAggregate {
                        donor_id: id.to_string(),
                        total: *total,
                        count: 1,
                        first_date: day,
                        last_date: day,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn boundaries_are_strict() {
        assert_eq!(GivingTrend::classify(dec!(26)), GivingTrend::Increasing);
        assert_eq!(GivingTrend::classify(dec!(25)), GivingTrend::Consistent);
        assert_eq!(GivingTrend::classify(dec!(-25)), GivingTrend::Consistent);
        assert_eq!(GivingTrend::classify(dec!(-26)), GivingTrend::Declining);
    }

    #[test]
    fn empty_buckets_average_to_zero() {
        let usd = CurrencyCode::parse("USD").unwrap();
        let buckets = classify_trends(&usd, &aggs(&[("a", dec!(100))]), &aggs(&[("a", dec!(100))]));
        assert_eq!(buckets.consistent.count, 1);
        assert_eq!(buckets.increasing, TrendBucket::default());
        assert_eq!(buckets.declining.average_pct_change, Decimal::ZERO);
    }

    #[test]
    fn averages_use_unrounded_changes() {
        let usd = CurrencyCode::parse("USD").unwrap();
        // 100 → 133.33 (+33.33%) and 300 → 400 (+33.333…%)
        let buckets = classify_trends(
            &usd,
            &aggs(&[("a", dec!(133.33)), ("b", dec!(400))]),
            &aggs(&[("a", dec!(100)), ("b", dec!(300))]),
        );
        assert_eq!(buckets.increasing.count, 2);
        assert_eq!(buckets.increasing.total_current_amount, dec!(533.33));
        assert_eq!(buckets.increasing.average_pct_change, dec!(33.3));
    }
}
