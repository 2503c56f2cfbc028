//! Headline giving figures for the current period against the previous one.

use crate::{
    error::AnalyticsResult,
    ledger::{DonationSource, DonorAggregates, DonorLedgerView},
    period::{Period, PeriodWindow},
    ratio::{mean, percent_change, round_pct},
    types::CurrencyCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeriodTotals {
    pub total_amount: Decimal,
    pub donation_count: u32,
    pub donor_count: usize,
    pub average_gift: Decimal,
}

impl PeriodTotals {
    pub fn from_aggregates(aggregates: &DonorAggregates) -> Self {
        let (total_amount, donation_count) = aggregates
            .values()
            .fold((Decimal::ZERO, 0u32), |(sum, n), a| (sum + a.total, n + a.count));
        Self {
            total_amount,
            donation_count,
            donor_count: aggregates.len(),
            average_gift: mean(total_amount, donation_count as usize),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GivingSummary {
    pub currency: CurrencyCode,
    pub current_period: Period,
    pub previous_period: Period,
    pub current: PeriodTotals,
    pub previous: PeriodTotals,
    /// Change in total amount; zero when the previous period had no giving.
    pub total_change_pct: Decimal,
    pub donor_count_change_pct: Decimal,
}

pub fn summarize_window(
    currency: &CurrencyCode,
    window: &PeriodWindow,
    current: &DonorAggregates,
    previous: &DonorAggregates,
) -> GivingSummary {
    let current_totals = PeriodTotals::from_aggregates(current);
    let previous_totals = PeriodTotals::from_aggregates(previous);
    GivingSummary {
        currency: currency.clone(),
        current_period: window.current,
        previous_period: window.previous,
        total_change_pct: round_pct(percent_change(
            previous_totals.total_amount,
            current_totals.total_amount,
        )),
        donor_count_change_pct: round_pct(percent_change(
            Decimal::from(previous_totals.donor_count),
            Decimal::from(current_totals.donor_count),
        )),
        current: current_totals,
        previous: previous_totals,
    }
}

pub fn giving_summary<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    window: &PeriodWindow,
) -> AnalyticsResult<GivingSummary> {
    let current = view.aggregate(&window.current)?;
    let previous = view.aggregate(&window.previous)?;
    Ok(summarize_window(view.currency(), window, &current, &previous))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DonationRecord, MemoryLedger};
    use crate::period::PeriodSelection;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn gift(donor: &str, amount: Decimal, on: &str) -> DonationRecord {
        DonationRecord {
            branch_id: "main".into(),
            donor_id: Some(donor.into()),
            amount,
            currency: CurrencyCode::parse("USD").unwrap(),
            date: NaiveDate::parse_from_str(on, "%Y-%m-%d").unwrap(),
            is_anonymous: false,
        }
    }

    #[test]
    fn totals_and_changes_against_previous_period() {
        let ledger = MemoryLedger::new(vec![
            gift("a", dec!(100), "2026-08-10"),
            gift("b", dec!(100), "2026-08-11"),
            gift("a", dec!(150), "2026-09-03"),
            gift("a", dec!(50), "2026-09-04"),
            gift("c", dec!(100), "2026-09-05"),
        ]);
        let view = DonorLedgerView::new(&ledger, "main", CurrencyCode::parse("USD").unwrap());
        let now = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let window = PeriodSelection::between("2026-09-01", "2026-09-30").resolve(now).unwrap();

        let summary = giving_summary(&view, &window).unwrap();
        assert_eq!(summary.current.total_amount, dec!(300));
        assert_eq!(summary.current.donation_count, 3);
        assert_eq!(summary.current.donor_count, 2);
        assert_eq!(summary.current.average_gift, dec!(100));
        assert_eq!(summary.previous.total_amount, dec!(200));
        assert_eq!(summary.total_change_pct, dec!(50.0));
        assert_eq!(summary.donor_count_change_pct, Decimal::ZERO);
    }

    #[test]
    fn empty_previous_period_reports_zero_change() {
        let totals = PeriodTotals::from_aggregates(&DonorAggregates::new());
        assert_eq!(totals, PeriodTotals::default());
    }
}
