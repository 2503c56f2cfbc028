use chrono::{NaiveDate, NaiveDateTime};
use giving_core::{
    ledger::{DonationRecord, DonorLedgerView, MemoryLedger},
    period::{PeriodSelection, PeriodWindow},
    synthetic::{generate_ledger, SyntheticLedgerConfig},
    trend::{giving_trends, GivingTrend},
    types::CurrencyCode,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn usd() -> CurrencyCode {
    CurrencyCode::parse("USD").unwrap()
}

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

fn now() -> NaiveDateTime {
    date("2026-10-19").and_hms_opt(23, 59, 59).unwrap()
}

fn gift(donor: &str, amount: Decimal, on: &str) -> DonationRecord {
    DonationRecord {
        branch_id: "main".into(),
        donor_id: Some(donor.into()),
        amount,
        currency: usd(),
        date: date(on),
        is_anonymous: false,
    }
}

fn september() -> PeriodWindow {
    PeriodSelection::between("2026-09-01", "2026-09-30")
        .resolve(now())
        .unwrap()
}

fn trend_of(buckets: &giving_core::trend::GivingTrendBuckets, donor: &str) -> GivingTrend {
    buckets
        .donors
        .iter()
        .find(|d| d.donor_id == donor)
        .map(|d| d.trend)
        .unwrap_or_else(|| panic!("{donor} was not classified"))
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// 100 → 126 increasing, 100 → 125 consistent, 100 → 75 consistent,
/// 100 → 74 declining.
#[test]
fn twenty_five_percent_boundaries_are_strict() {
    let mut records = Vec::new();
    let boundary = [
        ("p126", dec!(126)),
        ("p125", dec!(125)),
        ("p75", dec!(75)),
        ("p74", dec!(74)),
    ];
    for (donor, current) in boundary {
        records.push(gift(donor, dec!(100), "2026-08-15"));
        records.push(gift(donor, current, "2026-09-15"));
    }
    let ledger = MemoryLedger::new(records);
    let view = DonorLedgerView::new(&ledger, "main", usd());

    let buckets = giving_trends(&view, &september()).unwrap();

    assert_eq!(trend_of(&buckets, "p126"), GivingTrend::Increasing);
    assert_eq!(trend_of(&buckets, "p125"), GivingTrend::Consistent);
    assert_eq!(trend_of(&buckets, "p75"), GivingTrend::Consistent);
    assert_eq!(trend_of(&buckets, "p74"), GivingTrend::Declining);

    assert_eq!(buckets.increasing.count, 1);
    assert_eq!(buckets.increasing.total_current_amount, dec!(126));
    assert_eq!(buckets.increasing.average_pct_change, dec!(26.0));
    assert_eq!(buckets.consistent.count, 2);
    assert_eq!(buckets.consistent.total_current_amount, dec!(200));
    assert_eq!(buckets.consistent.average_pct_change, dec!(0.0));
    assert_eq!(buckets.declining.average_pct_change, dec!(-26.0));
}

/// Donors missing from either period are left to the cohort analysis.
#[test]
fn donors_absent_from_one_period_are_not_classified() {
    let ledger = MemoryLedger::new(vec![
        gift("both", dec!(50), "2026-08-03"),
        gift("both", dec!(50), "2026-09-03"),
        gift("lapsed", dec!(80), "2026-08-04"),
        gift("new", dec!(90), "2026-09-04"),
    ]);
    let view = DonorLedgerView::new(&ledger, "main", usd());

    let buckets = giving_trends(&view, &september()).unwrap();

    assert_eq!(buckets.classified_count(), 1);
    assert_eq!(buckets.donors.len(), 1);
    assert_eq!(buckets.donors[0].donor_id, "both");
}

/// Every donor with giving in both periods lands in exactly one bucket.
#[test]
fn classification_is_total() {
    let config = SyntheticLedgerConfig::new("main", usd(), date("2025-06-01"), date("2026-10-01"));
    let ledger = MemoryLedger::new(generate_ledger(&config, 99));
    let view = DonorLedgerView::new(&ledger, "main", usd());
    let window = PeriodSelection::last_days(90).resolve(now()).unwrap();

    let current = view.aggregate(&window.current).unwrap();
    let previous = view.aggregate(&window.previous).unwrap();
    let in_both = current.keys().filter(|k| previous.contains_key(*k)).count();

    let buckets = giving_trends(&view, &window).unwrap();

    assert!(in_both > 0, "synthetic ledger should overlap the two windows");
    assert_eq!(buckets.classified_count(), in_both);
    let summed = buckets.increasing.total_current_amount
        + buckets.declining.total_current_amount
        + buckets.consistent.total_current_amount;
    let expected: Decimal = current
        .iter()
        .filter(|(k, _)| previous.contains_key(*k))
        .map(|(_, a)| a.total)
        .sum();
    assert_eq!(summed, expected);
}
