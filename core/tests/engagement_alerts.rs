use chrono::{Duration, NaiveDate, NaiveDateTime};
use giving_core::{
    alerts::AlertKind,
    clock::AnalyticsClock,
    config::AnalyticsConfig,
    engine::GivingAnalytics,
    ledger::{DonationRecord, MemoryLedger},
    period::PeriodSelection,
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

fn end_of(raw: &str) -> NaiveDateTime {
    date(raw).and_hms_opt(23, 59, 59).unwrap()
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

fn september() -> PeriodSelection {
    PeriodSelection::between("2026-09-01", "2026-09-30")
}

/// big:    major donor, 200 in August then 90 in September
/// small:  steady 50 / 50
/// old:    one gift in May, nothing since
/// newbie: first-ever gift of 2000 in September
fn outreach_ledger() -> MemoryLedger {
    MemoryLedger::new(vec![
        gift("big", dec!(2000), "2026-03-01"),
        gift("old", dec!(100), "2026-05-01"),
        gift("small", dec!(50), "2026-08-10"),
        gift("big", dec!(200), "2026-08-15"),
        gift("newbie", dec!(2000), "2026-09-05"),
        gift("small", dec!(50), "2026-09-10"),
        gift("big", dec!(90), "2026-09-15"),
    ])
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn each_alert_kind_fires_on_the_outreach_ledger() {
    let engine = GivingAnalytics::build_test(outreach_ledger(), end_of("2026-10-19"));

    let alerts = engine.engagement_alerts("main", "USD", &september()).unwrap();

    assert_eq!(alerts.lapse_cutoff, date("2026-07-21"));
    let ids = |kind: AlertKind| -> Vec<&str> {
        alerts.of_kind(kind).iter().map(|a| a.donor_id.as_str()).collect()
    };
    assert_eq!(ids(AlertKind::Lapsing), vec!["old"]);
    assert_eq!(ids(AlertKind::Declining), vec!["big"]);
    assert_eq!(ids(AlertKind::AtRiskMajor), vec!["big"]);
    assert_eq!(ids(AlertKind::PotentialMajor), vec!["newbie"]);

    let lapsing = &alerts.lapsing[0];
    assert_eq!(lapsing.days_since_last_gift, 171);
    assert_eq!(lapsing.baseline_total, dec!(100));

    let declining = &alerts.declining[0];
    assert_eq!(declining.baseline_total, dec!(200));
    assert_eq!(declining.current_total, dec!(90));
    assert_eq!(declining.change_pct, Some(dec!(-55.0)));

    // 4490 / 7 gifts × 3
    assert!(alerts.potential_major_threshold > dec!(1924));
    assert!(alerts.potential_major_threshold < dec!(1925));
    assert_eq!(alerts.potential_major[0].current_total, dec!(2000));
}

#[test]
fn a_donor_who_stops_entirely_is_declining_by_one_hundred_percent() {
    let ledger = MemoryLedger::new(vec![
        gift("gone", dec!(300), "2026-08-20"),
        gift("kept", dec!(300), "2026-08-20"),
        gift("kept", dec!(200), "2026-09-20"),
    ]);
    let engine = GivingAnalytics::build_test(ledger, end_of("2026-10-19"));

    let alerts = engine.engagement_alerts("main", "USD", &september()).unwrap();

    assert_eq!(alerts.declining.len(), 1);
    assert_eq!(alerts.declining[0].donor_id, "gone");
    assert_eq!(alerts.declining[0].current_total, Decimal::ZERO);
    assert_eq!(alerts.declining[0].change_pct, Some(dec!(-100.0)));
    assert!(alerts.lapsing.is_empty());
}

#[test]
fn new_donors_are_not_flagged_without_a_yearly_baseline() {
    let ledger = MemoryLedger::new(vec![gift("fresh", dec!(500), "2025-12-10")]);
    let december = PeriodSelection::between("2025-12-01", "2025-12-31");

    let engine = GivingAnalytics::build_test(ledger.clone(), end_of("2026-01-05"));
    let alerts = engine.engagement_alerts("main", "USD", &december).unwrap();
    assert!(alerts.potential_major.is_empty());
    assert_eq!(alerts.potential_major_threshold, Decimal::ZERO);

    let mut config = AnalyticsConfig::default_test();
    config.alerts.flag_new_donors_without_baseline = true;
    let engine =
        GivingAnalytics::new(ledger, config, AnalyticsClock::fixed(end_of("2026-01-05"))).unwrap();
    let alerts = engine.engagement_alerts("main", "USD", &december).unwrap();
    assert_eq!(alerts.potential_major.len(), 1);
    assert_eq!(alerts.potential_major[0].donor_id, "fresh");
}

#[test]
fn lists_are_capped_and_longest_lapsed_come_first() {
    let first = date("2026-01-01");
    let records = (0..15)
        .map(|i| {
            let on = (first + Duration::days(i)).format("%Y-%m-%d").to_string();
            gift(&format!("d{i:02}"), dec!(25), &on)
        })
        .collect();
    let engine = GivingAnalytics::build_test(MemoryLedger::new(records), end_of("2026-10-19"));

    let alerts = engine.engagement_alerts("main", "USD", &september()).unwrap();

    assert_eq!(alerts.matched.lapsing, 15);
    assert_eq!(alerts.lapsing.len(), 10);
    let ids: Vec<&str> = alerts.lapsing.iter().map(|a| a.donor_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["d00", "d01", "d02", "d03", "d04", "d05", "d06", "d07", "d08", "d09"]
    );
}

#[test]
fn lapsing_donors_are_ordered_by_oldest_last_gift() {
    let ledger = MemoryLedger::new(vec![
        gift("recent", dec!(10), "2026-06-01"),
        gift("oldest", dec!(10), "2025-01-01"),
        gift("middle", dec!(10), "2025-09-14"),
    ]);
    let engine = GivingAnalytics::build_test(ledger, end_of("2026-10-19"));

    let alerts = engine.engagement_alerts("main", "USD", &september()).unwrap();

    let order: Vec<(&str, NaiveDate)> = alerts
        .lapsing
        .iter()
        .map(|a| (a.donor_id.as_str(), a.aggregate.last_date))
        .collect();
    assert_eq!(
        order,
        vec![
            ("oldest", date("2025-01-01")),
            ("middle", date("2025-09-14")),
            ("recent", date("2026-06-01")),
        ]
    );
}

#[test]
fn a_lapse_window_reaching_past_the_ledger_floor_finds_nobody() {
    let ledger = MemoryLedger::new(vec![gift("early", dec!(10), "1949-03-01")]);
    let mut config = AnalyticsConfig::default_test();
    config.alerts.lapse_days = 30_000;
    let engine =
        GivingAnalytics::new(ledger, config, AnalyticsClock::fixed(end_of("1950-06-01"))).unwrap();
    assert_eq!(engine.config().alerts.lapse_days, 30_000);

    let window = PeriodSelection::between("1950-05-01", "1950-05-31");
    let alerts = engine.engagement_alerts("main", "USD", &window).unwrap();

    assert!(alerts.lapsing.is_empty());
    assert_eq!(alerts.lapse_cutoff, date("1900-01-01"));
}

#[test]
fn a_gift_dated_on_the_cutoff_day_keeps_a_donor_active() {
    let ledger = MemoryLedger::new(vec![
        gift("edge", dec!(40), "2026-05-01"),
        gift("edge", dec!(40), "2026-07-21"),
        gift("eve", dec!(40), "2026-07-20"),
    ]);
    let engine = GivingAnalytics::build_test(ledger, end_of("2026-10-19"));

    let alerts = engine.engagement_alerts("main", "USD", &september()).unwrap();
    assert_eq!(alerts.lapse_cutoff, date("2026-07-21"));
    let ids: Vec<&str> = alerts.lapsing.iter().map(|a| a.donor_id.as_str()).collect();
    assert_eq!(ids, vec!["eve"]);
}
