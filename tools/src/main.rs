//! giving-report: headless donor analytics report.
//!
//! Usage:
//!   giving-report --db ledger.db --branch main --currency USD --days 90
//!   giving-report --db ledger.db --from 2026-07-01 --to 2026-09-30 --json
//!   giving-report --seed-demo 42 --now 2026-10-19

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Months};
use giving_core::{
    clock::AnalyticsClock,
    config::AnalyticsConfig,
    engine::{AnalyticsReport, GivingAnalytics, ReportRequest},
    period::{parse_date, PeriodSelection},
    store::LedgerStore,
    synthetic::{generate_ledger, SyntheticLedgerConfig},
};
use std::env;
use std::str::FromStr;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json = args.iter().any(|a| a == "--json");
    let db = flag(&args, "--db")?.unwrap_or(":memory:");
    let branch = flag(&args, "--branch")?.unwrap_or("main").to_string();

    let config = match flag(&args, "--config")? {
        Some(path) => AnalyticsConfig::load(path)?,
        None => AnalyticsConfig::default(),
    };
    let currency = flag(&args, "--currency")?
        .map(str::to_string)
        .or_else(|| config.default_currency.as_ref().map(|c| c.to_string()))
        .unwrap_or_else(|| "USD".to_string());

    let clock = match flag(&args, "--now")? {
        Some(raw) => AnalyticsClock::fixed_end_of_day(parse_date(raw)?),
        None => AnalyticsClock::System,
    };

    let selection = PeriodSelection {
        days: Some(parse_arg(&args, "--days")?.unwrap_or(30u32)),
        from: flag(&args, "--from")?.map(str::to_string),
        to: flag(&args, "--to")?.map(str::to_string),
    };
    let year: Option<i32> = parse_arg(&args, "--year")?;

    let store = LedgerStore::open(db).with_context(|| format!("opening ledger {db}"))?;
    store.migrate()?;

    if let Some(seed) = parse_arg::<u64>(&args, "--seed-demo")? {
        let currency = config.resolve_currency(&currency)?;
        let today = clock.today();
        let first = today
            .checked_sub_months(Months::new(23))
            .and_then(|d| d.with_day(1))
            .unwrap_or(today);
        let mut demo = SyntheticLedgerConfig::new(&branch, currency, first, today);
        demo.donors = parse_arg(&args, "--demo-donors")?.unwrap_or(120usize);
        let written = store.insert_donations(&generate_ledger(&demo, seed))?;
        log::info!("seeded {written} demo donation(s) into branch {branch}");
    }

    let engine = GivingAnalytics::new(store, config, clock)?;
    let request = ReportRequest {
        branch_id: branch,
        currency,
        selection,
        year,
    };
    let report = engine.report(&request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &AnalyticsReport) {
    let cur = &report.currency;
    let s = &report.summary;
    println!("=== GIVING REPORT ===");
    println!("  branch:        {}", report.branch_id);
    println!("  currency:      {cur}");
    println!(
        "  current:       {} .. {}",
        report.window.current.start, report.window.current.end
    );
    println!(
        "  previous:      {} .. {}",
        report.window.previous.start, report.window.previous.end
    );
    println!(
        "  total given:   {} {cur} ({}% vs previous)",
        s.current.total_amount, s.total_change_pct
    );
    println!(
        "  gifts/donors:  {} / {}  avg gift {} {cur}",
        s.current.donation_count, s.current.donor_count, s.current.average_gift.round_dp(2)
    );

    let r = &report.retention;
    println!();
    println!("=== RETENTION ===");
    println!("  retention:     {}%   churn: {}%", r.retention_rate, r.churn_rate);
    println!(
        "  returning {} | lapsed {} | reactivated {} | first-time {}",
        r.returning.len(),
        r.lapsed.len(),
        r.reactivated.len(),
        r.first_time_ever.len()
    );
    let trend: Vec<String> = report
        .retention_trend
        .points
        .iter()
        .map(|p| format!("{} {}%", p.month, p.retention_rate))
        .collect();
    println!("  monthly:       {}", trend.join(", "));

    let t = &report.giving_trends;
    println!();
    println!("=== GIVING TRENDS ===");
    println!("  increasing:    {} (avg {}%)", t.increasing.count, t.increasing.average_pct_change);
    println!("  consistent:    {} (avg {}%)", t.consistent.count, t.consistent.average_pct_change);
    println!("  declining:     {} (avg {}%)", t.declining.count, t.declining.average_pct_change);

    let seg = &report.segments;
    println!();
    println!("=== SEGMENTS {} ===", seg.year);
    println!("  major:         {} donors, {} {cur}", seg.major.count, seg.major.total_amount);
    println!("  regular:       {} donors, {} {cur}", seg.regular.count, seg.regular.total_amount);
    println!(
        "  occasional:    {} donors, {} {cur}",
        seg.occasional.count, seg.occasional.total_amount
    );
    for band in &report.tier_chart.bands {
        println!(
            "  {:<12}   {} donors, {} {cur} ({}%)",
            band.label, band.donor_count, band.amount, band.share_of_total_pct
        );
    }

    let a = &report.alerts;
    println!();
    println!("=== ENGAGEMENT ALERTS ===");
    println!("  lapsing:         {} (since {})", a.matched.lapsing, a.lapse_cutoff);
    println!("  declining:       {}", a.matched.declining);
    println!("  at-risk major:   {}", a.matched.at_risk_major);
    println!("  potential major: {}", a.matched.potential_major);
    for alert in a.declining.iter().chain(&a.at_risk_major).chain(&a.potential_major) {
        println!(
            "    {:?} {}: {} -> {} {cur}",
            alert.kind, alert.donor_id, alert.baseline_total, alert.current_total
        );
    }
}

/// Value following `name`. Absent flag is `None`; a flag with no value is an error.
fn flag<'a>(args: &'a [String], name: &str) -> Result<Option<&'a str>> {
    let Some(pos) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    match args.get(pos + 1) {
        Some(value) if !value.starts_with("--") => Ok(Some(value.as_str())),
        _ => bail!("{name} needs a value"),
    }
}

/// Parsed value of `name`. Absent flag is `None`; an unparsable value is an error.
fn parse_arg<T>(args: &[String], name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    flag(args, name)?
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("invalid value '{raw}' for {name}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        std::iter::once("giving-report")
            .chain(raw.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn absent_flags_fall_back_to_none() {
        let args = args(&["--json"]);
        assert_eq!(flag(&args, "--db").unwrap(), None);
        assert_eq!(parse_arg::<u32>(&args, "--days").unwrap(), None);
    }

    #[test]
    fn well_formed_values_parse() {
        let args = args(&["--days", "90", "--year", "2025", "--branch", "north"]);
        assert_eq!(parse_arg::<u32>(&args, "--days").unwrap(), Some(90));
        assert_eq!(parse_arg::<i32>(&args, "--year").unwrap(), Some(2025));
        assert_eq!(flag(&args, "--branch").unwrap(), Some("north"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let args = args(&["--days", "abc", "--year", "xyz", "--seed-demo", "-1"]);
        let err = parse_arg::<u32>(&args, "--days").unwrap_err();
        assert!(err.to_string().contains("--days"));
        assert!(parse_arg::<i32>(&args, "--year").is_err());
        assert!(parse_arg::<u64>(&args, "--seed-demo").is_err());
    }

    #[test]
    fn a_flag_without_a_value_is_rejected() {
        let trailing = args(&["--json", "--days"]);
        assert!(parse_arg::<u32>(&trailing, "--days").is_err());
        let followed = args(&["--year", "--json"]);
        assert!(flag(&followed, "--year").is_err());
    }
}
