//! Engagement alerts: donors who need outreach attention.
//!
//! This module:
//!   1. Flags lapsing donors (gave before the lapse cutoff, nothing since)
//!   2. Flags sharply declining donors between the previous and current period
//!   3. Flags major donors whose giving dropped past the at-risk ratio
//!   4. Flags new donors whose first-period giving looks like a major gift
//!
//! Each kind is ranked by severity and capped at `alert_limit`.

use crate::{
    cohort::CohortSet,
    config::AlertConfig,
    error::AnalyticsResult,
    ledger::{DonationSource, DonorAggregate, DonorLedgerView},
    period::{end_of_day, ledger_floor, start_of_day, Period, PeriodWindow},
    ratio::{percent_change, round_pct},
    types::{CurrencyCode, DonorId},
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Lapsing,
    Declining,
    AtRiskMajor,
    PotentialMajor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementAlert {
    pub kind: AlertKind,
    pub donor_id: DonorId,
    /// Lapsing: all giving before the cutoff. Declining / at-risk: the
    /// previous period. Potential major: the current period.
    pub aggregate: DonorAggregate,
    /// What the donor is measured against: previous-period total, lifetime
    /// total before the cutoff, or the potential-major threshold.
    pub baseline_total: Decimal,
    pub current_total: Decimal,
    pub change_pct: Option<Decimal>,
    pub days_since_last_gift: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertCounts {
    pub lapsing: usize,
    pub declining: usize,
    pub at_risk_major: usize,
    pub potential_major: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementAlerts {
    pub currency: CurrencyCode,
    pub lapse_cutoff: NaiveDate,
    pub potential_major_threshold: Decimal,
    pub lapsing: Vec<EngagementAlert>,
    pub declining: Vec<EngagementAlert>,
    pub at_risk_major: Vec<EngagementAlert>,
    pub potential_major: Vec<EngagementAlert>,
    /// Matches before each list was capped.
    pub matched: AlertCounts,
}

impl EngagementAlerts {
    pub fn of_kind(&self, kind: AlertKind) -> &[EngagementAlert] {
        match kind {
            AlertKind::Lapsing => &self.lapsing,
            AlertKind::Declining => &self.declining,
            AlertKind::AtRiskMajor => &self.at_risk_major,
            AlertKind::PotentialMajor => &self.potential_major,
        }
    }
}

// ── Generator ────────────────────────────────────────────────────────────────

pub struct AlertGenerator<'v, 'a, S: DonationSource + ?Sized> {
    view: &'v DonorLedgerView<'a, S>,
    config: &'v AlertConfig,
    now: NaiveDateTime,
}

impl<'v, 'a, S: DonationSource + ?Sized> AlertGenerator<'v, 'a, S> {
    pub fn new(
        view: &'v DonorLedgerView<'a, S>,
        config: &'v AlertConfig,
        now: NaiveDateTime,
    ) -> Self {
        Self { view, config, now }
    }

    fn days_since(&self, date: NaiveDate) -> i64 {
        (self.now.date() - date).num_days()
    }

    /// Calendar day `lapse_days` before `now`. A gift dated on this day
    /// counts as on/after the cutoff, so the donor is not lapsing.
    /// Never earlier than the ledger floor.
    pub fn lapse_cutoff(&self) -> NaiveDate {
        let floor = ledger_floor();
        self.now
            .checked_sub_signed(Duration::days(i64::from(self.config.lapse_days)))
            .map_or(floor, |at| at.max(floor))
            .date()
    }

    fn lapsing(&self) -> AnalyticsResult<Vec<EngagementAlert>> {
        let cutoff = self.lapse_cutoff();
        let since_start = start_of_day(cutoff);
        if since_start <= ledger_floor() {
            // nothing can be dated before the floor
            return Ok(Vec::new());
        }
        let history = self.view.aggregate(&Period::before(since_start)?)?;
        let since_end = end_of_day(self.now.date()).max(since_start);
        let recent = self.view.distinct_donor_ids(&Period::new(since_start, since_end)?)?;

        Ok(history
            .into_values()
            .filter(|agg| !recent.contains(&agg.donor_id))
            .map(|agg| EngagementAlert {
                kind: AlertKind::Lapsing,
                donor_id: agg.donor_id.clone(),
                baseline_total: agg.total,
                current_total: Decimal::ZERO,
                change_pct: None,
                days_since_last_gift: self.days_since(agg.last_date),
                aggregate: agg,
            })
            .collect())
    }

    /// Donors whose current total fell below `ratio` × their previous total.
    fn dropped_below(
        &self,
        window: &PeriodWindow,
        ratio: Decimal,
        kind: AlertKind,
        only: Option<&CohortSet>,
    ) -> AnalyticsResult<Vec<EngagementAlert>> {
        let previous = self.view.aggregate(&window.previous)?;
        let current = self.view.aggregate(&window.current)?;

        let mut out = Vec::new();
        for (donor_id, prev) in previous {
            if only.is_some_and(|set| !set.contains(&donor_id)) {
                continue;
            }
            if prev.total <= Decimal::ZERO {
                continue;
            }
            let current_agg = current.get(&donor_id);
            let current_total = current_agg.map_or(Decimal::ZERO, |a| a.total);
            if current_total >= prev.total * ratio {
                continue;
            }
            let last_gift = current_agg.map_or(prev.last_date, |a| a.last_date);
            out.push(EngagementAlert {
                kind,
                donor_id,
                baseline_total: prev.total,
                current_total,
                change_pct: Some(round_pct(percent_change(prev.total, current_total))),
                days_since_last_gift: self.days_since(last_gift),
                aggregate: prev,
            });
        }
        Ok(out)
    }

    /// Threshold a new donor's current total must reach; `None` when there is
    /// no yearly baseline and zero-baseline flagging is off.
    pub fn potential_major_threshold(&self) -> AnalyticsResult<Option<Decimal>> {
        let average = self.view.average_donation_amount(self.now.year())?;
        if average.is_zero() && !self.config.flag_new_donors_without_baseline {
            return Ok(None);
        }
        Ok(Some(average * self.config.potential_major_multiplier))
    }

    fn potential_major(
        &self,
        window: &PeriodWindow,
        threshold: Decimal,
    ) -> AnalyticsResult<Vec<EngagementAlert>> {
        let current = self.view.aggregate(&window.current)?;
        let first_day = window.current.first_date();

        let mut out = Vec::new();
        for (donor_id, agg) in current {
            if agg.total < threshold {
                continue;
            }
            if self.view.has_prior_donation(&donor_id, first_day)? {
                continue;
            }
            out.push(EngagementAlert {
                kind: AlertKind::PotentialMajor,
                donor_id,
                baseline_total: threshold,
                current_total: agg.total,
                change_pct: None,
                days_since_last_gift: self.days_since(agg.last_date),
                aggregate: agg,
            });
        }
        Ok(out)
    }

    pub fn generate(
        &self,
        window: &PeriodWindow,
        major_donors: &CohortSet,
    ) -> AnalyticsResult<EngagementAlerts> {
        let limit = self.config.alert_limit;

        let mut lapsing = self.lapsing()?;
        let mut declining =
            self.dropped_below(window, self.config.declining_ratio, AlertKind::Declining, None)?;
        let mut at_risk_major = self.dropped_below(
            window,
            self.config.at_risk_major_ratio,
            AlertKind::AtRiskMajor,
            Some(major_donors),
        )?;

        let threshold = self.potential_major_threshold()?;
        let mut potential_major = match threshold {
            Some(t) => self.potential_major(window, t)?,
            None => {
                log::info!(
                    "alerts: branch={} no gifts yet in {}, potential-major alerts skipped",
                    self.view.branch(),
                    self.now.year(),
                );
                Vec::new()
            }
        };

        // longest silence first
        lapsing.sort_by(|a, b| by_key(b.days_since_last_gift.cmp(&a.days_since_last_gift), a, b));
        declining.sort_by(by_amount_lost);
        at_risk_major.sort_by(by_amount_lost);
        potential_major.sort_by(|a, b| by_key(b.current_total.cmp(&a.current_total), a, b));

        let matched = AlertCounts {
            lapsing: lapsing.len(),
            declining: declining.len(),
            at_risk_major: at_risk_major.len(),
            potential_major: potential_major.len(),
        };
        log::debug!(
            "alerts: branch={} lapsing={} declining={} at_risk_major={} potential_major={}",
            self.view.branch(),
            matched.lapsing,
            matched.declining,
            matched.at_risk_major,
            matched.potential_major,
        );

        lapsing.truncate(limit);
        declining.truncate(limit);
        at_risk_major.truncate(limit);
        potential_major.truncate(limit);

        Ok(EngagementAlerts {
            currency: self.view.currency().clone(),
            lapse_cutoff: self.lapse_cutoff(),
            potential_major_threshold: threshold.unwrap_or(Decimal::ZERO),
            lapsing,
            declining,
            at_risk_major,
            potential_major,
            matched,
        })
    }
}

fn by_key(primary: Ordering, a: &EngagementAlert, b: &EngagementAlert) -> Ordering {
    primary.then_with(|| a.donor_id.cmp(&b.donor_id))
}

fn by_amount_lost(a: &EngagementAlert, b: &EngagementAlert) -> Ordering {
    let lost_a = a.baseline_total - a.current_total;
    let lost_b = b.baseline_total - b.current_total;
    by_key(lost_b.cmp(&lost_a), a, b)
}

pub fn engagement_alerts<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    window: &PeriodWindow,
    now: NaiveDateTime,
    major_donors: &CohortSet,
    config: &AlertConfig,
) -> AnalyticsResult<EngagementAlerts> {
    AlertGenerator::new(view, config, now).generate(window, major_donors)
}
