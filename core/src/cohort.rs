//! Cohort retention analysis.
//!
//! This module:
//!   1. Splits current/previous donor cohorts into returning, lapsed and new
//!   2. Separates new donors into reactivated and first-time-ever
//!   3. Computes retention and churn rates between the two periods
//!   4. Builds the rolling month-over-month retention series

use crate::{
    error::AnalyticsResult,
    ledger::{DonationSource, DonorLedgerView},
    period::{prev_month, Period, PeriodWindow},
    ratio::{percent_of_counts, round_pct, HUNDRED},
    types::{BranchId, CurrencyCode, DonorId},
};
use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Cohort set ───────────────────────────────────────────────────────────────

/// The distinct donors who gave during one period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CohortSet(HashSet<DonorId>);

impl CohortSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, donor: DonorId) -> bool {
        self.0.insert(donor)
    }

    pub fn contains(&self, donor: &str) -> bool {
        self.0.contains(donor)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DonorId> {
        self.0.iter()
    }

    pub fn intersection(&self, other: &CohortSet) -> CohortSet {
        self.0.intersection(&other.0).cloned().collect()
    }

    pub fn difference(&self, other: &CohortSet) -> CohortSet {
        self.0.difference(&other.0).cloned().collect()
    }

    pub fn union(&self, other: &CohortSet) -> CohortSet {
        self.0.union(&other.0).cloned().collect()
    }

    pub fn is_disjoint(&self, other: &CohortSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    /// Donor ids in ascending order, for stable output.
    pub fn sorted(&self) -> Vec<DonorId> {
        let mut ids: Vec<DonorId> = self.0.iter().cloned().collect();
        ids.sort();
        ids
    }
}

impl FromIterator<DonorId> for CohortSet {
    fn from_iter<I: IntoIterator<Item = DonorId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Public types ─────────────────────────────────────────────────────────────

/// Raw cohort algebra for one window, before anything is rounded.
#[derive(Debug, Clone)]
pub struct CohortBreakdown {
    pub current: CohortSet,
    pub previous: CohortSet,
    pub returning: CohortSet,
    pub lapsed: CohortSet,
    pub new_this_period: CohortSet,
    pub reactivated: CohortSet,
    pub first_time_ever: CohortSet,
}

impl CohortBreakdown {
    /// Unrounded retention rate; zero when nobody gave in the previous period.
    pub fn raw_retention_rate(&self) -> Decimal {
        percent_of_counts(self.returning.len(), self.returning.len() + self.lapsed.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionMetrics {
    pub branch_id: BranchId,
    pub currency: CurrencyCode,
    pub current: Period,
    pub previous: Period,
    pub current_donors: usize,
    pub previous_donors: usize,
    pub returning: Vec<DonorId>,
    pub lapsed: Vec<DonorId>,
    pub new_this_period: Vec<DonorId>,
    pub reactivated: Vec<DonorId>,
    pub first_time_ever: Vec<DonorId>,
    pub retention_rate: Decimal,
    pub churn_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionTrendPoint {
    /// `YYYY-MM` of the month being measured.
    pub month: String,
    pub previous_month_donors: usize,
    pub returning: usize,
    pub retention_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionTrend {
    pub branch_id: BranchId,
    pub currency: CurrencyCode,
    /// Oldest month first.
    pub points: Vec<RetentionTrendPoint>,
}

// ── Analysis ─────────────────────────────────────────────────────────────────

pub fn cohort_breakdown<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    window: &PeriodWindow,
) -> AnalyticsResult<CohortBreakdown> {
    let current = view.distinct_donor_ids(&window.current)?;
    let previous = view.distinct_donor_ids(&window.previous)?;

    let returning = current.intersection(&previous);
    let lapsed = previous.difference(&current);
    let new_this_period = current.difference(&previous);

    // Anyone new this period with history before the previous period is back
    // after a gap; everyone else is giving for the first time.
    let history_cutoff = window.previous.first_date();
    let mut reactivated = CohortSet::new();
    let mut first_time_ever = CohortSet::new();
    for donor in new_this_period.sorted() {
        if view.has_prior_donation(&donor, history_cutoff)? {
            reactivated.insert(donor);
        } else {
            first_time_ever.insert(donor);
        }
    }

    Ok(CohortBreakdown {
        current,
        previous,
        returning,
        lapsed,
        new_this_period,
        reactivated,
        first_time_ever,
    })
}

pub fn retention_metrics<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    window: &PeriodWindow,
) -> AnalyticsResult<RetentionMetrics> {
    let cohorts = cohort_breakdown(view, window)?;

    let has_prior_cohort = !cohorts.previous.is_empty();
    let retention_rate = round_pct(cohorts.raw_retention_rate());
    let churn_rate = if has_prior_cohort {
        HUNDRED - retention_rate
    } else {
        Decimal::ZERO
    };

    log::debug!(
        "retention: branch={} current={} previous={} returning={} lapsed={} rate={}",
        view.branch(),
        cohorts.current.len(),
        cohorts.previous.len(),
        cohorts.returning.len(),
        cohorts.lapsed.len(),
        retention_rate,
    );

    Ok(RetentionMetrics {
        branch_id: view.branch().to_string(),
        currency: view.currency().clone(),
        current: window.current,
        previous: window.previous,
        current_donors: cohorts.current.len(),
        previous_donors: cohorts.previous.len(),
        returning: cohorts.returning.sorted(),
        lapsed: cohorts.lapsed.sorted(),
        new_this_period: cohorts.new_this_period.sorted(),
        reactivated: cohorts.reactivated.sorted(),
        first_time_ever: cohorts.first_time_ever.sorted(),
        retention_rate,
        churn_rate,
    })
}

/// Month-over-month retention for the `months` calendar months ending with
/// the month containing `now`.
pub fn retention_trend<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    now: NaiveDateTime,
    months: u32,
) -> AnalyticsResult<RetentionTrend> {
    // Walk back from the current month; one extra month supplies the first
    // point's prior cohort.
    let mut calendar = Vec::with_capacity(months as usize + 1);
    let (mut year, mut month) = (now.year(), now.month());
    for _ in 0..=months {
        calendar.push((year, month));
        (year, month) = prev_month(year, month);
    }
    calendar.reverse();

    let (first_year, first_month) = calendar[0];
    let span = Period::new(Period::calendar_month(first_year, first_month)?.start, now)?;
    let cohorts = view.monthly_cohorts(&span)?;
    let empty = CohortSet::new();

    let points = calendar
        .windows(2)
        .map(|pair| {
            let prior = cohorts.get(&pair[0]).unwrap_or(&empty);
            let this = cohorts.get(&pair[1]).unwrap_or(&empty);
            let returning = this.intersection(prior).len();
            RetentionTrendPoint {
                month: format!("{:04}-{:02}", pair[1].0, pair[1].1),
                previous_month_donors: prior.len(),
                returning,
                retention_rate: round_pct(percent_of_counts(returning, prior.len())),
            }
        })
        .collect();

    Ok(RetentionTrend {
        branch_id: view.branch().to_string(),
        currency: view.currency().clone(),
        points,
    })
}
