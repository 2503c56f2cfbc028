//! Donor ledger view: read-only per-donor projection over donation records.
//!
//! RULE: The engine never writes to the ledger.
//! Every query is scoped by branch (tenant partition key) and one currency.

use crate::{
    cohort::CohortSet,
    error::AnalyticsResult,
    period::Period,
    types::{BranchId, CurrencyCode, DonorId},
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Public types ─────────────────────────────────────────────────────────────

/// An immutable donation fact owned by the external ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub branch_id: BranchId,
    pub donor_id: Option<DonorId>,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub date: NaiveDate,
    pub is_anonymous: bool,
}

impl DonationRecord {
    /// The donor this gift counts towards, if it counts towards anyone.
    pub fn attributed_donor(&self) -> Option<&str> {
        if self.is_anonymous {
            return None;
        }
        self.donor_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Per-donor totals for one period. Rebuilt on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonorAggregate {
    pub donor_id: DonorId,
    pub total: Decimal,
    pub count: u32,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

impl DonorAggregate {
    fn start(donor_id: &str, record: &DonationRecord) -> Self {
        Self {
            donor_id: donor_id.to_string(),
            total: record.amount,
            count: 1,
            first_date: record.date,
            last_date: record.date,
        }
    }

    fn absorb(&mut self, record: &DonationRecord) {
        self.total += record.amount;
        self.count += 1;
        self.first_date = self.first_date.min(record.date);
        self.last_date = self.last_date.max(record.date);
    }
}

pub type DonorAggregates = BTreeMap<DonorId, DonorAggregate>;

// ── External interface ───────────────────────────────────────────────────────

/// What the engine needs from the surrounding system's donation storage.
pub trait DonationSource {
    /// Every donation for the branch and currency dated within `range`.
    fn list_donations(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        range: &Period,
    ) -> AnalyticsResult<Vec<DonationRecord>>;

    /// True when the donor has any attributed gift dated strictly before `date`.
    fn has_donation_before(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        donor_id: &str,
        date: NaiveDate,
    ) -> AnalyticsResult<bool>;

    /// Mean gift amount across all gifts of the calendar year, zero when
    /// there are none.
    fn average_donation_amount(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        year: i32,
    ) -> AnalyticsResult<Decimal>;
}

/// A plain vector of records. Used for synthetic ledgers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    records: Vec<DonationRecord>,
}

impl MemoryLedger {
    pub fn new(records: Vec<DonationRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: DonationRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn scoped<'a>(
        &'a self,
        branch: &'a str,
        currency: &'a CurrencyCode,
    ) -> impl Iterator<Item = &'a DonationRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.branch_id == branch && &r.currency == currency)
    }
}

impl DonationSource for MemoryLedger {
    fn list_donations(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        range: &Period,
    ) -> AnalyticsResult<Vec<DonationRecord>> {
        Ok(self
            .scoped(branch, currency)
            .filter(|r| range.contains_date(r.date))
            .cloned()
            .collect())
    }

    fn has_donation_before(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        donor_id: &str,
        date: NaiveDate,
    ) -> AnalyticsResult<bool> {
        Ok(self
            .scoped(branch, currency)
            .any(|r| r.attributed_donor() == Some(donor_id) && r.date < date))
    }

    fn average_donation_amount(
        &self,
        branch: &str,
        currency: &CurrencyCode,
        year: i32,
    ) -> AnalyticsResult<Decimal> {
        let (sum, n) = self
            .scoped(branch, currency)
            .filter(|r| r.date.year() == year)
            .fold((Decimal::ZERO, 0u32), |(s, n), r| (s + r.amount, n + 1));
        Ok(if n == 0 { Decimal::ZERO } else { sum / Decimal::from(n) })
    }
}

// ── View ─────────────────────────────────────────────────────────────────────

/// A branch- and currency-bound projection over a DonationSource.
pub struct DonorLedgerView<'a, S: DonationSource + ?Sized> {
    source: &'a S,
    branch: BranchId,
    currency: CurrencyCode,
}

impl<'a, S: DonationSource + ?Sized> DonorLedgerView<'a, S> {
    pub fn new(source: &'a S, branch: &str, currency: CurrencyCode) -> Self {
        Self { source, branch: branch.to_string(), currency }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// Attributed, in-scope records for the period.
    fn attributed(&self, period: &Period) -> AnalyticsResult<Vec<DonationRecord>> {
        let records = self.source.list_donations(&self.branch, &self.currency, period)?;
        let mut kept = Vec::with_capacity(records.len());
        let mut foreign = 0usize;
        for record in records {
            if record.currency != self.currency || record.branch_id != self.branch {
                foreign += 1;
                continue;
            }
            if record.attributed_donor().is_some() && period.contains_date(record.date) {
                kept.push(record);
            }
        }
        if foreign > 0 {
            log::warn!(
                "ledger: dropped {foreign} record(s) outside branch={} currency={}",
                self.branch,
                self.currency,
            );
        }
        Ok(kept)
    }

    /// Per-donor totals for the period.
    pub fn aggregate(&self, period: &Period) -> AnalyticsResult<DonorAggregates> {
        let mut out: DonorAggregates = BTreeMap::new();
        for record in self.attributed(period)? {
            let Some(donor) = record.attributed_donor() else { continue };
            out.entry(donor.to_string())
                .and_modify(|agg| agg.absorb(&record))
                .or_insert_with(|| DonorAggregate::start(donor, &record));
        }
        log::debug!(
            "ledger: {} donor aggregate(s) for branch={} {}..{}",
            out.len(),
            self.branch,
            period.start,
            period.end,
        );
        Ok(out)
    }

    /// The cohort of distinct donors who gave during the period.
    pub fn distinct_donor_ids(&self, period: &Period) -> AnalyticsResult<CohortSet> {
        Ok(self
            .attributed(period)?
            .iter()
            .filter_map(|r| r.attributed_donor())
            .map(str::to_string)
            .collect())
    }

    /// Distinct donors per calendar month for every month the period touches.
    pub fn monthly_cohorts(
        &self,
        period: &Period,
    ) -> AnalyticsResult<BTreeMap<(i32, u32), CohortSet>> {
        let mut out: BTreeMap<(i32, u32), CohortSet> = BTreeMap::new();
        for record in self.attributed(period)? {
            if let Some(donor) = record.attributed_donor() {
                out.entry((record.date.year(), record.date.month()))
                    .or_default()
                    .insert(donor.to_string());
            }
        }
        Ok(out)
    }

    pub fn has_prior_donation(&self, donor_id: &str, before: NaiveDate) -> AnalyticsResult<bool> {
        self.source
            .has_donation_before(&self.branch, &self.currency, donor_id, before)
    }

    pub fn average_donation_amount(&self, year: i32) -> AnalyticsResult<Decimal> {
        self.source
            .average_donation_amount(&self.branch, &self.currency, year)
    }
}
