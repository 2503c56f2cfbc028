//! Donor segmentation: tiers and percentile bands over a year's giving.
//!
//! Donors are ranked by total descending. Equal totals are ordered by donor
//! id ascending so the ranking never depends on storage order.

use crate::{
    cohort::CohortSet,
    config::SegmentationConfig,
    error::AnalyticsResult,
    ledger::{DonationSource, DonorAggregate, DonorAggregates, DonorLedgerView},
    period::Period,
    ratio::{mean, percent, round_pct},
    types::{CurrencyCode, DonorId},
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Major,
    Regular,
    Occasional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDonor {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub donor_id: DonorId,
    pub total: Decimal,
    pub count: u32,
    pub tier: Tier,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierSummary {
    pub count: usize,
    pub total_amount: Decimal,
    pub average_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorSegments {
    pub year: i32,
    pub currency: CurrencyCode,
    pub total_donors: usize,
    pub total_amount: Decimal,
    pub major: TierSummary,
    pub regular: TierSummary,
    pub occasional: TierSummary,
    /// Ranking order, highest total first.
    pub donors: Vec<RankedDonor>,
}

impl DonorSegments {
    pub fn tier_of(&self, donor_id: &str) -> Option<Tier> {
        self.donors
            .iter()
            .find(|d| d.donor_id == donor_id)
            .map(|d| d.tier)
    }

    pub fn donors_in(&self, tier: Tier) -> CohortSet {
        self.donors
            .iter()
            .filter(|d| d.tier == tier)
            .map(|d| d.donor_id.clone())
            .collect()
    }

    pub fn major_donors(&self) -> CohortSet {
        self.donors_in(Tier::Major)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PercentileBandKind {
    Top10,
    Top25,
    Top50,
    Bottom50,
}

impl PercentileBandKind {
    pub const ALL: [PercentileBandKind; 4] =
        [Self::Top10, Self::Top25, Self::Top50, Self::Bottom50];

    /// Cumulative share of the ranking covered once this band is included.
    fn cumulative_share(self) -> Option<Decimal> {
        match self {
            Self::Top10 => Some(dec!(0.10)),
            Self::Top25 => Some(dec!(0.25)),
            Self::Top50 => Some(dec!(0.50)),
            Self::Bottom50 => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Top10 => "Top 10%",
            Self::Top25 => "Top 25%",
            Self::Top50 => "Top 50%",
            Self::Bottom50 => "Bottom 50%",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileBand {
    pub band: PercentileBandKind,
    pub label: String,
    pub donor_count: usize,
    pub amount: Decimal,
    pub share_of_total_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierChartData {
    pub year: i32,
    pub currency: CurrencyCode,
    pub total_donors: usize,
    pub total_amount: Decimal,
    pub bands: Vec<PercentileBand>,
}

// ── Ranking ──────────────────────────────────────────────────────────────────

/// Size of the leading slice covering `share` of `n` ranked donors:
/// `max(1, ceil(n × share))`, never more than `n`.
pub fn leading_count(n: usize, share: Decimal) -> usize {
    if n == 0 {
        return 0;
    }
    let raw = (Decimal::from(n) * share).ceil().to_usize().unwrap_or(n);
    raw.max(1).min(n)
}

/// Highest total first; equal totals by donor id ascending.
pub fn rank_donors(aggregates: &DonorAggregates) -> Vec<DonorAggregate> {
    let mut ranked: Vec<DonorAggregate> = aggregates.values().cloned().collect();
    ranked.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.donor_id.cmp(&b.donor_id))
    });
    ranked
}

fn summarize<'a>(donors: impl Iterator<Item = &'a RankedDonor>) -> TierSummary {
    let (count, total_amount) = donors
        .fold((0usize, Decimal::ZERO), |(n, sum), d| (n + 1, sum + d.total));
    TierSummary {
        count,
        total_amount,
        average_amount: mean(total_amount, count),
    }
}

pub fn segment_aggregates(
    year: i32,
    currency: &CurrencyCode,
    aggregates: &DonorAggregates,
    config: &SegmentationConfig,
) -> DonorSegments {
    let ranked = rank_donors(aggregates);
    let major_count = leading_count(ranked.len(), config.major_donor_share);

    let donors: Vec<RankedDonor> = ranked
        .into_iter()
        .enumerate()
        .map(|(i, agg)| {
            let tier = if i < major_count {
                Tier::Major
            } else if agg.count <= config.occasional_max_donations {
                Tier::Occasional
            } else {
                Tier::Regular
            };
            RankedDonor {
                rank: i + 1,
                donor_id: agg.donor_id,
                total: agg.total,
                count: agg.count,
                tier,
            }
        })
        .collect();

    let of = |tier: Tier| summarize(donors.iter().filter(|d| d.tier == tier));
    let major = of(Tier::Major);
    let regular = of(Tier::Regular);
    let occasional = of(Tier::Occasional);

    DonorSegments {
        year,
        currency: currency.clone(),
        total_donors: donors.len(),
        total_amount: donors.iter().map(|d| d.total).sum(),
        major,
        regular,
        occasional,
        donors,
    }
}

pub fn tier_chart_from_aggregates(
    year: i32,
    currency: &CurrencyCode,
    aggregates: &DonorAggregates,
) -> TierChartData {
    let ranked = rank_donors(aggregates);
    let n = ranked.len();

    // cumulative[k] = sum of the top k totals
    let mut cumulative = Vec::with_capacity(n + 1);
    cumulative.push(Decimal::ZERO);
    for agg in &ranked {
        let last = cumulative.last().copied().unwrap_or(Decimal::ZERO);
        cumulative.push(last + agg.total);
    }
    let total_amount = cumulative[n];

    let mut bands = Vec::with_capacity(PercentileBandKind::ALL.len());
    let mut prev_cut = 0usize;
    for kind in PercentileBandKind::ALL {
        let cut = match kind.cumulative_share() {
            Some(share) => leading_count(n, share).max(prev_cut),
            None => n,
        };
        let amount = cumulative[cut] - cumulative[prev_cut];
        bands.push(PercentileBand {
            band: kind,
            label: kind.label().to_string(),
            donor_count: cut - prev_cut,
            amount,
            share_of_total_pct: round_pct(percent(amount, total_amount)),
        });
        prev_cut = cut;
    }

    TierChartData {
        year,
        currency: currency.clone(),
        total_donors: n,
        total_amount,
        bands,
    }
}

// ── Ledger-backed entry points ───────────────────────────────────────────────

pub fn donor_segments<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    year: i32,
    config: &SegmentationConfig,
) -> AnalyticsResult<DonorSegments> {
    donor_segments_in(view, &Period::calendar_year(year)?, year, config)
}

/// Segment over an arbitrary slice of `year`, e.g. year-to-date.
pub fn donor_segments_in<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    period: &Period,
    year: i32,
    config: &SegmentationConfig,
) -> AnalyticsResult<DonorSegments> {
    let aggregates = view.aggregate(period)?;
    let segments = segment_aggregates(year, view.currency(), &aggregates, config);
    log::debug!(
        "segments: branch={} year={year} donors={} major={} regular={} occasional={}",
        view.branch(),
        segments.total_donors,
        segments.major.count,
        segments.regular.count,
        segments.occasional.count,
    );
    Ok(segments)
}

pub fn tier_chart<S: DonationSource + ?Sized>(
    view: &DonorLedgerView<'_, S>,
    year: i32,
) -> AnalyticsResult<TierChartData> {
    let aggregates = view.aggregate(&Period::calendar_year(year)?)?;
    Ok(tier_chart_from_aggregates(year, view.currency(), &aggregates))
}
