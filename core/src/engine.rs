//! The analytics engine: one entry point per presentation structure.
//!
//! RULES:
//!   - Inputs (branch, currency, period) are validated before the ledger is
//!     touched.
//!   - Every figure is recomputed from the ledger on each call; nothing is
//!     cached across calls.
//!   - `now` comes from the configured AnalyticsClock, never the wall clock.

use crate::{
    alerts::{engagement_alerts, EngagementAlerts},
    clock::AnalyticsClock,
    cohort::{retention_metrics, retention_trend, RetentionMetrics, RetentionTrend},
    config::AnalyticsConfig,
    error::{AnalyticsError, AnalyticsResult},
    ledger::{DonationSource, DonorLedgerView},
    period::{Period, PeriodSelection, PeriodWindow},
    segmentation::{
        donor_segments, donor_segments_in, segment_aggregates, tier_chart,
        tier_chart_from_aggregates, DonorSegments, TierChartData,
    },
    summary::{giving_summary, summarize_window, GivingSummary},
    trend::{classify_trends, giving_trends, GivingTrendBuckets},
    types::{BranchId, CurrencyCode},
};
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Everything the dashboard asks for in one call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub branch_id: BranchId,
    pub currency: String,
    pub selection: PeriodSelection,
    /// Segmentation year; defaults to the year of `now`.
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub branch_id: BranchId,
    pub currency: CurrencyCode,
    pub generated_at: NaiveDateTime,
    pub window: PeriodWindow,
    pub summary: GivingSummary,
    pub retention: RetentionMetrics,
    pub retention_trend: RetentionTrend,
    pub giving_trends: GivingTrendBuckets,
    pub segments: DonorSegments,
    pub tier_chart: TierChartData,
    pub alerts: EngagementAlerts,
}

pub struct GivingAnalytics<S: DonationSource> {
    config: AnalyticsConfig,
    clock: AnalyticsClock,
    source: S,
}

impl<S: DonationSource> GivingAnalytics<S> {
    pub fn new(source: S, config: AnalyticsConfig, clock: AnalyticsClock) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config, clock, source })
    }

    /// Engine over `source` with test defaults and a fixed clock.
    pub fn build_test(source: S, now: NaiveDateTime) -> Self {
        Self {
            config: AnalyticsConfig::default_test(),
            clock: AnalyticsClock::fixed(now),
            source,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    fn view(&self, branch: &str, currency: &str) -> AnalyticsResult<DonorLedgerView<'_, S>> {
        if branch.trim().is_empty() {
            return Err(AnalyticsError::MissingBranch);
        }
        let currency = self.config.resolve_currency(currency)?;
        Ok(DonorLedgerView::new(&self.source, branch, currency))
    }

    pub fn resolve_window(&self, selection: &PeriodSelection) -> AnalyticsResult<PeriodWindow> {
        selection.resolve(self.now())
    }

    pub fn giving_summary(
        &self,
        branch: &str,
        currency: &str,
        selection: &PeriodSelection,
    ) -> AnalyticsResult<GivingSummary> {
        let view = self.view(branch, currency)?;
        let window = self.resolve_window(selection)?;
        giving_summary(&view, &window)
    }

    pub fn retention_metrics(
        &self,
        branch: &str,
        currency: &str,
        selection: &PeriodSelection,
    ) -> AnalyticsResult<RetentionMetrics> {
        let view = self.view(branch, currency)?;
        let window = self.resolve_window(selection)?;
        retention_metrics(&view, &window)
    }

    pub fn retention_trend(&self, branch: &str, currency: &str) -> AnalyticsResult<RetentionTrend> {
        let view = self.view(branch, currency)?;
        retention_trend(&view, self.now(), self.config.trend_months)
    }

    pub fn giving_trends(
        &self,
        branch: &str,
        currency: &str,
        selection: &PeriodSelection,
    ) -> AnalyticsResult<GivingTrendBuckets> {
        let view = self.view(branch, currency)?;
        let window = self.resolve_window(selection)?;
        giving_trends(&view, &window)
    }

    pub fn donor_segments(
        &self,
        branch: &str,
        currency: &str,
        year: i32,
    ) -> AnalyticsResult<DonorSegments> {
        let view = self.view(branch, currency)?;
        donor_segments(&view, year, &self.config.segmentation)
    }

    pub fn tier_chart(
        &self,
        branch: &str,
        currency: &str,
        year: i32,
    ) -> AnalyticsResult<TierChartData> {
        let view = self.view(branch, currency)?;
        tier_chart(&view, year)
    }

    /// Alerts for the selected window. The major-donor set is year-to-date.
    pub fn engagement_alerts(
        &self,
        branch: &str,
        currency: &str,
        selection: &PeriodSelection,
    ) -> AnalyticsResult<EngagementAlerts> {
        let view = self.view(branch, currency)?;
        let window = self.resolve_window(selection)?;
        let now = self.now();
        let ytd = self.year_to_date_segments(&view, now)?;
        engagement_alerts(&view, &window, now, &ytd.major_donors(), &self.config.alerts)
    }

    /// Segments from January 1st to `now`; their Major tier drives at-risk alerts.
    fn year_to_date_segments(
        &self,
        view: &DonorLedgerView<'_, S>,
        now: NaiveDateTime,
    ) -> AnalyticsResult<DonorSegments> {
        let ytd = Period::year_to_date(now)?;
        donor_segments_in(view, &ytd, now.year(), &self.config.segmentation)
    }

    pub fn report(&self, request: &ReportRequest) -> AnalyticsResult<AnalyticsReport> {
        let view = self.view(&request.branch_id, &request.currency)?;
        let window = self.resolve_window(&request.selection)?;
        let now = self.now();
        let year = request.year.unwrap_or(now.year());
        let currency = view.currency().clone();

        log::info!(
            "report: branch={} currency={} current={}..{} year={year}",
            request.branch_id,
            currency,
            window.current.start,
            window.current.end,
        );

        let current = view.aggregate(&window.current)?;
        let previous = view.aggregate(&window.previous)?;
        let summary = summarize_window(&currency, &window, &current, &previous);
        let giving_trends = classify_trends(&currency, &current, &previous);

        let year_aggregates = view.aggregate(&Period::calendar_year(year)?)?;
        let segments =
            segment_aggregates(year, &currency, &year_aggregates, &self.config.segmentation);
        let tier_chart = tier_chart_from_aggregates(year, &currency, &year_aggregates);

        let ytd = self.year_to_date_segments(&view, now)?;
        let alerts =
            engagement_alerts(&view, &window, now, &ytd.major_donors(), &self.config.alerts)?;

        Ok(AnalyticsReport {
            branch_id: request.branch_id.clone(),
            currency,
            generated_at: now,
            window,
            summary,
            retention: retention_metrics(&view, &window)?,
            retention_trend: retention_trend(&view, now, self.config.trend_months)?,
            giving_trends,
            segments,
            tier_chart,
            alerts,
        })
    }
}
