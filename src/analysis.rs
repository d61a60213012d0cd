//! Analysis façade.
//!
//! [AnalysisContext] answers one request per catalog section. Each request parses its filter
//! parameters, then runs the section's queries through the query cache.

use crate::aggregation::Aggregation;
use crate::aggregations::fare::{
    CorrelationRow, DistanceFareCorrelation, FareComposition, FareCompositionRow,
    FareDistribution, FareRangeRow,
};
use crate::aggregations::pandemic::{
    year_over_year, BehaviorChanges, BehaviorRow, VolumeComparison, VolumeRow, YearOverYear,
};
use crate::aggregations::payment::{
    PaymentDistribution, PaymentRow, PaymentTrend, PaymentTrendRow, TipRow, TipsByPayment,
};
use crate::aggregations::quality::{
    CleanCount, MonthlyCountRow, MonthlyCounts, QualityMetrics, QualityMetricsRow, RawCount,
    RecordCount,
};
use crate::aggregations::temporal::{
    HeatmapRow, HourDayHeatmap, HourlyPattern, HourlyRow, MonthlyTrend, MonthlyTrendRow,
    WeeklyPattern, WeeklyRow,
};
use crate::aggregations::trip_profile::{
    DistanceBinRow, DistanceHistogram, PassengerDistribution, PassengerRow,
};
use crate::cache::{CachePolicy, QueryCache};
use crate::error::AnalysisError;
use crate::filter::TripFilter;
use crate::models::FilterParams;
use crate::query::{QuerySignature, Section};
use crate::table::{Execution, TripTable};

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

/// Rows of one query, shared with the cache.
pub type Rows<T> = Arc<Vec<T>>;

/// Record counts before and after cleaning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualitySummary {
    pub raw_records: u64,
    pub clean_records: u64,
    /// Raw records failing the cleaning rules
    pub removed_records: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuality {
    pub summary: QualitySummary,
    pub monthly_counts: Rows<MonthlyCountRow>,
    pub metrics: Rows<QualityMetricsRow>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalPatterns {
    pub hourly_pattern: Rows<HourlyRow>,
    pub weekly_pattern: Rows<WeeklyRow>,
    pub hour_day_heatmap: Rows<HeatmapRow>,
    pub monthly_trend: Rows<MonthlyTrendRow>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripProfile {
    pub distance_histogram: Rows<DistanceBinRow>,
    pub passenger_distribution: Rows<PassengerRow>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareAnalysis {
    pub fare_composition: Rows<FareCompositionRow>,
    pub fare_distribution: Rows<FareRangeRow>,
    pub distance_fare_correlation: Rows<CorrelationRow>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAnalysis {
    pub payment_distribution: Rows<PaymentRow>,
    pub tips_by_payment: Rows<TipRow>,
    pub payment_trend: Rows<PaymentTrendRow>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PandemicImpact {
    pub volume_comparison: Rows<VolumeRow>,
    pub behavior_changes: Rows<BehaviorRow>,
    pub year_over_year: Vec<YearOverYear>,
}

/// Entry point of the analyses over one loaded table.
///
/// Each context owns its cache, so contexts over different tables do not share results.
pub struct AnalysisContext {
    table: Arc<TripTable>,
    cache: QueryCache,
    execution: Execution,
    cache_enabled: bool,
}

impl AnalysisContext {
    /// Return a new AnalysisContext.
    ///
    /// # Arguments
    ///
    /// * `table`: The loaded trip records
    /// * `execution`: Whether scans run serially or on the rayon pool
    /// * `cache_enabled`: When false every query is computed and nothing is cached
    pub fn new(table: Arc<TripTable>, execution: Execution, cache_enabled: bool) -> Self {
        Self {
            table,
            cache: QueryCache::new(),
            execution,
            cache_enabled,
        }
    }

    pub fn table(&self) -> &TripTable {
        &self.table
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn policy(&self) -> CachePolicy {
        if self.cache_enabled {
            CachePolicy::Use
        } else {
            CachePolicy::Bypass
        }
    }

    fn run<A: Aggregation>(
        &self,
        filter: TripFilter,
        policy: CachePolicy,
    ) -> Result<Rows<A::Row>, AnalysisError> {
        self.cache
            .get_or_compute(QuerySignature::new(A::KIND, filter), policy, || {
                Ok(A::execute(&self.table, &filter, self.execution))
            })
    }

    fn count<A: Aggregation<Row = RecordCount>>(&self, filter: TripFilter) -> Result<u64, AnalysisError> {
        let rows = self.run::<A>(filter, CachePolicy::Bypass)?;
        Ok(rows.iter().map(|row| row.records).sum())
    }

    /// Record counts, monthly clean counts and headline metrics.
    ///
    /// The raw and clean totals are always recomputed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn data_quality(&self, params: &FilterParams) -> Result<DataQuality, AnalysisError> {
        let filter = params.to_filter()?;
        let raw_records = self.count::<RawCount>(filter)?;
        let clean_records = self.count::<CleanCount>(filter)?;
        Ok(DataQuality {
            summary: QualitySummary {
                raw_records,
                clean_records,
                removed_records: raw_records.saturating_sub(clean_records),
            },
            monthly_counts: self.run::<MonthlyCounts>(filter, self.policy())?,
            metrics: self.run::<QualityMetrics>(filter, self.policy())?,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn temporal_patterns(&self, params: &FilterParams) -> Result<TemporalPatterns, AnalysisError> {
        let filter = params.to_filter()?;
        let policy = self.policy();
        Ok(TemporalPatterns {
            hourly_pattern: self.run::<HourlyPattern>(filter, policy)?,
            weekly_pattern: self.run::<WeeklyPattern>(filter, policy)?,
            hour_day_heatmap: self.run::<HourDayHeatmap>(filter, policy)?,
            monthly_trend: self.run::<MonthlyTrend>(filter, policy)?,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn trip_profile(&self, params: &FilterParams) -> Result<TripProfile, AnalysisError> {
        let filter = params.to_filter()?;
        let policy = self.policy();
        Ok(TripProfile {
            distance_histogram: self.run::<DistanceHistogram>(filter, policy)?,
            passenger_distribution: self.run::<PassengerDistribution>(filter, policy)?,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn fare_analysis(&self, params: &FilterParams) -> Result<FareAnalysis, AnalysisError> {
        let filter = params.to_filter()?;
        let policy = self.policy();
        Ok(FareAnalysis {
            fare_composition: self.run::<FareComposition>(filter, policy)?,
            fare_distribution: self.run::<FareDistribution>(filter, policy)?,
            distance_fare_correlation: self.run::<DistanceFareCorrelation>(filter, policy)?,
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn payment_analysis(&self, params: &FilterParams) -> Result<PaymentAnalysis, AnalysisError> {
        let filter = params.to_filter()?;
        let policy = self.policy();
        Ok(PaymentAnalysis {
            payment_distribution: self.run::<PaymentDistribution>(filter, policy)?,
            tips_by_payment: self.run::<TipsByPayment>(filter, policy)?,
            payment_trend: self.run::<PaymentTrend>(filter, policy)?,
        })
    }

    /// 2019 against 2020 volumes and behaviour, with the year over year change.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn pandemic_impact(&self, params: &FilterParams) -> Result<PandemicImpact, AnalysisError> {
        let filter = params.to_filter()?;
        let policy = self.policy();
        let behavior_changes = self.run::<BehaviorChanges>(filter, policy)?;
        Ok(PandemicImpact {
            volume_comparison: self.run::<VolumeComparison>(filter, policy)?,
            year_over_year: year_over_year(&behavior_changes),
            behavior_changes,
        })
    }

    /// Remove every cached result. Returns the number removed.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear_all()
    }

    /// Remove the cached results of every section not in `keep`. Returns the number removed.
    pub fn retain_sections(&self, keep: &HashSet<Section>) -> usize {
        self.cache.clear_sections(keep)
    }
}
