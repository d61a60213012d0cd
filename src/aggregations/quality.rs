//! Data quality: record counts before and after cleaning.

use crate::aggregate::{Count, Grouped, Mean};
use crate::aggregation::Aggregation;
use crate::filter::TripFilter;
use crate::query::QueryKind;
use crate::table::{Execution, TripTable};

use serde::Serialize;

/// A number of records.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RecordCount {
    pub records: u64,
}

/// Raw records whose pickup falls within the filter. Validity rules are not applied.
pub struct RawCount;

impl Aggregation for RawCount {
    const KIND: QueryKind = QueryKind::RawCount;
    type Row = RecordCount;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<RecordCount> {
        let count = table.fold_raw(filter, execution, Count::default, |c, _| c.push());
        vec![RecordCount { records: count.0 }]
    }
}

/// Clean records within the filter.
pub struct CleanCount;

impl Aggregation for CleanCount {
    const KIND: QueryKind = QueryKind::CleanCount;
    type Row = RecordCount;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<RecordCount> {
        let count = table.fold_clean(filter, execution, Count::default, |c, _| c.push());
        vec![RecordCount { records: count.0 }]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MonthlyCountRow {
    pub year: i32,
    pub month: u32,
    pub trips: u64,
}

/// Clean records per year and month.
pub struct MonthlyCounts;

impl Aggregation for MonthlyCounts {
    const KIND: QueryKind = QueryKind::MonthlyCounts;
    type Row = MonthlyCountRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<Self::Row> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(i32, u32), Count>::default,
            |groups, trip| groups.entry((trip.year(), trip.month())).push(),
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((year, month), count)| MonthlyCountRow {
                year,
                month,
                trips: count.0,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QualityMetricsRow {
    pub clean_records: u64,
    pub avg_distance: Option<f64>,
    pub avg_fare: Option<f64>,
}

/// Summary of the clean records: count, mean distance and mean total amount.
pub struct QualityMetrics;

impl Aggregation for QualityMetrics {
    const KIND: QueryKind = QueryKind::QualityMetrics;
    type Row = QualityMetricsRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<Self::Row> {
        let (distance, fare) = table.fold_clean(
            filter,
            execution,
            <(Mean, Mean)>::default,
            |(distance, fare), trip| {
                distance.push(trip.trip_distance());
                fare.push(trip.total_amount());
            },
        );
        vec![QualityMetricsRow {
            clean_records: distance.count(),
            avg_distance: distance.value(),
            avg_fare: fare.value(),
        }]
    }
}
