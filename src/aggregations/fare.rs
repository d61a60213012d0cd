//! Fare analysis: composition of the total, fare ranges and distance/fare correlation.

use crate::aggregate::{Count, Grouped, Mean, Summary};
use crate::aggregation::Aggregation;
use crate::filter::TripFilter;
use crate::labels::FareBucket;
use crate::query::QueryKind;
use crate::table::{Execution, TripTable};

use std::ops::RangeInclusive;

use serde::Serialize;

/// Mean of every fare component per year.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FareCompositionRow {
    pub year: i32,
    pub fare: Option<f64>,
    pub extra: Option<f64>,
    pub mta_tax: Option<f64>,
    pub tip: Option<f64>,
    pub tolls: Option<f64>,
    pub improvement_surcharge: Option<f64>,
    pub congestion_surcharge: Option<f64>,
    pub airport_fee: Option<f64>,
    pub total: Option<f64>,
}

/// Mean fare components per year.
///
/// Missing surcharges count as zero. The fare and the total are never missing on a clean trip.
pub struct FareComposition;

impl Aggregation for FareComposition {
    const KIND: QueryKind = QueryKind::FareComposition;
    type Row = FareCompositionRow;

    fn execute(
        table: &TripTable,
        filter: &TripFilter,
        execution: Execution,
    ) -> Vec<FareCompositionRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<i32, [Mean; 9]>::default,
            |groups, trip| {
                let raw = trip.raw();
                let components = [
                    trip.fare_amount(),
                    raw.extra.unwrap_or(0.0),
                    raw.mta_tax.unwrap_or(0.0),
                    raw.tip_amount.unwrap_or(0.0),
                    raw.tolls_amount.unwrap_or(0.0),
                    raw.improvement_surcharge.unwrap_or(0.0),
                    raw.congestion_surcharge.unwrap_or(0.0),
                    raw.airport_fee.unwrap_or(0.0),
                    trip.total_amount(),
                ];
                let means = groups.entry(trip.year());
                for (mean, value) in means.iter_mut().zip(components) {
                    mean.push(value);
                }
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|(year, means)| {
                let [
                    fare,
                    extra,
                    mta_tax,
                    tip,
                    tolls,
                    improvement_surcharge,
                    congestion_surcharge,
                    airport_fee,
                    total,
                ] = means.map(|mean| mean.value());
                FareCompositionRow {
                    year,
                    fare,
                    extra,
                    mta_tax,
                    tip,
                    tolls,
                    improvement_surcharge,
                    congestion_surcharge,
                    airport_fee,
                    total,
                }
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FareRangeRow {
    pub year: i32,
    pub fare_range: FareBucket,
    pub trips: u64,
}

/// Trips per year and total amount range.
pub struct FareDistribution;

impl Aggregation for FareDistribution {
    const KIND: QueryKind = QueryKind::FareDistribution;
    type Row = FareRangeRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<FareRangeRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(i32, FareBucket), Count>::default,
            |groups, trip| {
                groups
                    .entry((trip.year(), FareBucket::of(trip.total_amount())))
                    .push()
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((year, fare_range), count)| FareRangeRow {
                year,
                fare_range,
                trips: count.0,
            })
            .collect()
    }
}

/// Distances included in the correlation, in miles.
pub const CORRELATION_DISTANCE: RangeInclusive<f64> = 0.1..=20.0;

/// Total amounts included in the correlation.
pub const CORRELATION_TOTAL: RangeInclusive<f64> = 2.5..=200.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CorrelationRow {
    /// Lower bound of the tenth-of-a-mile bin
    pub trip_distance: f64,
    pub year: i32,
    /// Mean total amount
    pub total_amount: Option<f64>,
    pub trip_count: u64,
    pub min_fare: Option<f64>,
    pub max_fare: Option<f64>,
    /// Sample standard deviation of the total amount, missing for single-trip bins
    pub std_fare: Option<f64>,
}

/// Total amount statistics per tenth-of-a-mile distance bin and year.
///
/// Only ordinary trips are included, see [CORRELATION_DISTANCE] and [CORRELATION_TOTAL].
pub struct DistanceFareCorrelation;

impl Aggregation for DistanceFareCorrelation {
    const KIND: QueryKind = QueryKind::DistanceFareCorrelation;
    type Row = CorrelationRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<CorrelationRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(u32, i32), Summary>::default,
            |groups, trip| {
                let distance = trip.trip_distance();
                let total = trip.total_amount();
                if CORRELATION_DISTANCE.contains(&distance) && CORRELATION_TOTAL.contains(&total) {
                    let tenths = (distance * 10.0).floor() as u32;
                    groups.entry((tenths, trip.year())).push(total);
                }
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((tenths, year), summary)| CorrelationRow {
                trip_distance: tenths as f64 / 10.0,
                year,
                total_amount: summary.mean(),
                trip_count: summary.count(),
                min_fare: summary.min(),
                max_fare: summary.max(),
                std_fare: summary.stddev(),
            })
            .collect()
    }
}
