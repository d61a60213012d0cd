//! Trip profile: distance histogram and passenger counts.

use crate::aggregate::{Count, Grouped};
use crate::aggregation::Aggregation;
use crate::filter::TripFilter;
use crate::query::QueryKind;
use crate::table::{Execution, TripTable};

use serde::Serialize;

/// Longest distance shown in the histogram, in miles.
pub const HISTOGRAM_MAX_DISTANCE: f64 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DistanceBinRow {
    /// Lower bound of the half-mile bin
    pub trip_distance: f64,
    pub year: i32,
    pub frequency: u64,
}

/// Trips per half-mile distance bin and year, up to [HISTOGRAM_MAX_DISTANCE].
pub struct DistanceHistogram;

impl Aggregation for DistanceHistogram {
    const KIND: QueryKind = QueryKind::DistanceHistogram;
    type Row = DistanceBinRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<DistanceBinRow> {
        // Bins are keyed by whole half miles so that the keys are ordered integers.
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(u32, i32), Count>::default,
            |groups, trip| {
                let distance = trip.trip_distance();
                if distance <= HISTOGRAM_MAX_DISTANCE {
                    let half_miles = (distance * 2.0).floor() as u32;
                    groups.entry((half_miles, trip.year())).push();
                }
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((half_miles, year), count)| DistanceBinRow {
                trip_distance: half_miles as f64 / 2.0,
                year,
                frequency: count.0,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PassengerRow {
    pub year: i32,
    /// Recorded passenger count. Fractional values are kept as their own groups.
    pub passenger_count: f64,
    pub trips: u64,
}

/// Group key of a passenger count.
///
/// Counts are non-negative, so their bit patterns order like the values. Adding zero folds
/// `-0.0` into `0.0`.
fn passenger_key(passenger_count: f64) -> u64 {
    (passenger_count + 0.0).to_bits()
}

/// Trips per year and passenger count.
pub struct PassengerDistribution;

impl Aggregation for PassengerDistribution {
    const KIND: QueryKind = QueryKind::PassengerDistribution;
    type Row = PassengerRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<PassengerRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(i32, u64), Count>::default,
            |groups, trip| {
                groups
                    .entry((trip.year(), passenger_key(trip.passenger_count())))
                    .push()
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((year, key), count)| PassengerRow {
                year,
                passenger_count: f64::from_bits(key),
                trips: count.0,
            })
            .collect()
    }
}
