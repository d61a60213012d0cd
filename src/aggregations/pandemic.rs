//! Pandemic impact: 2019 against 2020 volume and trip behaviour.

use crate::aggregate::{round2, Grouped, Mean};
use crate::aggregation::Aggregation;
use crate::filter::TripFilter;
use crate::query::QueryKind;
use crate::table::{Execution, TripTable};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VolumeRow {
    pub year: i32,
    pub month: u32,
    pub trips: u64,
    pub avg_distance: Option<f64>,
    pub avg_fare: Option<f64>,
}

/// Trips, mean distance and mean total amount per year and month.
pub struct VolumeComparison;

impl Aggregation for VolumeComparison {
    const KIND: QueryKind = QueryKind::VolumeComparison;
    type Row = VolumeRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<VolumeRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(i32, u32), (Mean, Mean)>::default,
            |groups, trip| {
                let (distance, fare) = groups.entry((trip.year(), trip.month()));
                distance.push(trip.trip_distance());
                fare.push(trip.total_amount());
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((year, month), (distance, fare))| VolumeRow {
                year,
                month,
                trips: distance.count(),
                avg_distance: distance.value(),
                avg_fare: fare.value(),
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BehaviorRow {
    pub year: i32,
    pub avg_distance: Option<f64>,
    pub avg_fare: Option<f64>,
    /// Mean minutes from pickup to dropoff
    pub avg_duration: Option<f64>,
    pub avg_passengers: Option<f64>,
    pub avg_tip_pct: Option<f64>,
    pub total_trips: u64,
}

/// Per-year trip behaviour: distance, total amount, duration, passengers and tip percentage.
pub struct BehaviorChanges;

impl Aggregation for BehaviorChanges {
    const KIND: QueryKind = QueryKind::BehaviorChanges;
    type Row = BehaviorRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<BehaviorRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<i32, [Mean; 5]>::default,
            |groups, trip| {
                let [distance, fare, duration, passengers, tip_pct] = groups.entry(trip.year());
                distance.push(trip.trip_distance());
                fare.push(trip.total_amount());
                duration.push(trip.duration_minutes());
                passengers.push(trip.passenger_count());
                tip_pct.push_opt(trip.tip_percentage());
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(
                |(year, [distance, fare, duration, passengers, tip_pct])| BehaviorRow {
                    year,
                    avg_distance: distance.value(),
                    avg_fare: fare.value(),
                    avg_duration: duration.value(),
                    avg_passengers: passengers.value(),
                    avg_tip_pct: tip_pct.value(),
                    total_trips: distance.count(),
                },
            )
            .collect()
    }
}

/// One metric of [BehaviorRow] compared between 2019 and 2020.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct YearOverYear {
    pub metric: &'static str,
    pub value_2019: Option<f64>,
    pub value_2020: Option<f64>,
    /// Change from 2019 to 2020 in percent
    pub change_pct: Option<f64>,
}

/// Compare the behaviour of 2020 with 2019.
///
/// The change is missing when either year is missing or the 2019 value is zero.
pub fn year_over_year(rows: &[BehaviorRow]) -> Vec<YearOverYear> {
    let find = |year: i32| rows.iter().find(|row| row.year == year);
    let before = find(2019);
    let after = find(2020);
    let metrics: [(&'static str, fn(&BehaviorRow) -> Option<f64>); 6] = [
        ("avg_distance", |row| row.avg_distance),
        ("avg_fare", |row| row.avg_fare),
        ("avg_duration", |row| row.avg_duration),
        ("avg_passengers", |row| row.avg_passengers),
        ("avg_tip_pct", |row| row.avg_tip_pct),
        ("total_trips", |row| Some(row.total_trips as f64)),
    ];
    metrics
        .into_iter()
        .map(|(metric, value)| {
            let value_2019 = before.and_then(value);
            let value_2020 = after.and_then(value);
            let change_pct = match (value_2019, value_2020) {
                (Some(old), Some(new)) if old != 0.0 => Some(round2((new - old) / old * 100.0)),
                _ => None,
            };
            YearOverYear {
                metric,
                value_2019,
                value_2020,
                change_pct,
            }
        })
        .collect()
}
