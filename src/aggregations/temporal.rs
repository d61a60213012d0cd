//! Temporal patterns: demand and average fare by hour, weekday and month.

use crate::aggregate::{Grouped, Mean};
use crate::aggregation::Aggregation;
use crate::filter::TripFilter;
use crate::labels;
use crate::query::QueryKind;
use crate::table::{Execution, TripTable};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HourlyRow {
    pub hour: u32,
    pub year: i32,
    pub trips: u64,
    pub avg_fare: Option<f64>,
}

/// Trips and mean total amount per pickup hour and year.
pub struct HourlyPattern;

impl Aggregation for HourlyPattern {
    const KIND: QueryKind = QueryKind::HourlyPattern;
    type Row = HourlyRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<HourlyRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(u32, i32), Mean>::default,
            |groups, trip| {
                groups
                    .entry((trip.hour(), trip.year()))
                    .push(trip.total_amount())
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((hour, year), fare)| HourlyRow {
                hour,
                year,
                trips: fare.count(),
                avg_fare: fare.value(),
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WeeklyRow {
    pub day_of_week: u32,
    pub day_name: &'static str,
    pub year: i32,
    pub trips: u64,
    pub avg_fare: Option<f64>,
}

/// Trips and mean total amount per day of week and year.
pub struct WeeklyPattern;

impl Aggregation for WeeklyPattern {
    const KIND: QueryKind = QueryKind::WeeklyPattern;
    type Row = WeeklyRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<WeeklyRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(u32, i32), Mean>::default,
            |groups, trip| {
                groups
                    .entry((trip.day_of_week(), trip.year()))
                    .push(trip.total_amount())
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((day_of_week, year), fare)| WeeklyRow {
                day_of_week,
                day_name: labels::day_name(day_of_week),
                year,
                trips: fare.count(),
                avg_fare: fare.value(),
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub hour: u32,
    pub day_of_week: u32,
    pub year: i32,
    pub trips: u64,
    pub avg_fare: Option<f64>,
}

/// Trips and mean total amount per hour, day of week and year.
pub struct HourDayHeatmap;

impl Aggregation for HourDayHeatmap {
    const KIND: QueryKind = QueryKind::HourDayHeatmap;
    type Row = HeatmapRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<HeatmapRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(u32, u32, i32), Mean>::default,
            |groups, trip| {
                groups
                    .entry((trip.hour(), trip.day_of_week(), trip.year()))
                    .push(trip.total_amount())
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((hour, day_of_week, year), fare)| HeatmapRow {
                hour,
                day_of_week,
                year,
                trips: fare.count(),
                avg_fare: fare.value(),
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MonthlyTrendRow {
    pub year: i32,
    pub month: u32,
    pub trips: u64,
    pub avg_fare: Option<f64>,
    pub total_revenue: f64,
}

/// Trips, mean total amount and revenue per year and month.
pub struct MonthlyTrend;

impl Aggregation for MonthlyTrend {
    const KIND: QueryKind = QueryKind::MonthlyTrend;
    type Row = MonthlyTrendRow;

    fn execute(
        table: &TripTable,
        filter: &TripFilter,
        execution: Execution,
    ) -> Vec<MonthlyTrendRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(i32, u32), Mean>::default,
            |groups, trip| {
                groups
                    .entry((trip.year(), trip.month()))
                    .push(trip.total_amount())
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((year, month), fare)| MonthlyTrendRow {
                year,
                month,
                trips: fare.count(),
                avg_fare: fare.value(),
                total_revenue: fare.sum(),
            })
            .collect()
    }
}
