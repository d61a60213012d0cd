//! Payment analysis: payment mix, tipping and payment share over time.

use crate::aggregate::{round2, Count, Grouped, Mean};
use crate::aggregation::Aggregation;
use crate::filter::TripFilter;
use crate::labels;
use crate::query::QueryKind;
use crate::table::{Execution, TripTable};

use std::cmp::Reverse;

use hashbrown::HashMap;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PaymentRow {
    pub year: i32,
    pub payment_type: i64,
    pub payment_name: &'static str,
    pub count: u64,
    pub avg_amount: Option<f64>,
}

/// Trips and mean total amount per year and payment type.
///
/// Rows are ordered by year, then by descending count.
pub struct PaymentDistribution;

impl Aggregation for PaymentDistribution {
    const KIND: QueryKind = QueryKind::PaymentDistribution;
    type Row = PaymentRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<PaymentRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(i32, i64), Mean>::default,
            |groups, trip| {
                groups
                    .entry((trip.year(), trip.payment_type()))
                    .push(trip.total_amount())
            },
        );
        let mut rows: Vec<PaymentRow> = groups
            .into_sorted()
            .into_iter()
            .map(|((year, payment_type), amount)| PaymentRow {
                year,
                payment_type,
                payment_name: labels::payment_name(payment_type),
                count: amount.count(),
                avg_amount: amount.value(),
            })
            .collect();
        // Stable, so equal counts stay ordered by payment type.
        rows.sort_by_key(|row| (row.year, Reverse(row.count)));
        rows
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TipRow {
    pub year: i32,
    pub payment_type: i64,
    pub payment_name: &'static str,
    pub avg_tip: Option<f64>,
    pub tip_percentage: Option<f64>,
    pub count: u64,
}

/// Mean tip and mean tip percentage per year and payment type.
///
/// Trips with a zero total or no tip amount do not contribute to the percentage.
pub struct TipsByPayment;

impl Aggregation for TipsByPayment {
    const KIND: QueryKind = QueryKind::TipsByPayment;
    type Row = TipRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<TipRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(i32, i64), (Count, (Mean, Mean))>::default,
            |groups, trip| {
                let (count, (tip, percentage)) =
                    groups.entry((trip.year(), trip.payment_type()));
                count.push();
                tip.push_opt(trip.tip_amount());
                percentage.push_opt(trip.tip_percentage());
            },
        );
        groups
            .into_sorted()
            .into_iter()
            .map(|((year, payment_type), (count, (tip, percentage)))| TipRow {
                year,
                payment_type,
                payment_name: labels::tip_payment_name(payment_type),
                avg_tip: tip.value(),
                tip_percentage: percentage.value(),
                count: count.0,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PaymentTrendRow {
    pub year: i32,
    pub month: u32,
    pub payment_type: i64,
    pub payment_name: &'static str,
    pub trips: u64,
    /// Share of the month's trips, in percent
    pub percentage: Option<f64>,
}

/// Trips per year, month and payment type, with each type's share of the month.
pub struct PaymentTrend;

impl Aggregation for PaymentTrend {
    const KIND: QueryKind = QueryKind::PaymentTrend;
    type Row = PaymentTrendRow;

    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<PaymentTrendRow> {
        let groups = table.fold_clean(
            filter,
            execution,
            Grouped::<(i32, u32, i64), Count>::default,
            |groups, trip| {
                groups
                    .entry((trip.year(), trip.month(), trip.payment_type()))
                    .push()
            },
        );
        let groups = groups.into_sorted();
        let mut totals: HashMap<(i32, u32), u64> = HashMap::new();
        for ((year, month, _), count) in &groups {
            *totals.entry((*year, *month)).or_default() += count.0;
        }
        groups
            .into_iter()
            .map(|((year, month, payment_type), count)| {
                let total = totals.get(&(year, month)).copied().unwrap_or_default();
                PaymentTrendRow {
                    year,
                    month,
                    payment_type,
                    payment_name: labels::payment_name(payment_type),
                    trips: count.0,
                    percentage: (total > 0).then(|| round2(count.0 as f64 * 100.0 / total as f64)),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn tipped(payment_type: i64, total: f64, tip: Option<f64>) -> crate::trip::RawTrip {
        let mut trip = test_utils::trip_with(2019, 10, 1.0, total, payment_type);
        trip.tip_amount = tip;
        trip
    }

    #[test]
    fn payment_distribution_order() {
        let trips = vec![
            test_utils::trip_with(2019, 10, 1.0, 10.0, 2),
            test_utils::trip_with(2019, 10, 1.0, 12.0, 1),
            test_utils::trip_with(2019, 10, 1.0, 14.0, 1),
            test_utils::trip_with(2019, 10, 1.0, 14.0, 4),
            test_utils::trip_with(2020, 10, 1.0, 11.0, 3),
        ];
        let table = test_utils::table(&trips, 2);
        let rows = PaymentDistribution::execute(&table, &TripFilter::all(), Execution::Serial);
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.year, r.payment_type, r.payment_name, r.count))
            .collect();
        assert_eq!(
            vec![
                (2019, 1, "Card", 2),
                (2019, 2, "Cash", 1),
                (2019, 4, "Dispute", 1),
                (2020, 3, "No Charge", 1),
            ],
            keys
        );
        assert_eq!(Some(13.0), rows[0].avg_amount);
    }

    #[test]
    fn tip_percentage_skips_zero_total() {
        let trips = vec![
            tipped(1, 0.0, Some(1.0)),
            tipped(1, 20.0, Some(4.0)),
            tipped(1, 10.0, None),
        ];
        let table = test_utils::table(&trips, 2);
        let rows = TipsByPayment::execute(&table, &TripFilter::all(), Execution::Serial);
        assert_eq!(
            vec![TipRow {
                year: 2019,
                payment_type: 1,
                payment_name: "Card",
                avg_tip: Some(2.5),
                tip_percentage: Some(20.0),
                count: 3,
            }],
            rows
        );
    }

    #[test]
    fn tip_percentage_none_when_nothing_qualifies() {
        let trips = vec![tipped(2, 0.0, Some(0.0)), tipped(2, 0.0, Some(0.0))];
        let table = test_utils::table(&trips, 2);
        let rows = TipsByPayment::execute(&table, &TripFilter::all(), Execution::Serial);
        assert_eq!(1, rows.len());
        assert_eq!(None, rows[0].tip_percentage);
        assert_eq!(Some(0.0), rows[0].avg_tip);
        assert_eq!(2, rows[0].count);
    }

    #[test]
    fn tip_labels() {
        let trips: Vec<_> = (1..=6).map(|code| tipped(code, 10.0, Some(1.0))).collect();
        let table = test_utils::table(&trips, 4);
        let rows = TipsByPayment::execute(&table, &TripFilter::all(), Execution::Serial);
        let labels: Vec<_> = rows.iter().map(|r| (r.payment_type, r.payment_name)).collect();
        assert_eq!(
            vec![
                (1, "Card"),
                (2, "Cash"),
                (3, "Other"),
                (4, "Other"),
                (5, "Other"),
                (6, "Other"),
            ],
            labels
        );
    }

    #[test]
    fn payment_trend_shares_sum_to_100() {
        let trips = test_utils::sample_trips();
        let table = test_utils::table(&trips, 16);
        let rows = PaymentTrend::execute(&table, &TripFilter::all(), Execution::Parallel);
        let mut sums: HashMap<(i32, u32), f64> = HashMap::new();
        for row in &rows {
            *sums.entry((row.year, row.month)).or_default() += row.percentage.unwrap();
        }
        assert_eq!(6, sums.len());
        for ((year, month), sum) in sums {
            assert!((sum - 100.0).abs() <= 0.05, "{}-{} sums to {}", year, month, sum);
        }
    }

    #[test]
    fn payment_trend_thirds() {
        let trips = vec![
            test_utils::trip_with(2020, 11, 1.0, 10.0, 1),
            test_utils::trip_with(2020, 11, 1.0, 10.0, 2),
            test_utils::trip_with(2020, 11, 1.0, 10.0, 2),
        ];
        let table = test_utils::table(&trips, 2);
        let rows = PaymentTrend::execute(&table, &TripFilter::all(), Execution::Serial);
        assert_eq!(
            vec![
                PaymentTrendRow {
                    year: 2020,
                    month: 11,
                    payment_type: 1,
                    payment_name: "Card",
                    trips: 1,
                    percentage: Some(33.33),
                },
                PaymentTrendRow {
                    year: 2020,
                    month: 11,
                    payment_type: 2,
                    payment_name: "Cash",
                    trips: 2,
                    percentage: Some(66.67),
                },
            ],
            rows
        );
    }
}
