use crate::table::TripTable;
use crate::trip::RawTrip;

use chrono::{Duration, NaiveDate};

/// Create a valid RawTrip picked up at the given date and hour.
///
/// The trip lasts ten minutes, covers one mile and costs 10.0 paid by card.
pub(crate) fn trip_at(year: i32, month: u32, day: u32, hour: u32) -> RawTrip {
    let pickup = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap();
    RawTrip {
        vendor_id: Some(1),
        pickup: Some(pickup),
        dropoff: Some(pickup + Duration::minutes(10)),
        passenger_count: Some(1.0),
        trip_distance: Some(1.0),
        rate_code: Some(1.0),
        pickup_zone: Some(161),
        dropoff_zone: Some(237),
        payment_type: Some(1),
        fare_amount: Some(7.0),
        extra: Some(0.5),
        mta_tax: Some(0.5),
        tip_amount: Some(1.0),
        tolls_amount: Some(0.0),
        improvement_surcharge: Some(0.3),
        total_amount: Some(10.0),
        congestion_surcharge: Some(0.7),
        airport_fee: None,
    }
}

/// Create a valid RawTrip with the given distance and total amount.
pub(crate) fn trip_with(
    year: i32,
    month: u32,
    trip_distance: f64,
    total_amount: f64,
    payment_type: i64,
) -> RawTrip {
    let mut trip = trip_at(year, month, 1, 8);
    trip.trip_distance = Some(trip_distance);
    trip.total_amount = Some(total_amount);
    trip.fare_amount = Some(total_amount);
    trip.payment_type = Some(payment_type);
    trip
}

/// Create a TripTable split into batches of `batch_size` records.
pub(crate) fn table(records: &[RawTrip], batch_size: usize) -> TripTable {
    TripTable::from_records(records, batch_size)
}

/// A mixed set of clean and invalid trips across both years and all months.
pub(crate) fn sample_trips() -> Vec<RawTrip> {
    let mut trips = Vec::new();
    for (i, (year, month)) in [
        (2019, 10),
        (2019, 11),
        (2019, 12),
        (2020, 10),
        (2020, 11),
        (2020, 12),
    ]
    .into_iter()
    .enumerate()
    {
        for day in 1..=7 {
            for hour in [0, 8, 17] {
                let mut trip = trip_at(year, month, day, hour);
                let n = i as u32 * 100 + day * 10 + hour;
                trip.trip_distance = Some(0.3 + (n % 37) as f64 * 0.55);
                trip.total_amount = Some(4.0 + (n % 41) as f64 * 1.25);
                trip.fare_amount = Some(3.0 + (n % 41) as f64);
                trip.tip_amount = Some((n % 5) as f64 * 0.75);
                trip.passenger_count = Some((n % 4) as f64);
                trip.payment_type = Some(1 + (n % 4) as i64);
                trips.push(trip);
            }
        }
        // Invalid trips that every aggregation must ignore.
        let mut too_long = trip_at(year, month, 9, 9);
        too_long.trip_distance = Some(150.0);
        trips.push(too_long);
        let mut no_payment = trip_at(year, month, 9, 10);
        no_payment.payment_type = Some(0);
        trips.push(no_payment);
    }
    trips
}
