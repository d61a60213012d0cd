//! Record filter.
//!
//! Defines which raw trips count as clean trips. Every aggregation scans the clean view through
//! [clean], so all result sets agree on what a valid trip is.
//!
//! Also defines [TripFilter], the year/month restriction applied on top of the clean view.

use std::fmt;
use std::ops::RangeInclusive;

use chrono::Datelike;
use serde::Serialize;

use crate::trip::{CleanTrip, RawTrip};

/// Years covered by the dataset.
pub const YEARS: [i32; 2] = [2019, 2020];

/// Months covered by the dataset.
pub const MONTHS: [u32; 3] = [10, 11, 12];

/// Shortest valid trip distance in miles.
pub const MIN_TRIP_DISTANCE: f64 = 0.01;

/// Longest valid trip distance in miles.
pub const MAX_TRIP_DISTANCE: f64 = 100.0;

/// Largest valid passenger count.
pub const MAX_PASSENGERS: f64 = 6.0;

/// Valid payment type codes.
pub const PAYMENT_TYPES: RangeInclusive<i64> = 1..=6;

/// Apply the validity rules to a raw trip.
///
/// Returns the clean trip if every rule holds, otherwise `None`. A missing value in any checked
/// field fails its rule.
pub fn clean(raw: &RawTrip) -> Option<CleanTrip> {
    let pickup = raw.pickup?;
    let dropoff = raw.dropoff?;
    if !YEARS.contains(&pickup.year()) || dropoff <= pickup {
        return None;
    }

    let trip_distance = raw.trip_distance?;
    if !(MIN_TRIP_DISTANCE..=MAX_TRIP_DISTANCE).contains(&trip_distance) {
        return None;
    }

    let total_amount = raw.total_amount?;
    let fare_amount = raw.fare_amount?;
    // Negated comparisons so that NaN is rejected.
    if !(total_amount >= 0.0) || !(fare_amount >= 0.0) {
        return None;
    }

    let passenger_count = raw.passenger_count?;
    if !(0.0..=MAX_PASSENGERS).contains(&passenger_count) {
        return None;
    }

    let payment_type = raw.payment_type?;
    if !PAYMENT_TYPES.contains(&payment_type) {
        return None;
    }

    Some(CleanTrip::new(
        *raw,
        pickup,
        dropoff,
        trip_distance,
        passenger_count,
        payment_type,
        fare_amount,
        total_amount,
    ))
}

/// Returns whether a raw trip passes the validity rules.
pub fn is_clean(raw: &RawTrip) -> bool {
    clean(raw).is_some()
}

/// Year and month restriction.
///
/// `None` leaves that dimension unrestricted, so the default filter covers every partition.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct TripFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl TripFilter {
    /// A filter matching every trip.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(year: Option<i32>, month: Option<u32>) -> Self {
        Self { year, month }
    }

    /// Returns whether a year and month pass the filter.
    pub fn matches(&self, year: i32, month: u32) -> bool {
        self.year.map_or(true, |y| y == year) && self.month.map_or(true, |m| m == month)
    }

    /// Returns whether a clean trip passes the filter.
    pub fn matches_clean(&self, trip: &CleanTrip) -> bool {
        self.matches(trip.year(), trip.month())
    }

    /// Returns whether a raw trip passes the filter, judged on its pickup timestamp.
    ///
    /// A trip without a pickup timestamp only passes an unrestricted filter.
    pub fn matches_raw(&self, raw: &RawTrip) -> bool {
        match raw.pickup {
            Some(pickup) => self.matches(pickup.year(), pickup.month()),
            None => self.year.is_none() && self.month.is_none(),
        }
    }
}

impl fmt::Display for TripFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "year={}", year)?,
            None => write!(f, "year=both")?,
        }
        match self.month {
            Some(month) => write!(f, "&month={}", month),
            None => write!(f, "&month=all"),
        }
    }
}
