//! Trip record types.
//!
//! [RawTrip] mirrors one row of a yellow taxi trip partition, with every column nullable as it is
//! in the source files. [CleanTrip] is a raw trip that passed the record filter, together with
//! the date parts derived from its pickup timestamp. A [CleanTrip] can only be obtained from
//! [crate::filter::clean].

use chrono::{Datelike, NaiveDateTime, Timelike};

/// One raw taxi trip.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawTrip {
    pub vendor_id: Option<i64>,
    pub pickup: Option<NaiveDateTime>,
    pub dropoff: Option<NaiveDateTime>,
    pub passenger_count: Option<f64>,
    /// Trip distance in miles
    pub trip_distance: Option<f64>,
    pub rate_code: Option<f64>,
    pub pickup_zone: Option<i64>,
    pub dropoff_zone: Option<i64>,
    /// Payment type code, 1 to 6 for valid trips
    pub payment_type: Option<i64>,
    pub fare_amount: Option<f64>,
    pub extra: Option<f64>,
    pub mta_tax: Option<f64>,
    pub tip_amount: Option<f64>,
    pub tolls_amount: Option<f64>,
    pub improvement_surcharge: Option<f64>,
    pub total_amount: Option<f64>,
    pub congestion_surcharge: Option<f64>,
    pub airport_fee: Option<f64>,
}

/// A raw trip satisfying every validity rule, with derived date parts.
///
/// The fields checked by the filter are stored unwrapped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CleanTrip {
    raw: RawTrip,
    pickup: NaiveDateTime,
    dropoff: NaiveDateTime,
    trip_distance: f64,
    passenger_count: f64,
    payment_type: i64,
    fare_amount: f64,
    total_amount: f64,
}

impl CleanTrip {
    /// Only called by the record filter once every rule has been checked.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        raw: RawTrip,
        pickup: NaiveDateTime,
        dropoff: NaiveDateTime,
        trip_distance: f64,
        passenger_count: f64,
        payment_type: i64,
        fare_amount: f64,
        total_amount: f64,
    ) -> Self {
        Self {
            raw,
            pickup,
            dropoff,
            trip_distance,
            passenger_count,
            payment_type,
            fare_amount,
            total_amount,
        }
    }

    /// The underlying raw record.
    pub fn raw(&self) -> &RawTrip {
        &self.raw
    }

    pub fn year(&self) -> i32 {
        self.pickup.year()
    }

    pub fn month(&self) -> u32 {
        self.pickup.month()
    }

    pub fn hour(&self) -> u32 {
        self.pickup.hour()
    }

    /// Day of week of the pickup, 0 = Sunday to 6 = Saturday.
    pub fn day_of_week(&self) -> u32 {
        self.pickup.weekday().num_days_from_sunday()
    }

    pub fn pickup(&self) -> NaiveDateTime {
        self.pickup
    }

    pub fn dropoff(&self) -> NaiveDateTime {
        self.dropoff
    }

    /// Minutes between pickup and dropoff.
    pub fn duration_minutes(&self) -> f64 {
        (self.dropoff - self.pickup).num_milliseconds() as f64 / 60_000.0
    }

    pub fn trip_distance(&self) -> f64 {
        self.trip_distance
    }

    pub fn passenger_count(&self) -> f64 {
        self.passenger_count
    }

    pub fn payment_type(&self) -> i64 {
        self.payment_type
    }

    pub fn fare_amount(&self) -> f64 {
        self.fare_amount
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    pub fn tip_amount(&self) -> Option<f64> {
        self.raw.tip_amount
    }

    /// Tip as a percentage of the total amount.
    ///
    /// Undefined when the total is zero or the tip is missing.
    pub fn tip_percentage(&self) -> Option<f64> {
        let tip = self.raw.tip_amount?;
        if self.total_amount == 0.0 {
            return None;
        }
        Some(tip / self.total_amount * 100.0)
    }
}
