//! Columnar trip storage and scans.
//!
//! A [TripTable] holds the raw partitions as typed Arrow arrays. Nothing derived is
//! materialised: the clean view is rebuilt by applying [filter::clean] to each row on every scan.

use std::sync::Arc;

use arrow_array::{
    Array, Float64Array, Int64Array, PrimitiveArray, TimestampMicrosecondArray,
    types::ArrowPrimitiveType,
};
use chrono::{DateTime, NaiveDateTime};
use rayon::prelude::*;

use crate::aggregate::Merge;
use crate::filter::{self, TripFilter};
use crate::loader::Partition;
use crate::trip::{CleanTrip, RawTrip};

/// How a scan runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Execution {
    /// Scan batches one after another on the calling thread.
    #[default]
    Serial,
    /// Scan batches on the Rayon thread pool.
    Parallel,
}

/// One batch of trips in columnar form.
#[derive(Clone, Debug)]
pub struct TripBatch {
    pub(crate) vendor_id: Int64Array,
    pub(crate) pickup: TimestampMicrosecondArray,
    pub(crate) dropoff: TimestampMicrosecondArray,
    pub(crate) passenger_count: Float64Array,
    pub(crate) trip_distance: Float64Array,
    pub(crate) rate_code: Float64Array,
    pub(crate) pickup_zone: Int64Array,
    pub(crate) dropoff_zone: Int64Array,
    pub(crate) payment_type: Int64Array,
    pub(crate) fare_amount: Float64Array,
    pub(crate) extra: Float64Array,
    pub(crate) mta_tax: Float64Array,
    pub(crate) tip_amount: Float64Array,
    pub(crate) tolls_amount: Float64Array,
    pub(crate) improvement_surcharge: Float64Array,
    pub(crate) total_amount: Float64Array,
    pub(crate) congestion_surcharge: Float64Array,
    pub(crate) airport_fee: Float64Array,
}

/// Returns the value at `index`, or `None` if it is null.
fn value<T: ArrowPrimitiveType>(array: &PrimitiveArray<T>, index: usize) -> Option<T::Native> {
    array.is_valid(index).then(|| array.value(index))
}

fn timestamp(array: &TimestampMicrosecondArray, index: usize) -> Option<NaiveDateTime> {
    value(array, index)
        .and_then(DateTime::from_timestamp_micros)
        .map(|datetime| datetime.naive_utc())
}

fn micros(datetime: Option<NaiveDateTime>) -> Option<i64> {
    datetime.map(|datetime| datetime.and_utc().timestamp_micros())
}

impl TripBatch {
    /// Build a batch from row records.
    pub fn from_records(records: &[RawTrip]) -> Self {
        macro_rules! column {
            ($array:ty, $field:ident) => {
                <$array>::from(records.iter().map(|r| r.$field).collect::<Vec<_>>())
            };
        }
        Self {
            vendor_id: column!(Int64Array, vendor_id),
            pickup: TimestampMicrosecondArray::from(
                records.iter().map(|r| micros(r.pickup)).collect::<Vec<_>>(),
            ),
            dropoff: TimestampMicrosecondArray::from(
                records.iter().map(|r| micros(r.dropoff)).collect::<Vec<_>>(),
            ),
            passenger_count: column!(Float64Array, passenger_count),
            trip_distance: column!(Float64Array, trip_distance),
            rate_code: column!(Float64Array, rate_code),
            pickup_zone: column!(Int64Array, pickup_zone),
            dropoff_zone: column!(Int64Array, dropoff_zone),
            payment_type: column!(Int64Array, payment_type),
            fare_amount: column!(Float64Array, fare_amount),
            extra: column!(Float64Array, extra),
            mta_tax: column!(Float64Array, mta_tax),
            tip_amount: column!(Float64Array, tip_amount),
            tolls_amount: column!(Float64Array, tolls_amount),
            improvement_surcharge: column!(Float64Array, improvement_surcharge),
            total_amount: column!(Float64Array, total_amount),
            congestion_surcharge: column!(Float64Array, congestion_surcharge),
            airport_fee: column!(Float64Array, airport_fee),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.pickup.len()
    }

    /// Returns the raw trip at a row index.
    pub fn row(&self, index: usize) -> RawTrip {
        RawTrip {
            vendor_id: value(&self.vendor_id, index),
            pickup: timestamp(&self.pickup, index),
            dropoff: timestamp(&self.dropoff, index),
            passenger_count: value(&self.passenger_count, index),
            trip_distance: value(&self.trip_distance, index),
            rate_code: value(&self.rate_code, index),
            pickup_zone: value(&self.pickup_zone, index),
            dropoff_zone: value(&self.dropoff_zone, index),
            payment_type: value(&self.payment_type, index),
            fare_amount: value(&self.fare_amount, index),
            extra: value(&self.extra, index),
            mta_tax: value(&self.mta_tax, index),
            tip_amount: value(&self.tip_amount, index),
            tolls_amount: value(&self.tolls_amount, index),
            improvement_surcharge: value(&self.improvement_surcharge, index),
            total_amount: value(&self.total_amount, index),
            congestion_surcharge: value(&self.congestion_surcharge, index),
            airport_fee: value(&self.airport_fee, index),
        }
    }

    /// Iterate over the raw trips of the batch.
    pub fn rows(&self) -> impl Iterator<Item = RawTrip> + '_ {
        (0..self.num_rows()).map(|index| self.row(index))
    }
}

/// The complete set of loaded trips.
#[derive(Clone, Debug, Default)]
pub struct TripTable {
    partitions: Vec<Partition>,
    batches: Vec<Arc<TripBatch>>,
}

impl TripTable {
    /// Create a table from loaded partitions and their batches.
    pub fn new(partitions: Vec<Partition>, batches: Vec<TripBatch>) -> Self {
        Self {
            partitions,
            batches: batches.into_iter().map(Arc::new).collect(),
        }
    }

    /// Create an in-memory table from row records, split into batches of `batch_size` rows.
    pub fn from_records(records: &[RawTrip], batch_size: usize) -> Self {
        let batches = records
            .chunks(batch_size.max(1))
            .map(TripBatch::from_records)
            .collect();
        Self::new(Vec::new(), batches)
    }

    /// Partitions the table was loaded from. Empty for in-memory tables.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|batch| batch.num_rows()).sum()
    }

    /// Fold every batch into an accumulator and merge the results in batch order.
    fn fold_batches<A, I, F>(&self, execution: Execution, init: I, fold: F) -> A
    where
        A: Merge + Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, &TripBatch) + Sync,
    {
        let scan = |batch: &Arc<TripBatch>| {
            let mut acc = init();
            fold(&mut acc, batch);
            acc
        };
        // Collecting keeps batch order, so merges happen in the same order either way.
        let partials: Vec<A> = match execution {
            Execution::Serial => self.batches.iter().map(scan).collect(),
            Execution::Parallel => self.batches.par_iter().map(scan).collect(),
        };
        partials.into_iter().fold(init(), |mut total, partial| {
            total.merge(partial);
            total
        })
    }

    /// Fold every raw trip passing `trip_filter` on its pickup timestamp.
    ///
    /// The validity rules are not applied.
    pub fn fold_raw<A, I, F>(
        &self,
        trip_filter: &TripFilter,
        execution: Execution,
        init: I,
        fold: F,
    ) -> A
    where
        A: Merge + Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, &RawTrip) + Sync,
    {
        self.fold_batches(execution, init, |acc, batch| {
            batch
                .rows()
                .filter(|raw| trip_filter.matches_raw(raw))
                .for_each(|raw| fold(acc, &raw));
        })
    }

    /// Fold every clean trip passing `trip_filter`.
    pub fn fold_clean<A, I, F>(
        &self,
        trip_filter: &TripFilter,
        execution: Execution,
        init: I,
        fold: F,
    ) -> A
    where
        A: Merge + Send,
        I: Fn() -> A + Sync,
        F: Fn(&mut A, &CleanTrip) + Sync,
    {
        self.fold_batches(execution, init, |acc, batch| {
            batch
                .rows()
                .filter_map(|raw| filter::clean(&raw))
                .filter(|trip| trip_filter.matches_clean(trip))
                .for_each(|trip| fold(acc, &trip));
        })
    }
}
