//! Partition loading.
//!
//! Trips are stored as one Parquet file per month under
//! `<data_dir>/<year>/yellow_tripdata_<year>-<month>.parquet`. Loading is all or nothing: if any
//! partition fails, no [TripTable] is returned and the error names the partition.

use crate::error::{AnalysisError, PartitionError};
use crate::table::{TripBatch, TripTable};

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow_array::{cast::AsArray, types::*, ArrayRef, PrimitiveArray, RecordBatch};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Serialize;
use tracing::info;

/// Number of rows per decoded batch.
pub const BATCH_SIZE: usize = 64 * 1024;

/// One monthly partition of the dataset.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Partition {
    pub year: i32,
    pub month: u32,
}

/// The partitions making up the dataset.
pub const PARTITIONS: [Partition; 6] = [
    Partition::new(2019, 10),
    Partition::new(2019, 11),
    Partition::new(2019, 12),
    Partition::new(2020, 10),
    Partition::new(2020, 11),
    Partition::new(2020, 12),
];

impl Partition {
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Returns the path of the partition file under a data directory.
    pub fn path(&self, data_dir: &Path) -> PathBuf {
        data_dir
            .join(self.year.to_string())
            .join(format!("yellow_tripdata_{}.parquet", self))
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Find a column by name, ignoring ASCII case.
fn column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a ArrayRef> {
    batch
        .schema_ref()
        .fields()
        .iter()
        .position(|field| field.name().eq_ignore_ascii_case(name))
        .map(|index| batch.column(index))
}

/// Cast a column to the primitive type used in a [TripBatch].
fn cast_to<T: ArrowPrimitiveType>(array: &ArrayRef) -> Result<PrimitiveArray<T>, PartitionError> {
    let array = arrow_cast::cast(array, &T::DATA_TYPE)?;
    Ok(array.as_primitive::<T>().clone())
}

fn required<T: ArrowPrimitiveType>(
    batch: &RecordBatch,
    name: &'static str,
) -> Result<PrimitiveArray<T>, PartitionError> {
    let array = column(batch, name).ok_or(PartitionError::MissingColumn(name))?;
    cast_to(array)
}

/// Columns added to the dataset over time are read as nulls when absent.
fn optional<T: ArrowPrimitiveType>(
    batch: &RecordBatch,
    name: &'static str,
) -> Result<PrimitiveArray<T>, PartitionError> {
    match column(batch, name) {
        Some(array) => cast_to(array),
        None => Ok(PrimitiveArray::new_null(batch.num_rows())),
    }
}

impl TryFrom<&RecordBatch> for TripBatch {
    type Error = PartitionError;

    fn try_from(batch: &RecordBatch) -> Result<Self, Self::Error> {
        Ok(Self {
            vendor_id: required::<Int64Type>(batch, "VendorID")?,
            pickup: required::<TimestampMicrosecondType>(batch, "tpep_pickup_datetime")?,
            dropoff: required::<TimestampMicrosecondType>(batch, "tpep_dropoff_datetime")?,
            passenger_count: required::<Float64Type>(batch, "passenger_count")?,
            trip_distance: required::<Float64Type>(batch, "trip_distance")?,
            rate_code: required::<Float64Type>(batch, "RatecodeID")?,
            pickup_zone: required::<Int64Type>(batch, "PULocationID")?,
            dropoff_zone: required::<Int64Type>(batch, "DOLocationID")?,
            payment_type: required::<Int64Type>(batch, "payment_type")?,
            fare_amount: required::<Float64Type>(batch, "fare_amount")?,
            extra: required::<Float64Type>(batch, "extra")?,
            mta_tax: required::<Float64Type>(batch, "mta_tax")?,
            tip_amount: required::<Float64Type>(batch, "tip_amount")?,
            tolls_amount: required::<Float64Type>(batch, "tolls_amount")?,
            improvement_surcharge: required::<Float64Type>(batch, "improvement_surcharge")?,
            total_amount: required::<Float64Type>(batch, "total_amount")?,
            congestion_surcharge: optional::<Float64Type>(batch, "congestion_surcharge")?,
            airport_fee: optional::<Float64Type>(batch, "airport_fee")?,
        })
    }
}

/// Read every batch of one partition file.
pub fn load_partition(data_dir: &Path, partition: Partition) -> Result<Vec<TripBatch>, PartitionError> {
    let file = File::open(partition.path(data_dir))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(BATCH_SIZE)
        .build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(TripBatch::try_from(&batch?)?);
    }
    Ok(batches)
}

/// Load a set of partitions into a [TripTable].
///
/// # Arguments
///
/// * `data_dir`: Directory containing one subdirectory per year
/// * `partitions`: Partitions to load
#[tracing::instrument(level = "info", skip_all, fields(data_dir = %data_dir.display()))]
pub fn load_partitions(
    data_dir: &Path,
    partitions: &[Partition],
) -> Result<TripTable, AnalysisError> {
    let mut batches = Vec::new();
    for &partition in partitions {
        let loaded = load_partition(data_dir, partition)
            .map_err(|source| AnalysisError::PartitionLoad { partition, source })?;
        let rows: usize = loaded.iter().map(TripBatch::num_rows).sum();
        info!(%partition, rows, "loaded partition");
        batches.extend(loaded);
    }
    Ok(TripTable::new(partitions.to_vec(), batches))
}

/// Load the complete dataset.
pub fn load(data_dir: &Path) -> Result<TripTable, AnalysisError> {
    load_partitions(data_dir, &PARTITIONS)
}
