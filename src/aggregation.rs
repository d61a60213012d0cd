use crate::filter::TripFilter;
use crate::query::QueryKind;
use crate::table::{Execution, TripTable};

use serde::Serialize;

/// Trait for catalog queries.
///
/// This forms the contract between the analysis façade and the aggregation library. Every
/// aggregation is a pure function of the table and its filter, and sees only clean trips unless
/// it explicitly scans raw rows.
pub trait Aggregation {
    /// Catalog entry computed by this aggregation.
    const KIND: QueryKind;

    /// One row of the result set.
    type Row: Serialize + Send + Sync + 'static;

    /// Execute the aggregation.
    ///
    /// Returns the rows ordered by their group keys unless the query defines another order.
    ///
    /// # Arguments
    ///
    /// * `table`: Trips to aggregate
    /// * `filter`: Year and month restriction
    /// * `execution`: Whether batches are scanned serially or in parallel
    fn execute(table: &TripTable, filter: &TripFilter, execution: Execution) -> Vec<Self::Row>;
}
