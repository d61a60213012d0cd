//! Aggregation library.
//!
//! Each catalog query is implemented as a unit struct that implements the
//! [Aggregation](crate::aggregation::Aggregation) trait. Averages, sums of money, percentages
//! and standard deviations are rounded to 2 decimal places as they are computed. Counts are
//! exact.

pub mod fare;
pub mod pandemic;
pub mod payment;
pub mod quality;
pub mod temporal;
pub mod trip_profile;

pub use fare::{DistanceFareCorrelation, FareComposition, FareDistribution};
pub use pandemic::{year_over_year, BehaviorChanges, VolumeComparison};
pub use payment::{PaymentDistribution, PaymentTrend, TipsByPayment};
pub use quality::{CleanCount, MonthlyCounts, QualityMetrics, RawCount};
pub use temporal::{HourDayHeatmap, HourlyPattern, MonthlyTrend, WeeklyPattern};
pub use trip_profile::{DistanceHistogram, PassengerDistribution};
