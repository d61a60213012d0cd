//! Query catalog.
//!
//! Every query belongs to exactly one [Section]. The mapping is an exhaustive match, so a new
//! query kind cannot be added without assigning it a section, and selective cache clearing
//! always knows which entries belong to which section.

use crate::filter::TripFilter;

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, IntoStaticStr};

/// Logical group of queries, matching one façade method.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Section {
    Quality,
    Temporal,
    Trip,
    Fare,
    Payment,
    Pandemic,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Self::Quality,
        Self::Temporal,
        Self::Trip,
        Self::Fare,
        Self::Payment,
        Self::Pandemic,
    ];

    /// Returns the query kinds belonging to this section.
    pub fn queries(self) -> impl Iterator<Item = QueryKind> {
        QueryKind::ALL
            .into_iter()
            .filter(move |kind| kind.section() == self)
    }
}

/// One entry of the query catalog.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    Hash,
    IntoStaticStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryKind {
    RawCount,
    CleanCount,
    MonthlyCounts,
    QualityMetrics,
    HourlyPattern,
    WeeklyPattern,
    HourDayHeatmap,
    MonthlyTrend,
    DistanceHistogram,
    PassengerDistribution,
    FareComposition,
    FareDistribution,
    DistanceFareCorrelation,
    PaymentDistribution,
    TipsByPayment,
    PaymentTrend,
    VolumeComparison,
    BehaviorChanges,
}

impl QueryKind {
    pub const ALL: [QueryKind; 18] = [
        Self::RawCount,
        Self::CleanCount,
        Self::MonthlyCounts,
        Self::QualityMetrics,
        Self::HourlyPattern,
        Self::WeeklyPattern,
        Self::HourDayHeatmap,
        Self::MonthlyTrend,
        Self::DistanceHistogram,
        Self::PassengerDistribution,
        Self::FareComposition,
        Self::FareDistribution,
        Self::DistanceFareCorrelation,
        Self::PaymentDistribution,
        Self::TipsByPayment,
        Self::PaymentTrend,
        Self::VolumeComparison,
        Self::BehaviorChanges,
    ];

    /// Returns the section a query belongs to.
    pub fn section(self) -> Section {
        match self {
            Self::RawCount | Self::CleanCount | Self::MonthlyCounts | Self::QualityMetrics => {
                Section::Quality
            }
            Self::HourlyPattern
            | Self::WeeklyPattern
            | Self::HourDayHeatmap
            | Self::MonthlyTrend => Section::Temporal,
            Self::DistanceHistogram | Self::PassengerDistribution => Section::Trip,
            Self::FareComposition | Self::FareDistribution | Self::DistanceFareCorrelation => {
                Section::Fare
            }
            Self::PaymentDistribution | Self::TipsByPayment | Self::PaymentTrend => {
                Section::Payment
            }
            Self::VolumeComparison | Self::BehaviorChanges => Section::Pandemic,
        }
    }

    /// Stable marker string, e.g. `hourly_pattern`.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Cache key: a query together with its year/month filter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct QuerySignature {
    pub kind: QueryKind,
    pub filter: TripFilter,
}

impl QuerySignature {
    pub fn new(kind: QueryKind, filter: TripFilter) -> Self {
        Self { kind, filter }
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?{}", self.kind, self.filter)
    }
}
