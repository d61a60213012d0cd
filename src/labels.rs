//! Shared label tables.
//!
//! Every aggregation that labels a day of week, payment type or fare range uses these tables.

use serde::Serialize;

/// Day names indexed by day of week, starting Sunday = 0.
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Payment type codes and their labels.
pub const PAYMENT_NAMES: [(i64, &str); 6] = [
    (1, "Card"),
    (2, "Cash"),
    (3, "No Charge"),
    (4, "Dispute"),
    (5, "Unknown"),
    (6, "Voided Trip"),
];

/// Label for payment codes outside [PAYMENT_NAMES].
pub const OTHER_PAYMENT: &str = "Other";

/// Returns the name of a day of week (0 = Sunday).
pub fn day_name(day_of_week: u32) -> &'static str {
    DAY_NAMES
        .get(day_of_week as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Returns the label of a payment type code.
pub fn payment_name(payment_type: i64) -> &'static str {
    PAYMENT_NAMES
        .iter()
        .find(|(code, _)| *code == payment_type)
        .map(|(_, name)| *name)
        .unwrap_or(OTHER_PAYMENT)
}

/// Returns the coarse label used when comparing tips: card, cash or anything else.
pub fn tip_payment_name(payment_type: i64) -> &'static str {
    match payment_type {
        1 | 2 => payment_name(payment_type),
        _ => OTHER_PAYMENT,
    }
}

/// Total amount ranges used by the fare distribution.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum FareBucket {
    /// Below 10
    UpTo10,
    /// From 10 up to 20
    UpTo20,
    /// From 20 up to 30
    UpTo30,
    /// 30 and above
    Over30,
}

impl FareBucket {
    /// Returns the bucket containing a total amount. Lower bounds are inclusive.
    pub fn of(total_amount: f64) -> Self {
        if total_amount < 10.0 {
            Self::UpTo10
        } else if total_amount < 20.0 {
            Self::UpTo20
        } else if total_amount < 30.0 {
            Self::UpTo30
        } else {
            Self::Over30
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UpTo10 => "0-10",
            Self::UpTo20 => "10-20",
            Self::UpTo30 => "20-30",
            Self::Over30 => "30+",
        }
    }
}

impl Serialize for FareBucket {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}
