//! Request and response models of the HTTP API

use crate::error::AnalysisError;
use crate::filter::TripFilter;
use crate::query::Section;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Year and month filter parameters of an analysis request.
///
/// Both parameters are optional. An absent year covers 2019 and 2020, an absent month covers
/// October to December.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FilterParams {
    /// "2019", "2020" or "both"
    #[validate(custom = "validate_year")]
    pub year: Option<String>,
    /// "10", "11", "12" or "all"
    #[validate(custom = "validate_month")]
    pub month: Option<String>,
}

impl FilterParams {
    /// Return a new FilterParams object.
    pub fn new(year: Option<&str>, month: Option<&str>) -> Self {
        Self {
            year: year.map(str::to_owned),
            month: month.map(str::to_owned),
        }
    }

    /// Parse the parameters into a [TripFilter].
    pub fn to_filter(&self) -> Result<TripFilter, AnalysisError> {
        Ok(TripFilter::new(
            parse_year(self.year.as_deref())?,
            parse_month(self.month.as_deref())?,
        ))
    }
}

/// Parse a year parameter. `None` means both years.
pub fn parse_year(year: Option<&str>) -> Result<Option<i32>, AnalysisError> {
    match year {
        None | Some("both") => Ok(None),
        Some("2019") => Ok(Some(2019)),
        Some("2020") => Ok(Some(2020)),
        Some(other) => Err(AnalysisError::InvalidYear(other.to_owned())),
    }
}

/// Parse a month parameter. `None` means all months.
pub fn parse_month(month: Option<&str>) -> Result<Option<u32>, AnalysisError> {
    match month {
        None | Some("all") => Ok(None),
        Some("10") => Ok(Some(10)),
        Some("11") => Ok(Some(11)),
        Some("12") => Ok(Some(12)),
        Some(other) => Err(AnalysisError::InvalidMonth(other.to_owned())),
    }
}

fn validate_year(year: &str) -> Result<(), ValidationError> {
    if parse_year(Some(year)).is_err() {
        let mut error = ValidationError::new("year must be one of 2019, 2020 or both");
        error.add_param("year".into(), &year);
        return Err(error);
    }
    Ok(())
}

fn validate_month(month: &str) -> Result<(), ValidationError> {
    if parse_month(Some(month)).is_err() {
        let mut error = ValidationError::new("month must be one of 10, 11, 12 or all");
        error.add_param("month".into(), &month);
        return Err(error);
    }
    Ok(())
}

/// Request to clear every cached section except the listed ones.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RetainRequest {
    /// Sections whose cached results are kept
    #[validate(custom = "validate_keep")]
    pub keep: Vec<Section>,
}

impl RetainRequest {
    /// The kept sections as a set.
    pub fn sections(&self) -> HashSet<Section> {
        self.keep.iter().copied().collect()
    }
}

fn validate_keep(keep: &[Section]) -> Result<(), ValidationError> {
    let unique: HashSet<&Section> = keep.iter().collect();
    if unique.len() != keep.len() {
        return Err(ValidationError::new("keep must not list a section twice"));
    }
    Ok(())
}

/// Number of cached results removed by a cache management request.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Removed {
    pub removed: usize,
}

/// Number of cached results, in total and per section.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CacheStatus {
    pub entries: usize,
    pub sections: BTreeMap<Section, usize>,
}

/// The query markers of each section.
pub fn catalog() -> BTreeMap<Section, Vec<&'static str>> {
    Section::ALL
        .into_iter()
        .map(|section| (section, section.queries().map(|kind| kind.as_str()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    #[test]
    fn test_filter_params_empty() {
        let params = FilterParams::default();
        assert_de_tokens(
            &params,
            &[
                Token::Struct {
                    name: "FilterParams",
                    len: 0,
                },
                Token::StructEnd,
            ],
        );
        params.validate().unwrap();
        assert_eq!(TripFilter::all(), params.to_filter().unwrap());
    }

    #[test]
    fn test_filter_params_all_fields() {
        let params = FilterParams::new(Some("2020"), Some("11"));
        assert_de_tokens(
            &params,
            &[
                Token::Struct {
                    name: "FilterParams",
                    len: 2,
                },
                Token::Str("year"),
                Token::Some,
                Token::Str("2020"),
                Token::Str("month"),
                Token::Some,
                Token::Str("11"),
                Token::StructEnd,
            ],
        );
        params.validate().unwrap();
        assert_eq!(
            TripFilter::new(Some(2020), Some(11)),
            params.to_filter().unwrap()
        );
    }

    #[test]
    fn test_filter_params_unknown_field() {
        assert_de_tokens_error::<FilterParams>(
            &[
                Token::Struct {
                    name: "FilterParams",
                    len: 1,
                },
                Token::Str("day"),
            ],
            "unknown field `day`, expected `year` or `month`",
        )
    }

    #[test]
    fn test_filter_params_keywords() {
        let params = FilterParams::new(Some("both"), Some("all"));
        params.validate().unwrap();
        assert_eq!(TripFilter::all(), params.to_filter().unwrap());
    }

    #[test]
    fn test_invalid_year() {
        let params = FilterParams::new(Some("2021"), None);
        let message = params.validate().unwrap_err().to_string();
        assert!(
            message.contains("year: Validation error: year must be one of 2019, 2020 or both"),
            "{message}"
        );
        match params.to_filter() {
            Err(AnalysisError::InvalidYear(year)) => assert_eq!("2021", year),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_invalid_month() {
        let params = FilterParams::new(None, Some("1"));
        let message = params.validate().unwrap_err().to_string();
        assert!(
            message.contains("month: Validation error: month must be one of 10, 11, 12 or all"),
            "{message}"
        );
        match params.to_filter() {
            Err(AnalysisError::InvalidMonth(month)) => assert_eq!("1", month),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!(parse_year(Some("Both")).is_err());
        assert!(parse_month(Some("ALL")).is_err());
        assert!(parse_month(Some("010")).is_err());
    }

    #[test]
    fn test_retain_request() {
        let request = RetainRequest {
            keep: vec![Section::Temporal, Section::Fare],
        };
        assert_de_tokens(
            &request,
            &[
                Token::Struct {
                    name: "RetainRequest",
                    len: 1,
                },
                Token::Str("keep"),
                Token::Seq { len: Some(2) },
                Token::Enum { name: "Section" },
                Token::Str("temporal"),
                Token::Unit,
                Token::Enum { name: "Section" },
                Token::Str("fare"),
                Token::Unit,
                Token::SeqEnd,
                Token::StructEnd,
            ],
        );
        request.validate().unwrap();
        assert_eq!(
            HashSet::from([Section::Temporal, Section::Fare]),
            request.sections()
        );
    }

    #[test]
    fn test_retain_request_missing_keep() {
        assert_de_tokens_error::<RetainRequest>(
            &[
                Token::Struct {
                    name: "RetainRequest",
                    len: 0,
                },
                Token::StructEnd,
            ],
            "missing field `keep`",
        )
    }

    #[test]
    fn test_retain_request_duplicate_section() {
        let request = RetainRequest {
            keep: vec![Section::Trip, Section::Trip],
        };
        let message = request.validate().unwrap_err().to_string();
        assert!(
            message.contains("keep: Validation error: keep must not list a section twice"),
            "{message}"
        );
    }

    #[test]
    fn test_catalog() {
        let catalog = catalog();
        assert_eq!(6, catalog.len());
        assert_eq!(
            vec!["raw_count", "clean_count", "monthly_counts", "quality_metrics"],
            catalog[&Section::Quality]
        );
        assert_eq!(
            vec!["volume_comparison", "behavior_changes"],
            catalog[&Section::Pandemic]
        );
        assert_eq!(18, catalog.values().map(Vec::len).sum::<usize>());
    }
}
