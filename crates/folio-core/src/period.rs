//! Reporting period definitions.
//!
//! This module defines [`FiscalPeriod`] for the period tag carried by each
//! statement, [`PeriodType`] for upstream fetch requests, and [`PeriodView`]
//! for the view a user selects when browsing statements.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FolioError;

/// Period tag carried by a statement or segment report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FiscalPeriod {
    /// Full fiscal year.
    #[default]
    FY,
    /// First fiscal quarter.
    Q1,
    /// Second fiscal quarter.
    Q2,
    /// Third fiscal quarter.
    Q3,
    /// Fourth fiscal quarter.
    Q4,
    /// Synthetic trailing-twelve-month period.
    TTM,
}

impl FiscalPeriod {
    /// Returns true for the four quarter tags.
    #[must_use]
    pub const fn is_quarter(&self) -> bool {
        matches!(self, Self::Q1 | Self::Q2 | Self::Q3 | Self::Q4)
    }

    /// Returns true when the period already spans a full year (FY or TTM).
    #[must_use]
    pub const fn is_full_year(&self) -> bool {
        matches!(self, Self::FY | Self::TTM)
    }

    /// Returns the tag as stored upstream.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FY => "FY",
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
            Self::TTM => "TTM",
        }
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FiscalPeriod {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FY" => Ok(Self::FY),
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            "TTM" => Ok(Self::TTM),
            other => Err(FolioError::Parse(format!("Invalid fiscal period: {other}"))),
        }
    }
}

/// Period granularity requested from an upstream provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodType {
    /// Annual reporting period.
    #[default]
    Annual,
    /// Quarterly reporting period.
    Quarterly,
}

impl PeriodType {
    /// Both period types, annual first.
    pub const ALL: [Self; 2] = [Self::Annual, Self::Quarterly];
}

/// The statement view selected by the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodView {
    /// Fiscal-year statements only.
    #[default]
    Annual,
    /// Quarterly statements only.
    Quarterly,
    /// Trailing-twelve-month sums of quarterly statements.
    Ttm,
}

impl PeriodView {
    /// Returns the persisted name of the view.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
            Self::Ttm => "ttm",
        }
    }
}

impl fmt::Display for PeriodView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodView {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" => Ok(Self::Annual),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "ttm" => Ok(Self::Ttm),
            other => Err(FolioError::InvalidParameter(format!(
                "Unknown period view: {other}. Supported: annual, quarterly, ttm"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("FY", FiscalPeriod::FY)]
    #[case("q3", FiscalPeriod::Q3)]
    #[case(" TTM ", FiscalPeriod::TTM)]
    fn test_fiscal_period_parse(#[case] input: &str, #[case] expected: FiscalPeriod) {
        assert_eq!(input.parse::<FiscalPeriod>().unwrap(), expected);
    }

    #[test]
    fn test_fiscal_period_predicates() {
        assert!(FiscalPeriod::Q2.is_quarter());
        assert!(!FiscalPeriod::TTM.is_quarter());
        assert!(FiscalPeriod::TTM.is_full_year());
        assert!(!FiscalPeriod::Q4.is_full_year());
        assert!("H1".parse::<FiscalPeriod>().is_err());
    }

    #[test]
    fn test_period_view_round_trip() {
        for view in [PeriodView::Annual, PeriodView::Quarterly, PeriodView::Ttm] {
            assert_eq!(view.as_str().parse::<PeriodView>().unwrap(), view);
        }
        assert!("monthly".parse::<PeriodView>().is_err());
    }
}
