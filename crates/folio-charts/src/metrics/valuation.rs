//! Price-based valuation ratios.

use chrono::NaiveDate;
use folio_core::{
    BalanceSheet, FinancialData, FiscalPeriod, FolioError, Result, Statement, StockPrice,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MetricSeries, as_of};
use crate::extract::ChartDataPoint;
use crate::filter::synthesize_ttm;

/// Price-based valuation ratios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValuationKind {
    /// Price over TTM diluted EPS.
    Pe,
    /// TTM free cash flow per share over price, in percent.
    FcfYield,
    /// Price over TTM revenue per share.
    Ps,
    /// Enterprise value over TTM EBITDA.
    EvEbitda,
    /// Price over TTM gross profit per share.
    Pgp,
    /// Price over book value per share.
    Pb,
    /// Price over tangible book value per share.
    Ptb,
    /// Price over TTM operating income per share.
    Poi,
}

impl ValuationKind {
    /// All kinds in chart order.
    pub const ALL: [Self; 8] = [
        Self::Pe,
        Self::FcfYield,
        Self::Ps,
        Self::EvEbitda,
        Self::Pgp,
        Self::Pb,
        Self::Ptb,
        Self::Poi,
    ];

    /// Chart series name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pe => "P/E Ratio",
            Self::FcfYield => "FCF Yield",
            Self::Ps => "P/S Ratio",
            Self::EvEbitda => "EV/EBITDA",
            Self::Pgp => "P/GP Ratio",
            Self::Pb => "P/B Ratio",
            Self::Ptb => "P/Tangible B",
            Self::Poi => "P/Operating Income",
        }
    }

    /// Short identifier.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Pe => "pe",
            Self::FcfYield => "fcfYield",
            Self::Ps => "ps",
            Self::EvEbitda => "evEbitda",
            Self::Pgp => "pgp",
            Self::Pb => "pb",
            Self::Ptb => "ptb",
            Self::Poi => "poi",
        }
    }

    /// Exclusive upper bound on a valid ratio, if any.
    #[must_use]
    pub const fn ceiling(&self) -> Option<f64> {
        match self {
            Self::Pe => Some(1000.0),
            Self::FcfYield | Self::Ps | Self::EvEbitda | Self::Pgp | Self::Poi => Some(100.0),
            Self::Pb | Self::Ptb => None,
        }
    }

    /// Looks a kind up by its series name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Looks a kind up by its short identifier.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    const fn needs_shares(&self) -> bool {
        !matches!(self, Self::Pe)
    }

    fn accepts(&self, ratio: f64) -> bool {
        ratio.is_finite() && ratio > 0.0 && self.ceiling().is_none_or(|max| ratio < max)
    }
}

impl fmt::Display for ValuationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Share count of the most recent income statement, diluted when reported.
#[must_use]
pub fn shares_outstanding(data: &FinancialData) -> Option<f64> {
    let latest = data.latest_income_statement()?;
    latest
        .finite("weighted_average_shs_out_dil")
        .or_else(|| latest.finite("weighted_average_shs_out"))
        .filter(|v| *v > 0.0)
}

/// Existing TTM statements, or TTM statements synthesized from quarters.
fn ttm_source<S: Statement>(statements: &[S]) -> Vec<S> {
    let existing: Vec<S> = statements
        .iter()
        .filter(|s| s.period() == FiscalPeriod::TTM)
        .cloned()
        .collect();
    if existing.is_empty() {
        synthesize_ttm(statements)
    } else {
        existing
    }
}

/// A dated fundamental value, `None` when the line item is missing.
type Fundamental = (NaiveDate, Option<f64>);

fn newest_first(mut values: Vec<Fundamental>) -> Vec<Fundamental> {
    values.sort_by(|a, b| b.0.cmp(&a.0));
    values
}

fn ttm_field<S: Statement>(statements: &[S], field: &str) -> Vec<Fundamental> {
    newest_first(
        ttm_source(statements)
            .iter()
            .map(|s| (s.date(), s.finite(field)))
            .collect(),
    )
}

fn book_value(sheet: &BalanceSheet, tangible: bool) -> Option<f64> {
    let mut value = sheet.finite("total_assets")? - sheet.finite("total_liabilities")?;
    if tangible {
        value -= sheet.finite("intangible_assets").unwrap_or(0.0);
        value -= sheet.finite("goodwill").unwrap_or(0.0);
    }
    Some(value)
}

fn no_data(kind: ValuationKind, what: &str) -> FolioError {
    FolioError::NoDataAvailable(format!("{}: {what}", kind.name()))
}

/// Calculates a valuation ratio for every price point.
///
/// Each price is matched to the most recent fundamental dated on or before
/// it. Per-share figures divide by [`shares_outstanding`], one scalar for the
/// whole series. Points failing the kind's bounds are dropped.
///
/// # Errors
///
/// `NoDataAvailable` when prices, the required statements or the share count
/// are missing; `NoValidDataAvailable` when no point survives.
pub fn calculate_valuation(
    kind: ValuationKind,
    prices: &[StockPrice],
    data: &FinancialData,
) -> Result<MetricSeries> {
    let prices: Vec<(NaiveDate, f64)> = prices
        .iter()
        .filter_map(|p| p.adjusted_close().map(|close| (p.date, close)))
        .collect();
    if prices.is_empty() {
        return Err(no_data(kind, "no price data"));
    }

    let shares = if kind.needs_shares() {
        Some(shares_outstanding(data).ok_or_else(|| no_data(kind, "no shares outstanding"))?)
    } else {
        None
    };

    let mut sheets_desc: Vec<&BalanceSheet> = data.balance_sheets.iter().collect();
    sheets_desc.sort_by(|a, b| b.date().cmp(&a.date()));

    let fundamentals = match kind {
        ValuationKind::Pe => ttm_field(&data.income_statements, "eps_diluted"),
        ValuationKind::Ps => ttm_field(&data.income_statements, "revenue"),
        ValuationKind::Pgp => ttm_field(&data.income_statements, "gross_profit"),
        ValuationKind::Poi => ttm_field(&data.income_statements, "operating_income"),
        ValuationKind::EvEbitda => ttm_field(&data.income_statements, "ebitda"),
        ValuationKind::FcfYield => ttm_field(&data.cash_flow_statements, "free_cash_flow"),
        ValuationKind::Pb | ValuationKind::Ptb => sheets_desc
            .iter()
            .map(|s| (s.date(), book_value(s, kind == ValuationKind::Ptb)))
            .collect(),
    };
    if fundamentals.is_empty() {
        return Err(no_data(kind, "could not calculate TTM data"));
    }
    if kind == ValuationKind::EvEbitda && sheets_desc.is_empty() {
        return Err(no_data(kind, "no balance sheets"));
    }

    let points: Vec<ChartDataPoint> = prices
        .iter()
        .filter_map(|&(date, price)| {
            let (_, value) = as_of(&fundamentals, date, |f| f.0)?;
            let value = (*value)?;
            let per_share = |total: f64| Some(total / shares?);
            let ratio = match kind {
                ValuationKind::Pe => (value > 0.0).then(|| price / value)?,
                ValuationKind::FcfYield if value != 0.0 => per_share(value)? / price * 100.0,
                ValuationKind::Ps if value != 0.0 => price / per_share(value)?,
                ValuationKind::Pgp | ValuationKind::Poi | ValuationKind::Pb | ValuationKind::Ptb
                    if value > 0.0 =>
                {
                    price / per_share(value)?
                }
                ValuationKind::EvEbitda => {
                    if value <= 0.0 {
                        return None;
                    }
                    let sheet = as_of(&sheets_desc, date, |s| s.date())?;
                    let debt = sheet.finite("total_debt")?;
                    let cash = sheet.finite("cash_and_cash_equivalents")?;
                    (price * shares? + debt - cash) / value
                }
                _ => return None,
            };
            kind.accepts(ratio).then(|| ChartDataPoint::new(date, ratio))
        })
        .collect();

    if points.is_empty() {
        return Err(FolioError::NoValidDataAvailable(format!(
            "No valid {} data available",
            kind.name()
        )));
    }
    Ok(MetricSeries::from_points(points))
}
