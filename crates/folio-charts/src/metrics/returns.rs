//! Return-on-capital calculators.

use folio_core::{BalanceSheet, FinancialData, FolioError, IncomeStatement, Result, Statement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use super::{ChartMetric, MetricSeries, annualization_factor, join_exact};
use crate::extract::ChartDataPoint;

/// Return-on-capital ratios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnKind {
    /// Return on invested capital.
    Roic,
    /// Return on capital employed.
    Roce,
    /// Return on equity.
    Roe,
    /// Return on assets.
    Roa,
}

impl ReturnKind {
    /// All kinds in chart order.
    pub const ALL: [Self; 4] = [Self::Roic, Self::Roce, Self::Roe, Self::Roa];

    /// Chart series name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Roic => "ROIC",
            Self::Roce => "ROCE",
            Self::Roe => "ROE",
            Self::Roa => "ROA",
        }
    }

    /// Looks a kind up by its series name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Ratio for one income statement and its balance sheet, in percent.
    fn ratio(&self, income: &IncomeStatement, balance: &BalanceSheet) -> Option<f64> {
        let factor = annualization_factor(income.period());
        let capital_employed = || {
            let capital = balance.finite("total_assets")? - balance.finite("total_current_liabilities")?;
            (capital != 0.0).then_some(capital)
        };

        let (numerator, denominator) = match self {
            Self::Roic => {
                let operating = income.finite("operating_income").filter(|v| *v != 0.0)?;
                let tax = income.finite("income_tax_expense")?;
                // NOPAT = OI * (1 - tax / OI)
                ((operating - tax) * factor, capital_employed()?)
            }
            Self::Roce => (income.finite("operating_income")? * factor, capital_employed()?),
            Self::Roe => {
                let equity = balance
                    .finite("total_stockholders_equity")
                    .or_else(|| balance.finite("total_equity"))
                    .filter(|v| *v != 0.0)?;
                (income.finite("net_income")? * factor, equity)
            }
            Self::Roa => {
                let assets = balance.finite("total_assets").filter(|v| *v != 0.0)?;
                (income.finite("net_income")? * factor, assets)
            }
        };

        let value = numerator / denominator * 100.0;
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calculates one return ratio over the income statements in `data`.
///
/// Each income statement is matched to the balance sheet with the same date;
/// statements without a match are dropped. Quarterly figures are annualized.
pub fn calculate_return(kind: ReturnKind, data: &FinancialData) -> Result<MetricSeries> {
    if data.income_statements.is_empty() || data.balance_sheets.is_empty() {
        return Err(FolioError::NoDataAvailable(format!(
            "{}: income statements and balance sheets are required",
            kind.name()
        )));
    }

    let points = data
        .income_statements
        .iter()
        .filter_map(|income| {
            let balance = join_exact(income.date(), income.period(), &data.balance_sheets)?;
            kind.ratio(income, balance)
                .map(|value| ChartDataPoint::new(income.date(), value))
        })
        .collect();

    Ok(MetricSeries::from_points(points))
}

/// Computes the chart series of every enabled return ratio, in chart order.
#[must_use]
pub fn return_metrics(data: &FinancialData, enabled: &BTreeSet<ReturnKind>) -> Vec<ChartMetric> {
    enabled
        .iter()
        .filter_map(|kind| match calculate_return(*kind, data) {
            Ok(series) if !series.is_empty() => Some(ChartMetric::from_series(kind.name(), &series)),
            Ok(_) => None,
            Err(e) => {
                debug!(metric = %kind, error = %e, "Return metric skipped");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use folio_core::{FiscalPeriod, Symbol};
    use rstest::rstest;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bundle(period: FiscalPeriod) -> FinancialData {
        let d = date("2023-12-31");
        FinancialData {
            income_statements: vec![
                IncomeStatement::new(Symbol::new("T"), d, period)
                    .with("operating_income", 30.0)
                    .with("income_tax_expense", 5.0)
                    .with("net_income", 20.0),
                // No balance sheet on this date.
                IncomeStatement::new(Symbol::new("T"), date("2022-12-31"), period)
                    .with("operating_income", 25.0)
                    .with("net_income", 15.0),
            ],
            balance_sheets: vec![
                BalanceSheet::new(Symbol::new("T"), d, period)
                    .with("total_assets", 300.0)
                    .with("total_current_liabilities", 50.0)
                    .with("total_stockholders_equity", 100.0),
            ],
            ..Default::default()
        }
    }

    #[rstest]
    #[case(ReturnKind::Roic, 10.0)]
    #[case(ReturnKind::Roce, 12.0)]
    #[case(ReturnKind::Roe, 20.0)]
    #[case(ReturnKind::Roa, 20.0 / 3.0)]
    fn test_annual_returns(#[case] kind: ReturnKind, #[case] expected: f64) {
        let series = calculate_return(kind, &bundle(FiscalPeriod::FY)).unwrap();
        assert_eq!(series.dates, vec![date("2023-12-31")]);
        assert_relative_eq!(series.values[0], expected, epsilon = 1e-9);
    }

    #[test]
    fn test_quarterly_returns_are_annualized() {
        let series = calculate_return(ReturnKind::Roe, &bundle(FiscalPeriod::Q4)).unwrap();
        assert_relative_eq!(series.values[0], 80.0);
    }

    #[test]
    fn test_roe_falls_back_to_total_equity() {
        let mut data = bundle(FiscalPeriod::FY);
        data.balance_sheets[0].total_stockholders_equity = None;
        data.balance_sheets[0].total_equity = Some(200.0);
        let series = calculate_return(ReturnKind::Roe, &data).unwrap();
        assert_relative_eq!(series.values[0], 10.0);
    }

    #[test]
    fn test_zero_capital_is_dropped() {
        let mut data = bundle(FiscalPeriod::FY);
        data.balance_sheets[0].total_current_liabilities = Some(300.0);
        assert!(calculate_return(ReturnKind::Roce, &data).unwrap().is_empty());
    }

    #[test]
    fn test_missing_balance_sheets_is_no_data() {
        let mut data = bundle(FiscalPeriod::FY);
        data.balance_sheets.clear();
        let err = calculate_return(ReturnKind::Roa, &data).unwrap_err();
        assert!(err.is_recoverable_no_data());
        assert!(return_metrics(&data, &ReturnKind::ALL.into_iter().collect()).is_empty());
    }
}
