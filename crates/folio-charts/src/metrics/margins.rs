//! Profit margin calculators.

use folio_core::{FinancialData, FolioError, Result, Statement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

use super::{ChartMetric, MetricSeries, join_exact};
use crate::extract::ChartDataPoint;

/// A line item expressed as a percentage of revenue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarginKind {
    /// Net income over revenue.
    NetIncome,
    /// Gross profit over revenue.
    GrossProfit,
    /// Operating income over revenue.
    Operating,
    /// EBITDA over revenue.
    Ebitda,
    /// Free cash flow over revenue.
    Fcf,
    /// Operating cash flow over revenue.
    OperatingCashFlow,
}

impl MarginKind {
    /// All kinds in chart order.
    pub const ALL: [Self; 6] = [
        Self::NetIncome,
        Self::GrossProfit,
        Self::Operating,
        Self::Ebitda,
        Self::Fcf,
        Self::OperatingCashFlow,
    ];

    /// Chart series name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NetIncome => "Net Income Margin",
            Self::GrossProfit => "Gross Profit Margin",
            Self::Operating => "Operating Margin",
            Self::Ebitda => "EBITDA Margin",
            Self::Fcf => "FCF Margin",
            Self::OperatingCashFlow => "Operating Cash Flow Margin",
        }
    }

    /// Numerator field key.
    #[must_use]
    pub const fn numerator(&self) -> &'static str {
        match self {
            Self::NetIncome => "net_income",
            Self::GrossProfit => "gross_profit",
            Self::Operating => "operating_income",
            Self::Ebitda => "ebitda",
            Self::Fcf => "free_cash_flow",
            Self::OperatingCashFlow => "operating_cash_flow",
        }
    }

    /// Returns true when the numerator comes from the cash flow statement.
    #[must_use]
    pub const fn is_cash_flow(&self) -> bool {
        matches!(self, Self::Fcf | Self::OperatingCashFlow)
    }

    /// Looks a kind up by its series name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for MarginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn margin_point(date: chrono::NaiveDate, numerator: Option<f64>, revenue: Option<f64>) -> Option<ChartDataPoint> {
    let (numerator, revenue) = (numerator?, revenue?);
    if revenue == 0.0 {
        return None;
    }
    let value = numerator / revenue * 100.0;
    value.is_finite().then(|| ChartDataPoint::new(date, value))
}

/// Calculates one margin series over the statements in `data`.
///
/// Statements with a missing, non-finite or zero revenue are skipped. Cash
/// flow margins take revenue from the income statement with the same date.
pub fn calculate_margin(kind: MarginKind, data: &FinancialData) -> Result<MetricSeries> {
    if data.income_statements.is_empty() {
        return Err(FolioError::NoDataAvailable(format!(
            "{}: no income statements",
            kind.name()
        )));
    }

    let points: Vec<ChartDataPoint> = if kind.is_cash_flow() {
        if data.cash_flow_statements.is_empty() {
            return Err(FolioError::NoDataAvailable(format!(
                "{}: no cash flow statements",
                kind.name()
            )));
        }
        data.cash_flow_statements
            .iter()
            .filter_map(|cf| {
                let income = join_exact(cf.date(), cf.period(), &data.income_statements)?;
                margin_point(cf.date(), cf.finite(kind.numerator()), income.finite("revenue"))
            })
            .collect()
    } else {
        data.income_statements
            .iter()
            .filter_map(|s| margin_point(s.date(), s.finite(kind.numerator()), s.finite("revenue")))
            .collect()
    };

    Ok(MetricSeries::from_points(points))
}

/// Computes the chart series of every enabled margin, in chart order.
///
/// Margins that fail or yield no points are left out.
#[must_use]
pub fn margin_metrics(data: &FinancialData, enabled: &BTreeSet<MarginKind>) -> Vec<ChartMetric> {
    enabled
        .iter()
        .filter_map(|kind| match calculate_margin(*kind, data) {
            Ok(series) if !series.is_empty() => Some(ChartMetric::from_series(kind.name(), &series)),
            Ok(_) => None,
            Err(e) => {
                debug!(margin = %kind, error = %e, "Margin skipped");
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
    use folio_core::{CashFlowStatement, FiscalPeriod, IncomeStatement, Symbol};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn income(d: &str, revenue: f64, net_income: f64) -> IncomeStatement {
        IncomeStatement::new(Symbol::new("T"), date(d), FiscalPeriod::FY)
            .with("revenue", revenue)
            .with("net_income", net_income)
    }

    #[test]
    fn test_zero_revenue_is_excluded() {
        let data = FinancialData {
            income_statements: vec![
                income("2021-12-31", 0.0, 5.0),
                income("2022-12-31", 200.0, 20.0),
                income("2023-12-31", 0.0, -3.0),
            ],
            ..Default::default()
        };
        let series = calculate_margin(MarginKind::NetIncome, &data).unwrap();
        assert_eq!(series.dates, vec![date("2022-12-31")]);
        assert_relative_eq!(series.values[0], 10.0);
        assert!(series.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_income_is_no_data() {
        let err = calculate_margin(MarginKind::GrossProfit, &FinancialData::default()).unwrap_err();
        assert!(matches!(err, FolioError::NoDataAvailable(_)));
    }

    #[test]
    fn test_cash_flow_margin_joins_by_date() {
        let data = FinancialData {
            income_statements: vec![income("2022-12-31", 200.0, 20.0), income("2023-12-31", 400.0, 40.0)],
            cash_flow_statements: vec![
                CashFlowStatement::new(Symbol::new("T"), date("2023-12-31"), FiscalPeriod::FY)
                    .with("free_cash_flow", 100.0),
                CashFlowStatement::new(Symbol::new("T"), date("2021-12-31"), FiscalPeriod::FY)
                    .with("free_cash_flow", 50.0),
            ],
            ..Default::default()
        };
        let series = calculate_margin(MarginKind::Fcf, &data).unwrap();
        assert_eq!(series.dates, vec![date("2023-12-31")]);
        assert_relative_eq!(series.values[0], 25.0);
    }

    #[test]
    fn test_margin_metrics_keeps_chart_order_and_skips_empty() {
        let data = FinancialData {
            income_statements: vec![income("2023-12-31", 100.0, 10.0)],
            ..Default::default()
        };
        let enabled: BTreeSet<MarginKind> =
            [MarginKind::Fcf, MarginKind::Operating, MarginKind::NetIncome].into_iter().collect();
        let metrics = margin_metrics(&data, &enabled);
        let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Net Income Margin"]);
        assert!(!metrics[0].hidden);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(MarginKind::from_name("EBITDA Margin"), Some(MarginKind::Ebitda));
        assert_eq!(MarginKind::from_name("ROIC"), None);
    }
}
