//! Financial statement types.
//!
//! Each statement variant is a typed record of optional numeric line items
//! sharing a common [`StatementMeta`]. Line items can also be read by their
//! snake_case key through the [`Statement`] trait, which returns `None` when
//! the variant does not carry the requested field.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::period::FiscalPeriod;
use crate::types::Symbol;

/// Metadata shared by every statement variant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementMeta {
    /// Stock symbol.
    pub symbol: Symbol,
    /// End date of the reporting period.
    pub date: NaiveDate,
    /// Period tag.
    pub period: FiscalPeriod,
    /// Currency the figures were reported in before conversion.
    #[serde(default = "default_currency")]
    pub reported_currency: String,
    /// SEC CIK number.
    #[serde(default)]
    pub cik: Option<String>,
    /// Filing date as reported upstream.
    #[serde(default)]
    pub filling_date: Option<String>,
    /// Acceptance timestamp as reported upstream.
    #[serde(default)]
    pub accepted_date: Option<String>,
    /// Calendar year label.
    #[serde(default)]
    pub calendar_year: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl StatementMeta {
    /// Creates metadata for a USD statement.
    #[must_use]
    pub fn new(symbol: Symbol, date: NaiveDate, period: FiscalPeriod) -> Self {
        Self {
            symbol,
            date,
            period,
            reported_currency: default_currency(),
            ..Default::default()
        }
    }
}

/// The three statement variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Income statement.
    Income,
    /// Balance sheet.
    Balance,
    /// Cash flow statement.
    CashFlow,
}

impl StatementKind {
    /// All variants in lookup priority order.
    pub const ALL: [Self; 3] = [Self::Income, Self::Balance, Self::CashFlow];

    /// Returns the line-item keys carried by this variant.
    #[must_use]
    pub const fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Income => IncomeStatement::FIELDS,
            Self::Balance => BalanceSheet::FIELDS,
            Self::CashFlow => CashFlowStatement::FIELDS,
        }
    }

    /// Returns true if this variant carries the field.
    #[must_use]
    pub fn has_field(&self, key: &str) -> bool {
        self.fields().contains(&key)
    }

    /// Returns every variant that carries the field, in priority order.
    #[must_use]
    pub fn carrying(key: &str) -> Vec<Self> {
        Self::ALL.into_iter().filter(|k| k.has_field(key)).collect()
    }

    /// Returns true when line items are flows over the period rather than
    /// point-in-time balances.
    #[must_use]
    pub const fn is_flow(&self) -> bool {
        !matches!(self, Self::Balance)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Income => "income statement",
            Self::Balance => "balance sheet",
            Self::CashFlow => "cash flow statement",
        };
        f.write_str(name)
    }
}

/// Capability-checked access to a statement's line items.
pub trait Statement: Clone + fmt::Debug + Send + Sync {
    /// The variant implemented by this type.
    const KIND: StatementKind;

    /// Line-item keys carried by this variant.
    const FIELDS: &'static [&'static str];

    /// Shared metadata.
    fn meta(&self) -> &StatementMeta;

    /// Mutable shared metadata.
    fn meta_mut(&mut self) -> &mut StatementMeta;

    /// Reads a line item; `None` if missing or not carried by this variant.
    fn field(&self, key: &str) -> Option<f64>;

    /// Writes a line item. Returns false if the variant has no such field.
    fn set_field(&mut self, key: &str, value: Option<f64>) -> bool;

    /// End date of the reporting period.
    fn date(&self) -> NaiveDate {
        self.meta().date
    }

    /// Period tag.
    fn period(&self) -> FiscalPeriod {
        self.meta().period
    }

    /// Reads a line item only if it is a finite number.
    fn finite(&self, key: &str) -> Option<f64> {
        self.field(key).filter(|v| v.is_finite())
    }
}

macro_rules! statement {
    (
        $(#[$outer:meta])*
        $name:ident : $kind:ident {
            $( $field:ident ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Shared statement metadata.
            #[serde(flatten)]
            pub meta: StatementMeta,
            $(
                #[doc = concat!("`", stringify!($field), "` line item.")]
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<f64>,
            )*
        }

        impl $name {
            /// Creates an empty statement for the given key.
            #[must_use]
            pub fn new(symbol: Symbol, date: NaiveDate, period: FiscalPeriod) -> Self {
                Self {
                    meta: StatementMeta::new(symbol, date, period),
                    ..Default::default()
                }
            }

            /// Sets a line item by key, builder style. Unknown keys are ignored.
            #[must_use]
            pub fn with(mut self, key: &str, value: f64) -> Self {
                self.set_field(key, Some(value));
                self
            }
        }

        impl Statement for $name {
            const KIND: StatementKind = StatementKind::$kind;
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn meta(&self) -> &StatementMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut StatementMeta {
                &mut self.meta
            }

            fn field(&self, key: &str) -> Option<f64> {
                match key {
                    $(stringify!($field) => self.$field,)*
                    _ => None,
                }
            }

            fn set_field(&mut self, key: &str, value: Option<f64>) -> bool {
                match key {
                    $(stringify!($field) => {
                        self.$field = value;
                        true
                    })*
                    _ => false,
                }
            }
        }
    };
}

statement! {
    /// Income statement for one `(symbol, date, period)`.
    IncomeStatement: Income {
        revenue,
        cost_of_revenue,
        gross_profit,
        gross_profit_ratio,
        research_and_development_expenses,
        general_and_administrative_expenses,
        selling_and_marketing_expenses,
        selling_general_and_administrative_expenses,
        other_expenses,
        operating_expenses,
        cost_and_expenses,
        interest_income,
        interest_expense,
        depreciation_and_amortization,
        ebitda,
        ebitda_ratio,
        operating_income,
        operating_income_ratio,
        total_other_income_expenses_net,
        income_before_tax,
        income_before_tax_ratio,
        income_tax_expense,
        net_income,
        net_income_ratio,
        eps,
        eps_diluted,
        weighted_average_shs_out,
        weighted_average_shs_out_dil,
    }
}

statement! {
    /// Balance sheet for one `(symbol, date, period)`.
    BalanceSheet: Balance {
        cash_and_cash_equivalents,
        short_term_investments,
        cash_and_short_term_investments,
        net_receivables,
        inventory,
        other_current_assets,
        total_current_assets,
        property_plant_equipment_net,
        goodwill,
        intangible_assets,
        goodwill_and_intangible_assets,
        long_term_investments,
        tax_assets,
        other_non_current_assets,
        total_non_current_assets,
        other_assets,
        total_assets,
        account_payables,
        short_term_debt,
        tax_payables,
        deferred_revenue,
        other_current_liabilities,
        total_current_liabilities,
        long_term_debt,
        deferred_revenue_non_current,
        deferred_tax_liabilities_non_current,
        other_non_current_liabilities,
        total_non_current_liabilities,
        other_liabilities,
        capital_lease_obligations,
        total_liabilities,
        preferred_stock,
        common_stock,
        retained_earnings,
        accumulated_other_comprehensive_income_loss,
        other_total_stockholders_equity,
        total_stockholders_equity,
        total_equity,
        total_liabilities_and_stockholders_equity,
        minority_interest,
        total_liabilities_and_total_equity,
        total_investments,
        total_debt,
        net_debt,
    }
}

statement! {
    /// Cash flow statement for one `(symbol, date, period)`.
    CashFlowStatement: CashFlow {
        net_income,
        depreciation_and_amortization,
        deferred_income_tax,
        stock_based_compensation,
        change_in_working_capital,
        accounts_receivables,
        inventory,
        accounts_payables,
        other_working_capital,
        other_non_cash_items,
        net_cash_provided_by_operating_activities,
        investments_in_property_plant_and_equipment,
        acquisitions_net,
        purchases_of_investments,
        sales_maturities_of_investments,
        other_investing_activities,
        net_cash_used_for_investing_activities,
        debt_repayment,
        common_stock_issued,
        common_stock_repurchased,
        dividends_paid,
        other_financing_activities,
        net_cash_used_provided_by_financing_activities,
        effect_of_forex_changes_on_cash,
        net_change_in_cash,
        cash_at_end_of_period,
        cash_at_beginning_of_period,
        operating_cash_flow,
        capital_expenditure,
        free_cash_flow,
    }
}

/// Tagged union over the three statement variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyStatement {
    /// An income statement.
    Income(IncomeStatement),
    /// A balance sheet.
    Balance(BalanceSheet),
    /// A cash flow statement.
    CashFlow(CashFlowStatement),
}

impl AnyStatement {
    /// Returns the variant tag.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        match self {
            Self::Income(_) => StatementKind::Income,
            Self::Balance(_) => StatementKind::Balance,
            Self::CashFlow(_) => StatementKind::CashFlow,
        }
    }

    /// Shared metadata.
    #[must_use]
    pub fn meta(&self) -> &StatementMeta {
        match self {
            Self::Income(s) => s.meta(),
            Self::Balance(s) => s.meta(),
            Self::CashFlow(s) => s.meta(),
        }
    }

    /// Reads a line item from whichever variant this is.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<f64> {
        match self {
            Self::Income(s) => s.field(key),
            Self::Balance(s) => s.field(key),
            Self::CashFlow(s) => s.field(key),
        }
    }
}

/// Revenue broken down by product segment or geographic region.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    /// Stock symbol.
    pub symbol: Symbol,
    /// End date of the reporting period.
    pub date: NaiveDate,
    /// Period tag.
    pub period: FiscalPeriod,
    /// Currency the figures were reported in before conversion.
    #[serde(default = "default_currency")]
    pub reported_currency: String,
    /// Segment or region name to revenue.
    pub segments: BTreeMap<String, f64>,
}

impl SegmentReport {
    /// Creates a report, dropping zero-valued entries.
    #[must_use]
    pub fn new(
        symbol: Symbol,
        date: NaiveDate,
        period: FiscalPeriod,
        segments: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        Self {
            symbol,
            date,
            period,
            reported_currency: default_currency(),
            segments: segments.into_iter().filter(|(_, v)| *v != 0.0).collect(),
        }
    }

    /// Returns the value of a segment when it is a finite number.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<f64> {
        self.segments.get(name).copied().filter(|v| v.is_finite())
    }
}

/// Everything the charting pipeline reads for one symbol.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialData {
    /// Income statements.
    #[serde(default)]
    pub income_statements: Vec<IncomeStatement>,
    /// Balance sheets.
    #[serde(default)]
    pub balance_sheets: Vec<BalanceSheet>,
    /// Cash flow statements.
    #[serde(default)]
    pub cash_flow_statements: Vec<CashFlowStatement>,
    /// Revenue by product segment.
    #[serde(default)]
    pub revenue_segments: Vec<SegmentReport>,
    /// Revenue by geographic region.
    #[serde(default)]
    pub revenue_geo_segments: Vec<SegmentReport>,
}

impl FinancialData {
    /// Returns true if no statement or segment is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.income_statements.is_empty()
            && self.balance_sheets.is_empty()
            && self.cash_flow_statements.is_empty()
            && self.revenue_segments.is_empty()
            && self.revenue_geo_segments.is_empty()
    }

    /// Total number of statements and segment reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.income_statements.len()
            + self.balance_sheets.len()
            + self.cash_flow_statements.len()
            + self.revenue_segments.len()
            + self.revenue_geo_segments.len()
    }

    /// Appends every statement and segment report of `other`.
    pub fn merge(&mut self, other: Self) {
        self.income_statements.extend(other.income_statements);
        self.balance_sheets.extend(other.balance_sheets);
        self.cash_flow_statements.extend(other.cash_flow_statements);
        self.revenue_segments.extend(other.revenue_segments);
        self.revenue_geo_segments.extend(other.revenue_geo_segments);
    }

    /// Returns the income statement with the latest date.
    #[must_use]
    pub fn latest_income_statement(&self) -> Option<&IncomeStatement> {
        self.income_statements.iter().max_by_key(|s| s.date())
    }

    /// Iterates every statement as the tagged union.
    pub fn statements(&self) -> impl Iterator<Item = AnyStatement> + '_ {
        self.income_statements
            .iter()
            .cloned()
            .map(AnyStatement::Income)
            .chain(self.balance_sheets.iter().cloned().map(AnyStatement::Balance))
            .chain(
                self.cash_flow_statements
                    .iter()
                    .cloned()
                    .map(AnyStatement::CashFlow),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_field_access_is_capability_checked() {
        let stmt = IncomeStatement::new(Symbol::new("AAPL"), date(2023, 12, 31), FiscalPeriod::FY)
            .with("revenue", 100.0)
            .with("total_assets", 5.0);

        assert_eq!(stmt.field("revenue"), Some(100.0));
        assert_eq!(stmt.field("total_assets"), None);
        assert_eq!(stmt.revenue, Some(100.0));

        let mut stmt = stmt;
        assert!(!stmt.set_field("goodwill", Some(1.0)));
        assert!(stmt.set_field("revenue", None));
        assert_eq!(stmt.finite("revenue"), None);
    }

    #[test]
    fn test_kind_lookup() {
        assert_eq!(StatementKind::carrying("total_assets"), vec![StatementKind::Balance]);
        assert_eq!(
            StatementKind::carrying("net_income"),
            vec![StatementKind::Income, StatementKind::CashFlow]
        );
        assert!(StatementKind::carrying("no_such_field").is_empty());
        assert!(!StatementKind::Balance.is_flow());
    }

    #[test]
    fn test_statement_json_is_flat() {
        let stmt = BalanceSheet::new(Symbol::new("MSFT"), date(2024, 6, 30), FiscalPeriod::Q4)
            .with("total_assets", 512.0);
        let value = serde_json::to_value(&stmt).unwrap();
        assert_eq!(value["symbol"], "MSFT");
        assert_eq!(value["date"], "2024-06-30");
        assert_eq!(value["period"], "Q4");
        assert_eq!(value["total_assets"], 512.0);
        assert!(value.get("goodwill").is_none());

        let back: BalanceSheet = serde_json::from_value(value).unwrap();
        assert_eq!(back, stmt);
    }

    #[test]
    fn test_segment_report_drops_zeros() {
        let report = SegmentReport::new(
            Symbol::new("AAPL"),
            date(2023, 9, 30),
            FiscalPeriod::FY,
            [("iPhone".to_string(), 200.0), ("Other".to_string(), 0.0)],
        );
        assert_eq!(report.segments.len(), 1);
        assert_eq!(report.value("iPhone"), Some(200.0));
        assert_eq!(report.value("Other"), None);
    }

    #[test]
    fn test_latest_income_statement() {
        let data = FinancialData {
            income_statements: vec![
                IncomeStatement::new(Symbol::new("A"), date(2023, 3, 31), FiscalPeriod::Q1),
                IncomeStatement::new(Symbol::new("A"), date(2023, 12, 31), FiscalPeriod::Q4),
                IncomeStatement::new(Symbol::new("A"), date(2023, 6, 30), FiscalPeriod::Q2),
            ],
            ..Default::default()
        };
        assert_eq!(data.latest_income_statement().unwrap().date(), date(2023, 12, 31));
        assert_eq!(data.len(), 3);
        assert_eq!(data.statements().count(), 3);
    }
}
