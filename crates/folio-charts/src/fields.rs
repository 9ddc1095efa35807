//! Display label to statement field key resolution.

use folio_core::StatementKind;

/// Display labels with a fixed field key, grouped by statement.
pub const FIELD_MAP: &[(&str, &str)] = &[
    // Income statement
    ("Revenue", "revenue"),
    ("Cost of Revenue", "cost_of_revenue"),
    ("Gross Profit", "gross_profit"),
    ("Gross Profit Ratio", "gross_profit_ratio"),
    ("Research & Development", "research_and_development_expenses"),
    ("Sales, General & Administrative", "selling_general_and_administrative_expenses"),
    ("Operating Expenses", "operating_expenses"),
    ("Operating Income", "operating_income"),
    ("Operating Income Ratio", "operating_income_ratio"),
    ("Interest Income", "interest_income"),
    ("Interest Expense", "interest_expense"),
    ("Total Other Income/Expenses", "total_other_income_expenses_net"),
    ("Income Before Tax", "income_before_tax"),
    ("Income Tax Expense", "income_tax_expense"),
    ("Net Income", "net_income"),
    ("Net Income Ratio", "net_income_ratio"),
    ("EBITDA", "ebitda"),
    ("EBITDA Ratio", "ebitda_ratio"),
    ("EPS", "eps"),
    ("EPS Diluted", "eps_diluted"),
    ("Weighted Average Shares", "weighted_average_shs_out"),
    ("Weighted Average Shares Diluted", "weighted_average_shs_out_dil"),
    // Balance sheet
    ("Cash & Cash Equivalents", "cash_and_cash_equivalents"),
    ("Short Term Investments", "short_term_investments"),
    ("Net Receivables", "net_receivables"),
    ("Inventory", "inventory"),
    ("Total Current Assets", "total_current_assets"),
    ("Property, Plant & Equipment", "property_plant_equipment_net"),
    ("Goodwill", "goodwill"),
    ("Intangible Assets", "intangible_assets"),
    ("Long Term Investments", "long_term_investments"),
    ("Total Non-Current Assets", "total_non_current_assets"),
    ("Total Assets", "total_assets"),
    ("Account Payables", "account_payables"),
    ("Short Term Debt", "short_term_debt"),
    ("Deferred Revenue", "deferred_revenue"),
    ("Total Current Liabilities", "total_current_liabilities"),
    ("Long Term Debt", "long_term_debt"),
    ("Total Non-Current Liabilities", "total_non_current_liabilities"),
    ("Total Liabilities", "total_liabilities"),
    ("Common Stock", "common_stock"),
    ("Retained Earnings", "retained_earnings"),
    ("Total Stockholders' Equity", "total_stockholders_equity"),
    // Cash flow statement
    ("Net Income CF", "net_income"),
    ("Depreciation & Amortization", "depreciation_and_amortization"),
    ("Stock Based Compensation", "stock_based_compensation"),
    ("Change in Working Capital", "change_in_working_capital"),
    ("Operating Cash Flow", "operating_cash_flow"),
    ("Capital Expenditure", "capital_expenditure"),
    ("Acquisitions", "acquisitions_net"),
    ("Purchase of Investments", "purchases_of_investments"),
    ("Sale of Investments", "sales_maturities_of_investments"),
    ("Net Investing Cash Flow", "net_cash_used_for_investing_activities"),
    ("Debt Repayment", "debt_repayment"),
    ("Common Stock Issued", "common_stock_issued"),
    ("Common Stock Repurchased", "common_stock_repurchased"),
    ("Dividends Paid", "dividends_paid"),
    ("Net Financing Cash Flow", "net_cash_used_provided_by_financing_activities"),
    ("Free Cash Flow", "free_cash_flow"),
    ("Net Change in Cash", "net_change_in_cash"),
    ("Cash at End of Period", "cash_at_end_of_period"),
];

/// Resolves a display label to its statement field key.
///
/// Labels in [`FIELD_MAP`] resolve exactly. Any other label is lowercased,
/// `&` becomes `and`, each run of characters outside `[a-z0-9]` collapses to
/// a single underscore, and leading or trailing underscores are stripped.
#[must_use]
pub fn resolve(display_name: &str) -> String {
    if let Some((_, key)) = FIELD_MAP.iter().find(|(label, _)| *label == display_name) {
        return (*key).to_string();
    }

    let lowered = display_name.to_lowercase().replace('&', "and");
    let mut key = String::with_capacity(lowered.len());
    let mut pending_separator = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.push(c);
        } else {
            pending_separator = true;
        }
    }
    key
}

/// Statement variants that carry the field a label resolves to.
#[must_use]
pub fn statement_kinds(display_name: &str) -> Vec<StatementKind> {
    StatementKind::carrying(&resolve(display_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Research & Development", "research_and_development_expenses")]
    #[case("Sales, General & Administrative", "selling_general_and_administrative_expenses")]
    #[case("Total Stockholders' Equity", "total_stockholders_equity")]
    #[case("Net Income CF", "net_income")]
    #[case("Free Cash Flow", "free_cash_flow")]
    fn test_exact_lookup(#[case] label: &str, #[case] expected: &str) {
        assert_eq!(resolve(label), expected);
    }

    #[rstest]
    #[case("Other Expenses", "other_expenses")]
    #[case("  Net Debt  ", "net_debt")]
    #[case("Goodwill & Intangible Assets", "goodwill_and_intangible_assets")]
    #[case("Effect of Forex (Changes) on Cash!", "effect_of_forex_changes_on_cash")]
    #[case("--", "")]
    fn test_fallback_transform(#[case] label: &str, #[case] expected: &str) {
        assert_eq!(resolve(label), expected);
    }

    #[test]
    fn test_no_partial_matches() {
        // Case differs from the table entry, so the fallback applies.
        assert_eq!(resolve("research & development"), "research_and_development");
    }

    #[test]
    fn test_every_mapped_key_is_a_statement_field() {
        for (label, key) in FIELD_MAP {
            assert!(!StatementKind::carrying(key).is_empty(), "{label} -> {key}");
        }
    }

    #[test]
    fn test_statement_kinds() {
        assert_eq!(statement_kinds("Total Assets"), vec![StatementKind::Balance]);
        assert_eq!(
            statement_kinds("Net Income"),
            vec![StatementKind::Income, StatementKind::CashFlow]
        );
    }
}
