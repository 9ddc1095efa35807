//! Plain-text rendering.

use folio::charts::MetricSeries;
use folio::charts::config::format_value;
use folio::{FinancialData, Statement, Symbol};

pub(crate) fn print_summary(symbol: &Symbol, data: &FinancialData, prices: usize) {
    println!("{symbol}");
    println!("  Income statements:    {}", data.income_statements.len());
    println!("  Balance sheets:       {}", data.balance_sheets.len());
    println!("  Cash flow statements: {}", data.cash_flow_statements.len());
    println!("  Product segments:     {}", data.revenue_segments.len());
    println!("  Geographic segments:  {}", data.revenue_geo_segments.len());
    println!("  Daily prices:         {prices}");
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), format_value)
}

pub(crate) fn print_statements(data: &FinancialData) {
    if data.income_statements.is_empty() {
        println!("No income statements for this view.");
        return;
    }
    println!(
        "{:<12} {:<6} {:>12} {:>12} {:>12} {:>12}",
        "Date", "Period", "Revenue", "Gross", "Operating", "Net"
    );
    for s in &data.income_statements {
        println!(
            "{:<12} {:<6} {:>12} {:>12} {:>12} {:>12}",
            s.date().to_string(),
            s.period().to_string(),
            cell(s.finite("revenue")),
            cell(s.finite("gross_profit")),
            cell(s.finite("operating_income")),
            cell(s.finite("net_income")),
        );
    }
}

pub(crate) fn print_series(name: &str, series: &MetricSeries) {
    println!("{name}");
    for point in series.points() {
        println!("  {}  {:>12.2}", point.date, point.value);
    }
}
