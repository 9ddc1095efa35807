//! Conversion of FMP payloads into folio types.

use chrono::NaiveDate;
use folio_core::{
    CompanyInfo, FiscalPeriod, PeriodType, SegmentReport, Statement, StockPrice, Symbol,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Raw statement object as returned by the statement endpoints.
pub(crate) type RawStatement = Map<String, Value>;

/// FMP keys that don't map onto our line items by case conversion alone.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("epsdiluted", "eps_diluted"),
    ("ebitdaratio", "ebitda_ratio"),
    ("grossProfitRatio", "gross_profit_ratio"),
    ("operatingIncomeRatio", "operating_income_ratio"),
    ("incomeBeforeTaxRatio", "income_before_tax_ratio"),
    ("netIncomeRatio", "net_income_ratio"),
    (
        "netCashProvidedByInvestingActivities",
        "net_cash_used_for_investing_activities",
    ),
    (
        "netCashProvidedByFinancingActivities",
        "net_cash_used_provided_by_financing_activities",
    ),
    ("filingDate", "filling_date"),
    ("fiscalYear", "calendar_year"),
];

/// Converts a camelCase key into snake_case.
pub(crate) fn camel_to_snake(key: &str) -> String {
    if let Some((_, alias)) = KEY_ALIASES.iter().find(|(from, _)| *from == key) {
        return (*alias).to_string();
    }
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Returns true for line items that carry money and must be converted.
///
/// Per-share figures, ratios and share counts are left as reported.
pub(crate) fn is_monetary(key: &str) -> bool {
    !(key.contains("eps") || key.contains("ratio") || key.contains("shs_out"))
}

/// Converts a value at the given rate, rounded to cents.
#[must_use]
pub fn convert_to_usd(value: f64, rate: f64) -> f64 {
    (value * rate * 100.0).round() / 100.0
}

fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    let s = value?.as_str()?;
    // Some endpoints return "YYYY-MM-DD HH:MM:SS".
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Currency the batch was reported in, taken from its first statement.
pub(crate) fn reported_currency(raw: &[RawStatement]) -> Option<String> {
    raw.first()?
        .get("reportedCurrency")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Builds typed statements from raw payloads, converting money at `rate`.
///
/// Entries without a parseable date are skipped.
pub(crate) fn statements<S: Statement + Default>(
    raw: &[RawStatement],
    symbol: &Symbol,
    period_type: PeriodType,
    rate: f64,
) -> Vec<S> {
    let mut out = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(date) = parse_date(entry.get("date")) else {
            warn!(symbol = %symbol, "Skipping statement without a valid date");
            continue;
        };

        let period = entry
            .get("period")
            .and_then(Value::as_str)
            .and_then(|p| p.parse::<FiscalPeriod>().ok())
            .unwrap_or(match period_type {
                PeriodType::Annual => FiscalPeriod::FY,
                PeriodType::Quarterly => FiscalPeriod::Q4,
            });

        let mut stmt = S::default();
        {
            let meta = stmt.meta_mut();
            meta.symbol = symbol.clone();
            meta.date = date;
            meta.period = period;
        }

        for (key, value) in entry {
            let field = camel_to_snake(key);
            match field.as_str() {
                "date" | "symbol" | "period" | "link" | "final_link" => {}
                "reported_currency" => {
                    if let Some(c) = value.as_str() {
                        stmt.meta_mut().reported_currency = c.to_string();
                    }
                }
                "cik" => stmt.meta_mut().cik = string_of(value),
                "filling_date" => stmt.meta_mut().filling_date = string_of(value),
                "accepted_date" => stmt.meta_mut().accepted_date = string_of(value),
                "calendar_year" => stmt.meta_mut().calendar_year = string_of(value),
                _ => {
                    let Some(number) = value.as_f64() else {
                        continue;
                    };
                    let number = if is_monetary(&field) {
                        convert_to_usd(number, rate)
                    } else {
                        number
                    };
                    // Unknown keys are dropped.
                    stmt.set_field(&field, Some(number));
                }
            }
        }
        out.push(stmt);
    }
    out
}

/// One entry of a segmentation response.
///
/// The flat v4 shape is `{"2023-09-30": {"iPhone": 1.0}}`; the stable shape is
/// `{"date": "2023-09-30", "data": {"iPhone": 1.0}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawSegmentEntry {
    Dated {
        date: String,
        data: BTreeMap<String, Option<f64>>,
    },
    Flat(BTreeMap<String, BTreeMap<String, Option<f64>>>),
}

/// Period of a segment report.
///
/// Annual fetches are FY; quarterly fetches are tagged by the month the
/// period ends in, with year-end quarters as Q4.
#[must_use]
pub fn segment_period(date: NaiveDate, period_type: PeriodType) -> FiscalPeriod {
    if period_type == PeriodType::Annual {
        return FiscalPeriod::FY;
    }
    let suffix = date.format("%m-%d").to_string();
    match suffix.as_str() {
        "03-31" => FiscalPeriod::Q1,
        "06-30" => FiscalPeriod::Q2,
        "09-30" => FiscalPeriod::Q3,
        _ => FiscalPeriod::Q4,
    }
}

/// Builds segment reports, dropping zero and null values.
pub(crate) fn segments(
    raw: Vec<RawSegmentEntry>,
    symbol: &Symbol,
    period_type: PeriodType,
    rate: f64,
) -> Vec<SegmentReport> {
    let mut dated: Vec<(String, BTreeMap<String, Option<f64>>)> = Vec::new();
    for entry in raw {
        match entry {
            RawSegmentEntry::Dated { date, data } => dated.push((date, data)),
            RawSegmentEntry::Flat(map) => dated.extend(map),
        }
    }

    dated
        .into_iter()
        .filter_map(|(date, values)| {
            let date = parse_date(Some(&Value::String(date)))?;
            let values = values
                .into_iter()
                .filter_map(|(name, v)| v.map(|v| (name, convert_to_usd(v, rate))));
            Some(SegmentReport::new(
                symbol.clone(),
                date,
                segment_period(date, period_type),
                values,
            ))
        })
        .collect()
}

/// FMP end-of-day price.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPrice {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adj_close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    unadjusted_volume: Option<f64>,
    change: Option<f64>,
    change_percent: Option<f64>,
    vwap: Option<f64>,
}

/// Price payload: a bare array, or the legacy `{"historical": [...]}` wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawPriceResponse {
    Wrapped {
        #[serde(default)]
        historical: Vec<RawPrice>,
    },
    List(Vec<RawPrice>),
}

impl RawPriceResponse {
    pub(crate) fn into_prices(self) -> Vec<RawPrice> {
        match self {
            Self::Wrapped { historical } => historical,
            Self::List(prices) => prices,
        }
    }
}

/// Converts prices to USD, oldest first.
///
/// The adjusted close falls back to the close when the endpoint omits it.
pub(crate) fn prices(raw: Vec<RawPrice>, symbol: &Symbol, rate: f64) -> Vec<StockPrice> {
    let money = |v: Option<f64>| v.map(|v| convert_to_usd(v, rate));
    let mut out: Vec<StockPrice> = raw
        .into_iter()
        .filter_map(|p| {
            let date = NaiveDate::parse_from_str(&p.date, "%Y-%m-%d").ok()?;
            let volume = p.volume.unwrap_or(0.0);
            Some(StockPrice {
                symbol: symbol.clone(),
                date,
                open: money(p.open),
                high: money(p.high),
                low: money(p.low),
                close: money(p.close),
                adj_close: money(p.adj_close.or(p.close)),
                volume,
                unadjusted_volume: p.unadjusted_volume.or(Some(volume)),
                change: money(p.change),
                change_percent: p.change_percent,
                vwap: money(p.vwap),
            })
        })
        .collect();
    out.sort_by_key(|p| p.date);
    out
}

/// FMP company profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProfile {
    #[serde(default)]
    pub(crate) company_name: String,
    #[serde(default)]
    exchange_short_name: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    pub(crate) currency: Option<String>,
    cik: Option<String>,
    isin: Option<String>,
    description: Option<String>,
}

impl RawProfile {
    pub(crate) fn into_company_info(self, symbol: &Symbol) -> CompanyInfo {
        let mut info = CompanyInfo::new(symbol.clone(), self.company_name);
        info.exchange = self
            .exchange_short_name
            .or(self.exchange)
            .unwrap_or_default();
        info.sector = self.sector.unwrap_or_default();
        info.industry = self.industry.unwrap_or_default();
        info.country = self.country.unwrap_or_default();
        info.currency = self.currency.unwrap_or_else(|| "USD".to_string());
        info.isin = self.isin;
        if let Some(cik) = self.cik {
            info = info.with_cik(cik);
        }
        if let Some(desc) = self.description {
            info = info.with_description(desc);
        }
        info
    }
}

/// FMP quote, used for currency pairs.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawQuote {
    pub(crate) price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use folio_core::{BalanceSheet, IncomeStatement};
    use serde_json::json;

    fn raw(value: Value) -> Vec<RawStatement> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("revenue"), "revenue");
        assert_eq!(
            camel_to_snake("weightedAverageShsOutDil"),
            "weighted_average_shs_out_dil"
        );
        assert_eq!(camel_to_snake("epsdiluted"), "eps_diluted");
        assert_eq!(camel_to_snake("epsDiluted"), "eps_diluted");
        assert_eq!(camel_to_snake("fillingDate"), "filling_date");
        assert_eq!(camel_to_snake("filingDate"), "filling_date");
    }

    #[test]
    fn test_monetary_fields() {
        assert!(is_monetary("revenue"));
        assert!(is_monetary("total_debt"));
        assert!(!is_monetary("eps_diluted"));
        assert!(!is_monetary("gross_profit_ratio"));
        assert!(!is_monetary("weighted_average_shs_out"));
    }

    #[test]
    fn test_convert_to_usd_rounds_to_cents() {
        assert_relative_eq!(convert_to_usd(100.0, 1.0), 100.0);
        assert_relative_eq!(convert_to_usd(10.0, 0.123_456), 1.23);
        assert_relative_eq!(convert_to_usd(-3.0, 1.1), -3.3);
    }

    #[test]
    fn test_income_statement_transform() {
        let payload = raw(json!([{
            "date": "2023-09-30",
            "symbol": "AAPL",
            "reportedCurrency": "USD",
            "cik": "0000320193",
            "fillingDate": "2023-11-03",
            "calendarYear": "2023",
            "period": "FY",
            "revenue": 383285000000.0,
            "grossProfit": 169148000000.0,
            "netIncome": 96995000000.0,
            "epsdiluted": 6.13,
            "weightedAverageShsOutDil": 15812547000.0,
            "link": "https://example.com",
            "unknownField": 1.0
        }]));
        let stmts: Vec<IncomeStatement> =
            statements(&payload, &Symbol::new("aapl"), PeriodType::Annual, 1.0);
        assert_eq!(stmts.len(), 1);
        let s = &stmts[0];
        assert_eq!(s.meta.symbol.as_str(), "AAPL");
        assert_eq!(s.period(), FiscalPeriod::FY);
        assert_eq!(s.meta.cik.as_deref(), Some("0000320193"));
        assert_eq!(s.meta.filling_date.as_deref(), Some("2023-11-03"));
        assert_eq!(s.meta.calendar_year.as_deref(), Some("2023"));
        assert_eq!(s.revenue, Some(383_285_000_000.0));
        assert_eq!(s.eps_diluted, Some(6.13));
        assert_eq!(s.weighted_average_shs_out_dil, Some(15_812_547_000.0));
    }

    #[test]
    fn test_statement_conversion_skips_per_share_fields() {
        let payload = raw(json!([{
            "date": "2023-12-31",
            "period": "Q4",
            "reportedCurrency": "EUR",
            "totalAssets": 1000.0,
            "totalDebt": 250.5
        }, {
            "date": "not a date",
            "totalAssets": 1.0
        }]));
        assert_eq!(reported_currency(&payload).as_deref(), Some("EUR"));
        let sheets: Vec<BalanceSheet> =
            statements(&payload, &Symbol::new("SAP"), PeriodType::Quarterly, 1.1);
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].meta.reported_currency, "EUR");
        assert_relative_eq!(sheets[0].total_assets.unwrap(), 1100.0);
        assert_relative_eq!(sheets[0].total_debt.unwrap(), 275.55);

        let eps_payload = raw(json!([{"date": "2023-12-31", "period": "Q4", "eps": 2.0, "revenue": 10.0}]));
        let income: Vec<IncomeStatement> =
            statements(&eps_payload, &Symbol::new("SAP"), PeriodType::Quarterly, 2.0);
        assert_eq!(income[0].eps, Some(2.0));
        assert_eq!(income[0].revenue, Some(20.0));
    }

    #[test]
    fn test_segment_period_rule() {
        let d = |m, day| NaiveDate::from_ymd_opt(2023, m, day).unwrap();
        assert_eq!(segment_period(d(12, 31), PeriodType::Annual), FiscalPeriod::FY);
        assert_eq!(segment_period(d(9, 30), PeriodType::Annual), FiscalPeriod::FY);
        assert_eq!(segment_period(d(3, 31), PeriodType::Quarterly), FiscalPeriod::Q1);
        assert_eq!(segment_period(d(6, 30), PeriodType::Quarterly), FiscalPeriod::Q2);
        assert_eq!(segment_period(d(9, 30), PeriodType::Quarterly), FiscalPeriod::Q3);
        assert_eq!(segment_period(d(12, 31), PeriodType::Quarterly), FiscalPeriod::Q4);
        assert_eq!(segment_period(d(7, 1), PeriodType::Quarterly), FiscalPeriod::Q4);
    }

    #[test]
    fn test_segments_both_shapes() {
        let flat: Vec<RawSegmentEntry> = serde_json::from_value(json!([
            {"2023-09-30": {"iPhone": 200.0, "Mac": 0.0, "Services": null}}
        ]))
        .unwrap();
        let dated: Vec<RawSegmentEntry> = serde_json::from_value(json!([
            {"date": "2023-06-30", "symbol": "AAPL", "data": {"iPhone": 150.0}}
        ]))
        .unwrap();

        let symbol = Symbol::new("AAPL");
        let mut reports = segments(flat, &symbol, PeriodType::Quarterly, 1.0);
        reports.extend(segments(dated, &symbol, PeriodType::Quarterly, 1.0));
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].period, FiscalPeriod::Q3);
        assert_eq!(reports[0].segments.len(), 1);
        assert_eq!(reports[0].value("iPhone"), Some(200.0));
        assert_eq!(reports[1].period, FiscalPeriod::Q2);
    }

    #[test]
    fn test_prices_sorted_and_converted() {
        let response: RawPriceResponse = serde_json::from_value(json!({
            "symbol": "SAP",
            "historical": [
                {"date": "2024-01-03", "open": 10.0, "close": 11.0, "adjClose": 10.5, "volume": 100.0},
                {"date": "2024-01-02", "close": 9.0, "volume": 50.0, "changePercent": 1.5}
            ]
        }))
        .unwrap();
        let out = prices(response.into_prices(), &Symbol::new("SAP"), 2.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(out[0].adj_close, Some(18.0));
        assert_eq!(out[0].change_percent, Some(1.5));
        assert_eq!(out[1].adj_close, Some(21.0));
        assert_eq!(out[1].open, Some(20.0));
        assert_eq!(out[1].unadjusted_volume, Some(100.0));

        let list: RawPriceResponse =
            serde_json::from_value(json!([{"date": "2024-01-02", "close": 1.0}])).unwrap();
        assert_eq!(list.into_prices().len(), 1);
    }

    #[test]
    fn test_profile_into_company_info() {
        let profile: RawProfile = serde_json::from_value(json!({
            "symbol": "AAPL",
            "companyName": "Apple Inc.",
            "exchangeShortName": "NASDAQ",
            "sector": "Technology",
            "currency": "USD",
            "cik": "0000320193",
            "isin": "US0378331005"
        }))
        .unwrap();
        let info = profile.into_company_info(&Symbol::new("AAPL"));
        assert_eq!(info.name, "Apple Inc.");
        assert_eq!(info.exchange, "NASDAQ");
        assert_eq!(info.isin.as_deref(), Some("US0378331005"));
        assert_eq!(info.cik.as_deref(), Some("0000320193"));
        assert_eq!(info.industry, "");
    }
}
