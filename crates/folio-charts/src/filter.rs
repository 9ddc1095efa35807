//! Statement period filter.
//!
//! Produces the annual, quarterly or trailing-twelve-month view of a
//! statement or segment collection, bounded to a number of years.

use chrono::NaiveDate;
use folio_core::{FinancialData, FiscalPeriod, PeriodView, SegmentReport, Statement};
use std::collections::BTreeMap;

/// Number of quarters summed into one TTM entry.
pub const TTM_WINDOW: usize = 4;

/// Returns true for line items that are not summed into a TTM entry.
///
/// Ratios and share counts keep the most recent quarter's value.
#[must_use]
pub fn is_ttm_excluded(field: &str) -> bool {
    field.contains("ratio") || field.contains("shs_out")
}

/// Keeps entries matching the view's period predicate, then the most recent
/// `years` (annual) or `years * 4` (otherwise) of them in ascending order.
///
/// `years == 0` keeps every matching entry in input order.
fn bound<T: Clone>(
    items: &[T],
    key: impl Fn(&T) -> (NaiveDate, FiscalPeriod),
    annual: bool,
    years: u32,
) -> Vec<T> {
    let mut matching: Vec<T> = items
        .iter()
        .filter(|item| (key(item).1 == FiscalPeriod::FY) == annual)
        .cloned()
        .collect();

    if years == 0 {
        return matching;
    }

    let limit = if annual { years } else { years.saturating_mul(4) } as usize;
    matching.sort_by(|a, b| key(b).0.cmp(&key(a).0));
    matching.truncate(limit);
    matching.reverse();
    matching
}

/// Bounds an already-synthesized TTM series to `years * 4` entries.
fn bound_ttm<T>(mut ttm: Vec<T>, years: u32) -> Vec<T> {
    // Synthesized entries are newest-first.
    if years > 0 {
        ttm.truncate(years.saturating_mul(4) as usize);
    }
    ttm.reverse();
    ttm
}

/// Quarterly entries sorted newest-first.
fn quarters_desc<T>(items: &[T], key: impl Fn(&T) -> (NaiveDate, FiscalPeriod)) -> Vec<&T> {
    let mut quarters: Vec<&T> = items.iter().filter(|i| key(i).1.is_quarter()).collect();
    quarters.sort_by(|a, b| key(b).0.cmp(&key(a).0));
    quarters
}

/// Synthesizes trailing-twelve-month statements, newest first.
///
/// Every window of four consecutive quarters yields one entry tagged
/// [`FiscalPeriod::TTM`] and dated at the window's most recent quarter. Flow
/// statements sum each line item over the window (missing values count as
/// zero, a field missing in all four stays missing); balance sheets and
/// excluded fields keep the most recent quarter's value. Returns nothing when
/// fewer than four quarters exist.
#[must_use]
pub fn synthesize_ttm<S: Statement>(statements: &[S]) -> Vec<S> {
    let quarters = quarters_desc(statements, |s| (s.date(), s.period()));
    if quarters.len() < TTM_WINDOW {
        return Vec::new();
    }

    quarters
        .windows(TTM_WINDOW)
        .map(|window| {
            let mut ttm = window[0].clone();
            ttm.meta_mut().period = FiscalPeriod::TTM;
            if S::KIND.is_flow() {
                for field in S::FIELDS.iter().filter(|f| !is_ttm_excluded(f)) {
                    let present: Vec<f64> = window.iter().filter_map(|q| q.finite(field)).collect();
                    let sum = (!present.is_empty()).then(|| present.iter().sum());
                    ttm.set_field(field, sum);
                }
            }
            ttm
        })
        .collect()
}

/// Synthesizes trailing-twelve-month segment reports, newest first.
///
/// Segment names are unioned across the window; a segment absent from a
/// quarter contributes zero for it.
#[must_use]
pub fn synthesize_segment_ttm(segments: &[SegmentReport]) -> Vec<SegmentReport> {
    let quarters = quarters_desc(segments, |s| (s.date, s.period));
    if quarters.len() < TTM_WINDOW {
        return Vec::new();
    }

    quarters
        .windows(TTM_WINDOW)
        .map(|window| {
            let mut sums: BTreeMap<String, f64> = BTreeMap::new();
            for quarter in window {
                for (name, value) in &quarter.segments {
                    if value.is_finite() {
                        *sums.entry(name.clone()).or_insert(0.0) += value;
                    }
                }
            }
            let newest = window[0];
            let mut report =
                SegmentReport::new(newest.symbol.clone(), newest.date, FiscalPeriod::TTM, sums);
            report.reported_currency = newest.reported_currency.clone();
            report
        })
        .collect()
}

/// Filters statements to a period view.
///
/// - `Annual`: FY entries, the most recent `years`.
/// - `Quarterly`: every non-FY entry, the most recent `years * 4`.
/// - `Ttm`: synthesized TTM entries, the most recent `years * 4`, falling back
///   to the quarterly view when fewer than four quarters exist.
///
/// `years == 0` means unlimited. Shorter histories are returned as they are.
#[must_use]
pub fn filter_statements<S: Statement>(statements: &[S], view: PeriodView, years: u32) -> Vec<S> {
    let key = |s: &S| (s.date(), s.period());
    match view {
        PeriodView::Annual => bound(statements, key, true, years),
        PeriodView::Quarterly => bound(statements, key, false, years),
        PeriodView::Ttm => {
            let ttm = synthesize_ttm(statements);
            if ttm.is_empty() {
                bound(statements, key, false, years)
            } else {
                bound_ttm(ttm, years)
            }
        }
    }
}

/// Filters segment reports to a period view, with the same rules as
/// [`filter_statements`].
#[must_use]
pub fn filter_segments(segments: &[SegmentReport], view: PeriodView, years: u32) -> Vec<SegmentReport> {
    let key = |s: &SegmentReport| (s.date, s.period);
    match view {
        PeriodView::Annual => bound(segments, key, true, years),
        PeriodView::Quarterly => bound(segments, key, false, years),
        PeriodView::Ttm => {
            let ttm = synthesize_segment_ttm(segments);
            if ttm.is_empty() {
                bound(segments, key, false, years)
            } else {
                bound_ttm(ttm, years)
            }
        }
    }
}

/// Applies the period filter to every collection of a bundle independently.
#[must_use]
pub fn filter_financial_data(data: &FinancialData, view: PeriodView, years: u32) -> FinancialData {
    FinancialData {
        income_statements: filter_statements(&data.income_statements, view, years),
        balance_sheets: filter_statements(&data.balance_sheets, view, years),
        cash_flow_statements: filter_statements(&data.cash_flow_statements, view, years),
        revenue_segments: filter_segments(&data.revenue_segments, view, years),
        revenue_geo_segments: filter_segments(&data.revenue_geo_segments, view, years),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use folio_core::{BalanceSheet, IncomeStatement, Symbol};
    use rstest::rstest;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn income(d: &str, period: FiscalPeriod, revenue: f64, net_income: f64) -> IncomeStatement {
        IncomeStatement::new(Symbol::new("TEST"), date(d), period)
            .with("revenue", revenue)
            .with("net_income", net_income)
    }

    fn mixed() -> Vec<IncomeStatement> {
        vec![
            income("2021-12-31", FiscalPeriod::FY, 400.0, 40.0),
            income("2022-03-31", FiscalPeriod::Q1, 100.0, 10.0),
            income("2022-12-31", FiscalPeriod::FY, 440.0, 44.0),
            income("2022-06-30", FiscalPeriod::Q2, 110.0, 11.0),
            income("2022-09-30", FiscalPeriod::Q3, 120.0, 12.0),
            income("2022-12-31", FiscalPeriod::Q4, 130.0, 13.0),
            income("2023-12-31", FiscalPeriod::FY, 480.0, 48.0),
        ]
    }

    #[rstest]
    #[case(PeriodView::Annual)]
    #[case(PeriodView::Quarterly)]
    fn test_unbounded_filter_is_predicate_subset_and_idempotent(#[case] view: PeriodView) {
        let statements = mixed();
        let once = filter_statements(&statements, view, 0);
        let expected: Vec<IncomeStatement> = statements
            .iter()
            .filter(|s| (s.period() == FiscalPeriod::FY) == (view == PeriodView::Annual))
            .cloned()
            .collect();
        assert_eq!(once, expected);
        assert_eq!(filter_statements(&once, view, 0), once);
    }

    #[test]
    fn test_annual_bounded_to_most_recent_years_ascending() {
        let out = filter_statements(&mixed(), PeriodView::Annual, 2);
        let dates: Vec<NaiveDate> = out.iter().map(|s| s.date()).collect();
        assert_eq!(dates, vec![date("2022-12-31"), date("2023-12-31")]);
    }

    #[test]
    fn test_quarterly_keeps_years_times_four() {
        let mut statements = mixed();
        for (d, p) in [
            ("2023-03-31", FiscalPeriod::Q1),
            ("2023-06-30", FiscalPeriod::Q2),
        ] {
            statements.push(income(d, p, 1.0, 1.0));
        }
        let out = filter_statements(&statements, PeriodView::Quarterly, 1);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].date(), date("2022-09-30"));
        assert_eq!(out[3].date(), date("2023-06-30"));
    }

    #[test]
    fn test_short_history_returns_everything_available() {
        let out = filter_statements(&mixed(), PeriodView::Annual, 10);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_ttm_sums_last_four_quarters() {
        let statements = vec![
            income("2023-03-31", FiscalPeriod::Q1, 100.0, 10.0),
            income("2023-06-30", FiscalPeriod::Q2, 110.0, 11.0),
            income("2023-09-30", FiscalPeriod::Q3, 120.0, 12.0),
            income("2023-12-31", FiscalPeriod::Q4, 130.0, 13.0),
        ];
        let ttm = filter_statements(&statements, PeriodView::Ttm, 10);
        assert_eq!(ttm.len(), 1);
        assert_eq!(ttm[0].period(), FiscalPeriod::TTM);
        assert_eq!(ttm[0].date(), date("2023-12-31"));
        assert_relative_eq!(ttm[0].revenue.unwrap(), 460.0);
        assert_relative_eq!(ttm[0].net_income.unwrap(), 46.0);
    }

    #[test]
    fn test_ttm_windows_slide_newest_first() {
        let mut statements = vec![income("2022-12-31", FiscalPeriod::Q4, 90.0, 9.0)];
        statements.extend([
            income("2023-03-31", FiscalPeriod::Q1, 100.0, 10.0),
            income("2023-06-30", FiscalPeriod::Q2, 110.0, 11.0),
            income("2023-09-30", FiscalPeriod::Q3, 120.0, 12.0),
            income("2023-12-31", FiscalPeriod::Q4, 130.0, 13.0),
        ]);
        let ttm = synthesize_ttm(&statements);
        assert_eq!(ttm.len(), 2);
        assert_eq!(ttm[0].date(), date("2023-12-31"));
        assert_relative_eq!(ttm[1].revenue.unwrap(), 420.0);

        let bounded = filter_statements(&statements, PeriodView::Ttm, 0);
        assert_eq!(bounded[0].date(), date("2023-09-30"));
        assert_eq!(bounded[1].date(), date("2023-12-31"));
    }

    #[test]
    fn test_ttm_excludes_ratios_and_share_counts() {
        let statements: Vec<IncomeStatement> = ["2023-03-31", "2023-06-30", "2023-09-30", "2023-12-31"]
            .iter()
            .enumerate()
            .map(|(i, d)| {
                IncomeStatement::new(Symbol::new("TEST"), date(d), FiscalPeriod::Q1)
                    .with("eps_diluted", 1.0)
                    .with("gross_profit_ratio", 0.4 + i as f64 * 0.01)
                    .with("weighted_average_shs_out_dil", 1000.0 + i as f64)
            })
            .collect();
        let ttm = synthesize_ttm(&statements);
        assert_relative_eq!(ttm[0].eps_diluted.unwrap(), 4.0);
        assert_relative_eq!(ttm[0].gross_profit_ratio.unwrap(), 0.43);
        assert_relative_eq!(ttm[0].weighted_average_shs_out_dil.unwrap(), 1003.0);
        assert_eq!(ttm[0].revenue, None);
    }

    #[test]
    fn test_ttm_balance_sheet_keeps_latest_quarter() {
        let sheets: Vec<BalanceSheet> = ["2023-03-31", "2023-06-30", "2023-09-30", "2023-12-31"]
            .iter()
            .enumerate()
            .map(|(i, d)| {
                BalanceSheet::new(Symbol::new("TEST"), date(d), FiscalPeriod::Q2)
                    .with("total_assets", 100.0 * (i + 1) as f64)
            })
            .collect();
        let ttm = synthesize_ttm(&sheets);
        assert_eq!(ttm.len(), 1);
        assert_relative_eq!(ttm[0].total_assets.unwrap(), 400.0);
    }

    #[test]
    fn test_ttm_falls_back_to_quarterly_with_fewer_than_four() {
        let statements = vec![
            income("2023-06-30", FiscalPeriod::Q2, 110.0, 11.0),
            income("2023-09-30", FiscalPeriod::Q3, 120.0, 12.0),
            income("2023-12-31", FiscalPeriod::Q4, 130.0, 13.0),
        ];
        assert!(synthesize_ttm(&statements).is_empty());
        let out = filter_statements(&statements, PeriodView::Ttm, 10);
        assert_eq!(out, statements);
    }

    #[test]
    fn test_segment_ttm_unions_names() {
        let seg = |d: &str, values: &[(&str, f64)]| {
            SegmentReport::new(
                Symbol::new("TEST"),
                date(d),
                FiscalPeriod::Q1,
                values.iter().map(|(k, v)| ((*k).to_string(), *v)),
            )
        };
        let segments = vec![
            seg("2023-03-31", &[("Mac", 10.0), ("iPhone", 50.0)]),
            seg("2023-06-30", &[("Mac", 12.0), ("iPhone", 40.0)]),
            seg("2023-09-30", &[("iPhone", 45.0), ("Vision", 1.0)]),
            seg("2023-12-31", &[("Mac", 15.0), ("iPhone", 70.0)]),
        ];
        let ttm = filter_segments(&segments, PeriodView::Ttm, 0);
        assert_eq!(ttm.len(), 1);
        assert_relative_eq!(ttm[0].value("Mac").unwrap(), 37.0);
        assert_relative_eq!(ttm[0].value("iPhone").unwrap(), 205.0);
        assert_relative_eq!(ttm[0].value("Vision").unwrap(), 1.0);
        assert_eq!(ttm[0].period, FiscalPeriod::TTM);

        let annual = filter_segments(&segments, PeriodView::Annual, 0);
        assert!(annual.is_empty());
    }

    #[test]
    fn test_filter_financial_data_handles_each_collection() {
        let data = FinancialData {
            income_statements: mixed(),
            ..Default::default()
        };
        let out = filter_financial_data(&data, PeriodView::Annual, 1);
        assert_eq!(out.income_statements.len(), 1);
        assert!(out.balance_sheets.is_empty());
        assert!(out.revenue_segments.is_empty());
    }
}
