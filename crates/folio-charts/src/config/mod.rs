//! Chart configuration builders.
//!
//! [`build_chart_config`] turns the selected metrics into renderer-ready
//! labels, datasets and axes. Margins and return ratios are lines on the
//! percentage axis, the price is a line on its own axis, and everything else
//! is drawn against the absolute axis.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::metrics::{ChartMetric, MarginKind, MetricFamily, ReturnKind, ValuationKind};

mod axes;
mod format;
mod theme;

pub use axes::{Axis, AxisId, AxisRange, absolute_range, percentage_range, price_range};
pub use format::{format_date, format_percent, format_price, format_value, growth_annotation};
pub use theme::{
    BAR_COLORS, PRICE_COLOR, Palette, ThemeMode, TooltipStyle, bar_color, margin_color,
    return_color, valuation_color,
};

/// Inputs besides the metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartOptions {
    /// Light or dark rendering.
    pub theme: ThemeMode,
    /// Inclusive date window; `None` shows every date.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// How a dataset is drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Vertical bars.
    Bar,
    /// Connected line.
    Line,
}

/// One renderer dataset, aligned with [`ChartConfig::dates`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Series name.
    pub label: String,
    /// Bar or line.
    #[serde(rename = "type")]
    pub kind: DatasetKind,
    /// Value per date label; `None` where the series has no point.
    pub data: Vec<Option<f64>>,
    /// Stroke color.
    pub border_color: String,
    /// Fill color.
    pub background_color: String,
    /// Scale the dataset is plotted against.
    pub y_axis_id: AxisId,
    /// Draw order; lower draws on top.
    pub order: usize,
    /// Line smoothing.
    pub tension: f64,
    /// Whether the renderer hides the dataset.
    pub hidden: bool,
}

impl Dataset {
    fn family(&self) -> MetricFamily {
        MetricFamily::of(&self.label)
    }

    fn visible_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .flatten()
            .copied()
            .filter(|_| !self.hidden)
    }
}

/// The three scales of a chart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    /// Absolute magnitudes.
    pub y: Axis,
    /// Percentages.
    pub y1: Axis,
    /// Prices.
    pub price: Axis,
}

/// Renderer-ready chart configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartConfig {
    /// Dates the datasets are aligned with, ascending.
    pub dates: Vec<NaiveDate>,
    /// Formatted x-axis labels, one per date.
    pub labels: Vec<String>,
    /// Datasets in metric order.
    pub datasets: Vec<Dataset>,
    /// Scales.
    pub axes: Axes,
    /// Theme colors.
    pub palette: Palette,
    /// Tooltip colors.
    pub tooltip: TooltipStyle,
}

impl ChartConfig {
    /// Tooltip title for the date at `index`.
    #[must_use]
    pub fn tooltip_title(&self, index: usize) -> String {
        self.dates.get(index).map(|d| format_date(*d)).unwrap_or_default()
    }

    /// Tooltip line for one dataset at `index`, or `None` where the dataset
    /// has no point.
    #[must_use]
    pub fn tooltip_label(&self, dataset: usize, index: usize) -> Option<String> {
        let dataset = self.datasets.get(dataset)?;
        let value = dataset.data.get(index).copied().flatten()?;
        let family = dataset.family();
        if family == MetricFamily::Price {
            return Some(format_price(value));
        }
        let formatted = if family.is_percentage() {
            format_percent(value)
        } else {
            format_value(value)
        };
        Some(format!(
            "{}: {formatted}{}",
            dataset.label,
            growth_annotation(&dataset.data, index)
        ))
    }
}

/// Union of every metric's dates within the window, ascending.
#[must_use]
pub fn chart_dates(metrics: &[ChartMetric], range: Option<(NaiveDate, NaiveDate)>) -> Vec<NaiveDate> {
    metrics
        .iter()
        .flat_map(|m| m.data.iter().map(|p| p.date))
        .filter(|d| range.is_none_or(|(from, to)| *d >= from && *d <= to))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn line_color(family: MetricFamily, name: &str) -> &'static str {
    match family {
        MetricFamily::Margin => MarginKind::from_name(name).map_or(theme::BAR_COLORS[0], margin_color),
        MetricFamily::Return => ReturnKind::from_name(name).map_or(theme::BAR_COLORS[0], return_color),
        MetricFamily::Valuation => {
            ValuationKind::from_name(name).map_or(theme::BAR_COLORS[0], valuation_color)
        }
        MetricFamily::Price | MetricFamily::Raw => PRICE_COLOR,
    }
}

fn dataset(index: usize, metric: &ChartMetric, dates: &[NaiveDate]) -> Dataset {
    let by_date: BTreeMap<NaiveDate, f64> = metric.data.iter().map(|p| (p.date, p.value)).collect();
    let data = dates.iter().map(|d| by_date.get(d).copied()).collect();
    let family = MetricFamily::of(&metric.name);

    let (kind, border, background, axis, order, tension) = match family {
        MetricFamily::Raw => {
            let color = bar_color(index);
            (
                DatasetKind::Bar,
                color.to_string(),
                format!("{color}{}", theme::BAR_FILL_ALPHA),
                AxisId::Y,
                index + 1,
                0.0,
            )
        }
        MetricFamily::Price => {
            (DatasetKind::Line, PRICE_COLOR.to_string(), "transparent".to_string(), AxisId::Price, 0, 0.4)
        }
        MetricFamily::Valuation | MetricFamily::Margin | MetricFamily::Return => {
            let axis = if family.is_percentage() { AxisId::Y1 } else { AxisId::Y };
            let color = line_color(family, &metric.name);
            (DatasetKind::Line, color.to_string(), "transparent".to_string(), axis, 0, 0.2)
        }
    };

    Dataset {
        label: metric.name.clone(),
        kind,
        data,
        border_color: border,
        background_color: background,
        y_axis_id: axis,
        order,
        tension,
        hidden: metric.hidden,
    }
}

fn axis(id: AxisId, datasets: &[Dataset], range: impl Fn(Vec<f64>) -> AxisRange) -> Axis {
    let members: Vec<&Dataset> = datasets.iter().filter(|d| d.y_axis_id == id).collect();
    let visible = members.iter().any(|d| !d.hidden);
    let values: Vec<f64> = members.iter().flat_map(|d| d.visible_values()).collect();
    Axis {
        id,
        display: !members.is_empty(),
        grid: visible,
        range: range(values),
    }
}

/// Builds the chart configuration for the selected metrics.
///
/// Axis ranges consider visible datasets only; an axis without a visible
/// dataset keeps its default range and draws no grid lines.
#[must_use]
pub fn build_chart_config(metrics: &[ChartMetric], options: &ChartOptions) -> ChartConfig {
    let dates = chart_dates(metrics, options.date_range);
    let datasets: Vec<Dataset> = metrics
        .iter()
        .enumerate()
        .map(|(i, m)| dataset(i, m, &dates))
        .collect();

    let axes = Axes {
        y: axis(AxisId::Y, &datasets, absolute_range),
        y1: axis(AxisId::Y1, &datasets, percentage_range),
        price: axis(AxisId::Price, &datasets, price_range),
    };

    ChartConfig {
        labels: dates.iter().map(|d| format_date(*d)).collect(),
        dates,
        datasets,
        axes,
        palette: options.theme.palette(),
        tooltip: options.theme.tooltip(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ChartDataPoint;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn metric(name: &str, points: &[(&str, f64)]) -> ChartMetric {
        ChartMetric::new(
            name,
            points.iter().map(|(d, v)| ChartDataPoint::new(date(d), *v)).collect(),
        )
    }

    fn sample() -> Vec<ChartMetric> {
        vec![
            metric("Revenue", &[("2022-12-31", 1e9), ("2023-12-31", 2e9)]),
            metric("Net Income Margin", &[("2023-12-31", 20.0)]),
            metric("Stock Price", &[("2024-01-02", 50.0)]),
        ]
    }

    #[test]
    fn test_datasets_are_aligned_to_date_union() {
        let config = build_chart_config(&sample(), &ChartOptions::default());
        assert_eq!(config.dates.len(), 3);
        assert_eq!(config.labels, vec!["Dec 2022", "Dec 2023", "Jan 2024"]);
        assert_eq!(config.datasets[1].data, vec![None, Some(20.0), None]);

        let revenue = &config.datasets[0];
        assert_eq!(revenue.kind, DatasetKind::Bar);
        assert_eq!(revenue.y_axis_id, AxisId::Y);
        assert_eq!(revenue.background_color, "#3B82F6CC");

        let margin = &config.datasets[1];
        assert_eq!(margin.kind, DatasetKind::Line);
        assert_eq!(margin.y_axis_id, AxisId::Y1);
        assert_eq!(margin.border_color, "rgb(147, 51, 234)");

        assert_eq!(config.datasets[2].y_axis_id, AxisId::Price);
        assert_eq!(config.datasets[2].border_color, PRICE_COLOR);
    }

    #[test]
    fn test_date_range_restricts_labels() {
        let options = ChartOptions {
            date_range: Some((date("2023-01-01"), date("2023-12-31"))),
            ..Default::default()
        };
        let config = build_chart_config(&sample(), &options);
        assert_eq!(config.dates, vec![date("2023-12-31")]);
    }

    #[test]
    fn test_hidden_series_do_not_range_or_grid() {
        let mut metrics = sample();
        metrics[1].hidden = true;
        let config = build_chart_config(&metrics, &ChartOptions::default());
        assert!(config.axes.y1.display);
        assert!(!config.axes.y1.grid);
        assert_eq!(config.axes.y1.range, AxisRange::new(-50.0, 100.0));
        assert!(config.axes.y.grid);
        assert!(config.axes.price.grid);
    }

    #[test]
    fn test_empty_chart_has_no_grid() {
        let config = build_chart_config(&[], &ChartOptions::default());
        assert!(config.datasets.is_empty());
        assert!(!config.axes.y.display && !config.axes.y.grid);
    }

    #[test]
    fn test_tooltips_use_metric_units() {
        let config = build_chart_config(&sample(), &ChartOptions { theme: ThemeMode::Light, date_range: None });
        assert_eq!(config.tooltip_title(1), "Dec 2023");
        assert_eq!(
            config.tooltip_label(0, 1).as_deref(),
            Some("Revenue: 2.0B (QoQ: +100.0%)")
        );
        assert_eq!(config.tooltip_label(1, 1).as_deref(), Some("Net Income Margin: 20.00%"));
        assert_eq!(config.tooltip_label(2, 2).as_deref(), Some("Price: $50.00"));
        assert_eq!(config.tooltip_label(1, 0), None);
        assert_eq!(config.tooltip.background, "#FFFFFF");
    }
}
