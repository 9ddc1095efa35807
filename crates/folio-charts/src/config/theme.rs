//! Theme palettes and series colors.

use serde::{Deserialize, Serialize};

use crate::metrics::{MarginKind, ReturnKind, ValuationKind};

/// Bar colors, cycled by series position.
pub const BAR_COLORS: [&str; 7] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#06B6D4",
];

/// Alpha suffix applied to bar fills.
pub const BAR_FILL_ALPHA: &str = "CC";

/// Price line color.
pub const PRICE_COLOR: &str = "#10B981";

/// Light or dark rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Dark background.
    #[default]
    Dark,
    /// Light background.
    Light,
}

/// Base colors of a theme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Palette {
    /// Chart background.
    pub background: &'static str,
    /// Secondary surfaces.
    pub secondary: &'static str,
    /// Labels and ticks.
    pub text: &'static str,
    /// Grid lines and borders.
    pub border: &'static str,
    /// Highlight color.
    pub accent: &'static str,
}

/// Tooltip colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TooltipStyle {
    /// Tooltip background.
    pub background: &'static str,
    /// Title and body text.
    pub text: &'static str,
    /// Tooltip border.
    pub border: &'static str,
}

impl ThemeMode {
    /// Base colors.
    #[must_use]
    pub const fn palette(&self) -> Palette {
        match self {
            Self::Dark => Palette {
                background: "#1F2937",
                secondary: "#374151",
                text: "#F9FAFB",
                border: "#4B5563",
                accent: "#3B82F6",
            },
            Self::Light => Palette {
                background: "#FFFFFF",
                secondary: "#F3F4F6",
                text: "#111827",
                border: "#E5E7EB",
                accent: "#2563EB",
            },
        }
    }

    /// Tooltip colors.
    #[must_use]
    pub const fn tooltip(&self) -> TooltipStyle {
        match self {
            Self::Dark => TooltipStyle {
                background: "#374151",
                text: "#F3F4F6",
                border: "#4B5563",
            },
            Self::Light => TooltipStyle {
                background: "#FFFFFF",
                text: "#111827",
                border: "#E5E7EB",
            },
        }
    }
}

/// Line color of a margin.
#[must_use]
pub const fn margin_color(kind: MarginKind) -> &'static str {
    match kind {
        MarginKind::NetIncome => "rgb(147, 51, 234)",
        MarginKind::GrossProfit => "rgb(6, 182, 212)",
        MarginKind::Operating => "rgb(245, 158, 11)",
        MarginKind::Ebitda => "rgb(59, 130, 246)",
        MarginKind::Fcf => "rgb(16, 185, 129)",
        MarginKind::OperatingCashFlow => "rgb(239, 68, 68)",
    }
}

/// Line color of a return ratio.
#[must_use]
pub const fn return_color(kind: ReturnKind) -> &'static str {
    match kind {
        ReturnKind::Roic => "rgb(220, 38, 38)",
        ReturnKind::Roce => "rgb(8, 145, 178)",
        ReturnKind::Roe => "rgb(132, 204, 22)",
        ReturnKind::Roa => "rgb(249, 115, 22)",
    }
}

/// Line color of a valuation ratio.
#[must_use]
pub const fn valuation_color(kind: ValuationKind) -> &'static str {
    match kind {
        ValuationKind::Pe => "rgb(147, 51, 234)",
        ValuationKind::FcfYield => "rgb(6, 182, 212)",
        ValuationKind::Ps => "rgb(245, 158, 11)",
        ValuationKind::EvEbitda => "rgb(59, 130, 246)",
        ValuationKind::Pgp => "rgb(16, 185, 129)",
        ValuationKind::Pb => "rgb(236, 72, 153)",
        ValuationKind::Ptb => "rgb(139, 92, 246)",
        ValuationKind::Poi => "rgb(239, 68, 68)",
    }
}

/// Bar color for the series at `index`.
#[must_use]
pub const fn bar_color(index: usize) -> &'static str {
    BAR_COLORS[index % BAR_COLORS.len()]
}
