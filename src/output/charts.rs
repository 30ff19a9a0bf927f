use std::fmt::{Display, Formatter};
use std::str::FromStr;

use plotters::coord::ranged1d::SegmentValue;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{DashboardError, DashboardResult};
use crate::ledger::summary::{DashboardReport, GroupTotal};
use crate::output::format_amount;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 560;
const FONT: &str = "sans-serif";

// Qualitative palette, cycled when there are more groups than colours.
const PALETTE: [RGBColor; 10] = [
    RGBColor(0x63, 0x6E, 0xFA),
    RGBColor(0xEF, 0x55, 0x3B),
    RGBColor(0x00, 0xCC, 0x96),
    RGBColor(0xAB, 0x63, 0xFA),
    RGBColor(0xFF, 0xA1, 0x5A),
    RGBColor(0x19, 0xD3, 0xF3),
    RGBColor(0xFF, 0x66, 0x92),
    RGBColor(0xB6, 0xE8, 0x80),
    RGBColor(0xFF, 0x97, 0xFF),
    RGBColor(0xFE, 0xCB, 0x52),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    SalesByCategory,
    CommissionByCategory,
    CommissionByClient,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::SalesByCategory,
        ChartKind::CommissionByCategory,
        ChartKind::CommissionByClient,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::SalesByCategory => "sales-by-category",
            Self::CommissionByCategory => "commission-by-category",
            Self::CommissionByClient => "commission-by-client",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::SalesByCategory => "Vendas por Categoria",
            Self::CommissionByCategory => "Comissão por Categoria",
            Self::CommissionByClient => "Comissão por Cliente",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.svg", self.as_slug())
    }
}

impl Display for ChartKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Error)]
#[error("unknown chart: {0}")]
pub struct ChartParseError(pub String);

impl FromStr for ChartKind {
    type Err = ChartParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_end_matches(".svg").to_ascii_lowercase();
        match normalized.as_str() {
            "sales-by-category" => Ok(Self::SalesByCategory),
            "commission-by-category" => Ok(Self::CommissionByCategory),
            "commission-by-client" => Ok(Self::CommissionByClient),
            _ => Err(ChartParseError(s.to_string())),
        }
    }
}

/// Renders one of the dashboard charts as an SVG document.
pub fn render_chart(
    kind: ChartKind,
    report: &DashboardReport,
    currency_symbol: &str,
) -> DashboardResult<String> {
    match kind {
        ChartKind::SalesByCategory => render_donut(kind.title(), &report.sales_by_category),
        ChartKind::CommissionByCategory => render_bars(
            kind.title(),
            "Categoria",
            &format!("Comissão ({currency_symbol})"),
            &report.commission_by_category,
        ),
        ChartKind::CommissionByClient => render_bars(
            kind.title(),
            "Cliente",
            &format!("Comissão ({currency_symbol})"),
            &report.commission_by_client,
        ),
    }
}

fn chart_error(error: impl Display) -> DashboardError {
    DashboardError::Chart(error.to_string())
}

fn color(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

/// Share of each slice with its label, e.g. `Móveis 68.5%`.
pub fn slice_labels(groups: &[GroupTotal]) -> Vec<String> {
    let total: f64 = groups.iter().map(|g| g.value.max(0.0)).sum();
    groups
        .iter()
        .map(|g| {
            let share = if total > 0.0 {
                g.value.max(0.0) / total * 100.0
            } else {
                0.0
            };
            format!("{} {share:.1}%", g.key)
        })
        .collect()
}

fn render_svg<F>(draw: F) -> DashboardResult<String>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> DashboardResult<()>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;
        draw(&root)?;
        root.present().map_err(chart_error)?;
    }
    Ok(svg)
}

fn render_donut(title: &str, groups: &[GroupTotal]) -> DashboardResult<String> {
    render_svg(|root| {
        let area = root.titled(title, (FONT, 24)).map_err(chart_error)?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);

        let slices: Vec<GroupTotal> = groups.iter().filter(|g| g.value > 0.0).cloned().collect();
        if slices.is_empty() {
            return draw_no_data(&area, center);
        }

        let radius = f64::from(w.min(h)) * 0.34;
        let sizes: Vec<f64> = slices.iter().map(|g| g.value).collect();
        let colors: Vec<RGBColor> = (0..slices.len()).map(color).collect();
        let labels = slice_labels(&slices);

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.label_style((FONT, 15).into_font().color(&BLACK));
        area.draw(&pie).map_err(chart_error)?;
        // Hole of the donut.
        area.draw(&Circle::new(center, (radius * 0.4) as i32, WHITE.filled()))
            .map_err(chart_error)
    })
}

fn render_bars(
    title: &str,
    x_desc: &str,
    y_desc: &str,
    groups: &[GroupTotal],
) -> DashboardResult<String> {
    render_svg(|root| {
        if groups.is_empty() {
            let area = root.titled(title, (FONT, 24)).map_err(chart_error)?;
            let (w, h) = area.dim_in_pixel();
            return draw_no_data(&area, (w as i32 / 2, h as i32 / 2));
        }

        let max = groups.iter().map(|g| g.value).fold(0.0_f64, f64::max);
        let y_max = if max > 0.0 { max * 1.15 } else { 1.0 };
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();

        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 24))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d((0..groups.len()).into_segmented(), 0.0..y_max)
            .map_err(chart_error)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(groups.len())
            .x_label_formatter(&|value| match value {
                SegmentValue::CenterOf(idx) => {
                    keys.get(*idx).map(|k| k.to_string()).unwrap_or_default()
                }
                _ => String::new(),
            })
            .y_label_formatter(&|value| format_amount(*value))
            .x_desc(x_desc)
            .y_desc(y_desc)
            .draw()
            .map_err(chart_error)?;

        chart
            .draw_series(groups.iter().enumerate().map(|(idx, group)| {
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(idx), 0.0),
                        (SegmentValue::Exact(idx + 1), group.value.max(0.0)),
                    ],
                    color(idx).filled(),
                );
                bar.set_margin(0, 0, 10, 10);
                bar
            }))
            .map_err(chart_error)?;

        let value_style =
            TextStyle::from((FONT, 14).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom));
        chart
            .draw_series(groups.iter().enumerate().map(|(idx, group)| {
                Text::new(
                    si_label(group.value),
                    (SegmentValue::CenterOf(idx), group.value.max(0.0)),
                    value_style.clone(),
                )
            }))
            .map_err(chart_error)?;
        Ok(())
    })
}

fn draw_no_data<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    center: (i32, i32),
) -> DashboardResult<()> {
    let style = TextStyle::from((FONT, 18).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new("Sem dados", center, style))
        .map_err(chart_error)
}

/// Two significant digits with an SI suffix, e.g. `5.4k` or `370`.
pub fn si_label(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "G")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "k")
    } else {
        (value, "")
    };
    if scaled.abs() >= 100.0 {
        format!("{:.0}{suffix}", (scaled / 10.0).round() * 10.0)
    } else if scaled.abs() >= 10.0 {
        format!("{scaled:.0}{suffix}")
    } else {
        format!("{scaled:.1}{suffix}")
    }
}
