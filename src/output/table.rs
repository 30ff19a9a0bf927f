use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Row, Table};

use crate::ledger::summary::{DashboardReport, GroupTotal, Summary};
use crate::ledger::OrderLine;
use crate::output::{format_amount, format_money};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn amount_cell(value: f64) -> Cell {
    Cell::new(format_amount(value)).set_alignment(CellAlignment::Right)
}

pub fn render_summary_table(summary: &Summary, currency_symbol: &str) -> String {
    let mut table = new_table();
    table.set_header(vec!["Indicador", "Valor"]);
    for (label, value) in summary.labelled() {
        let value_cell =
            Cell::new(format_money(currency_symbol, value)).set_alignment(CellAlignment::Right);
        let value_cell = if label == "Lucro Estimado" {
            if value < 0.0 {
                value_cell.fg(Color::Red)
            } else {
                value_cell.fg(Color::Green)
            }
        } else {
            value_cell
        };
        table.add_row(Row::from(vec![Cell::new(label), value_cell]));
    }
    table.to_string()
}

pub fn render_group_table(key_header: &str, value_header: &str, groups: &[GroupTotal]) -> String {
    let mut table = new_table();
    table.set_header(vec![key_header, value_header]);
    for group in groups {
        table.add_row(Row::from(vec![
            Cell::new(group.key.clone()),
            amount_cell(group.value),
        ]));
    }
    table.to_string()
}

/// Summary followed by the three breakdowns, as shown on the dashboard.
pub fn render_report_tables(report: &DashboardReport, currency_symbol: &str) -> String {
    let commission_header = format!("Comissão ({currency_symbol})");
    let mut out = String::new();
    out.push_str(&render_summary_table(&report.summary, currency_symbol));
    out.push_str("\n\nVendas por Categoria\n");
    out.push_str(&render_group_table(
        "Categoria",
        "Valor Total",
        &report.sales_by_category,
    ));
    out.push_str("\n\nComissão por Categoria\n");
    out.push_str(&render_group_table(
        "Categoria",
        &commission_header,
        &report.commission_by_category,
    ));
    out.push_str("\n\nComissão por Cliente\n");
    out.push_str(&render_group_table(
        "Cliente",
        &commission_header,
        &report.commission_by_client,
    ));
    out.push_str(&format!("\n{} pedidos selecionados", report.line_count));
    out
}

pub fn render_ledger_table(lines: &[&OrderLine]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Pedido",
        "Data",
        "Categoria",
        "Cliente",
        "Valor Total",
        "Comissão (%)",
        "Comissão (R$)",
        "Distância KM",
        "Custo Logístico",
        "Lucro",
    ]);
    for line in lines {
        table.add_row(vec![
            Cell::new(line.order_id.clone()),
            Cell::new(
                line.date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(line.category.clone()),
            Cell::new(line.client.clone()),
            line.total_value
                .map(amount_cell)
                .unwrap_or_else(|| Cell::new("-")),
            Cell::new(
                line.commission_rate
                    .map(|r| format!("{:.2}%", r * 100.0))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            line.commission
                .map(amount_cell)
                .unwrap_or_else(|| Cell::new("-")),
            Cell::new(
                line.distance_km
                    .map(|d| format!("{d:.1}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            amount_cell(line.logistics_cost),
            amount_cell(line.net_profit()),
        ]);
    }
    table.to_string()
}
