use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Range, Reader, Xlsx};
use tracing::debug;

use crate::config::{CommissionSheet, DeliveriesSheet, OrdersSheet, RateBandsSheet, WorkbookLayout};
use crate::error::{DashboardError, DashboardResult};
use crate::logistics::{RateBand, RateTable};
use crate::workbook::cell::{cell_datetime, cell_number, cell_text, is_blank};
use crate::workbook::{CommissionRate, Delivery, Order, SalesWorkbook};

static EMPTY: Data = Data::Empty;

pub fn read_workbook_path(path: &Path, layout: &WorkbookLayout) -> DashboardResult<SalesWorkbook> {
    let bytes = std::fs::read(path)?;
    read_workbook_bytes(bytes, layout)
}

pub fn read_workbook_bytes(bytes: Vec<u8>, layout: &WorkbookLayout) -> DashboardResult<SalesWorkbook> {
    let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

    let orders = read_sheet(&mut xlsx, &layout.orders.sheet)?;
    let commission = read_sheet(&mut xlsx, &layout.commission.sheet)?;
    let deliveries = read_sheet(&mut xlsx, &layout.deliveries.sheet)?;
    let rate_bands = read_sheet(&mut xlsx, &layout.rate_bands.sheet)?;

    parse_workbook(&orders, &commission, &deliveries, &rate_bands, layout)
}

/// Types the four sheet ranges of a workbook.
pub fn parse_workbook(
    orders: &Range<Data>,
    commission: &Range<Data>,
    deliveries: &Range<Data>,
    rate_bands: &Range<Data>,
    layout: &WorkbookLayout,
) -> DashboardResult<SalesWorkbook> {
    let workbook = SalesWorkbook {
        orders: parse_orders(orders, &layout.orders)?,
        commission_rates: parse_commission_rates(commission, &layout.commission)?,
        deliveries: parse_deliveries(deliveries, &layout.deliveries)?,
        rate_table: parse_rate_bands(rate_bands, &layout.rate_bands)?,
    };
    debug!(
        orders = workbook.orders.len(),
        commission_rates = workbook.commission_rates.len(),
        deliveries = workbook.deliveries.len(),
        rate_bands = workbook.rate_table.bands().len(),
        "parsed workbook"
    );
    Ok(workbook)
}

fn read_sheet<RS: Read + Seek>(xlsx: &mut Xlsx<RS>, name: &str) -> DashboardResult<Range<Data>> {
    if !xlsx.sheet_names().iter().any(|sheet| sheet == name) {
        return Err(DashboardError::MissingSheet(name.to_string()));
    }
    Ok(xlsx.worksheet_range(name)?)
}

pub fn parse_orders(range: &Range<Data>, layout: &OrdersSheet) -> DashboardResult<Vec<Order>> {
    let table = SheetTable::new(&layout.sheet, range);
    let id = table.column(&layout.order_id)?;
    let category = table.column(&layout.category)?;
    let client = table.column(&layout.client)?;
    let total_value = table.column(&layout.total_value)?;
    let date = table.column(&layout.date)?;

    table
        .rows()
        .into_iter()
        .map(|row| {
            Ok(Order {
                id: row.text(id)?,
                category: row.text(category)?,
                client: row.text(client)?,
                total_value: row.optional_number(total_value)?,
                date: row.optional_datetime(date)?,
            })
        })
        .collect()
}

pub fn parse_commission_rates(
    range: &Range<Data>,
    layout: &CommissionSheet,
) -> DashboardResult<Vec<CommissionRate>> {
    let table = SheetTable::new(&layout.sheet, range);
    let category_col = table.column(&layout.category)?;
    let rate_col = table.column(&layout.rate)?;

    // A rate without a category can never join to an order.
    table
        .rows()
        .into_iter()
        .map(|row| {
            let Some(category) = row.optional_text(category_col) else {
                return Ok(None);
            };
            Ok(Some(CommissionRate {
                category,
                rate: row.optional_number(rate_col)?,
            }))
        })
        .filter_map(Result::transpose)
        .collect()
}

pub fn parse_deliveries(
    range: &Range<Data>,
    layout: &DeliveriesSheet,
) -> DashboardResult<Vec<Delivery>> {
    let table = SheetTable::new(&layout.sheet, range);
    let order_id_col = table.column(&layout.order_id)?;
    let distance_col = table.column(&layout.distance_km)?;

    table
        .rows()
        .into_iter()
        .map(|row| {
            let Some(order_id) = row.optional_text(order_id_col) else {
                return Ok(None);
            };
            Ok(Some(Delivery {
                order_id,
                distance_km: row.optional_number(distance_col)?,
            }))
        })
        .filter_map(Result::transpose)
        .collect()
}

pub fn parse_rate_bands(range: &Range<Data>, layout: &RateBandsSheet) -> DashboardResult<RateTable> {
    let table = SheetTable::new(&layout.sheet, range);
    let start = table.column(&layout.start_km)?;
    let end = table.column(&layout.end_km)?;
    let price = table.column(&layout.price_per_km)?;

    let bands = table
        .rows()
        .into_iter()
        .map(|row| {
            Ok(RateBand::from_parts(
                row.optional_number(start)?,
                row.optional_number(end)?,
                row.optional_number(price)?,
            ))
        })
        .collect::<DashboardResult<Vec<_>>>()?;
    Ok(RateTable::new(bands))
}

/// A sheet whose first row holds column headers.
struct SheetTable<'a> {
    sheet: &'a str,
    range: &'a Range<Data>,
    headers: HashMap<String, usize>,
}

struct SheetRow<'s> {
    table: &'s SheetTable<'s>,
    number: usize,
    cells: &'s [Data],
}

impl<'a> SheetTable<'a> {
    fn new(sheet: &'a str, range: &'a Range<Data>) -> Self {
        let headers = range
            .rows()
            .next()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter_map(|(idx, cell)| cell_text(cell).map(|name| (name, idx)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            sheet,
            range,
            headers,
        }
    }

    fn column(&self, name: &str) -> DashboardResult<usize> {
        self.headers
            .get(name.trim())
            .copied()
            .ok_or_else(|| DashboardError::MissingColumn {
                sheet: self.sheet.to_string(),
                column: name.to_string(),
            })
    }

    fn column_name(&self, idx: usize) -> String {
        self.headers
            .iter()
            .find(|(_, col)| **col == idx)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| format!("#{}", idx + 1))
    }

    /// Data rows with their 1-based spreadsheet row number; blank rows are
    /// skipped.
    fn rows(&self) -> Vec<SheetRow<'_>> {
        let first_row = self
            .range
            .start()
            .map(|(row, _)| row as usize)
            .unwrap_or(0);
        self.range
            .rows()
            .enumerate()
            .skip(1)
            .filter(|(_, cells)| !cells.iter().all(is_blank))
            .map(|(idx, cells)| SheetRow {
                table: self,
                number: first_row + idx + 1,
                cells,
            })
            .collect()
    }
}

impl SheetRow<'_> {
    fn cell(&self, idx: usize) -> &Data {
        self.cells.get(idx).unwrap_or(&EMPTY)
    }

    fn invalid(&self, idx: usize, reason: impl Into<String>) -> DashboardError {
        DashboardError::InvalidCell {
            sheet: self.table.sheet.to_string(),
            row: self.number,
            column: self.table.column_name(idx),
            reason: reason.into(),
        }
    }

    fn optional_text(&self, idx: usize) -> Option<String> {
        cell_text(self.cell(idx))
    }

    fn text(&self, idx: usize) -> DashboardResult<String> {
        self.optional_text(idx)
            .ok_or_else(|| self.invalid(idx, "value is required"))
    }

    fn optional_number(&self, idx: usize) -> DashboardResult<Option<f64>> {
        cell_number(self.cell(idx)).map_err(|reason| self.invalid(idx, reason))
    }

    fn optional_datetime(&self, idx: usize) -> DashboardResult<Option<chrono::NaiveDateTime>> {
        cell_datetime(self.cell(idx)).map_err(|reason| self.invalid(idx, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::fixtures::{sample_sheets, sample_workbook, sample_xlsx, xlsx_bytes};

    fn sheet(rows: &[&[Data]]) -> Range<Data> {
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (rows.len() as u32 - 1, width - 1));
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), cell.clone());
            }
        }
        range
    }

    fn s(value: &str) -> Data {
        Data::String(value.to_string())
    }

    fn orders_range() -> Range<Data> {
        sheet(&[
            &[s("PedidoID"), s("Categoria"), s("Cliente"), s("Valor Total"), s("Data")],
            &[Data::Float(1001.0), s("Móveis"), s("Casa Bela"), Data::Float(2500.0), Data::Float(45_352.0)],
            &[Data::Empty, Data::Empty, Data::Empty, Data::Empty, Data::Empty],
            &[s("1002"), s("Eletrônicos"), s("Loja Centro"), Data::Int(400), s("2024-03-10")],
        ])
    }

    #[test]
    fn parses_orders_and_skips_blank_rows() {
        let orders = parse_orders(&orders_range(), &OrdersSheet::default()).expect("orders parse");
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, "1001");
        assert_eq!(orders[0].total_value, Some(2500.0));
        assert_eq!(
            orders[0].date.map(|d| d.to_string()).as_deref(),
            Some("2024-03-01 00:00:00")
        );
        assert_eq!(orders[1].id, "1002");
        assert_eq!(orders[1].client, "Loja Centro");
        assert_eq!(
            orders[1].date.map(|d| d.to_string()).as_deref(),
            Some("2024-03-10 00:00:00")
        );
    }

    #[test]
    fn columns_are_found_by_header_not_position() {
        let range = sheet(&[
            &[s("Valor por KM"), s("Raio Final"), s("Raio Inicial")],
            &[Data::Float(1.5), Data::Float(10.0), Data::Float(0.0)],
            &[Data::Float(2.0), Data::Float(30.0), Data::Float(10.01)],
        ]);
        let table = parse_rate_bands(&range, &RateBandsSheet::default()).expect("bands parse");
        assert_eq!(
            table.bands(),
            &[RateBand::new(0.0, 10.0, 1.5), RateBand::new(10.01, 30.0, 2.0)]
        );
    }

    #[test]
    fn blank_rate_and_distance_are_missing_values() {
        let commission = sheet(&[
            &[s("Categoria"), s("Comissão (%)")],
            &[s("Móveis"), Data::Float(0.08)],
            &[s("Brinquedos"), Data::Empty],
        ]);
        let rates = parse_commission_rates(&commission, &CommissionSheet::default())
            .expect("rates parse");
        assert_eq!(rates[0].rate, Some(0.08));
        assert_eq!(rates[1].rate, None);

        let deliveries = sheet(&[
            &[s("PedidoID"), s("Distância KM")],
            &[Data::Int(1001), Data::Empty],
        ]);
        let parsed = parse_deliveries(&deliveries, &DeliveriesSheet::default())
            .expect("deliveries parse");
        assert_eq!(parsed[0].order_id, "1001");
        assert_eq!(parsed[0].distance_km, None);
    }

    #[test]
    fn missing_column_names_the_sheet() {
        let range = sheet(&[&[s("PedidoID"), s("Categoria")], &[s("1"), s("x")]]);
        let err = parse_orders(&range, &OrdersSheet::default()).expect_err("missing columns");
        match err {
            DashboardError::MissingColumn { sheet, column } => {
                assert_eq!(sheet, "Pedidos");
                assert_eq!(column, "Cliente");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_date_reports_row_and_column() {
        let range = sheet(&[
            &[s("PedidoID"), s("Categoria"), s("Cliente"), s("Valor Total"), s("Data")],
            &[s("1"), s("Móveis"), s("Casa Bela"), Data::Float(10.0), s("amanhã")],
        ]);
        let err = parse_orders(&range, &OrdersSheet::default()).expect_err("bad date");
        match err {
            DashboardError::InvalidCell { sheet, row, column, .. } => {
                assert_eq!(sheet, "Pedidos");
                assert_eq!(row, 2);
                assert_eq!(column, "Data");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_client_is_rejected() {
        let range = sheet(&[
            &[s("PedidoID"), s("Categoria"), s("Cliente"), s("Valor Total"), s("Data")],
            &[s("1"), s("Móveis"), Data::Empty, Data::Float(10.0), s("2024-03-01")],
        ]);
        match parse_orders(&range, &OrdersSheet::default()) {
            Err(DashboardError::InvalidCell { column, .. }) => assert_eq!(column, "Cliente"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn blank_value_and_date_are_missing_values() {
        let range = sheet(&[
            &[s("PedidoID"), s("Categoria"), s("Cliente"), s("Valor Total"), s("Data")],
            &[s("1"), s("Móveis"), s("Casa Bela"), Data::Empty, s("2024-03-01")],
            &[s("2"), s("Móveis"), s("Casa Bela"), Data::Float(10.0), Data::Empty],
        ]);
        let orders = parse_orders(&range, &OrdersSheet::default()).expect("orders parse");
        assert_eq!(orders[0].total_value, None);
        assert!(orders[0].date.is_some());
        assert_eq!(orders[1].total_value, Some(10.0));
        assert_eq!(orders[1].date, None);
    }

    #[test]
    fn blank_band_cells_are_kept_as_missing() {
        let range = sheet(&[
            &[s("Raio Inicial"), s("Raio Final"), s("Valor por KM")],
            &[Data::Float(0.0), Data::Float(30.0), Data::Float(2.0)],
            &[Data::Float(30.01), Data::Empty, Data::Float(3.0)],
            &[Data::Float(50.0), Data::Float(80.0), Data::Empty],
        ]);
        let table = parse_rate_bands(&range, &RateBandsSheet::default()).expect("bands parse");
        assert_eq!(
            table.bands(),
            &[
                RateBand::new(0.0, 30.0, 2.0),
                RateBand::from_parts(Some(30.01), None, Some(3.0)),
                RateBand::from_parts(Some(50.0), Some(80.0), None),
            ]
        );
        assert_eq!(table.cost_for(25.0), 50.0);
        assert_eq!(table.cost_for(40.0), 0.0);
        assert_eq!(table.cost_for(60.0), 0.0);
    }

    #[test]
    fn rows_without_join_key_are_skipped() {
        let commission = sheet(&[
            &[s("Categoria"), s("Comissão (%)")],
            &[Data::Empty, Data::Float(0.1)],
            &[s("Móveis"), Data::Float(0.08)],
        ]);
        let rates = parse_commission_rates(&commission, &CommissionSheet::default())
            .expect("rates parse");
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].category, "Móveis");

        let deliveries = sheet(&[
            &[s("PedidoID"), s("Distância KM")],
            &[Data::Empty, Data::Float(7.0)],
        ]);
        let parsed = parse_deliveries(&deliveries, &DeliveriesSheet::default())
            .expect("deliveries parse");
        assert!(parsed.is_empty());
    }

    #[test]
    fn reads_generated_xlsx() {
        let workbook = read_workbook_bytes(sample_xlsx(), &WorkbookLayout::default())
            .expect("workbook reads");
        assert_eq!(workbook, sample_workbook());
    }

    #[test]
    fn missing_sheet_is_named() {
        let sheets: Vec<_> = sample_sheets()
            .into_iter()
            .filter(|(name, _)| *name != "Entregas")
            .collect();
        let err = read_workbook_bytes(xlsx_bytes(&sheets), &WorkbookLayout::default())
            .expect_err("sheet missing");
        match err {
            DashboardError::MissingSheet(name) => assert_eq!(name, "Entregas"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn renamed_sheets_follow_layout() {
        let sheets: Vec<_> = sample_sheets()
            .into_iter()
            .map(|(name, rows)| if name == "Pedidos" { ("Orders", rows) } else { (name, rows) })
            .collect();
        let mut layout = WorkbookLayout::default();
        layout.orders.sheet = "Orders".to_string();
        let workbook = read_workbook_bytes(xlsx_bytes(&sheets), &layout).expect("workbook reads");
        assert_eq!(workbook.orders.len(), 5);
    }

    #[test]
    fn garbage_bytes_are_a_workbook_error() {
        let err = read_workbook_bytes(b"not a workbook".to_vec(), &WorkbookLayout::default())
            .expect_err("not a zip");
        assert!(matches!(err, DashboardError::Workbook(_)));
    }
}
