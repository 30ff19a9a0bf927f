pub mod cell;
pub mod reader;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::logistics::RateTable;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub category: String,
    pub client: String,
    /// Blank in the workbook means unknown; it adds nothing to totals.
    pub total_value: Option<f64>,
    /// Blank in the workbook means unknown; such orders fall outside any
    /// period filter.
    pub date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommissionRate {
    pub category: String,
    /// Fraction of the order value, e.g. `0.05` for 5%.
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub order_id: String,
    pub distance_km: Option<f64>,
}

/// The four tables of an uploaded sales workbook, already typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SalesWorkbook {
    pub orders: Vec<Order>,
    pub commission_rates: Vec<CommissionRate>,
    pub deliveries: Vec<Delivery>,
    pub rate_table: RateTable,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use calamine::Data;
    use chrono::NaiveDate;

    use super::*;
    use crate::logistics::RateBand;

    pub fn order(id: &str, category: &str, client: &str, value: f64, day: u32) -> Order {
        Order {
            id: id.to_string(),
            category: category.to_string(),
            client: client.to_string(),
            total_value: Some(value),
            date: Some(
                NaiveDate::from_ymd_opt(2024, 3, day)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .expect("valid fixture date"),
            ),
        }
    }

    /// Five orders over three categories and three clients. The "Brinquedos"
    /// category has no commission rate and order 1005 has no delivery row.
    pub fn sample_workbook() -> SalesWorkbook {
        SalesWorkbook {
            orders: vec![
                order("1001", "Eletrônicos", "Loja Centro", 1000.0, 1),
                order("1002", "Móveis", "Casa Bela", 2500.0, 5),
                order("1003", "Eletrônicos", "Casa Bela", 400.0, 10),
                order("1004", "Brinquedos", "Mundo Kids", 300.0, 15),
                order("1005", "Móveis", "Loja Centro", 1200.0, 20),
            ],
            commission_rates: vec![
                CommissionRate {
                    category: "Eletrônicos".to_string(),
                    rate: Some(0.05),
                },
                CommissionRate {
                    category: "Móveis".to_string(),
                    rate: Some(0.08),
                },
            ],
            deliveries: vec![
                Delivery {
                    order_id: "1001".to_string(),
                    distance_km: Some(5.0),
                },
                Delivery {
                    order_id: "1002".to_string(),
                    distance_km: Some(25.0),
                },
                Delivery {
                    order_id: "1003".to_string(),
                    distance_km: Some(60.0),
                },
                Delivery {
                    order_id: "1004".to_string(),
                    distance_km: Some(12.0),
                },
            ],
            rate_table: RateTable::new(vec![
                RateBand::new(0.0, 10.0, 1.5),
                RateBand::new(10.01, 30.0, 2.0),
                RateBand::new(30.01, 50.0, 2.5),
            ]),
        }
    }

    pub fn text(value: &str) -> Data {
        Data::String(value.to_string())
    }

    pub fn num(value: f64) -> Data {
        Data::Float(value)
    }

    pub type FixtureSheet = (&'static str, Vec<Vec<Data>>);

    /// The rows of [`sample_workbook`] as they appear in a spreadsheet, dates
    /// typed as text.
    pub fn sample_sheets() -> Vec<FixtureSheet> {
        let order_row = |id: f64, category: &str, client: &str, value: f64, date: &str| {
            vec![num(id), text(category), text(client), num(value), text(date)]
        };
        vec![
            (
                "Pedidos",
                vec![
                    vec![
                        text("PedidoID"),
                        text("Categoria"),
                        text("Cliente"),
                        text("Valor Total"),
                        text("Data"),
                    ],
                    order_row(1001.0, "Eletrônicos", "Loja Centro", 1000.0, "2024-03-01"),
                    order_row(1002.0, "Móveis", "Casa Bela", 2500.0, "2024-03-05"),
                    order_row(1003.0, "Eletrônicos", "Casa Bela", 400.0, "2024-03-10"),
                    order_row(1004.0, "Brinquedos", "Mundo Kids", 300.0, "2024-03-15"),
                    order_row(1005.0, "Móveis", "Loja Centro", 1200.0, "2024-03-20"),
                ],
            ),
            (
                "Comissao",
                vec![
                    vec![text("Categoria"), text("Comissão (%)")],
                    vec![text("Eletrônicos"), num(0.05)],
                    vec![text("Móveis"), num(0.08)],
                ],
            ),
            (
                "Entregas",
                vec![
                    vec![text("PedidoID"), text("Distância KM")],
                    vec![num(1001.0), num(5.0)],
                    vec![num(1002.0), num(25.0)],
                    vec![num(1003.0), num(60.0)],
                    vec![num(1004.0), num(12.0)],
                ],
            ),
            (
                "Faixas_KM",
                vec![
                    vec![text("Raio Inicial"), text("Raio Final"), text("Valor por KM")],
                    vec![num(0.0), num(10.0), num(1.5)],
                    vec![num(10.01), num(30.0), num(2.0)],
                    vec![num(30.01), num(50.0), num(2.5)],
                ],
            ),
        ]
    }

    /// Writes the sheets into an in-memory `.xlsx`. Empty cells are left
    /// unwritten so they read back blank.
    pub fn xlsx_bytes(sheets: &[FixtureSheet]) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        for (name, rows) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(*name).expect("valid sheet name");
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let (r, c) = (r as u32, c as u16);
                    match cell {
                        Data::String(value) => {
                            worksheet.write_string(r, c, value).expect("text cell");
                        }
                        Data::Float(value) => {
                            worksheet.write_number(r, c, *value).expect("number cell");
                        }
                        Data::Int(value) => {
                            worksheet.write_number(r, c, *value as f64).expect("number cell");
                        }
                        Data::Empty => {}
                        other => panic!("unsupported fixture cell {other:?}"),
                    }
                }
            }
        }
        workbook.save_to_buffer().expect("workbook saves")
    }

    pub fn sample_xlsx() -> Vec<u8> {
        xlsx_bytes(&sample_sheets())
    }
}
