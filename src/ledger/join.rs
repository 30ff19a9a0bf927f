use std::collections::HashMap;

use tracing::debug;

use crate::ledger::OrderLine;
use crate::workbook::{CommissionRate, Delivery, SalesWorkbook};

/// Left-joins orders to commission rates by category, then to deliveries by
/// order id, and derives commission and logistics cost per line.
///
/// Joins fan out: a key matched by several right-hand rows yields one line
/// per match, in left order and then right order. Unmatched keys keep the
/// line with a missing rate or distance.
pub fn build_ledger(workbook: &SalesWorkbook) -> Vec<OrderLine> {
    let rates_by_category = index_by(&workbook.commission_rates, |r| r.category.as_str());
    let deliveries_by_order = index_by(&workbook.deliveries, |d| d.order_id.as_str());

    let mut lines = Vec::with_capacity(workbook.orders.len());
    for order in &workbook.orders {
        let rates: Vec<Option<&CommissionRate>> = matches_or_none(&rates_by_category, &order.category);
        let deliveries: Vec<Option<&Delivery>> = matches_or_none(&deliveries_by_order, &order.id);

        for rate in &rates {
            let commission_rate = rate.and_then(|r| r.rate);
            for delivery in &deliveries {
                let distance_km = delivery.and_then(|d| d.distance_km);
                lines.push(OrderLine {
                    order_id: order.id.clone(),
                    category: order.category.clone(),
                    client: order.client.clone(),
                    total_value: order.total_value,
                    date: order.date,
                    commission_rate,
                    commission: order.total_value.zip(commission_rate).map(|(v, r)| v * r),
                    distance_km,
                    logistics_cost: workbook.rate_table.cost_for_optional(distance_km),
                });
            }
        }
    }

    let unrated = lines.iter().filter(|l| l.commission_rate.is_none()).count();
    let undelivered = lines.iter().filter(|l| l.distance_km.is_none()).count();
    debug!(
        orders = workbook.orders.len(),
        lines = lines.len(),
        unrated,
        undelivered,
        "built ledger"
    );
    lines
}

fn index_by<'a, T>(rows: &'a [T], key: impl Fn(&'a T) -> &'a str) -> HashMap<&'a str, Vec<&'a T>> {
    let mut index: HashMap<&str, Vec<&T>> = HashMap::new();
    for row in rows {
        index.entry(key(row)).or_default().push(row);
    }
    index
}

fn matches_or_none<'a, T>(index: &HashMap<&str, Vec<&'a T>>, key: &str) -> Vec<Option<&'a T>> {
    match index.get(key) {
        Some(rows) => rows.iter().map(|row| Some(*row)).collect(),
        None => vec![None],
    }
}
