use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ledger::filter::{filter_options, FilterOptions, OrderFilter};
use crate::ledger::OrderLine;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub total_sales: f64,
    pub total_commission: f64,
    pub total_logistics: f64,
    pub net_profit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupTotal {
    pub key: String,
    pub value: f64,
}

/// Everything the dashboard shows for one upload and one filter selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardReport {
    pub summary: Summary,
    pub sales_by_category: Vec<GroupTotal>,
    pub commission_by_category: Vec<GroupTotal>,
    pub commission_by_client: Vec<GroupTotal>,
    pub options: FilterOptions,
    pub filter: OrderFilter,
    pub line_count: usize,
}

impl Summary {
    /// Missing values and commissions are skipped, matching a NaN-skipping sum.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a OrderLine>) -> Self {
        let mut total_sales = 0.0;
        let mut total_commission = 0.0;
        let mut total_logistics = 0.0;
        for line in lines {
            if let Some(value) = line.total_value {
                total_sales += value;
            }
            if let Some(commission) = line.commission {
                total_commission += commission;
            }
            total_logistics += line.logistics_cost;
        }
        Self {
            total_sales,
            total_commission,
            total_logistics,
            net_profit: total_sales - total_commission - total_logistics,
        }
    }

    /// Labelled figures in the order they are displayed.
    pub fn labelled(&self) -> [(&'static str, f64); 4] {
        [
            ("Total Vendido", self.total_sales),
            ("Comissão Total", self.total_commission),
            ("Logística Total", self.total_logistics),
            ("Lucro Estimado", self.net_profit),
        ]
    }
}

/// Sums `value` per `key`, sorted by key. A group whose values are all
/// missing still appears with `0.0`.
pub fn group_sum<'a, K, V>(lines: &[&'a OrderLine], key: K, value: V) -> Vec<GroupTotal>
where
    K: Fn(&'a OrderLine) -> &'a str,
    V: Fn(&OrderLine) -> Option<f64>,
{
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();
    for line in lines {
        let total = groups.entry(key(*line)).or_insert(0.0);
        if let Some(v) = value(*line) {
            *total += v;
        }
    }
    groups
        .into_iter()
        .map(|(key, value)| GroupTotal {
            key: key.to_string(),
            value,
        })
        .collect()
}

pub fn build_report(lines: &[OrderLine], filter: &OrderFilter) -> DashboardReport {
    let selected = filter.apply(lines);
    DashboardReport {
        summary: Summary::from_lines(selected.iter().copied()),
        sales_by_category: group_sum(&selected, |l| l.category.as_str(), |l| l.total_value),
        commission_by_category: group_sum(&selected, |l| l.category.as_str(), |l| l.commission),
        commission_by_client: group_sum(&selected, |l| l.client.as_str(), |l| l.commission),
        options: filter_options(lines),
        filter: filter.clone(),
        line_count: selected.len(),
    }
}
