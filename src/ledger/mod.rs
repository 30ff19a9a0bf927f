pub mod filter;
pub mod join;
pub mod summary;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One order after joining its commission rate and delivery distance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub order_id: String,
    pub category: String,
    pub client: String,
    pub total_value: Option<f64>,
    pub date: Option<NaiveDateTime>,
    pub commission_rate: Option<f64>,
    pub commission: Option<f64>,
    pub distance_km: Option<f64>,
    pub logistics_cost: f64,
}

impl OrderLine {
    pub fn net_profit(&self) -> f64 {
        self.total_value.unwrap_or(0.0) - self.commission.unwrap_or(0.0) - self.logistics_cost
    }
}
