use std::path::Path;

use tracing::info;

use crate::config::WorkbookLayout;
use crate::error::DashboardResult;
use crate::ledger::filter::OrderFilter;
use crate::ledger::join::build_ledger;
use crate::ledger::summary::{build_report, DashboardReport};
use crate::ledger::OrderLine;
use crate::workbook::reader::{read_workbook_bytes, read_workbook_path};
use crate::workbook::SalesWorkbook;

/// A loaded workbook, joined into per-order lines. Every CLI invocation and
/// every upload builds one from scratch.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    lines: Vec<OrderLine>,
}

impl Dashboard {
    pub fn from_workbook(workbook: &SalesWorkbook) -> Self {
        let lines = build_ledger(workbook);
        info!(
            orders = workbook.orders.len(),
            commission_rates = workbook.commission_rates.len(),
            deliveries = workbook.deliveries.len(),
            rate_bands = workbook.rate_table.bands().len(),
            lines = lines.len(),
            "workbook loaded"
        );
        Self { lines }
    }

    pub fn from_bytes(bytes: Vec<u8>, layout: &WorkbookLayout) -> DashboardResult<Self> {
        let workbook = read_workbook_bytes(bytes, layout)?;
        Ok(Self::from_workbook(&workbook))
    }

    pub fn from_path(path: &Path, layout: &WorkbookLayout) -> DashboardResult<Self> {
        let workbook = read_workbook_path(path, layout)?;
        Ok(Self::from_workbook(&workbook))
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn filtered(&self, filter: &OrderFilter) -> Vec<&OrderLine> {
        filter.apply(&self.lines)
    }

    pub fn report(&self, filter: &OrderFilter) -> DashboardReport {
        build_report(&self.lines, filter)
    }
}
