use anyhow::Result;

use crate::ledger::summary::DashboardReport;
use crate::ledger::OrderLine;

pub fn ledger_to_csv(lines: &[&OrderLine]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "order_id",
        "date",
        "category",
        "client",
        "total_value",
        "commission_rate",
        "commission",
        "distance_km",
        "logistics_cost",
        "net_profit",
    ])?;
    for line in lines {
        writer.write_record([
            line.order_id.clone(),
            line.date
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            line.category.clone(),
            line.client.clone(),
            line.total_value.map(|v| format!("{v:.2}")).unwrap_or_default(),
            line.commission_rate
                .map(|r| format!("{r:.4}"))
                .unwrap_or_default(),
            line.commission.map(|c| format!("{c:.2}")).unwrap_or_default(),
            line.distance_km.map(|d| format!("{d:.2}")).unwrap_or_default(),
            format!("{:.2}", line.logistics_cost),
            format!("{:.2}", line.net_profit()),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// Flattens the report into `section,key,value` rows.
pub fn report_to_csv(report: &DashboardReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["section", "key", "value"])?;
    for (label, value) in report.summary.labelled() {
        writer.write_record(["summary", label, format!("{value:.2}").as_str()])?;
    }
    let sections = [
        ("sales_by_category", &report.sales_by_category),
        ("commission_by_category", &report.commission_by_category),
        ("commission_by_client", &report.commission_by_client),
    ];
    for (section, groups) in sections {
        for group in groups {
            writer.write_record([
                section,
                group.key.as_str(),
                format!("{:.2}", group.value).as_str(),
            ])?;
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
