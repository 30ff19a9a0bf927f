pub mod config;
pub mod dashboard;
pub mod error;
pub mod ledger;
pub mod logistics;
pub mod output;
pub mod server;
pub mod workbook;
