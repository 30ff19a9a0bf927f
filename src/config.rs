use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub workbook: WorkbookLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_users")]
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntry {
    pub username: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default = "default_pdf_title")]
    pub pdf_title: String,
    #[serde(default = "default_client_heading")]
    pub client_heading: String,
    #[serde(default = "default_pdf_file_name")]
    pub pdf_file_name: String,
}

/// Sheet and column names expected in the uploaded workbook.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkbookLayout {
    #[serde(default)]
    pub orders: OrdersSheet,
    #[serde(default)]
    pub commission: CommissionSheet,
    #[serde(default)]
    pub deliveries: DeliveriesSheet,
    #[serde(default)]
    pub rate_bands: RateBandsSheet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersSheet {
    #[serde(default = "default_orders_sheet")]
    pub sheet: String,
    #[serde(default = "default_order_id_column")]
    pub order_id: String,
    #[serde(default = "default_category_column")]
    pub category: String,
    #[serde(default = "default_client_column")]
    pub client: String,
    #[serde(default = "default_total_value_column")]
    pub total_value: String,
    #[serde(default = "default_date_column")]
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSheet {
    #[serde(default = "default_commission_sheet")]
    pub sheet: String,
    #[serde(default = "default_category_column")]
    pub category: String,
    #[serde(default = "default_rate_column")]
    pub rate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveriesSheet {
    #[serde(default = "default_deliveries_sheet")]
    pub sheet: String,
    #[serde(default = "default_order_id_column")]
    pub order_id: String,
    #[serde(default = "default_distance_column")]
    pub distance_km: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateBandsSheet {
    #[serde(default = "default_rate_bands_sheet")]
    pub sheet: String,
    #[serde(default = "default_band_start_column")]
    pub start_km: String,
    #[serde(default = "default_band_end_column")]
    pub end_km: String,
    #[serde(default = "default_price_per_km_column")]
    pub price_per_km: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/sales-dashboard/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn default_template() -> String {
        let template = r#"[server]
host = "127.0.0.1"
port = 8501
max_upload_mb = 20

[auth]
enabled = true

[[auth.users]]
username = "weslley"
name = "Weslley"
password = "smart2024"

[[auth.users]]
username = "demo"
name = "Demo User"
password = "1234"

[report]
currency_symbol = "R$"
pdf_title = "Resumo de Indicadores"
client_heading = "Resumo por Cliente"
pdf_file_name = "resumo_dashboard.pdf"

# Sheet and column names of the uploaded workbook.
[workbook.orders]
sheet = "Pedidos"
order_id = "PedidoID"
category = "Categoria"
client = "Cliente"
total_value = "Valor Total"
date = "Data"

[workbook.commission]
sheet = "Comissao"
category = "Categoria"
rate = "Comissão (%)"

[workbook.deliveries]
sheet = "Entregas"
order_id = "PedidoID"
distance_km = "Distância KM"

[workbook.rate_bands]
sheet = "Faixas_KM"
start_km = "Raio Inicial"
end_km = "Raio Final"
price_per_km = "Valor por KM"
"#;
        template.to_string()
    }
}

impl AuthConfig {
    /// Passwords are compared in constant time.
    pub fn find_user(&self, username: &str, password: &str) -> Option<&UserEntry> {
        self.users.iter().find(|user| {
            user.username == username
                && bool::from(user.password.as_bytes().ct_eq(password.as_bytes()))
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            users: default_users(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            pdf_title: default_pdf_title(),
            client_heading: default_client_heading(),
            pdf_file_name: default_pdf_file_name(),
        }
    }
}

impl Default for OrdersSheet {
    fn default() -> Self {
        Self {
            sheet: default_orders_sheet(),
            order_id: default_order_id_column(),
            category: default_category_column(),
            client: default_client_column(),
            total_value: default_total_value_column(),
            date: default_date_column(),
        }
    }
}

impl Default for CommissionSheet {
    fn default() -> Self {
        Self {
            sheet: default_commission_sheet(),
            category: default_category_column(),
            rate: default_rate_column(),
        }
    }
}

impl Default for DeliveriesSheet {
    fn default() -> Self {
        Self {
            sheet: default_deliveries_sheet(),
            order_id: default_order_id_column(),
            distance_km: default_distance_column(),
        }
    }
}

impl Default for RateBandsSheet {
    fn default() -> Self {
        Self {
            sheet: default_rate_bands_sheet(),
            start_km: default_band_start_column(),
            end_km: default_band_end_column(),
            price_per_km: default_price_per_km_column(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_max_upload_mb() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_users() -> Vec<UserEntry> {
    vec![
        UserEntry {
            username: "weslley".to_string(),
            name: "Weslley".to_string(),
            password: "smart2024".to_string(),
        },
        UserEntry {
            username: "demo".to_string(),
            name: "Demo User".to_string(),
            password: "1234".to_string(),
        },
    ]
}

fn default_currency_symbol() -> String {
    "R$".to_string()
}

fn default_pdf_title() -> String {
    "Resumo de Indicadores".to_string()
}

fn default_client_heading() -> String {
    "Resumo por Cliente".to_string()
}

fn default_pdf_file_name() -> String {
    "resumo_dashboard.pdf".to_string()
}

fn default_orders_sheet() -> String {
    "Pedidos".to_string()
}

fn default_commission_sheet() -> String {
    "Comissao".to_string()
}

fn default_deliveries_sheet() -> String {
    "Entregas".to_string()
}

fn default_rate_bands_sheet() -> String {
    "Faixas_KM".to_string()
}

fn default_order_id_column() -> String {
    "PedidoID".to_string()
}

fn default_category_column() -> String {
    "Categoria".to_string()
}

fn default_client_column() -> String {
    "Cliente".to_string()
}

fn default_total_value_column() -> String {
    "Valor Total".to_string()
}

fn default_date_column() -> String {
    "Data".to_string()
}

fn default_rate_column() -> String {
    "Comissão (%)".to_string()
}

fn default_distance_column() -> String {
    "Distância KM".to_string()
}

fn default_band_start_column() -> String {
    "Raio Inicial".to_string()
}

fn default_band_end_column() -> String {
    "Raio Final".to_string()
}

fn default_price_per_km_column() -> String {
    "Valor por KM".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_back_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).expect("template parses");
        assert_eq!(parsed.server.port, 8501);
        assert_eq!(parsed.auth.users, Config::default().auth.users);
        assert_eq!(parsed.workbook.commission.rate, "Comissão (%)");
        assert_eq!(parsed.report.pdf_file_name, "resumo_dashboard.pdf");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let parsed: Config = toml::from_str(
            r#"
[workbook.orders]
sheet = "Orders"
"#,
        )
        .expect("partial config parses");
        assert_eq!(parsed.workbook.orders.sheet, "Orders");
        assert_eq!(parsed.workbook.orders.client, "Cliente");
        assert_eq!(parsed.workbook.rate_bands.sheet, "Faixas_KM");
        assert!(parsed.auth.enabled);
    }

    #[test]
    fn finds_user_only_with_matching_password() {
        let auth = AuthConfig::default();
        assert_eq!(
            auth.find_user("demo", "1234").map(|u| u.name.as_str()),
            Some("Demo User")
        );
        assert!(auth.find_user("demo", "wrong").is_none());
        assert!(auth.find_user("nobody", "1234").is_none());
        assert!(auth.find_user("demo", "12345").is_none());
        assert!(auth.find_user("demo", "").is_none());
    }

    #[test]
    fn overrides_replace_server_address() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            host: Some("0.0.0.0".to_string()),
            port: None,
        });
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8501);
    }
}
