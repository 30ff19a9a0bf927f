use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sales_dashboard::config::{Config, ConfigOverrides};
use sales_dashboard::dashboard::Dashboard;
use sales_dashboard::ledger::filter::OrderFilter;
use sales_dashboard::ledger::summary::DashboardReport;
use sales_dashboard::ledger::OrderLine;
use sales_dashboard::output::charts::{render_chart, ChartKind};
use sales_dashboard::output::csv::{ledger_to_csv, report_to_csv};
use sales_dashboard::output::json::render_json;
use sales_dashboard::output::pdf::render_pdf;
use sales_dashboard::output::table::{render_ledger_table, render_report_tables};
use sales_dashboard::server::run_server;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PROCESSING_FAILED: &str = "Erro ao processar a planilha";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "sales-dashboard",
    about = "Sales, commission and delivery logistics dashboard"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(flatten)]
    filter: FilterArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct FilterArgs {
    /// First day of the period, YYYY-MM-DD or DD/MM/YYYY.
    #[arg(long)]
    from: Option<String>,
    /// Last day of the period, inclusive.
    #[arg(long)]
    to: Option<String>,
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long = "client")]
    clients: Vec<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<OrderFilter> {
        Ok(OrderFilter::from_inputs(
            self.from.as_deref(),
            self.to.as_deref(),
            &self.categories,
            &self.clients,
        )?)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Headline figures and the per-category and per-client breakdowns.
    Summary { file: PathBuf },
    /// Every order line with its commission, logistics cost and profit.
    Ledger { file: PathBuf },
    Pdf {
        file: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Charts {
        file: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        config.apply_overrides(ConfigOverrides {
            host: host.clone(),
            port: *port,
        });
        let bind = format!("{}:{}", config.server.host, config.server.port);
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let filter = cli.filter.to_filter()?;
    match &cli.command {
        Commands::Summary { file } => {
            let dashboard = load_dashboard(file, &config)?;
            let report = dashboard.report(&filter);
            print_summary(&report, &config, cli.output)?;
        }
        Commands::Ledger { file } => {
            let dashboard = load_dashboard(file, &config)?;
            let lines = dashboard.filtered(&filter);
            print_ledger(&lines, cli.output)?;
        }
        Commands::Pdf { file, out } => {
            let dashboard = load_dashboard(file, &config)?;
            let report = dashboard.report(&filter);
            let out = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.report.pdf_file_name));
            write_pdf(&report, &config, &out)?;
        }
        Commands::Charts { file, out_dir } => {
            let dashboard = load_dashboard(file, &config)?;
            let report = dashboard.report(&filter);
            write_charts(&report, &config, out_dir)?;
        }
        Commands::Serve { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &Path) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn load_dashboard(file: &Path, config: &Config) -> Result<Dashboard> {
    Dashboard::from_path(file, &config.workbook)
        .map_err(|e| anyhow!("{PROCESSING_FAILED}: {e}"))
        .with_context(|| format!("workbook: {}", file.display()))
}

fn write_pdf(report: &DashboardReport, config: &Config, out: &Path) -> Result<()> {
    let bytes = render_pdf(report, &config.report).map_err(|e| anyhow!("{PROCESSING_FAILED}: {e}"))?;
    fs::write(out, bytes).with_context(|| format!("failed writing pdf: {}", out.display()))?;
    info!(path = %out.display(), "wrote pdf summary");
    println!("Wrote PDF summary to {}", out.display());
    Ok(())
}

fn write_charts(report: &DashboardReport, config: &Config, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed creating chart directory: {}", out_dir.display()))?;
    for kind in ChartKind::ALL {
        let svg = render_chart(kind, report, &config.report.currency_symbol)
            .map_err(|e| anyhow!("{PROCESSING_FAILED}: {e}"))?;
        let path = out_dir.join(kind.file_name());
        fs::write(&path, svg)
            .with_context(|| format!("failed writing chart: {}", path.display()))?;
        println!("Wrote {} to {}", kind, path.display());
    }
    Ok(())
}

fn print_summary(report: &DashboardReport, config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!(
            "{}",
            render_report_tables(report, &config.report.currency_symbol)
        ),
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => println!("{}", report_to_csv(report)?),
    }
    Ok(())
}

fn print_ledger(lines: &[&OrderLine], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_ledger_table(lines)),
        OutputFormat::Json => println!("{}", render_json(lines)?),
        OutputFormat::Csv => println!("{}", ledger_to_csv(lines)?),
    }
    Ok(())
}
