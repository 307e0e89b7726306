//! CLI entry point for the fleetwatch dashboard.
//!
//! Logs in to MyGeotab, loads the fleet, and renders the vehicle table,
//! summary cards or a single vehicle's detail. `browse` keeps the session
//! open and drives the table from typed commands.

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use fleetwatch::analyzers::state::VehicleStateDeriver;
use fleetwatch::config::AppConfig;
use fleetwatch::dashboard::{Dashboard, RefreshReport};
use fleetwatch::fetch::BasicClient;
use fleetwatch::infra::geotab::GeotabClient;
use fleetwatch::output::{append_rows, render_detail, render_stats, render_table, to_json};
use fleetwatch::services::telemetry_api::TelemetryGateway;
use fleetwatch::view::{
    CategoryFilter, FleetViewEngine, SortColumn, SortDirection, ViewEvent, ViewSettings,
};
use std::ffi::OsStr;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "fleetwatch")]
#[command(about = "Fleet telematics dashboard for MyGeotab", long_about = None)]
struct Cli {
    /// IANA timezone for "today" (overrides FLEETWATCH_TIMEZONE and the user's setting)
    #[arg(short, long, global = true)]
    timezone: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one page of the vehicle table
    List {
        /// Case-insensitive match on name, VIN or serial number
        #[arg(short, long, default_value = "")]
        search: String,

        /// Column to sort by
        #[arg(long, default_value = "name")]
        sort: SortColumn,

        /// Sort descending
        #[arg(long, default_value_t = false)]
        desc: bool,

        /// One of: all, communicating, driving, less_utilized, idling
        #[arg(short, long, default_value = "all")]
        filter: CategoryFilter,

        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// CSV file to append the visible rows to
        #[arg(long)]
        csv: Option<String>,

        /// Print the page as JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the fleet summary cards
    Summary {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show one vehicle in detail
    Detail {
        #[arg(value_name = "DEVICE_ID")]
        device_id: String,
    },
    /// Interactive table: type `help` for commands
    Browse,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/fleetwatch.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("fleetwatch.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let http = BasicClient::new(config.http_timeout)?;
    let gateway = GeotabClient::authenticate(
        http,
        &config.server,
        &config.database,
        &config.username,
        &config.password,
        config.device_results_limit,
    )
    .await
    .context("Login failed")?;
    info!(user = %gateway.session().display_name(), "Session started");

    let settings = ViewSettings {
        page_size: config.page_size,
        less_utilized_threshold: config.less_utilized_threshold,
        ..ViewSettings::default()
    };
    let engine = FleetViewEngine::new(
        settings,
        VehicleStateDeriver::new(config.ignition_freshness),
        Tz::UTC,
    );
    let mut dashboard = Dashboard::new(gateway, engine);

    let manual = cli.timezone.as_deref().or(config.timezone_override.as_deref());
    let timezone = dashboard.resolve_timezone(manual).await;
    dashboard.dispatch(ViewEvent::TimezoneChanged(timezone));
    info!(timezone = %timezone, "Display timezone resolved");

    match cli.command {
        Commands::List {
            search,
            sort,
            desc,
            filter,
            page,
            csv,
            json,
        } => {
            report(&dashboard.load(Utc::now()).await);

            dashboard.dispatch(ViewEvent::SearchChanged(search));
            dashboard.dispatch(ViewEvent::FilterClicked(filter));
            sort_by(&mut dashboard, sort, desc);
            dashboard.dispatch(ViewEvent::PageChanged(page));

            let view = dashboard.engine().current_view();
            if json {
                println!("{}", to_json(&view.rows)?);
            } else {
                print_table(&dashboard);
            }

            if let Some(path) = csv {
                append_rows(&path, &view.rows)
                    .with_context(|| format!("Failed to write {path}"))?;
                info!(path = %path, rows = view.rows.len(), "Rows exported");
            }
        }
        Commands::Summary { json } => {
            report(&dashboard.load(Utc::now()).await);
            let stats = dashboard.stats();
            if json {
                println!("{}", to_json(&stats)?);
            } else {
                println!("{}", render_stats(&stats));
            }
        }
        Commands::Detail { device_id } => match dashboard.detail(&device_id, Utc::now()).await {
            Ok(detail) => println!("{}", render_detail(&detail)),
            Err(e) => {
                eprintln!("{}", e.user_message());
                return Err(e).context("Failed to load vehicle");
            }
        },
        Commands::Browse => browse(&mut dashboard).await?,
    }

    Ok(())
}

const BROWSE_HELP: &str = "\
commands:
  search <text>      filter by name, VIN or serial (empty clears)
  sort <column>      sort; repeat to flip direction
  filter <category>  all | communicating | driving | less_utilized | idling
  page <n>, next, prev
  tz <iana id>       change the display timezone
  detail <id>        show one vehicle
  stats              summary cards
  refresh            reload everything
  quit";

/// One line typed in `browse`.
#[derive(Debug, PartialEq)]
enum BrowseCommand {
    View(ViewEvent),
    Next,
    Prev,
    Timezone(Tz),
    Detail(String),
    Stats,
    Refresh,
    Help,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<BrowseCommand, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match word.to_ascii_lowercase().as_str() {
        "search" => Ok(BrowseCommand::View(ViewEvent::SearchChanged(rest.to_string()))),
        "sort" => Ok(BrowseCommand::View(ViewEvent::SortClicked(rest.parse()?))),
        "filter" => Ok(BrowseCommand::View(ViewEvent::FilterClicked(rest.parse()?))),
        "page" => rest
            .parse()
            .map(|n| BrowseCommand::View(ViewEvent::PageChanged(n)))
            .map_err(|_| format!("Invalid page number: {rest}")),
        "next" => Ok(BrowseCommand::Next),
        "prev" => Ok(BrowseCommand::Prev),
        "tz" => rest
            .parse()
            .map(BrowseCommand::Timezone)
            .map_err(|_| format!("Unknown timezone: {rest}")),
        "detail" if !rest.is_empty() => Ok(BrowseCommand::Detail(rest.to_string())),
        "stats" => Ok(BrowseCommand::Stats),
        "refresh" => Ok(BrowseCommand::Refresh),
        "help" | "?" => Ok(BrowseCommand::Help),
        "quit" | "exit" | "q" => Ok(BrowseCommand::Quit),
        other => Err(format!("Unknown command: {other} (try `help`)")),
    }
}

async fn browse<G: TelemetryGateway>(dashboard: &mut Dashboard<G>) -> Result<()> {
    report(&dashboard.load(Utc::now()).await);
    print_table(dashboard);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        let page = dashboard.engine().config().page;
        match command {
            BrowseCommand::View(event) => {
                dashboard.dispatch(event);
            }
            BrowseCommand::Next => {
                dashboard.dispatch(ViewEvent::PageChanged(page.saturating_add(1)));
            }
            BrowseCommand::Prev => {
                dashboard.dispatch(ViewEvent::PageChanged(page.saturating_sub(1)));
            }
            BrowseCommand::Timezone(tz) => {
                if let Err(e) = dashboard.change_timezone(tz, Utc::now()).await {
                    eprintln!("{}", e.user_message());
                }
            }
            BrowseCommand::Detail(id) => {
                match dashboard.detail(&id, Utc::now()).await {
                    Ok(detail) => println!("{}", render_detail(&detail)),
                    Err(e) => eprintln!("{}", e.user_message()),
                }
                continue;
            }
            BrowseCommand::Stats => {
                println!("{}", render_stats(&dashboard.stats()));
                continue;
            }
            BrowseCommand::Refresh => report(&dashboard.load(Utc::now()).await),
            BrowseCommand::Help => {
                println!("{BROWSE_HELP}");
                continue;
            }
            BrowseCommand::Quit => break,
        }

        print_table(dashboard);
    }

    Ok(())
}

/// Clicks `column` until the table is sorted by it in the wanted direction.
fn sort_by<G: TelemetryGateway>(dashboard: &mut Dashboard<G>, column: SortColumn, desc: bool) {
    if dashboard.engine().config().sort.column != column {
        dashboard.dispatch(ViewEvent::SortClicked(column));
    }
    let wanted = if desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };
    if dashboard.engine().config().sort.direction != wanted {
        dashboard.dispatch(ViewEvent::SortClicked(column));
    }
}

fn print_table<G: TelemetryGateway>(dashboard: &Dashboard<G>) {
    let engine = dashboard.engine();
    println!(
        "{}",
        render_table(
            &engine.current_view(),
            engine.config(),
            &engine.settings().columns,
            engine.timezone(),
        )
    );
}

fn report(report: &RefreshReport) {
    for (stage, err) in &report.failures {
        warn!(stage = stage.as_str(), "Showing partial data");
        eprintln!("{}", err.user_message());
    }
    if report.requires_login() {
        eprintln!("Restart fleetwatch to log in again.");
    }
}
