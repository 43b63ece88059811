use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hrdash_reports::{
    api::{session, ApiClient},
    config::Config,
    services::{AttendanceReportService, Normalizer},
    state::{ReportController, ReportTab},
    utils::time::today_local,
};

const USAGE: &str =
    "usage: attendance_export <weekly [YYYY-MM-DD] | monthly YYYY-MM | date YYYY-MM-DD> [--role ROLE] [--search TEXT]";

struct Args {
    tab: ReportTab,
    anchor: Option<NaiveDate>,
    role: Option<String>,
    search: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let kind = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let mut positional = Vec::new();
    let mut role = None;
    let mut search = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--role" => role = Some(args.next().ok_or_else(|| anyhow!("--role needs a value"))?),
            "--search" => {
                search = Some(args.next().ok_or_else(|| anyhow!("--search needs a value"))?)
            }
            _ => positional.push(arg),
        }
    }

    let (tab, anchor) = match (kind.as_str(), positional.as_slice()) {
        ("weekly", []) => (ReportTab::Weekly, None),
        ("weekly", [day]) => (ReportTab::Weekly, Some(parse_day(day)?)),
        ("monthly", [month]) => {
            let first = NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
                .with_context(|| format!("invalid month: {}", month))?;
            (ReportTab::Monthly, Some(first))
        }
        ("date", [day]) => (ReportTab::DateBased, Some(parse_day(day)?)),
        _ => bail!(USAGE),
    };

    Ok(Args {
        tab,
        anchor,
        role,
        search,
    })
}

fn parse_day(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {}", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hrdash_reports=info,attendance_export=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = Config::load()?;
    tracing::info!(
        api_base_url = %config.api_base_url,
        company_id = config.company_id.as_deref().unwrap_or("-"),
        time_zone = %config.time_zone,
        export_dir = %config.export_dir.display(),
        "Loaded configuration from environment/.env"
    );

    session::begin(config.request_context());
    let result = run(&config, args).await;
    session::end();
    result
}

async fn run(config: &Config, args: Args) -> anyhow::Result<()> {
    let client = ApiClient::from_session()?;
    let service = AttendanceReportService::new(Arc::new(client), Normalizer::new(config.time_zone));
    let mut controller = ReportController::new(service, config.time_zone);

    let anchor = args.anchor.unwrap_or_else(|| today_local(&config.time_zone));
    controller.select_tab_on(args.tab, anchor);
    if args.role.is_some() {
        controller.set_role(args.role);
    }
    if args.search.is_some() {
        controller.set_search(args.search);
    }

    controller.reload().await;
    if let Some(notice) = controller.take_notice() {
        tracing::warn!(message = %notice.message, "Report loaded with errors");
    }

    let export = controller.export()?;
    let path = export
        .write_to(&config.export_dir)
        .with_context(|| format!("failed to write {}", export.filename))?;

    println!("Wrote {}", path.display());
    Ok(())
}
