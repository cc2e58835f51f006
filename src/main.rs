use std::path::PathBuf;

use clap::{Parser, Subcommand};
use g2b_export::config::AppConfig;
use g2b_export::contacts::{self, ContactList};
use g2b_export::io::http::HttpTransport;
use g2b_export::sync::{self, ExportSummary};
use g2b_export::{Result, ToolError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.verbose).and_then(|_| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let default_level = if verbose > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("g2b_export={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Bids(args) => execute_bids(&config, args),
        Command::OrderPlans(args) => execute_order_plans(&config, args),
        Command::Contacts(args) => {
            execute_contacts(args);
            Ok(())
        }
    }
}

fn execute_bids(config: &AppConfig, args: BidsArgs) -> Result<()> {
    let mut search = config.bid_notices.search.clone();
    if let Some(from) = args.from {
        search.inqry_bgn_dt = from;
    }
    if let Some(to) = args.to {
        search.inqry_end_dt = to;
    }
    if let Some(keyword) = args.keyword {
        search.bid_ntce_nm = Some(keyword);
    }
    if let Some(rows) = args.rows {
        search.num_of_rows = rows;
    }

    let transport = HttpTransport::new(config.api.timeout())?;
    let summary = sync::bid_notices_to_excel(&transport, config, &search, args.output.as_deref())?;
    report_export(&summary, "bid notices");

    if summary.output.is_some() {
        println!("\n=== 담당자 이메일 목록 ===");
        for email in &summary.emails {
            println!("{email}");
        }
    }
    Ok(())
}

fn execute_order_plans(config: &AppConfig, args: OrderPlansArgs) -> Result<()> {
    let transport = HttpTransport::new(config.api.timeout())?;
    let summary = sync::order_plans_to_excel(&transport, config, args.output.as_deref())?;
    report_export(&summary, "order plans");
    Ok(())
}

fn report_export(summary: &ExportSummary, what: &str) {
    match &summary.output {
        Some(path) => println!("{} rows written to {}", summary.records, path.display()),
        None => info!("no {what} fetched; nothing written"),
    }
}

/// Builds the contact list and prints its report. Failures are logged and the
/// process still exits successfully.
fn execute_contacts(args: ContactsArgs) {
    match sync::excel_to_contacts(&args.input, args.output.as_deref()) {
        Ok(list) => {
            print_report(&list);
            if !args.skip_analysis {
                print_analysis(&list);
            }
        }
        Err(err) => error!(input = %args.input.display(), error = %err, "contact list not created"),
    }
}

fn print_report(list: &ContactList) {
    let report = &list.report;
    println!("전체 데이터 수: {}건", report.input_rows);
    println!("중복 제거 후 데이터 수: {}건", report.output_rows);
    println!("제거된 중복 데이터: {}건", report.removed_duplicates);
    println!("\n새로운 엑셀 파일이 생성되었습니다: {}", list.output.display());
    println!("\n=== 통계 정보 ===");
    println!("수요기관 수: {}개", report.institutions);
    println!("담당자 이메일 수: {}개", report.distinct_emails);
    if report.empty_emails > 0 {
        println!("\n이메일 정보가 없는 데이터: {}건", report.empty_emails);
    }
    if report.empty_phones > 0 {
        println!("전화번호 정보가 없는 데이터: {}건", report.empty_phones);
    }
}

fn print_analysis(list: &ContactList) {
    let analysis = contacts::analyze_contacts(&list.contacts);
    println!("\n=== 상세 분석 ===");
    println!("\n[수요기관별 담당자 수]");
    for (name, count) in &analysis.top_institutions {
        println!("{name}\t{count}");
    }
    println!("\n[이메일 목록 (중복 제거)]");
    println!("총 {}개의 이메일", analysis.total_emails);
    for email in &analysis.emails {
        println!("  - {email}");
    }
    if analysis.omitted_emails() > 0 {
        println!("  ... 외 {}개", analysis.omitted_emails());
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export procurement OpenAPI bid notices and order plans to Excel."
)]
struct Cli {
    /// TOML configuration file. Defaults to ./g2b.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch bid notices and write them to a workbook.
    Bids(BidsArgs),
    /// Fetch order plans from every configured operation and write them to a workbook.
    OrderPlans(OrderPlansArgs),
    /// Build a deduplicated contact list from an exported bid-notice workbook.
    Contacts(ContactsArgs),
}

#[derive(clap::Args)]
struct BidsArgs {
    /// Range start, YYYYMMDDHHMM.
    #[arg(long)]
    from: Option<String>,

    /// Range end, YYYYMMDDHHMM.
    #[arg(long)]
    to: Option<String>,

    /// Notice-name filter.
    #[arg(long)]
    keyword: Option<String>,

    /// Rows per page.
    #[arg(long)]
    rows: Option<u32>,

    /// Output file path. Defaults to a timestamped name.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct OrderPlansArgs {
    /// Output file path. Defaults to a timestamped name.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ContactsArgs {
    /// Exported bid-notice workbook.
    #[arg(long)]
    input: PathBuf,

    /// Output file path. Defaults to a timestamped name.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip the per-institution and email breakdown.
    #[arg(long)]
    skip_analysis: bool,
}
