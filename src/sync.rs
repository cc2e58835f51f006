use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::config::{AppConfig, BidSearchParams};
use crate::contacts::{self, ContactList};
use crate::error::Result;
use crate::export;
use crate::fetch::{self, PaginatedFetcher, ResponseFormat};
use crate::io::http::Transport;
use crate::model::{BID_NOTICE, ORDER_PLAN, Record};

/// What a fetch-and-export pipeline produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Records fetched, after normalization.
    pub records: usize,
    /// Workbook path, or `None` when nothing was fetched.
    pub output: Option<PathBuf>,
    /// Distinct non-empty contact emails in first-seen order. Only filled for
    /// bid notices.
    pub emails: Vec<String>,
}

/// Fetches every bid-notice page and exports the records, blank-filling
/// missing fields.
#[instrument(level = "info", skip_all, fields(url = %config.bid_notices.url))]
pub fn bid_notices_to_excel<T: Transport + ?Sized>(
    transport: &T,
    config: &AppConfig,
    search: &BidSearchParams,
    output: Option<&Path>,
) -> Result<ExportSummary> {
    let service_key = config.api.require_service_key()?;
    search.validate()?;

    let fetcher = PaginatedFetcher::new(transport, service_key);
    let outcome = fetcher.fetch_all(
        &config.bid_notices.url,
        ResponseFormat::Xml,
        search,
        &BID_NOTICE,
    );
    info!(
        records = outcome.records.len(),
        pages = outcome.pages_requested,
        "bid notices fetched"
    );

    let output = export::export_records(
        &outcome.records,
        BID_NOTICE.fields,
        BID_NOTICE.sheet_name,
        output,
        BID_NOTICE.file_suffix,
    )?;
    let emails = if output.is_some() {
        unique_emails(&outcome.records)
    } else {
        Vec::new()
    };

    Ok(ExportSummary {
        records: outcome.records.len(),
        output,
        emails,
    })
}

/// Fetches every configured order-plan operation and exports the columns
/// that occur in the data.
#[instrument(level = "info", skip_all, fields(base_url = %config.order_plans.base_url))]
pub fn order_plans_to_excel<T: Transport + ?Sized>(
    transport: &T,
    config: &AppConfig,
    output: Option<&Path>,
) -> Result<ExportSummary> {
    let service_key = config.api.require_service_key()?;
    let plans = &config.order_plans;
    plans.search.validate()?;

    let fetcher = PaginatedFetcher::new(transport, service_key);
    let aggregated = fetch::aggregate(
        &fetcher,
        &plans.base_url,
        &plans.operations,
        ResponseFormat::Json,
        &plans.search,
        &ORDER_PLAN,
    );
    let failed = aggregated
        .endpoints
        .iter()
        .filter(|(_, stop)| !stop.is_complete())
        .count();
    if failed > 0 {
        warn!(failed, "some operations ended early");
    }

    let output = export::export_records(
        &aggregated.records,
        &aggregated.columns,
        ORDER_PLAN.sheet_name,
        output,
        ORDER_PLAN.file_suffix,
    )?;

    Ok(ExportSummary {
        records: aggregated.records.len(),
        output,
        emails: Vec::new(),
    })
}

/// Builds the deduplicated contact workbook from an exported bid-notice file.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display())
)]
pub fn excel_to_contacts(input: &Path, output: Option<&Path>) -> Result<ContactList> {
    let list = contacts::create_unique_contact_list(input, output)?;
    info!(
        output = %list.output.display(),
        rows = list.report.output_rows,
        "contact list written"
    );
    Ok(list)
}

fn unique_emails(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|record| record.get("ntceInsttOfclEmailAdrs"))
        .filter(|email| !email.is_empty() && seen.insert(*email))
        .map(str::to_string)
        .collect()
}
