use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::domain::{
    is_valid_bill_row, AccountInfo, BillError, BillRecord, DateRange, BILL_COLUMNS,
};

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("invalid selector: table"));

/// Which valid row becomes `selected_bill`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordSelection {
    /// The search already narrowed the grid to one period.
    First,
    /// Rows are chronological, newest last.
    #[default]
    Last,
    /// Newest row whose issue date lies in the requested range.
    InRange,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AccountLabels {
    pub account_number: String,
    pub name: String,
    pub meter_number: String,
    pub phone: String,
    pub address: String,
    /// First text after the account block, closes the address field.
    pub terminator: String,
}

impl AccountLabels {
    fn all(&self) -> [&str; 6] {
        [
            self.account_number.as_str(),
            self.name.as_str(),
            self.meter_number.as_str(),
            self.phone.as_str(),
            self.address.as_str(),
            self.terminator.as_str(),
        ]
    }
}

impl Default for AccountLabels {
    fn default() -> Self {
        AccountLabels {
            account_number: "Account No:".to_string(),
            name: "Name:".to_string(),
            meter_number: "Meter No:".to_string(),
            phone: "Phone:".to_string(),
            address: "Address:".to_string(),
            terminator: "Bill No".to_string(),
        }
    }
}

/// Header keywords identifying the billing grid: every `required` marker and
/// at least one of `any_of`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TableMarkers {
    pub required: Vec<String>,
    pub any_of: Vec<String>,
}

impl TableMarkers {
    fn matches(&self, text: &str) -> bool {
        self.required.iter().all(|marker| text.contains(marker.as_str()))
            && (self.any_of.is_empty()
                || self.any_of.iter().any(|marker| text.contains(marker.as_str())))
    }
}

impl Default for TableMarkers {
    fn default() -> Self {
        TableMarkers {
            required: vec!["Bill No".to_string()],
            any_of: vec!["Bill Month".to_string(), "Issue Date".to_string()],
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractionPolicy {
    /// Only pages served to a logged in user contain this text.
    pub auth_marker: String,
    pub account_labels: AccountLabels,
    pub table_markers: TableMarkers,
    pub fallback_to_last_table: bool,
    pub skip_header_row: bool,
    pub min_columns: usize,
    pub selection: RecordSelection,
    /// Attach diagnostic events to the result.
    pub trace: bool,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        ExtractionPolicy {
            auth_marker: "Account No".to_string(),
            account_labels: AccountLabels::default(),
            table_markers: TableMarkers::default(),
            fallback_to_last_table: true,
            skip_header_row: true,
            min_columns: BILL_COLUMNS,
            selection: RecordSelection::Last,
            trace: false,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    Debug,
    Info,
    Warn,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub level: TraceLevel,
    pub message: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub account_info: AccountInfo,
    pub selected_bill: Option<BillRecord>,
    /// Every valid row of the billing grid, in page order.
    pub bills: Vec<BillRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEvent>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("authentication marker not found on page")]
    AuthenticationFailed,
    #[error("account number or name missing from page")]
    AccountInfoMissing,
}

impl From<ExtractionError> for BillError {
    fn from(value: ExtractionError) -> Self {
        match value {
            ExtractionError::AuthenticationFailed => BillError::AuthenticationFailed,
            ExtractionError::AccountInfoMissing => BillError::AccountInfoMissing,
        }
    }
}

/// Log sink for one extraction run. Events always go to `log`; they are kept
/// for the result only when tracing is on.
struct Trace {
    events: Option<Vec<TraceEvent>>,
}

impl Trace {
    fn new(enabled: bool) -> Self {
        Trace {
            events: enabled.then(Vec::new),
        }
    }

    fn debug(&mut self, message: String) {
        log::debug!("{}", message);
        self.record(TraceLevel::Debug, message);
    }

    fn info(&mut self, message: String) {
        log::info!("{}", message);
        self.record(TraceLevel::Info, message);
    }

    fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.record(TraceLevel::Warn, message);
    }

    fn record(&mut self, level: TraceLevel, message: String) {
        if let Some(events) = self.events.as_mut() {
            events.push(TraceEvent { level, message });
        }
    }
}

/// Extracts account info and bills from a single page.
pub fn extract(
    html: &str,
    policy: &ExtractionPolicy,
) -> Result<ExtractionResult, ExtractionError> {
    extract_pages(html, None, policy, None)
}

/// Account info always comes from the landing page. Bills come from the
/// search results page when a search was made, else from the landing page.
pub fn extract_pages(
    landing_html: &str,
    search_html: Option<&str>,
    policy: &ExtractionPolicy,
    range: Option<&DateRange>,
) -> Result<ExtractionResult, ExtractionError> {
    let mut trace = Trace::new(policy.trace);

    if !has_auth_marker(landing_html, &policy.auth_marker) {
        trace.warn(format!(
            "Authentication marker {:?} not found on landing page",
            policy.auth_marker
        ));
        return Err(ExtractionError::AuthenticationFailed);
    }

    let landing = Html::parse_document(landing_html);
    let landing_text = flatten_text(&document_text(&landing));
    let account_info = account_info_from_text(&landing_text, &policy.account_labels);
    if !account_info.is_valid() {
        trace.warn(format!(
            "Account info incomplete: account number {:?}, name {:?}",
            account_info.account_number, account_info.name
        ));
        return Err(ExtractionError::AccountInfoMissing);
    }
    trace.debug(format!("Read account info for {}", account_info.account_number));

    let bills = match search_html {
        Some(search_html) => {
            trace.debug("Reading bills from search results page".to_string());
            bills_from_document(&Html::parse_document(search_html), policy, &mut trace)
        }
        None => bills_from_document(&landing, policy, &mut trace),
    };

    let selected_bill = select_bill(&bills, policy.selection, range, &mut trace);

    Ok(ExtractionResult {
        account_info,
        selected_bill,
        bills,
        trace: trace.events,
    })
}

/// Checked against the markup and against the text, so a marker split by
/// `&nbsp;` still counts.
pub fn has_auth_marker(html: &str, marker: &str) -> bool {
    if html.contains(marker) {
        return true;
    }
    let document = Html::parse_document(html);
    flatten_text(&document_text(&document)).contains(marker)
}

/// Label-delimited lookup over the page text. A field runs from its label to
/// the closest following known label; without one it stays empty.
pub fn extract_account_info(html: &str, labels: &AccountLabels) -> AccountInfo {
    let document = Html::parse_document(html);
    account_info_from_text(&flatten_text(&document_text(&document)), labels)
}

/// All valid bill rows of the page's billing grid.
pub fn extract_bills(html: &str, policy: &ExtractionPolicy) -> Vec<BillRecord> {
    let mut trace = Trace::new(false);
    bills_from_document(&Html::parse_document(html), policy, &mut trace)
}

fn account_info_from_text(text: &str, labels: &AccountLabels) -> AccountInfo {
    let boundaries = labels.all();
    let field = |label: &str| value_after_label(text, label, &boundaries);

    AccountInfo {
        account_number: field(labels.account_number.as_str()),
        name: field(labels.name.as_str()),
        meter_number: field(labels.meter_number.as_str()),
        phone: field(labels.phone.as_str()),
        address: field(labels.address.as_str()),
    }
}

fn value_after_label(text: &str, label: &str, boundaries: &[&str]) -> String {
    if label.is_empty() {
        return String::new();
    }
    let Some(label_start) = text.find(label) else {
        return String::new();
    };
    let rest = &text[label_start + label.len()..];

    let end = boundaries
        .iter()
        .filter(|boundary| !boundary.is_empty())
        .filter_map(|boundary| rest.find(boundary))
        .min();

    match end {
        Some(end) => rest[..end].trim().to_string(),
        None => String::new(),
    }
}

fn bills_from_document(
    document: &Html,
    policy: &ExtractionPolicy,
    trace: &mut Trace,
) -> Vec<BillRecord> {
    let tables: Vec<ElementRef> = document.select(&TABLE_SELECTOR).collect();
    if tables.is_empty() {
        trace.info("Page contains no tables".to_string());
        return vec![];
    }

    let marked = tables.iter().enumerate().find(|(_, table)| {
        let text = normalize_cell(&own_text(**table));
        policy.table_markers.matches(&text)
    });

    let table = match marked {
        Some((index, table)) => {
            trace.debug(format!(
                "Using table {} of {} (header markers matched)",
                index + 1,
                tables.len()
            ));
            *table
        }
        None if policy.fallback_to_last_table => {
            trace.warn(format!(
                "No table matched header markers, falling back to last of {} tables",
                tables.len()
            ));
            tables[tables.len() - 1]
        }
        None => {
            trace.warn("No table matched header markers".to_string());
            return vec![];
        }
    };

    let mut rows = own_rows(table);
    if policy.skip_header_row && rows.first().is_some_and(|row| is_header_row(*row)) {
        rows.remove(0);
    }

    let mut bills = vec![];
    let mut rejected = 0;
    for row in rows {
        let cells = row_cells(row);
        if is_valid_bill_row(&cells, policy.min_columns) {
            bills.push(BillRecord::from_cells(&cells));
        } else {
            rejected += 1;
            trace.debug(format!(
                "Skipping row with {} cells starting with {:?}",
                cells.len(),
                cells.first().map(String::as_str).unwrap_or_default()
            ));
        }
    }

    trace.info(format!(
        "Parsed {} bill rows, skipped {}",
        bills.len(),
        rejected
    ));

    bills
}

fn select_bill(
    bills: &[BillRecord],
    selection: RecordSelection,
    range: Option<&DateRange>,
    trace: &mut Trace,
) -> Option<BillRecord> {
    let selected = match (selection, range) {
        (RecordSelection::First, _) => bills.first(),
        (RecordSelection::Last, _) | (RecordSelection::InRange, None) => bills.last(),
        (RecordSelection::InRange, Some(range)) => bills.iter().rev().find(|bill| {
            bill.parsed_issue_date()
                .is_some_and(|issue_date| range.contains(issue_date))
        }),
    };

    match selected {
        Some(bill) => trace.debug(format!(
            "Selected bill {} ({:?} policy)",
            bill.bill_number, selection
        )),
        None => trace.info(format!("No bill selected ({:?} policy)", selection)),
    }

    selected.cloned()
}

/// Rendered text of the page; script, style and title content is skipped.
fn document_text(document: &Html) -> String {
    let mut out = String::new();
    collect_visible_text(document.root_element(), &mut out);
    out
}

fn collect_visible_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !matches!(
                child_element.value().name(),
                "script" | "style" | "title" | "noscript" | "template"
            ) {
                collect_visible_text(child_element, out);
            }
        }
    }
}

/// Replaces non-breaking spaces; everything else is kept as is so label
/// offsets line up with the page text.
fn flatten_text(text: &str) -> String {
    text.replace('\u{a0}', " ")
}

fn normalize_cell(text: &str) -> String {
    flatten_text(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of a table without the text of tables nested in it.
fn own_text(table: ElementRef) -> String {
    let mut out = String::new();
    collect_own_text(table, &mut out);
    out
}

fn collect_own_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if child_element.value().name() != "table" {
                collect_own_text(child_element, out);
            }
        }
    }
}

fn own_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = vec![];
    collect_rows(table, &mut rows);
    rows
}

fn collect_rows<'a>(element: ElementRef<'a>, rows: &mut Vec<ElementRef<'a>>) {
    for child in element.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "table" => {}
            "tr" => rows.push(child),
            _ => collect_rows(child, rows),
        }
    }
}

fn cell_elements<'a>(row: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
}

fn row_cells(row: ElementRef) -> Vec<String> {
    cell_elements(row)
        .map(|cell| normalize_cell(&cell.text().collect::<String>()))
        .collect()
}

/// A row in `<thead>` or made only of `<th>` cells.
fn is_header_row(row: ElementRef) -> bool {
    let in_thead = row
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.value().name() == "thead");

    let mut cells = cell_elements(row).peekable();
    let only_th = cells.peek().is_some() && cells.all(|cell| cell.value().name() == "th");

    in_thead || only_th
}
