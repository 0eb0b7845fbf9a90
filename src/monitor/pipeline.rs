//! Runs a phase end to end: balance query, window extraction, classification,
//! sequencing and, for grouped phases, the order-group summary.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::config::ReportScope;
use crate::database::ProductionSource;
use crate::error::MonitorError;
use crate::models::{
    CompletedRow, GroupSummary, Phase, PhaseReport, PhaseRow, ReturnEntry, Sequencing,
};
use crate::monitor::window::WindowExtractor;
use crate::monitor::{grouping, sequencing, status};
use crate::query::{balance, completed, returns, QueryContext, Qualifier};

const LOT_TABLES: [&str; 2] = ["loteprod", "lotprod"];
const SHEET_LEDGER: &str = "planilha";
const PHASE_LEDGER: &str = "pasfase";

async fn lot_table(source: &dyn ProductionSource) -> Result<&'static str, MonitorError> {
    for table in LOT_TABLES {
        if source.table_exists(table).await? {
            return Ok(table);
        }
    }
    Err(MonitorError::MissingTables(
        LOT_TABLES.iter().map(|t| t.to_string()).collect(),
    ))
}

/// Resolves what the query builders need to know about this installation.
/// Fails when there is no lot table at all.
pub async fn resolve_context(
    source: &dyn ProductionSource,
    scope: ReportScope,
    phase: Phase,
) -> Result<QueryContext, MonitorError> {
    let lot_table = lot_table(source).await?;
    let ledger = source.ledger_columns().await;
    // Only painting chooses between ledgers.
    let sheet_ledger = phase == Phase::Painting && source.table_exists(SHEET_LEDGER).await?;

    Ok(QueryContext {
        tables: Qualifier::new(source.schema()),
        lot_table: lot_table.to_string(),
        ledger,
        scope,
        sheet_ledger,
    })
}

async fn missing_tables(
    source: &dyn ProductionSource,
    tables: &[&str],
) -> Result<Vec<String>, MonitorError> {
    let mut missing = Vec::new();
    for table in tables {
        if !source.table_exists(table).await? {
            missing.push(table.to_string());
        }
    }
    Ok(missing)
}

/// Whether every table the phase reads is present. Absent tables are logged.
async fn phase_tables_present(
    source: &dyn ProductionSource,
    phase: Phase,
    ctx: &QueryContext,
) -> Result<bool, MonitorError> {
    let mut tables = phase.required_tables().to_vec();
    if phase == Phase::Painting && !ctx.sheet_ledger {
        tables.push(PHASE_LEDGER);
    }
    let missing = missing_tables(source, &tables).await?;
    if missing.is_empty() {
        Ok(true)
    } else {
        log::warn!(
            "Phase {} skipped, missing tables: {}",
            phase.code(),
            missing.join(", ")
        );
        Ok(false)
    }
}

/// What a board shows: the balance of `phase`, dated with the window label of
/// `dates_from` and filtered by `sequencing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    pub phase: Phase,
    pub dates_from: Phase,
    pub sequencing: Sequencing,
}

impl Board {
    pub fn of(phase: Phase) -> Self {
        Self {
            phase,
            dates_from: phase,
            sequencing: phase.sequencing(),
        }
    }

    /// The garland dashboard: priority orders, dated and shown like painting.
    pub fn garland() -> Self {
        Self {
            phase: Phase::PriorityConsolidation,
            dates_from: Phase::Painting,
            sequencing: Phase::Painting.sequencing(),
        }
    }
}

impl From<Phase> for Board {
    fn from(phase: Phase) -> Self {
        Board::of(phase)
    }
}

/// Balance rows of a board, labelled and filtered by its sequencing policy.
pub async fn processed_rows(
    source: &dyn ProductionSource,
    ctx: &QueryContext,
    board: Board,
    today: NaiveDate,
) -> Result<Vec<PhaseRow>, MonitorError> {
    let phase = board.phase;
    if !phase_tables_present(source, phase, ctx).await? {
        return Ok(Vec::new());
    }

    let query = balance::build(phase, ctx);
    let balances = source.fetch_balances(&query).await?;
    log::debug!("Phase {}: {} balance rows", phase.code(), balances.len());

    let extractor = WindowExtractor::for_phase(board.dates_from);
    let labelled = balances
        .into_iter()
        .map(|balance| {
            let window = extractor.extract(balance.lot_transition.as_deref());
            PhaseRow {
                status: status::classify(&window, today),
                window_start: window.start,
                window_end: window.end,
                balance,
            }
        })
        .collect();

    let mut rows = sequencing::apply(board.sequencing, labelled, today);
    sort_rows(&mut rows);
    Ok(rows)
}

/// The monitor view of a board, optionally limited to some lot descriptors.
pub async fn phase_report(
    source: &dyn ProductionSource,
    scope: ReportScope,
    board: impl Into<Board>,
    lots: Option<&[String]>,
    today: NaiveDate,
) -> Result<PhaseReport, MonitorError> {
    let board = board.into();
    let ctx = resolve_context(source, scope, board.phase).await?;
    let mut rows = processed_rows(source, &ctx, board, today).await?;

    if let Some(lots) = lots.filter(|l| !l.is_empty()) {
        rows.retain(|r| r.lot().is_some_and(|lot| lots.iter().any(|l| l == lot)));
    }

    if rows.is_empty() || !board.phase.is_grouped() {
        return Ok(PhaseReport::flat(rows));
    }

    let mut summary = grouping::summarize(&rows, today);
    sort_summary(&mut summary);
    Ok(PhaseReport::grouped(summary, rows))
}

/// Orders with output already accounted for in a phase.
pub async fn completed_orders(
    source: &dyn ProductionSource,
    scope: ReportScope,
    phase: Phase,
    lots: Option<&[String]>,
) -> Result<Vec<CompletedRow>, MonitorError> {
    let ctx = resolve_context(source, scope, phase).await?;
    if !phase_tables_present(source, phase, &ctx).await? {
        return Ok(Vec::new());
    }
    let query = completed::build(phase, &ctx, lots);
    source.fetch_completed(&query).await
}

/// Returned parts still owed to a phase. Phases without a returns view
/// yield nothing.
pub async fn open_returns(
    source: &dyn ProductionSource,
    scope: ReportScope,
    phase: Phase,
) -> Result<Vec<ReturnEntry>, MonitorError> {
    if !phase.has_returns_view() {
        return Ok(Vec::new());
    }

    let ctx = resolve_context(source, scope, phase).await?;
    let missing = missing_tables(source, &returns::REQUIRED_TABLES).await?;
    if !missing.is_empty() {
        return Err(MonitorError::MissingTables(missing));
    }

    let Some(query) = returns::build(phase, &ctx) else {
        return Ok(Vec::new());
    };
    let rows = source.fetch_returns(&query).await?;
    Ok(rows.into_iter().map(ReturnEntry::from).collect())
}

fn compare_order_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Unset dates sort last.
fn compare_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_rows(rows: &mut [PhaseRow]) {
    rows.sort_by(|a, b| {
        compare_dates(a.window_start, b.window_start)
            .then_with(|| compare_order_ids(&a.balance.order_id, &b.balance.order_id))
    });
}

fn sort_summary(summary: &mut [GroupSummary]) {
    summary.sort_by(|a, b| {
        compare_dates(a.window_start, b.window_start)
            .then_with(|| a.lot_descriptor.cmp(&b.lot_descriptor))
    });
}
