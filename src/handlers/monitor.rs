use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::MonitorError;
use crate::handlers::{today, AppState, PhaseParams};
use crate::models::{CompletedRow, Phase, PhaseReport, ReturnEntry};
use crate::monitor::pipeline::{self, Board};

pub async fn data(
    State(state): State<AppState>,
    Query(params): Query<PhaseParams>,
) -> Result<Json<PhaseReport>, MonitorError> {
    let phase = params.phase()?;
    let lots = params.lots();
    let report = pipeline::phase_report(
        state.source.as_ref(),
        state.scope,
        phase,
        lots.as_deref(),
        today(),
    )
    .await?;
    Ok(Json(report))
}

/// The priority consolidation orders, dated and shown like the painting
/// board, whatever phase is asked for.
pub async fn garland_data(
    State(state): State<AppState>,
    Query(params): Query<PhaseParams>,
) -> Result<Json<PhaseReport>, MonitorError> {
    let lots = params.lots();
    let report = pipeline::phase_report(
        state.source.as_ref(),
        state.scope,
        Board::garland(),
        lots.as_deref(),
        today(),
    )
    .await?;
    Ok(Json(report))
}

pub async fn completed(
    State(state): State<AppState>,
    Query(params): Query<PhaseParams>,
) -> Result<Json<Vec<CompletedRow>>, MonitorError> {
    let phase = params.phase()?;
    let lots = params.lots();
    let rows =
        pipeline::completed_orders(state.source.as_ref(), state.scope, phase, lots.as_deref())
            .await?;
    Ok(Json(rows))
}

/// Open returns. Unknown or missing phases get an empty list rather than an
/// error.
pub async fn returns(
    State(state): State<AppState>,
    Query(params): Query<PhaseParams>,
) -> Result<Json<Vec<ReturnEntry>>, MonitorError> {
    let Some(phase) = params.code().and_then(Phase::from_code) else {
        return Ok(Json(Vec::new()));
    };
    let entries = pipeline::open_returns(state.source.as_ref(), state.scope, phase).await?;
    Ok(Json(entries))
}
