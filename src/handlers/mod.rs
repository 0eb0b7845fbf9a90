pub mod export;
pub mod monitor;

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::ReportScope;
use crate::database::ProductionSource;
use crate::error::MonitorError;
use crate::models::Phase;

/// Shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn ProductionSource>,
    pub scope: ReportScope,
}

impl AppState {
    pub fn new(source: Arc<dyn ProductionSource>, scope: ReportScope) -> Self {
        Self { source, scope }
    }
}

pub const DEFAULT_PHASE: i32 = 5;

/// Phase code from a query string value; anything that is not a number
/// counts as absent.
pub fn phase_code(raw: Option<&str>) -> Option<i32> {
    raw?.trim().parse().ok()
}

/// Phase for `raw`, the default phase when absent or not a number.
pub fn phase_or_default(raw: Option<&str>) -> Result<Phase, MonitorError> {
    let code = phase_code(raw).unwrap_or(DEFAULT_PHASE);
    Phase::from_code(code).ok_or(MonitorError::UnknownPhase(code))
}

/// `?phase=<code>&lots=<a,b>`; the Portuguese names used by older
/// dashboards are accepted too.
#[derive(Debug, Default, Deserialize)]
pub struct PhaseParams {
    #[serde(alias = "fase")]
    pub phase: Option<String>,
    #[serde(alias = "lotes")]
    pub lots: Option<String>,
}

impl PhaseParams {
    pub fn code(&self) -> Option<i32> {
        phase_code(self.phase.as_deref())
    }

    pub fn phase(&self) -> Result<Phase, MonitorError> {
        phase_or_default(self.phase.as_deref())
    }

    /// Comma-separated lot descriptors, blanks dropped. `None` when nothing
    /// is left.
    pub fn lots(&self) -> Option<Vec<String>> {
        let lots: Vec<String> = self
            .lots
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        (!lots.is_empty()).then_some(lots)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
