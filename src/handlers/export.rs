use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::MonitorError;
use crate::handlers::{phase_or_default, today, AppState};
use crate::models::{Phase, PhaseRow, Status};
use crate::monitor::pipeline::{self, Board};
use crate::utils::format::ISO_DATE;

const HEADERS: [&str; 7] = [
    "Lot",
    "Order",
    "Product",
    "Description",
    "Pending",
    "Planned start",
    "Planned end",
];

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(alias = "fase")]
    pub phase: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Delayed,
    OnTime,
}

impl ExportStatus {
    pub fn parse(raw: Option<&str>) -> Result<Self, MonitorError> {
        match raw.map(str::trim) {
            Some("delayed") => Ok(ExportStatus::Delayed),
            Some("ontime") | Some("on_time") => Ok(ExportStatus::OnTime),
            other => Err(MonitorError::InvalidStatus(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ExportStatus::Delayed => "delayed",
            ExportStatus::OnTime => "ontime",
        }
    }

    /// Painting schedules ahead, so its on-time export includes upcoming work.
    pub fn keeps(self, phase: Phase, status: Status) -> bool {
        match (self, status) {
            (ExportStatus::Delayed, Status::Delayed) => true,
            (ExportStatus::OnTime, Status::OnTime) => true,
            (ExportStatus::OnTime, Status::Future) => phase == Phase::Painting,
            _ => false,
        }
    }
}

pub fn file_name(phase: Phase, status: ExportStatus) -> String {
    format!("report_{}_{}.csv", phase.name(), status.as_str())
}

pub fn render_csv(rows: &[PhaseRow]) -> Result<Vec<u8>, MonitorError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for row in rows {
        let balance = &row.balance;
        let date = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format(ISO_DATE).to_string()).unwrap_or_default()
        };
        writer.write_record([
            balance.lot_descriptor.clone().unwrap_or_default(),
            balance.order_id.clone(),
            balance.product.clone().unwrap_or_default(),
            balance.description.clone().unwrap_or_default(),
            balance.pending_quantity.normalize().to_string(),
            date(row.window_start),
            date(row.window_end),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| MonitorError::Export(e.into_error().into()))
}

pub async fn export(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, MonitorError> {
    let status = ExportStatus::parse(params.status.as_deref())?;
    let phase = phase_or_default(params.phase.as_deref())?;

    let source = state.source.as_ref();
    let ctx = pipeline::resolve_context(source, state.scope, phase).await?;
    let rows: Vec<PhaseRow> = pipeline::processed_rows(source, &ctx, Board::of(phase), today())
        .await?
        .into_iter()
        .filter(|r| status.keeps(phase, r.status))
        .collect();

    let body = render_csv(&rows)?;
    let name = file_name(phase, status);
    log::info!("Exporting {} rows as {}", rows.len(), name);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::fixtures::{day, row};

    #[test]
    fn status_parsing() {
        assert_eq!(ExportStatus::parse(Some("delayed")).unwrap(), ExportStatus::Delayed);
        assert_eq!(ExportStatus::parse(Some("ontime")).unwrap(), ExportStatus::OnTime);
        assert_eq!(ExportStatus::parse(Some("on_time")).unwrap(), ExportStatus::OnTime);
        assert!(matches!(
            ExportStatus::parse(Some("late")),
            Err(MonitorError::InvalidStatus(s)) if s == "late"
        ));
        assert!(ExportStatus::parse(None).is_err());
    }

    #[test]
    fn painting_on_time_export_includes_future_rows() {
        assert!(ExportStatus::OnTime.keeps(Phase::Painting, Status::Future));
        assert!(!ExportStatus::OnTime.keeps(Phase::Machining, Status::Future));
        assert!(!ExportStatus::Delayed.keeps(Phase::Painting, Status::OnTime));
        assert!(ExportStatus::Delayed.keeps(Phase::Cutting, Status::Delayed));
    }

    #[test]
    fn file_name_names_phase_and_status() {
        assert_eq!(
            file_name(Phase::SheetGoods, ExportStatus::Delayed),
            "report_sheet_goods_delayed.csv"
        );
    }

    #[test]
    fn csv_has_headers_and_blank_nulls() {
        let today = day(2025, 1, 15);
        let mut late = row("1001", "OSSO 4/25", Some(day(2025, 1, 1)), Some(day(2025, 1, 10)), today);
        late.balance.description = Some("TAMPO, 40MM".into());
        let open = row("1002", "OSSO 4/25", None, None, today);

        let body = String::from_utf8(render_csv(&[late, open]).unwrap()).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(
            lines[0],
            "Lot,Order,Product,Description,Pending,Planned start,Planned end"
        );
        assert_eq!(
            lines[1],
            "OSSO 4/25,1001,OSS1001,\"TAMPO, 40MM\",10,2025-01-01,2025-01-10"
        );
        assert_eq!(lines[2], "OSSO 4/25,1002,OSS1002,PECA 1002,10,,");
    }
}
