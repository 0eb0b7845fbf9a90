use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::models::Status;
use crate::utils::format;

/// One order (or requisitioned product) with quantity still to go through a
/// phase. Every phase query yields exactly these columns.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct BalanceRow {
    pub order_id: String,
    #[serde(serialize_with = "format::text")]
    pub product: Option<String>,
    #[serde(serialize_with = "format::text")]
    pub description: Option<String>,
    #[serde(serialize_with = "format::quantity")]
    pub pending_quantity: Decimal,
    #[serde(serialize_with = "format::quantity")]
    pub returns_balance: Decimal,
    #[serde(serialize_with = "format::opt_quantity")]
    pub order_quantity: Option<Decimal>,
    /// `None` while the order is open.
    #[serde(serialize_with = "format::date")]
    pub order_close_date: Option<NaiveDate>,
    #[serde(serialize_with = "format::text")]
    pub lot_descriptor: Option<String>,
    #[serde(serialize_with = "format::text")]
    pub lot_transition: Option<String>,
    #[serde(serialize_with = "format::date")]
    pub lot_start_date: Option<NaiveDate>,
    #[serde(serialize_with = "format::date")]
    pub lot_preview_date: Option<NaiveDate>,
    #[serde(serialize_with = "format::opt_quantity")]
    pub lot_historical_total: Option<Decimal>,
    #[serde(serialize_with = "format::text")]
    pub requisition_number: Option<String>,
    /// Ledger phase cutting output is written off under.
    #[serde(serialize_with = "format::opt_int")]
    pub write_off_phase: Option<i32>,
}

/// A balance row after window extraction and classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseRow {
    #[serde(flatten)]
    pub balance: BalanceRow,
    #[serde(serialize_with = "format::date")]
    pub window_start: Option<NaiveDate>,
    #[serde(serialize_with = "format::date")]
    pub window_end: Option<NaiveDate>,
    pub status: Status,
}

impl PhaseRow {
    pub fn lot(&self) -> Option<&str> {
        self.balance.lot_descriptor.as_deref()
    }
}

/// One order group (purchase order) in a grouped report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub lot_descriptor: String,
    #[serde(serialize_with = "format::quantity")]
    pub pending_quantity: Decimal,
    #[serde(serialize_with = "format::quantity")]
    pub returns_balance: Decimal,
    #[serde(serialize_with = "format::date")]
    pub window_start: Option<NaiveDate>,
    #[serde(serialize_with = "format::date")]
    pub window_end: Option<NaiveDate>,
    #[serde(serialize_with = "format::quantity")]
    pub lot_historical_total: Decimal,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PhaseReport {
    Flat {
        is_grouped: bool,
        data: Vec<PhaseRow>,
    },
    Grouped {
        is_grouped: bool,
        summary: Vec<GroupSummary>,
        details: Vec<PhaseRow>,
    },
}

impl PhaseReport {
    pub fn flat(data: Vec<PhaseRow>) -> Self {
        PhaseReport::Flat {
            is_grouped: false,
            data,
        }
    }

    pub fn grouped(summary: Vec<GroupSummary>, details: Vec<PhaseRow>) -> Self {
        PhaseReport::Grouped {
            is_grouped: true,
            summary,
            details,
        }
    }
}

/// Already-produced quantity of an order for a phase.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CompletedRow {
    pub order_id: String,
    #[serde(serialize_with = "format::text")]
    pub description: Option<String>,
    #[serde(serialize_with = "format::quantity")]
    pub produced_quantity: Decimal,
    #[serde(serialize_with = "format::opt_quantity")]
    pub order_quantity: Option<Decimal>,
    #[serde(serialize_with = "format::text")]
    pub lot_descriptor: Option<String>,
    #[serde(serialize_with = "format::date")]
    pub completion_date: Option<NaiveDate>,
    #[serde(serialize_with = "format::text")]
    pub requisition_number: Option<String>,
}

/// Parts returned to a phase and not yet re-debited, per reason.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ReturnRow {
    pub lot_descriptor: Option<String>,
    pub order_id: String,
    pub description: Option<String>,
    pub returned_on: Option<NaiveDate>,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnEntry {
    #[serde(serialize_with = "format::text")]
    pub lot_descriptor: Option<String>,
    pub order_id: String,
    #[serde(serialize_with = "format::text")]
    pub description: Option<String>,
    /// dd/mm/YYYY
    pub returned_on: String,
    #[serde(serialize_with = "format::quantity")]
    pub quantity: Decimal,
    #[serde(serialize_with = "format::text")]
    pub reason: Option<String>,
}

impl From<ReturnRow> for ReturnEntry {
    fn from(row: ReturnRow) -> Self {
        Self {
            lot_descriptor: row.lot_descriptor,
            order_id: row.order_id,
            description: row.description,
            returned_on: format::day_first(row.returned_on),
            quantity: row.quantity,
            reason: row.reason,
        }
    }
}
