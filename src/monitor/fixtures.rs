// Row builders shared by the monitor tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{BalanceRow, PhaseRow, Status};
use crate::monitor::status::classify;
use crate::monitor::window::DateWindow;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn balance(order_id: &str, lot: &str, pending: i64) -> BalanceRow {
    BalanceRow {
        order_id: order_id.to_string(),
        product: Some(format!("OSS{}", order_id)),
        description: Some(format!("PECA {}", order_id)),
        pending_quantity: Decimal::from(pending),
        returns_balance: Decimal::ZERO,
        order_quantity: Some(Decimal::from(pending)),
        order_close_date: None,
        lot_descriptor: Some(lot.to_string()),
        lot_transition: None,
        lot_start_date: None,
        lot_preview_date: None,
        lot_historical_total: None,
        requisition_number: None,
        write_off_phase: None,
    }
}

/// A labelled row whose status is derived from the window like the pipeline does.
pub fn row(
    order_id: &str,
    lot: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> PhaseRow {
    let window = DateWindow::new(start, end);
    PhaseRow {
        balance: balance(order_id, lot, 10),
        window_start: start,
        window_end: end,
        status: classify(&window, today),
    }
}

pub fn with_status(mut row: PhaseRow, status: Status) -> PhaseRow {
    row.status = status;
    row
}

pub fn order_ids(rows: &[PhaseRow]) -> Vec<&str> {
    rows.iter().map(|r| r.balance.order_id.as_str()).collect()
}
