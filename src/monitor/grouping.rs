//! Collapses sub-lot rows into one summary per purchase order ("OP 12/25").

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

use crate::models::{GroupSummary, PhaseRow};
use crate::monitor::status::classify;
use crate::monitor::window::DateWindow;

static ORDER_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:OP|O\.P\.?)\s?\d+/\d+").expect("order group pattern"));

/// Purchase-order number inside a lot descriptor, or the descriptor itself.
pub fn group_key(lot_descriptor: &str) -> &str {
    ORDER_GROUP
        .find(lot_descriptor)
        .map(|m| m.as_str())
        .unwrap_or(lot_descriptor)
}

#[derive(Default)]
struct Accumulator {
    pending: Decimal,
    returns: Decimal,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    historical: Decimal,
}

fn earliest(current: Option<NaiveDate>, candidate: Option<NaiveDate>) -> Option<NaiveDate> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// One summary per order group, status re-derived from the group's earliest
/// start and earliest end. Historical totals count each sub-lot once. Rows
/// without a lot descriptor only appear in the details.
pub fn summarize(rows: &[PhaseRow], today: NaiveDate) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    let mut seen_lots: HashSet<&str> = HashSet::new();

    for row in rows {
        let Some(lot) = row.lot() else { continue };
        let group = groups.entry(group_key(lot)).or_default();

        group.pending += row.balance.pending_quantity;
        group.returns += row.balance.returns_balance;
        group.start = earliest(group.start, row.window_start);
        group.end = earliest(group.end, row.window_end);

        if seen_lots.insert(lot) {
            group.historical += row.balance.lot_historical_total.unwrap_or_default();
        }
    }

    groups
        .into_iter()
        .map(|(key, acc)| GroupSummary {
            lot_descriptor: key.to_string(),
            pending_quantity: acc.pending,
            returns_balance: acc.returns,
            window_start: acc.start,
            window_end: acc.end,
            lot_historical_total: acc.historical,
            status: classify(&DateWindow::new(acc.start, acc.end), today),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::monitor::fixtures::{day, row};

    #[test]
    fn extracts_purchase_order_keys() {
        assert_eq!(group_key("Petra OP 12/25 - Lote 3"), "OP 12/25");
        assert_eq!(group_key("O.P. 7/24 Solare"), "O.P. 7/24");
        assert_eq!(group_key("O.P 7/24"), "O.P 7/24");
        assert_eq!(group_key("OP15/25A"), "OP15/25");
        assert_eq!(group_key("Garland amostras"), "Garland amostras");
        assert_eq!(group_key("op 12/25"), "op 12/25");
    }

    #[test]
    fn group_totals_equal_the_sum_of_sub_lots() {
        let today = day(2025, 1, 15);
        let mut a = row("1", "OP 12/25 - A", Some(day(2025, 1, 10)), Some(day(2025, 1, 20)), today);
        a.balance.pending_quantity = Decimal::from(7);
        a.balance.returns_balance = Decimal::from(2);
        a.balance.lot_historical_total = Some(Decimal::from(100));
        let mut a2 = a.clone();
        a2.balance.order_id = "2".into();
        a2.balance.pending_quantity = Decimal::from(3);
        let mut b = row("3", "OP 12/25 - B", Some(day(2025, 1, 5)), Some(day(2025, 1, 25)), today);
        b.balance.pending_quantity = Decimal::from(11);
        b.balance.lot_historical_total = Some(Decimal::from(40));
        let other = row("4", "Garland amostras", None, None, today);

        let rows = vec![a, a2, b, other];
        let summary = summarize(&rows, today);
        assert_eq!(summary.len(), 2);

        let op = summary.iter().find(|s| s.lot_descriptor == "OP 12/25").unwrap();
        assert_eq!(op.pending_quantity, Decimal::from(21));
        assert_eq!(op.returns_balance, Decimal::from(4));
        assert_eq!(op.lot_historical_total, Decimal::from(140));
        assert_eq!(op.window_start, Some(day(2025, 1, 5)));
        assert_eq!(op.window_end, Some(day(2025, 1, 20)));
        assert_eq!(op.status, Status::OnTime);

        let sub_total: Decimal = rows
            .iter()
            .filter(|r| r.lot().map(group_key) == Some("OP 12/25"))
            .map(|r| r.balance.pending_quantity)
            .sum();
        assert_eq!(op.pending_quantity, sub_total);

        let samples = summary.iter().find(|s| s.lot_descriptor == "Garland amostras").unwrap();
        assert_eq!(samples.status, Status::Future);
        assert_eq!(samples.lot_historical_total, Decimal::ZERO);
    }

    #[test]
    fn group_status_uses_earliest_end() {
        let today = day(2025, 1, 15);
        let rows = vec![
            row("1", "OP 1/25 a", Some(day(2025, 1, 1)), Some(day(2025, 1, 10)), today),
            row("2", "OP 1/25 b", Some(day(2025, 1, 12)), Some(day(2025, 1, 30)), today),
        ];
        let summary = summarize(&rows, today);
        assert_eq!(summary[0].status, Status::Delayed);
    }

    #[test]
    fn rows_without_lot_are_not_summarized() {
        let today = day(2025, 1, 15);
        let mut orphan = row("1", "x", None, None, today);
        orphan.balance.lot_descriptor = None;
        assert!(summarize(&[orphan], today).is_empty());
    }
}
