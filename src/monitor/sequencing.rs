//! Per-phase policies deciding which labelled rows reach the shop floor.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

use crate::models::{PhaseRow, Sequencing, Status};

pub fn apply(policy: Sequencing, rows: Vec<PhaseRow>, today: NaiveDate) -> Vec<PhaseRow> {
    match policy {
        Sequencing::ActiveOnly => active_only(rows),
        Sequencing::LotQueue => lot_queue(rows),
        Sequencing::NextCohort => next_cohort(rows, today),
        Sequencing::Unfiltered => rows,
    }
}

fn active_only(rows: Vec<PhaseRow>) -> Vec<PhaseRow> {
    rows.into_iter().filter(|r| r.status.is_active()).collect()
}

struct LotState {
    start: Option<NaiveDate>,
    status: Status,
}

/// Walks lots by earliest start, keeping delayed lots until the first on-time
/// lot, which is kept and ends the walk. Every row of a kept lot stays,
/// future ones included. Lots with no start date at all are dropped, as are
/// rows without a lot.
fn lot_queue(rows: Vec<PhaseRow>) -> Vec<PhaseRow> {
    let mut lots: BTreeMap<&str, LotState> = BTreeMap::new();
    for row in &rows {
        let Some(lot) = row.lot() else { continue };
        let state = lots.entry(lot).or_insert(LotState {
            start: None,
            status: Status::Future,
        });
        state.start = match (state.start, row.window_start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        state.status = match (state.status, row.status) {
            (Status::Delayed, _) | (_, Status::Delayed) => Status::Delayed,
            (Status::OnTime, _) | (_, Status::OnTime) => Status::OnTime,
            _ => Status::Future,
        };
    }

    // BTreeMap iteration is by descriptor, so the stable sort breaks start
    // ties alphabetically.
    let mut queue: Vec<(&str, NaiveDate, Status)> = lots
        .iter()
        .filter_map(|(lot, state)| state.start.map(|start| (*lot, start, state.status)))
        .collect();
    queue.sort_by_key(|(_, start, _)| *start);

    let mut keep: HashSet<String> = HashSet::new();
    for (lot, _, status) in queue {
        match status {
            Status::Delayed => {
                keep.insert(lot.to_string());
            }
            Status::OnTime => {
                keep.insert(lot.to_string());
                break;
            }
            Status::Future => {}
        }
    }

    rows.into_iter()
        .filter(|r| r.lot().is_some_and(|lot| keep.contains(lot)))
        .collect()
}

/// Delayed rows, plus either every non-delayed row that has already started
/// or, when none has, the rows sharing the nearest start date.
fn next_cohort(rows: Vec<PhaseRow>, today: NaiveDate) -> Vec<PhaseRow> {
    let (delayed, pending): (Vec<PhaseRow>, Vec<PhaseRow>) = rows
        .into_iter()
        .partition(|r| r.status == Status::Delayed);

    let started = pending
        .iter()
        .any(|r| r.window_start.is_some_and(|start| start <= today));

    let cohort: Vec<PhaseRow> = if started {
        pending
            .into_iter()
            .filter(|r| r.window_start.is_some_and(|start| start <= today))
            .collect()
    } else {
        match pending.iter().filter_map(|r| r.window_start).min() {
            Some(next) => pending
                .into_iter()
                .filter(|r| r.window_start == Some(next))
                .collect(),
            None => Vec::new(),
        }
    };

    delayed.into_iter().chain(cohort).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::fixtures::{day, order_ids, row, with_status};

    fn today() -> NaiveDate {
        day(2025, 1, 12)
    }

    #[test]
    fn active_only_drops_future_rows() {
        let rows = vec![
            row("1", "A", Some(day(2025, 1, 1)), Some(day(2025, 1, 5)), today()),
            row("2", "A", Some(day(2025, 1, 10)), Some(day(2025, 1, 20)), today()),
            row("3", "B", Some(day(2025, 2, 1)), Some(day(2025, 2, 5)), today()),
            row("4", "C", None, None, today()),
        ];
        let kept = apply(Sequencing::ActiveOnly, rows, today());
        assert_eq!(order_ids(&kept), vec!["1", "2"]);
    }

    #[test]
    fn lot_queue_keeps_delayed_lots_and_first_on_time_lot() {
        let rows = vec![
            with_status(row("30", "L3", Some(day(2025, 1, 10)), None, today()), Status::OnTime),
            with_status(row("10", "L1", Some(day(2025, 1, 1)), None, today()), Status::Delayed),
            with_status(row("40", "L4", Some(day(2025, 1, 15)), None, today()), Status::Delayed),
            with_status(row("20", "L2", Some(day(2025, 1, 5)), None, today()), Status::OnTime),
            with_status(row("21", "L2", Some(day(2025, 1, 6)), None, today()), Status::OnTime),
        ];
        let kept = apply(Sequencing::LotQueue, rows, today());
        assert_eq!(order_ids(&kept), vec!["10", "20", "21"]);
    }

    #[test]
    fn lot_queue_aggregates_lot_status_and_start() {
        let rows = vec![
            with_status(row("1", "EARLY", Some(day(2025, 1, 9)), None, today()), Status::OnTime),
            with_status(row("2", "LATE", Some(day(2025, 1, 11)), None, today()), Status::OnTime),
            with_status(row("3", "LATE", Some(day(2025, 1, 2)), None, today()), Status::OnTime),
        ];
        // LATE starts on the 2nd thanks to its second row, so it is the queue head.
        let kept = apply(Sequencing::LotQueue, rows, today());
        assert_eq!(order_ids(&kept), vec!["2", "3"]);
    }

    #[test]
    fn lot_queue_breaks_start_ties_by_descriptor() {
        let rows = vec![
            with_status(row("1", "OP 9/25", Some(day(2025, 1, 9)), None, today()), Status::OnTime),
            with_status(row("2", "OP 1/25", Some(day(2025, 1, 9)), None, today()), Status::OnTime),
        ];
        let kept = apply(Sequencing::LotQueue, rows, today());
        assert_eq!(order_ids(&kept), vec!["2"]);
    }

    #[test]
    fn lot_queue_drops_lots_without_start_and_rows_without_lot() {
        let mut orphan =
            with_status(row("9", "X", Some(day(2025, 1, 1)), None, today()), Status::Delayed);
        orphan.balance.lot_descriptor = None;
        let rows = vec![
            with_status(row("1", "NOSTART", None, Some(day(2025, 1, 2)), today()), Status::Delayed),
            orphan,
        ];
        assert!(apply(Sequencing::LotQueue, rows, today()).is_empty());
    }

    #[test]
    fn lot_queue_keeps_future_rows_of_a_kept_lot() {
        let rows = vec![
            row("1", "OSSO 1/25", Some(day(2025, 1, 1)), Some(day(2025, 1, 5)), today()),
            row("2", "OSSO 1/25", Some(day(2025, 1, 20)), Some(day(2025, 1, 25)), today()),
            row("3", "OSSO 2/25", Some(day(2025, 1, 21)), Some(day(2025, 1, 30)), today()),
        ];
        let kept = apply(Sequencing::LotQueue, rows, today());
        assert_eq!(order_ids(&kept), vec!["1", "2"]);
        assert_eq!(kept[1].status, Status::Future);
    }

    #[test]
    fn lot_queue_start_counts_future_rows() {
        // A's unfinished first row moves it ahead of B in the queue.
        let rows = vec![
            row("1", "A", Some(day(2025, 1, 2)), None, today()),
            row("2", "A", Some(day(2025, 1, 10)), Some(day(2025, 1, 20)), today()),
            row("3", "B", Some(day(2025, 1, 5)), Some(day(2025, 1, 20)), today()),
        ];
        let kept = apply(Sequencing::LotQueue, rows, today());
        assert_eq!(order_ids(&kept), vec!["1", "2"]);
    }

    #[test]
    fn next_cohort_keeps_started_rows_including_unlabelled_future() {
        let rows = vec![
            row("1", "A", Some(day(2025, 1, 1)), Some(day(2025, 1, 5)), today()),
            row("2", "B", Some(day(2025, 1, 10)), Some(day(2025, 1, 20)), today()),
            // Started but with no end date: still `Future`, still kept.
            row("3", "C", Some(day(2025, 1, 12)), None, today()),
            row("4", "D", Some(day(2025, 1, 30)), Some(day(2025, 2, 5)), today()),
        ];
        let kept = apply(Sequencing::NextCohort, rows, today());
        assert_eq!(order_ids(&kept), vec!["1", "2", "3"]);
    }

    #[test]
    fn next_cohort_falls_back_to_nearest_start() {
        let rows = vec![
            row("1", "A", Some(day(2025, 1, 20)), Some(day(2025, 1, 25)), today()),
            row("2", "B", Some(day(2025, 1, 15)), Some(day(2025, 1, 18)), today()),
            row("3", "C", Some(day(2025, 1, 15)), Some(day(2025, 1, 15)), today()),
            row("4", "D", None, None, today()),
        ];
        let kept = apply(Sequencing::NextCohort, rows, today());
        assert_eq!(order_ids(&kept), vec!["2", "3"]);
    }

    #[test]
    fn next_cohort_is_empty_without_any_dates() {
        let rows = vec![row("1", "A", None, None, today())];
        assert!(apply(Sequencing::NextCohort, rows, today()).is_empty());
    }

    #[test]
    fn unfiltered_keeps_everything() {
        let rows = vec![
            row("1", "A", None, None, today()),
            row("2", "B", Some(day(2025, 1, 1)), Some(day(2025, 1, 2)), today()),
        ];
        assert_eq!(apply(Sequencing::Unfiltered, rows, today()).len(), 2);
    }
}
