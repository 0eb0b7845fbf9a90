use chrono::NaiveDate;

use crate::models::Status;
use crate::monitor::window::DateWindow;

/// Labels a window relative to `today`. Starts as `Future`, becomes
/// `OnTime` when today lies inside a fully set window, and `Delayed`
/// whenever the end has passed; the delayed check runs last and wins.
pub fn classify(window: &DateWindow, today: NaiveDate) -> Status {
    let mut status = Status::Future;

    if let (Some(start), Some(end)) = (window.start, window.end) {
        if start <= today && end >= today {
            status = Status::OnTime;
        }
    }

    if matches!(window.end, Some(end) if end < today) {
        status = Status::Delayed;
    }

    status
}
