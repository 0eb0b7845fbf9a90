pub mod phase;
pub mod rows;
pub mod status;

pub use phase::{Handoff, Phase, Sequencing, WindowLabel};
pub use rows::{
    BalanceRow, CompletedRow, GroupSummary, PhaseReport, PhaseRow, ReturnEntry, ReturnRow,
};
pub use status::Status;
