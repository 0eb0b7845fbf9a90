//! Typed builders for the per-phase read queries.

pub mod balance;
pub mod completed;
pub mod fragments;
pub mod returns;
pub mod sql;

use std::collections::HashSet;

use crate::config::ReportScope;
pub use sql::{Qualifier, SqlArg, SqlQuery};

/// Column names of the generic phase ledger (`pasfase`), which differ
/// between ERP installations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerColumns {
    pub order: &'static str,
    pub quantity: &'static str,
}

const ORDER_COLUMNS: [&str; 3] = ["ordem", "pasordem", "ordnum"];
const QUANTITY_COLUMNS: [&str; 3] = ["pasquanti", "pasquant", "pasqtd"];

impl Default for LedgerColumns {
    fn default() -> Self {
        Self {
            order: ORDER_COLUMNS[0],
            quantity: QUANTITY_COLUMNS[0],
        }
    }
}

impl LedgerColumns {
    /// Picks the first known variant present among `columns` (lowercase).
    /// Only whitelisted names are ever returned, so they are safe to splice
    /// into SQL.
    pub fn detect(columns: &HashSet<String>) -> Self {
        let defaults = Self::default();
        Self {
            order: ORDER_COLUMNS
                .into_iter()
                .find(|c| columns.contains(*c))
                .unwrap_or(defaults.order),
            quantity: QUANTITY_COLUMNS
                .into_iter()
                .find(|c| columns.contains(*c))
                .unwrap_or(defaults.quantity),
        }
    }
}

/// Everything a builder needs besides the phase itself.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub tables: Qualifier,
    /// `loteprod` or `lotprod`, whichever the installation has.
    pub lot_table: String,
    pub ledger: LedgerColumns,
    pub scope: ReportScope,
    /// Whether the planning spreadsheet ledger (`planilha`) exists.
    pub sheet_ledger: bool,
}

impl QueryContext {
    pub fn table(&self, name: &str) -> String {
        self.tables.table(name)
    }

    pub fn lots(&self) -> String {
        self.tables.table(&self.lot_table)
    }
}
