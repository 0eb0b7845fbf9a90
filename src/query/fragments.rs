// Predicate fragments shared by the phase builders. Table aliases are fixed:
// o = ordem, l = lot table, p = produto, m = toqmovi, r = reqordem.

use crate::query::sql::Binds;
use crate::query::QueryContext;

/// Closure date an open order carries.
pub const OPEN_SENTINEL: &str = "DATE '0001-01-01'";

/// Lots of bone-structure parts, excluding one-off ("avulso") lots.
pub const BONE_LOT: &str = "%OSSO%";
pub const LOOSE_LOT: &str = "%AVULSO%";

/// Customer brands whose purchase orders are split into sub-lots.
pub const BRAND_LOTS: [&str; 3] = ["%Petra%", "%Solare%", "%Garland%"];

/// Movement ledger transaction codes.
pub const TX_PRODUCTION: &str = "3";
pub const TX_RETURN: &str = "4";
pub const TX_DEBIT: &str = "14";

/// Observation marker on return movements; the digits after it are the
/// return reason code.
pub const RETURN_MARKER: &str = "%*d:%";
pub const RETURN_REASON: &str = r"\*d:([0-9]+)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotScope {
    Bone,
    Brands,
    Any,
}

pub fn open_order() -> String {
    format!("o.orddtence = {}", OPEN_SENTINEL)
}

pub fn lot_scope(scope: LotScope, binds: &mut Binds) -> Option<String> {
    match scope {
        LotScope::Bone => Some(format!(
            "l.lotdes ILIKE {} AND l.lotdes NOT ILIKE {}",
            binds.text(BONE_LOT),
            binds.text(LOOSE_LOT)
        )),
        LotScope::Brands => Some(format!("l.lotdes ILIKE ANY({})", binds.texts(&BRAND_LOTS))),
        LotScope::Any => None,
    }
}

pub fn lot_year(ctx: &QueryContext, binds: &mut Binds) -> String {
    format!(
        "EXTRACT(YEAR FROM l.lotdtini) >= {}",
        binds.int(ctx.scope.min_lot_year)
    )
}

/// The product is routed through `phase` in the process table.
pub fn routed_through(ctx: &QueryContext, binds: &mut Binds, product: &str, phase: i32) -> String {
    format!(
        "EXISTS (SELECT 1 FROM {} pr WHERE pr.produto = {} AND pr.fase = {})",
        ctx.table("processo"),
        product,
        binds.int(phase)
    )
}

/// Debit movements with no observation: parts actually handed to the next
/// phase, as opposed to return corrections.
pub fn plain_debit(ctx: &QueryContext, binds: &mut Binds) -> String {
    format!(
        "m.pritransac = {} AND (m.priobserv IS NULL OR m.priobserv = '') AND m.pridata >= {}",
        binds.text(TX_DEBIT),
        binds.date(ctx.scope.movements_since)
    )
}

pub fn with_ctes(ctes: &[String]) -> String {
    format!("WITH {}", ctes.join(",\n"))
}
