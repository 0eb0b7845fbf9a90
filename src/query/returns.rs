//! Returned parts still owed back to a phase, per order, product and reason.

use crate::models::Phase;
use crate::query::fragments::{self, LotScope};
use crate::query::sql::{where_all, Binds, SqlQuery};
use crate::query::QueryContext;

/// Tables the returns view reads besides the lot table.
pub const REQUIRED_TABLES: [&str; 5] = ["toqmovi", "grmotper", "produto", "ordem", "processo"];

/// Returns view for `phase`, or `None` when the phase has none.
pub fn build(phase: Phase, ctx: &QueryContext) -> Option<SqlQuery> {
    if !phase.has_returns_view() {
        return None;
    }

    let mut binds = Binds::new();
    let ret = binds.text(fragments::TX_RETURN);
    let debit = binds.text(fragments::TX_DEBIT);
    let reason = binds.text(fragments::RETURN_REASON);
    let marker = binds.text(fragments::RETURN_MARKER);
    let since = binds.date(ctx.scope.movements_since);

    let mut predicates = vec!["GREATEST(s.returned - s.debited, 0) > 0".to_string()];
    predicates.extend(fragments::lot_scope(LotScope::Brands, &mut binds));
    if phase.tracks_returns() {
        predicates.push(fragments::routed_through(
            ctx,
            &mut binds,
            "s.priproduto",
            phase.code(),
        ));
    }

    let sql = format!(
        r#"WITH movements AS (
  SELECT m.priordem, m.priproduto, m.priquanti, m.pritransac, m.pridata,
    CAST(SUBSTRING(m.priobserv FROM {reason}) AS INTEGER) AS reason_code
  FROM {movements} m
  WHERE m.priobserv ILIKE {marker}
    AND m.pridata >= {since}
    AND m.pritransac IN ({ret}, {debit})
),
by_reason AS (
  SELECT priordem, priproduto, reason_code,
    SUM(CASE WHEN pritransac = {ret} THEN priquanti ELSE 0 END) AS returned,
    SUM(CASE WHEN pritransac = {debit} THEN priquanti ELSE 0 END) AS debited,
    MAX(CASE WHEN pritransac = {ret} THEN pridata ELSE NULL END) AS last_returned
  FROM movements
  GROUP BY priordem, priproduto, reason_code
)
SELECT
  CAST(l.lotdes AS TEXT) AS lot_descriptor,
  CAST(s.priordem AS TEXT) AS order_id,
  CAST(p.pronome AS TEXT) AS description,
  CAST(s.last_returned AS DATE) AS returned_on,
  CAST(GREATEST(s.returned - s.debited, 0) AS NUMERIC) AS quantity,
  CAST(g.gmpdescri AS TEXT) AS reason
FROM by_reason s
JOIN {products} p ON TRIM(p.produto) = TRIM(s.priproduto)
JOIN {orders} o ON TRIM(CAST(o.ordem AS TEXT)) = TRIM(CAST(s.priordem AS TEXT))
JOIN {lots} l ON o.lotcod = l.lotcod
LEFT JOIN {reasons} g ON g.gmpcodigo = s.reason_code
{where_clause}
ORDER BY s.last_returned DESC NULLS LAST"#,
        movements = ctx.table("toqmovi"),
        products = ctx.table("produto"),
        orders = ctx.table("ordem"),
        lots = ctx.lots(),
        reasons = ctx.table("grmotper"),
        where_clause = where_all(&predicates),
    );

    Some(binds.finish(sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::sql::SqlArg;
    use crate::query::testing::{assert_placeholders_match, context, has_arg};

    #[test]
    fn only_return_phases_have_a_view() {
        let ctx = context();
        for phase in Phase::ALL {
            assert_eq!(build(phase, &ctx).is_some(), phase.has_returns_view(), "{:?}", phase);
        }
    }

    #[test]
    fn reason_code_is_parsed_from_the_marker() {
        let query = build(Phase::ToPainting, &context()).unwrap();
        assert_placeholders_match(&query);
        assert!(query.sql.contains("SUBSTRING(m.priobserv FROM $3)"));
        assert_eq!(query.args[2], SqlArg::Text(r"\*d:([0-9]+)".into()));
        assert!(query.sql.contains("LEFT JOIN producao.grmotper g"));
        assert!(!query.sql.contains("FROM producao.processo pr"));
    }

    #[test]
    fn phase_views_require_routing() {
        for phase in [Phase::SolidWood, Phase::SheetGoods] {
            let query = build(phase, &context()).unwrap();
            assert_placeholders_match(&query);
            assert!(query.sql.contains("pr.produto = s.priproduto"));
            assert!(has_arg(&query, SqlArg::Int(phase.code())));
            assert!(query.sql.contains("l.lotdes ILIKE ANY("));
        }
    }
}
