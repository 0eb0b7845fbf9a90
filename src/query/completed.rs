//! Orders with something already accounted for in a phase.

use crate::models::{Handoff, Phase};
use crate::query::balance::{
    eligibility_cte, eligibility_filter, eligibility_join, order_rule, produced_cte, produced_key,
    requisition_filters, OrderBalance,
};
use crate::query::fragments;
use crate::query::sql::{where_all, Binds, SqlQuery};
use crate::query::QueryContext;

/// Completed-orders query for `phase`, optionally limited to the given lot
/// descriptors.
pub fn build(phase: Phase, ctx: &QueryContext, lots: Option<&[String]>) -> SqlQuery {
    match (order_rule(phase, ctx), phase.handoff()) {
        (Some(rule), _) => order_view(phase, &rule, ctx, lots),
        (None, Some(handoff)) => handoff_view(handoff, ctx, lots),
        (None, None) => unreachable!("every order phase has a balance rule"),
    }
}

fn lot_filter(lots: Option<&[String]>, binds: &mut Binds) -> Option<String> {
    let lots = lots.filter(|l| !l.is_empty())?;
    let refs: Vec<&str> = lots.iter().map(String::as_str).collect();
    Some(format!("l.lotdes = ANY({})", binds.texts(&refs)))
}

fn order_view(
    phase: Phase,
    rule: &OrderBalance,
    ctx: &QueryContext,
    lots: Option<&[String]>,
) -> SqlQuery {
    let mut binds = Binds::new();
    let mut ctes = Vec::new();
    ctes.extend(eligibility_cte(rule.eligibility, phase, ctx, &mut binds));
    ctes.push(produced_cte(rule.produced, phase, ctx, &mut binds));

    let mut joins = vec![
        format!("JOIN {} p ON p.produto = o.ordproduto", ctx.table("produto")),
        format!("JOIN {} l ON o.lotcod = l.lotcod", ctx.lots()),
    ];
    joins.extend(eligibility_join(rule.eligibility).map(String::from));
    joins.push(format!(
        "JOIN produced q ON {} = q.order_key",
        produced_key(rule.produced)
    ));

    let mut predicates = vec!["q.qty > 0".to_string()];
    predicates.extend(eligibility_filter(rule.eligibility, phase, ctx, &mut binds));
    predicates.extend(lot_filter(lots, &mut binds));

    let sql = format!(
        r#"{with}
SELECT DISTINCT
  CAST(o.ordem AS TEXT) AS order_id,
  CAST(p.pronome AS TEXT) AS description,
  CAST(q.qty AS NUMERIC) AS produced_quantity,
  CAST(o.ordquanti AS NUMERIC) AS order_quantity,
  CAST(l.lotdes AS TEXT) AS lot_descriptor,
  CAST(CASE WHEN o.orddtence <> {open} THEN o.orddtence ELSE CURRENT_DATE END AS DATE) AS completion_date,
  CAST(NULL AS TEXT) AS requisition_number
FROM {orders} o
{joins}
{where_clause}
ORDER BY completion_date DESC, order_id"#,
        with = fragments::with_ctes(&ctes),
        open = fragments::OPEN_SENTINEL,
        orders = ctx.table("ordem"),
        joins = joins.join("\n"),
        where_clause = where_all(&predicates),
    );
    binds.finish(sql)
}

fn handoff_view(handoff: Handoff, ctx: &QueryContext, lots: Option<&[String]>) -> SqlQuery {
    let mut binds = Binds::new();
    let mut predicates = requisition_filters(handoff, ctx, &mut binds);
    predicates.extend(lot_filter(lots, &mut binds));
    let debit = fragments::plain_debit(ctx, &mut binds);

    let sql = format!(
        r#"WITH requisitions AS (
  SELECT DISTINCT r.reqord, r.reqproduto, r.reqnumero, o.ordquanti, l.lotdes, p.pronome
  FROM {requisitions} r
  JOIN {orders} o ON o.ordem = r.reqord
  JOIN {lots} l ON o.lotcod = l.lotcod
  JOIN {products} p ON p.produto = r.reqproduto
  {where_clause}
)
SELECT
  CAST(rq.reqord AS TEXT) AS order_id,
  CAST(rq.pronome AS TEXT) AS description,
  CAST(SUM(m.priquanti) AS NUMERIC) AS produced_quantity,
  CAST(MAX(rq.ordquanti) AS NUMERIC) AS order_quantity,
  CAST(rq.lotdes AS TEXT) AS lot_descriptor,
  CAST(MAX(m.pridata) AS DATE) AS completion_date,
  CAST(MAX(rq.reqnumero) AS TEXT) AS requisition_number
FROM requisitions rq
JOIN {movements} m
  ON TRIM(CAST(m.priordem AS TEXT)) = TRIM(CAST(rq.reqord AS TEXT))
  AND TRIM(m.priproduto) = TRIM(rq.reqproduto)
WHERE {debit}
GROUP BY rq.reqord, rq.reqproduto, rq.pronome, rq.lotdes
HAVING SUM(m.priquanti) > 0
ORDER BY completion_date DESC, order_id"#,
        requisitions = ctx.table("reqordem"),
        orders = ctx.table("ordem"),
        lots = ctx.lots(),
        products = ctx.table("produto"),
        movements = ctx.table("toqmovi"),
        where_clause = where_all(&predicates),
    );
    binds.finish(sql)
}
