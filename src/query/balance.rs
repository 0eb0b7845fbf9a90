//! Pending-balance query per phase. Every builder yields the `BalanceRow`
//! columns, restricted to rows with something left to produce.

use crate::models::phase::{
    ASSEMBLY_REQUISITION_PHASE, CUTTING_INTERMEDIATE_PHASE, UPHOLSTERY_OPERATION,
};
use crate::models::{Handoff, Phase};
use crate::query::fragments::{self, LotScope};
use crate::query::sql::{where_all, Binds, SqlQuery};
use crate::query::QueryContext;

/// Ledger an order's accounted-for quantity is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produced {
    /// Generic phase ledger filtered by the phase code.
    PhaseLedger,
    /// Generic phase ledger keyed by each product's write-off phase.
    CuttingLedger,
    /// Planning spreadsheet filtered by the phase code.
    SheetByPhase,
    /// Planning spreadsheet filtered by an operation code.
    SheetByOperation(&'static str),
    /// Movement ledger filtered by a transaction code.
    Movements(&'static str),
}

/// Which orders a phase considers at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Product routed through the phase.
    Routed,
    /// Product routed through cutting; also yields its write-off phase.
    CuttingRouting,
    /// Brand priority rules.
    PriorityOrders,
    /// Product routing carries an operation code.
    Operation(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    Open,
    /// Open, or closed while still owing returned parts.
    OpenOrReturned,
    Any,
}

/// Balance rule for phases that track orders against their planned quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBalance {
    pub produced: Produced,
    pub eligibility: Eligibility,
    /// Subtract the scrap ledger.
    pub scrap: bool,
    /// Add back net returned parts.
    pub returns: bool,
    pub lots: LotScope,
    pub lot_year: bool,
    pub orders: OrderFilter,
}

/// Balance rule of an order-tracking phase; `None` for the handoff views,
/// which balance requisitions instead.
pub fn order_rule(phase: Phase, ctx: &QueryContext) -> Option<OrderBalance> {
    let floor = OrderBalance {
        produced: Produced::PhaseLedger,
        eligibility: Eligibility::Routed,
        scrap: false,
        returns: false,
        lots: LotScope::Bone,
        lot_year: true,
        orders: OrderFilter::Open,
    };

    let rule = match phase {
        Phase::Cutting => OrderBalance {
            produced: Produced::CuttingLedger,
            eligibility: Eligibility::CuttingRouting,
            ..floor
        },
        Phase::Pressing => floor,
        Phase::Machining => OrderBalance {
            scrap: true,
            ..floor
        },
        Phase::SolidWood => OrderBalance {
            produced: Produced::Movements(fragments::TX_PRODUCTION),
            returns: true,
            lots: LotScope::Brands,
            orders: OrderFilter::OpenOrReturned,
            ..floor
        },
        Phase::SheetGoods => OrderBalance {
            returns: true,
            lots: LotScope::Brands,
            orders: OrderFilter::OpenOrReturned,
            ..floor
        },
        Phase::Painting => OrderBalance {
            produced: if ctx.sheet_ledger {
                Produced::SheetByPhase
            } else {
                Produced::PhaseLedger
            },
            lots: LotScope::Brands,
            lot_year: false,
            orders: OrderFilter::Any,
            ..floor
        },
        Phase::PriorityConsolidation => OrderBalance {
            produced: Produced::Movements(fragments::TX_PRODUCTION),
            eligibility: Eligibility::PriorityOrders,
            lots: LotScope::Any,
            lot_year: false,
            ..floor
        },
        Phase::Upholstery => OrderBalance {
            produced: Produced::SheetByOperation(UPHOLSTERY_OPERATION),
            eligibility: Eligibility::Operation(UPHOLSTERY_OPERATION),
            lots: LotScope::Any,
            orders: OrderFilter::Any,
            ..floor
        },
        Phase::ToAssembly | Phase::ToPainting => return None,
    };
    Some(rule)
}

pub fn build(phase: Phase, ctx: &QueryContext) -> SqlQuery {
    match (phase.handoff(), order_rule(phase, ctx)) {
        (_, Some(rule)) => order_balance(phase, &rule, ctx),
        (Some(handoff), None) => handoff_balance(handoff, ctx),
        (None, None) => unreachable!("every order phase has a balance rule"),
    }
}

/// `produced` CTE: accounted-for quantity per order, keyed by `order_key`.
pub(crate) fn produced_cte(
    produced: Produced,
    phase: Phase,
    ctx: &QueryContext,
    binds: &mut Binds,
) -> String {
    let ledger = ctx.ledger;
    match produced {
        Produced::PhaseLedger => format!(
            "produced AS (\n  SELECT CAST({ord} AS TEXT) AS order_key, SUM(COALESCE({qty}, 0)) AS qty\n  FROM {table} WHERE fase = {phase} GROUP BY {ord})",
            ord = ledger.order,
            qty = ledger.quantity,
            table = ctx.table("pasfase"),
            phase = binds.int(phase.code()),
        ),
        Produced::CuttingLedger => format!(
            "produced AS (\n  SELECT CAST(pf.{ord} AS TEXT) AS order_key, SUM(COALESCE(pf.{qty}, 0)) AS qty\n  FROM {table} pf\n  JOIN cut_routing cr ON cr.write_off_phase = pf.fase\n  JOIN {orders} co ON co.ordem = pf.{ord} AND co.ordproduto = cr.produto\n  GROUP BY pf.{ord})",
            ord = ledger.order,
            qty = ledger.quantity,
            table = ctx.table("pasfase"),
            orders = ctx.table("ordem"),
        ),
        Produced::SheetByPhase => format!(
            "produced AS (\n  SELECT CAST(plaordem AS TEXT) AS order_key, SUM(COALESCE(CAST(plaquant AS NUMERIC), 0)) AS qty\n  FROM {table} WHERE plafase = {phase} GROUP BY plaordem)",
            table = ctx.table("planilha"),
            phase = binds.int(phase.code()),
        ),
        Produced::SheetByOperation(operation) => format!(
            "produced AS (\n  SELECT CAST(plaordem AS TEXT) AS order_key, SUM(COALESCE(CAST(plaquant AS NUMERIC), 0)) AS qty\n  FROM {table} WHERE plaopera = {op} GROUP BY plaordem)",
            table = ctx.table("planilha"),
            op = binds.text(operation),
        ),
        Produced::Movements(transaction) => format!(
            "produced AS (\n  SELECT TRIM(CAST(m.priordem AS TEXT)) AS order_key, SUM(COALESCE(m.priquanti, 0)) AS qty\n  FROM {table} m WHERE m.pritransac = {tx} GROUP BY m.priordem)",
            table = ctx.table("toqmovi"),
            tx = binds.text(transaction),
        ),
    }
}

/// Order-side expression matching `produced.order_key`.
pub(crate) fn produced_key(produced: Produced) -> &'static str {
    match produced {
        Produced::Movements(_) => "TRIM(CAST(o.ordem AS TEXT))",
        _ => "CAST(o.ordem AS TEXT)",
    }
}

/// CTE the eligibility rule needs, if any.
pub(crate) fn eligibility_cte(
    eligibility: Eligibility,
    phase: Phase,
    ctx: &QueryContext,
    binds: &mut Binds,
) -> Option<String> {
    match eligibility {
        Eligibility::Routed => None,
        Eligibility::CuttingRouting => Some(format!(
            "cut_routing AS (\n  SELECT DISTINCT pr.produto,\n    CASE WHEN EXISTS (SELECT 1 FROM {process} sub WHERE sub.produto = pr.produto AND sub.fase = {inter})\n      THEN {inter} ELSE {cut} END AS write_off_phase\n  FROM {process} pr WHERE pr.fase = {cut})",
            process = ctx.table("processo"),
            inter = binds.int(CUTTING_INTERMEDIATE_PHASE),
            cut = binds.int(phase.code()),
        )),
        Eligibility::PriorityOrders => {
            let flag = binds.text("1");
            let base = format!(
                "SELECT o.ordem FROM {orders} o\n    JOIN {lots} l ON o.lotcod = l.lotcod\n    JOIN {products} p ON o.ordproduto = p.produto",
                orders = ctx.table("ordem"),
                lots = ctx.lots(),
                products = ctx.table("produto"),
            );
            let garland = format!(
                "{base}\n    WHERE l.lotdes ILIKE {} AND p.prodpriem = {flag}",
                binds.text("%Garland%"),
            );
            let solare = format!(
                "{base}\n    WHERE l.lotdes ILIKE {} AND p.pronome ILIKE {} AND p.prodpriem = {flag}",
                binds.text("%Solare%"),
                binds.text("%LERIADO%"),
            );
            let petra = format!(
                "{base}\n    WHERE l.lotdes ILIKE {} AND p.pronome ILIKE ANY({}) AND p.prodpriem = {flag}",
                binds.text("%Petra%"),
                binds.texts(&["%PT105%", "%PT102%", "%PT107%", "%PF107%", "%PT100%"]),
            );
            Some(format!(
                "eligible AS (\n    {garland}\n    UNION\n    {solare}\n    UNION\n    {petra})"
            ))
        }
        Eligibility::Operation(operation) => Some(format!(
            "eligible AS (\n  SELECT DISTINCT o.ordem FROM {orders} o\n  JOIN {process} pr ON o.ordproduto = pr.produto\n  JOIN {lots} l ON o.lotcod = l.lotcod\n  WHERE pr.prccodig = {op} AND {year})",
            orders = ctx.table("ordem"),
            process = ctx.table("processo"),
            lots = ctx.lots(),
            op = binds.text(operation),
            year = fragments::lot_year(ctx, binds),
        )),
    }
}

/// Join restricting `o` to eligible orders, if the rule works by join.
pub(crate) fn eligibility_join(eligibility: Eligibility) -> Option<&'static str> {
    match eligibility {
        Eligibility::Routed => None,
        Eligibility::CuttingRouting => Some("JOIN cut_routing cr ON cr.produto = o.ordproduto"),
        Eligibility::PriorityOrders | Eligibility::Operation(_) => {
            Some("JOIN eligible el ON el.ordem = o.ordem")
        }
    }
}

/// Predicate restricting `o` to eligible orders, if the rule works by filter.
pub(crate) fn eligibility_filter(
    eligibility: Eligibility,
    phase: Phase,
    ctx: &QueryContext,
    binds: &mut Binds,
) -> Option<String> {
    match eligibility {
        Eligibility::Routed => Some(fragments::routed_through(
            ctx,
            binds,
            "o.ordproduto",
            phase.code(),
        )),
        _ => None,
    }
}

fn order_balance(phase: Phase, rule: &OrderBalance, ctx: &QueryContext) -> SqlQuery {
    let mut binds = Binds::new();
    let mut ctes = Vec::new();

    if let Some(cte) = eligibility_cte(rule.eligibility, phase, ctx, &mut binds) {
        ctes.push(cte);
    }
    ctes.push(produced_cte(rule.produced, phase, ctx, &mut binds));

    if rule.scrap {
        ctes.push(format!(
            "scrap AS (\n  SELECT CAST(perofscod AS TEXT) AS order_key, SUM(COALESCE(perqtdper, 0)) AS qty\n  FROM {} GROUP BY perofscod)",
            ctx.table("perdas")
        ));
    }

    if rule.returns {
        let ret = binds.text(fragments::TX_RETURN);
        let debit = binds.text(fragments::TX_DEBIT);
        ctes.push(format!(
            "returns_balance AS (\n  SELECT ro.lotcod, TRIM(m.priproduto) AS product_key,\n    SUM(CASE WHEN m.pritransac = {ret} THEN m.priquanti ELSE -m.priquanti END) AS balance\n  FROM {movements} m\n  JOIN {orders} ro ON TRIM(CAST(ro.ordem AS TEXT)) = TRIM(CAST(m.priordem AS TEXT))\n  WHERE m.priobserv ILIKE {marker} AND m.pridata >= {since} AND m.pritransac IN ({ret}, {debit})\n  GROUP BY 1, 2)",
            movements = ctx.table("toqmovi"),
            orders = ctx.table("ordem"),
            marker = binds.text(fragments::RETURN_MARKER),
            since = binds.date(ctx.scope.movements_since),
        ));
    }

    // Lot scope shared by the historical totals and the main selection.
    let mut lot_predicates = Vec::new();
    if let Some(scope) = fragments::lot_scope(rule.lots, &mut binds) {
        lot_predicates.push(scope);
    }
    if rule.lot_year {
        lot_predicates.push(fragments::lot_year(ctx, &mut binds));
    }
    let routing = eligibility_filter(rule.eligibility, phase, ctx, &mut binds).or_else(|| {
        // Cutting eligibility is a join, but historical totals still only
        // count orders routed through cutting.
        (rule.eligibility == Eligibility::CuttingRouting)
            .then(|| fragments::routed_through(ctx, &mut binds, "o.ordproduto", phase.code()))
    });

    let mut total_predicates = lot_predicates.clone();
    total_predicates.extend(routing.clone());
    let total_join = match rule.eligibility {
        Eligibility::PriorityOrders | Eligibility::Operation(_) => {
            "\n  JOIN eligible el ON el.ordem = o.ordem"
        }
        _ => "",
    };
    ctes.push(format!(
        "lot_totals AS (\n  SELECT l.lotdes, SUM(o.ordquanti) AS total\n  FROM {orders} o JOIN {lots} l ON l.lotcod = o.lotcod{total_join}\n  {where_clause}\n  GROUP BY l.lotdes)",
        orders = ctx.table("ordem"),
        lots = ctx.lots(),
        where_clause = where_all(&total_predicates),
    ));

    let mut remaining = String::from("o.ordquanti - COALESCE(q.qty, 0)");
    if rule.scrap {
        remaining = String::from("o.ordquanti - (COALESCE(q.qty, 0) + COALESCE(s.qty, 0))");
    }
    if rule.returns {
        remaining.push_str(" + COALESCE(rb.balance, 0)");
    }
    let pending = format!("GREATEST({}, 0)", remaining);

    let mut joins = vec![
        format!("JOIN {} p ON p.produto = o.ordproduto", ctx.table("produto")),
        format!("JOIN {} l ON o.lotcod = l.lotcod", ctx.lots()),
    ];
    joins.extend(eligibility_join(rule.eligibility).map(String::from));
    joins.push(format!(
        "LEFT JOIN produced q ON {} = q.order_key",
        produced_key(rule.produced)
    ));
    if rule.scrap {
        joins.push("LEFT JOIN scrap s ON CAST(o.ordem AS TEXT) = s.order_key".into());
    }
    if rule.returns {
        joins.push(
            "LEFT JOIN returns_balance rb ON rb.lotcod = o.lotcod AND rb.product_key = TRIM(o.ordproduto)"
                .into(),
        );
    }
    joins.push("LEFT JOIN lot_totals lt ON lt.lotdes = l.lotdes".into());

    let mut predicates = Vec::new();
    match rule.orders {
        OrderFilter::Open => predicates.push(fragments::open_order()),
        OrderFilter::OpenOrReturned => predicates.push(format!(
            "({} OR COALESCE(rb.balance, 0) > 0)",
            fragments::open_order()
        )),
        OrderFilter::Any => {}
    }
    predicates.extend(lot_predicates);
    if rule.eligibility == Eligibility::Routed {
        predicates.extend(routing);
    }
    predicates.push(format!("{} > 0", pending));

    let returns = if rule.returns {
        "COALESCE(rb.balance, 0)"
    } else {
        "0"
    };
    let write_off = if rule.eligibility == Eligibility::CuttingRouting {
        "CAST(cr.write_off_phase AS INTEGER)"
    } else {
        "CAST(NULL AS INTEGER)"
    };
    let distinct = if rule.eligibility == Eligibility::CuttingRouting {
        "SELECT DISTINCT"
    } else {
        "SELECT"
    };

    let sql = format!(
        r#"{with}
{distinct}
  CAST(o.ordem AS TEXT) AS order_id,
  CAST(o.ordproduto AS TEXT) AS product,
  CAST(p.pronome AS TEXT) AS description,
  CAST({pending} AS NUMERIC) AS pending_quantity,
  CAST({returns} AS NUMERIC) AS returns_balance,
  CAST(o.ordquanti AS NUMERIC) AS order_quantity,
  CAST(NULLIF(o.orddtence, {open}) AS DATE) AS order_close_date,
  CAST(l.lotdes AS TEXT) AS lot_descriptor,
  CAST(l.lottrans AS TEXT) AS lot_transition,
  CAST(l.lotdtini AS DATE) AS lot_start_date,
  CAST(l.lotdtpre AS DATE) AS lot_preview_date,
  CAST(lt.total AS NUMERIC) AS lot_historical_total,
  CAST(NULL AS TEXT) AS requisition_number,
  {write_off} AS write_off_phase
FROM {orders} o
{joins}
{where_clause}
ORDER BY order_id, product"#,
        with = fragments::with_ctes(&ctes),
        open = fragments::OPEN_SENTINEL,
        orders = ctx.table("ordem"),
        joins = joins.join("\n"),
        where_clause = where_all(&predicates),
    );

    binds.finish(sql)
}

/// Requisition rules of a handoff view, on aliases `r` (requisition) and
/// `p` (product master).
pub(crate) fn requisition_filters(
    handoff: Handoff,
    ctx: &QueryContext,
    binds: &mut Binds,
) -> Vec<String> {
    let mut predicates = vec![
        "r.rqoquanti > 0".to_string(),
        format!("p.profantasm = {}", binds.text("N")),
        format!("p.proorigem = {}", binds.text("F")),
        format!(
            "p.pronome NOT ILIKE ALL({})",
            binds.texts(&["%CANTONEIRA%", "%(ALU)%", "%(FERRO)%"])
        ),
    ];
    match handoff {
        Handoff::Assembly => {
            predicates.push(format!("r.reqfase = {}", binds.int(ASSEMBLY_REQUISITION_PHASE)));
        }
        Handoff::Painting => {
            predicates.push(format!(
                "EXISTS (SELECT 1 FROM {} pr WHERE pr.produto = r.reqproduto AND pr.fase = ANY({}))",
                ctx.table("processo"),
                binds.ints(&[Phase::SolidWood.code(), Phase::SheetGoods.code()])
            ));
            predicates.push(format!("r.reqproduto ILIKE {}", binds.text("OSS%")));
        }
    }
    predicates
}

fn handoff_balance(handoff: Handoff, ctx: &QueryContext) -> SqlQuery {
    let mut binds = Binds::new();

    let mut predicates = requisition_filters(handoff, ctx, &mut binds);
    predicates.extend(fragments::lot_scope(LotScope::Brands, &mut binds));
    predicates.push(fragments::lot_year(ctx, &mut binds));
    let debit = fragments::plain_debit(ctx, &mut binds);

    let sql = format!(
        r#"WITH requisitions AS (
  SELECT r.reqord, r.reqproduto, r.rqoquanti, r.reqnumero, l.lotdes AS lot_descriptor
  FROM {requisitions} r
  JOIN {orders} o ON o.ordem = r.reqord
  JOIN {lots} l ON o.lotcod = l.lotcod
  JOIN {products} p ON p.produto = r.reqproduto
  {where_clause}
),
requested AS (
  SELECT reqord, reqproduto, lot_descriptor,
    TRIM(CAST(reqord AS TEXT)) AS order_key, TRIM(reqproduto) AS product_key,
    SUM(rqoquanti) AS qty, MAX(reqnumero) AS reqnumero
  FROM requisitions GROUP BY reqord, reqproduto, lot_descriptor
),
lot_totals AS (
  SELECT lot_descriptor, SUM(rqoquanti) AS total FROM requisitions GROUP BY lot_descriptor
),
debited AS (
  SELECT TRIM(CAST(m.priordem AS TEXT)) AS order_key, TRIM(m.priproduto) AS product_key, SUM(m.priquanti) AS qty
  FROM {movements} m
  WHERE EXISTS (
    SELECT 1 FROM requisitions rq
    WHERE TRIM(CAST(rq.reqord AS TEXT)) = TRIM(CAST(m.priordem AS TEXT)) AND TRIM(rq.reqproduto) = TRIM(m.priproduto)
  )
  AND {debit}
  GROUP BY 1, 2
),
balances AS (
  SELECT rq.reqord, rq.reqproduto, rq.lot_descriptor, rq.reqnumero,
    GREATEST(rq.qty - COALESCE(d.qty, 0), 0) AS pending
  FROM requested rq
  LEFT JOIN debited d ON d.order_key = rq.order_key AND d.product_key = rq.product_key
)
SELECT
  CAST(b.reqord AS TEXT) AS order_id,
  CAST(b.reqproduto AS TEXT) AS product,
  CAST(p.pronome AS TEXT) AS description,
  CAST(b.pending AS NUMERIC) AS pending_quantity,
  CAST(0 AS NUMERIC) AS returns_balance,
  CAST(o.ordquanti AS NUMERIC) AS order_quantity,
  CAST(NULLIF(o.orddtence, {open}) AS DATE) AS order_close_date,
  CAST(b.lot_descriptor AS TEXT) AS lot_descriptor,
  CAST(l.lottrans AS TEXT) AS lot_transition,
  CAST(l.lotdtini AS DATE) AS lot_start_date,
  CAST(l.lotdtpre AS DATE) AS lot_preview_date,
  CAST(lt.total AS NUMERIC) AS lot_historical_total,
  CAST(b.reqnumero AS TEXT) AS requisition_number,
  CAST(NULL AS INTEGER) AS write_off_phase
FROM balances b
JOIN lot_totals lt ON lt.lot_descriptor = b.lot_descriptor
JOIN {orders} o ON o.ordem = b.reqord
JOIN {products} p ON p.produto = b.reqproduto
JOIN {lots} l ON o.lotcod = l.lotcod
WHERE b.pending > 0
ORDER BY order_id, product"#,
        requisitions = ctx.table("reqordem"),
        orders = ctx.table("ordem"),
        lots = ctx.lots(),
        products = ctx.table("produto"),
        movements = ctx.table("toqmovi"),
        where_clause = where_all(&predicates),
        open = fragments::OPEN_SENTINEL,
    );

    binds.finish(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::sql::SqlArg;
    use crate::query::testing::{assert_placeholders_match, context, has_arg};

    #[test]
    fn every_phase_builds_a_bound_query() {
        let ctx = context();
        for phase in Phase::ALL {
            let query = build(phase, &ctx);
            assert_placeholders_match(&query);
            assert!(query.sql.contains("AS pending_quantity"), "{:?}", phase);
            assert!(query.sql.contains("AS write_off_phase"), "{:?}", phase);
            assert!(!query.sql.contains("lotprod"), "{:?}", phase);
        }
    }

    #[test]
    fn pending_is_clamped_and_positive_everywhere() {
        let ctx = context();
        for phase in Phase::ALL {
            let query = build(phase, &ctx);
            assert!(query.sql.contains("GREATEST("), "{:?}", phase);
            assert!(
                query.sql.contains(", 0) > 0") || query.sql.contains("b.pending > 0"),
                "{:?}",
                phase
            );
        }
    }

    #[test]
    fn cutting_keys_ledger_by_write_off_phase() {
        let query = build(Phase::Cutting, &context());
        assert!(query.sql.contains("cut_routing AS"));
        assert!(query.sql.contains("JOIN cut_routing cr ON cr.write_off_phase = pf.fase"));
        assert!(query.sql.contains("CAST(cr.write_off_phase AS INTEGER) AS write_off_phase"));
        assert!(query.sql.starts_with("WITH cut_routing"));
        assert!(has_arg(&query, SqlArg::Int(13)));
        assert!(has_arg(&query, SqlArg::Int(5)));
        assert!(query.sql.contains("o.orddtence = DATE '0001-01-01'"));
    }

    #[test]
    fn machining_subtracts_scrap() {
        let query = build(Phase::Machining, &context());
        assert!(query.sql.contains("FROM producao.perdas"));
        assert!(query
            .sql
            .contains("GREATEST(o.ordquanti - (COALESCE(q.qty, 0) + COALESCE(s.qty, 0)), 0)"));
        assert!(query.sql.contains("FROM producao.pasfase WHERE fase = $1"));
        assert_eq!(query.args[0], SqlArg::Int(15));
    }

    #[test]
    fn ledger_column_variants_are_spliced() {
        let mut ctx = context();
        ctx.ledger = crate::query::LedgerColumns {
            order: "ordnum",
            quantity: "pasqtd",
        };
        let query = build(Phase::Pressing, &ctx);
        assert!(query
            .sql
            .contains("SELECT CAST(ordnum AS TEXT) AS order_key, SUM(COALESCE(pasqtd, 0)) AS qty"));
    }

    #[test]
    fn returns_phases_add_back_and_relax_closure() {
        for phase in [Phase::SolidWood, Phase::SheetGoods] {
            let query = build(phase, &context());
            assert!(query.sql.contains("returns_balance AS"));
            assert!(query.sql.contains("+ COALESCE(rb.balance, 0)"));
            assert!(query
                .sql
                .contains("(o.orddtence = DATE '0001-01-01' OR COALESCE(rb.balance, 0) > 0)"));
            assert!(has_arg(&query, SqlArg::Text("%*d:%".into())));
            assert!(has_arg(&query, SqlArg::Text("4".into())));
            assert!(has_arg(&query, SqlArg::Text("14".into())));
        }
    }

    #[test]
    fn solid_wood_counts_production_movements() {
        let query = build(Phase::SolidWood, &context());
        assert!(query.sql.contains("FROM producao.toqmovi m WHERE m.pritransac ="));
        assert!(has_arg(&query, SqlArg::Text("3".into())));
        assert!(!query.sql.contains("pasfase"));

        let sheet = build(Phase::SheetGoods, &context());
        assert!(sheet.sql.contains("FROM producao.pasfase WHERE fase ="));
    }

    #[test]
    fn painting_prefers_spreadsheet_and_ignores_closure() {
        let mut ctx = context();
        let query = build(Phase::Painting, &ctx);
        assert!(query.sql.contains("FROM producao.planilha WHERE plafase ="));
        assert!(!query.sql.contains("o.orddtence = DATE"));
        assert!(!query.sql.contains("EXTRACT(YEAR"));

        ctx.sheet_ledger = false;
        let fallback = build(Phase::Painting, &ctx);
        assert!(fallback.sql.contains("FROM producao.pasfase WHERE fase ="));
    }

    #[test]
    fn upholstery_uses_operation_code_without_closure_filter() {
        let query = build(Phase::Upholstery, &context());
        assert!(query.sql.contains("WHERE plaopera = $1"));
        assert!(query.sql.contains("pr.prccodig = $1"));
        assert!(query.sql.contains("JOIN eligible el ON el.ordem = o.ordem"));
        assert!(!query.sql.contains("o.orddtence = DATE"));
        assert_eq!(query.args[0], SqlArg::Text("136".into()));
    }

    #[test]
    fn priority_consolidation_unions_three_rules() {
        let query = build(Phase::PriorityConsolidation, &context());
        assert_eq!(query.sql.matches("UNION").count(), 2);
        assert!(has_arg(&query, SqlArg::Text("%LERIADO%".into())));
        assert!(has_arg(
            &query,
            SqlArg::TextList(
                ["%PT105%", "%PT102%", "%PT107%", "%PF107%", "%PT100%"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            )
        ));
        assert!(query.sql.contains("o.orddtence = DATE '0001-01-01'"));
        assert!(query.sql.contains("FROM producao.toqmovi m WHERE m.pritransac ="));
    }

    #[test]
    fn handoffs_balance_requisitions_against_debits() {
        let assembly = build(Phase::ToAssembly, &context());
        assert!(assembly.sql.contains("FROM producao.reqordem r"));
        assert!(assembly.sql.contains("(m.priobserv IS NULL OR m.priobserv = '')"));
        assert!(assembly.sql.contains("r.reqfase ="));
        assert!(assembly.sql.contains("p.pronome NOT ILIKE ALL("));
        assert!(has_arg(&assembly, SqlArg::Int(17)));
        assert!(!assembly.sql.contains("r.reqproduto ILIKE"));

        let painting = build(Phase::ToPainting, &context());
        assert!(painting.sql.contains("pr.fase = ANY("));
        assert!(painting.sql.contains("r.reqproduto ILIKE"));
        assert!(painting.sql.contains("p.proorigem ="));
        assert!(has_arg(&painting, SqlArg::IntList(vec![25, 30])));
        assert!(has_arg(&painting, SqlArg::Text("OSS%".into())));
        assert!(!painting.sql.contains("r.reqfase"));
    }

    #[test]
    fn lot_table_fallback_is_used() {
        let mut ctx = context();
        ctx.lot_table = "lotprod".into();
        let query = build(Phase::Machining, &ctx);
        assert!(query.sql.contains("JOIN producao.lotprod l"));
    }
}
