/// Production phases with a monitor. The numeric codes are the phase codes
/// used by the routing table and the phase ledger; 998 and 999 are the
/// handoff views and have no ledger phase of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Cutting,
    Pressing,
    Machining,
    SolidWood,
    SheetGoods,
    Painting,
    PriorityConsolidation,
    Upholstery,
    ToAssembly,
    ToPainting,
}

/// How the dated window for a phase is written in the lot transition text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLabel {
    pub token: &'static str,
    /// Token must stand as a whole word.
    pub word_bounded: bool,
    /// `TOKEN: dd/mm/yy` without an end date is accepted (start = end).
    pub single_date: bool,
}

impl WindowLabel {
    const fn range(token: &'static str) -> Self {
        Self {
            token,
            word_bounded: true,
            single_date: false,
        }
    }
}

/// Which rows a phase surfaces once statuses are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequencing {
    /// Only delayed and on-time rows.
    ActiveOnly,
    /// Rows of the delayed lots queued before the first on-time lot, plus
    /// that lot.
    LotQueue,
    /// Delayed rows plus the current (or next) start-date cohort.
    NextCohort,
    /// Everything, labelled.
    Unfiltered,
}

/// Where a phase gets its requisition handoff rules from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    Assembly,
    Painting,
}

pub const UPHOLSTERY_OPERATION: &str = "136";
/// Intermediate sub-operation of cutting; products routed through it are
/// written off under this phase code instead of the cutting code.
pub const CUTTING_INTERMEDIATE_PHASE: i32 = 13;
pub const ASSEMBLY_REQUISITION_PHASE: i32 = 17;

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::Cutting,
        Phase::Pressing,
        Phase::Machining,
        Phase::SolidWood,
        Phase::SheetGoods,
        Phase::Painting,
        Phase::PriorityConsolidation,
        Phase::Upholstery,
        Phase::ToAssembly,
        Phase::ToPainting,
    ];

    pub fn from_code(code: i32) -> Option<Phase> {
        Phase::ALL.into_iter().find(|phase| phase.code() == code)
    }

    pub fn code(self) -> i32 {
        match self {
            Phase::Cutting => 5,
            Phase::Pressing => 10,
            Phase::Machining => 15,
            Phase::SolidWood => 25,
            Phase::SheetGoods => 30,
            Phase::Painting => 35,
            Phase::PriorityConsolidation => 40,
            Phase::Upholstery => 136,
            Phase::ToAssembly => 998,
            Phase::ToPainting => 999,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Cutting => "cutting",
            Phase::Pressing => "pressing",
            Phase::Machining => "machining",
            Phase::SolidWood => "solid_wood",
            Phase::SheetGoods => "sheet_goods",
            Phase::Painting => "painting",
            Phase::PriorityConsolidation => "garland",
            Phase::Upholstery => "upholstery",
            Phase::ToAssembly => "to_assembly",
            Phase::ToPainting => "to_painting",
        }
    }

    /// Label the lot transition text uses for this phase. Several phases
    /// share a label, and the handoff labels are not user-facing names.
    pub fn window_label(self) -> WindowLabel {
        match self {
            Phase::Cutting => WindowLabel::range("CORTE"),
            Phase::Pressing => WindowLabel::range("PRENSA"),
            Phase::Machining => WindowLabel::range("USINAGEM"),
            Phase::SolidWood | Phase::SheetGoods => WindowLabel::range("MONTAGEM"),
            Phase::Painting => WindowLabel::range("ACABAMENTO"),
            Phase::PriorityConsolidation => WindowLabel::range("GARLANDACABAMENTO"),
            Phase::ToAssembly => WindowLabel::range("MONTAGEMSEP"),
            Phase::ToPainting => WindowLabel::range("PREACABAMENT"),
            Phase::Upholstery => WindowLabel {
                token: "TAPECARIA(136)",
                word_bounded: false,
                single_date: true,
            },
        }
    }

    pub fn sequencing(self) -> Sequencing {
        match self {
            Phase::Machining => Sequencing::LotQueue,
            Phase::Upholstery => Sequencing::NextCohort,
            Phase::Painting => Sequencing::Unfiltered,
            _ => Sequencing::ActiveOnly,
        }
    }

    /// Phases whose lots are sub-orders of a larger purchase order and are
    /// reported with a per-order-group summary.
    pub fn is_grouped(self) -> bool {
        !matches!(self, Phase::Cutting | Phase::Pressing | Phase::Machining)
    }

    pub fn handoff(self) -> Option<Handoff> {
        match self {
            Phase::ToAssembly => Some(Handoff::Assembly),
            Phase::ToPainting => Some(Handoff::Painting),
            _ => None,
        }
    }

    /// Phases whose balance is adjusted by returned parts.
    pub fn tracks_returns(self) -> bool {
        matches!(self, Phase::SolidWood | Phase::SheetGoods)
    }

    /// Phases with a returns view.
    pub fn has_returns_view(self) -> bool {
        matches!(self, Phase::SolidWood | Phase::SheetGoods | Phase::ToPainting)
    }

    /// Tables the balance query cannot run without (besides the lot table).
    /// Painting's spreadsheet ledger is optional and resolved separately.
    pub fn required_tables(self) -> &'static [&'static str] {
        match self {
            Phase::Cutting | Phase::Pressing => &["ordem", "produto", "processo", "pasfase"],
            Phase::Machining => &["ordem", "produto", "processo", "pasfase", "perdas"],
            Phase::SolidWood => &["ordem", "produto", "processo", "toqmovi"],
            Phase::SheetGoods => &["ordem", "produto", "processo", "pasfase", "toqmovi"],
            Phase::Painting => &["ordem", "produto", "processo"],
            Phase::PriorityConsolidation => &["ordem", "produto", "toqmovi"],
            Phase::Upholstery => &["ordem", "produto", "processo", "planilha"],
            Phase::ToAssembly => &["ordem", "produto", "reqordem", "toqmovi"],
            Phase::ToPainting => &["ordem", "produto", "reqordem", "toqmovi", "processo"],
        }
    }
}
