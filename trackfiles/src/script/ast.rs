use crate::signals::{Aspect, BlockState};
use std::collections::HashMap;

use smallvec::SmallVec;

/// Signal properties a script can read, and for `STATE` and `DRAW_STATE`
/// also write.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExternalFloat {
    State,
    DrawState,
    Enabled,
    BlockState,
    ApproachControlReqPosition,
    ApproachControlReqSpeed,
}

static EXTERNAL_FLOAT_NAMES: &[(&str, ExternalFloat)] = &[
    ("STATE", ExternalFloat::State),
    ("DRAW_STATE", ExternalFloat::DrawState),
    ("ENABLED", ExternalFloat::Enabled),
    ("BLOCK_STATE", ExternalFloat::BlockState),
    ("APPROACH_CONTROL_REQ_POSITION", ExternalFloat::ApproachControlReqPosition),
    ("APPROACH_CONTROL_REQ_SPEED", ExternalFloat::ApproachControlReqSpeed),
];

impl ExternalFloat {
    pub fn from_name(name: &str) -> Option<ExternalFloat> {
        EXTERNAL_FLOAT_NAMES.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, f)| *f)
    }
}

macro_rules! external_functions {
    ($($variant:ident => $name:expr,)*) => {
        /// Functions provided to scripts by the signalling system.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum ExternalFunction {
            $($variant,)*
        }

        static EXTERNAL_FUNCTION_NAMES: &[(&str, ExternalFunction)] = &[
            $(($name, ExternalFunction::$variant),)*
        ];
    }
}

external_functions! {
    None => "NONE",
    BlockState => "BLOCK_STATE",
    RouteSet => "ROUTE_SET",
    NextSigLr => "NEXT_SIG_LR",
    NextSigMr => "NEXT_SIG_MR",
    ThisSigLr => "THIS_SIG_LR",
    ThisSigMr => "THIS_SIG_MR",
    OppSigLr => "OPP_SIG_LR",
    OppSigMr => "OPP_SIG_MR",
    NextNsigLr => "NEXT_NSIG_LR",
    DistMultiSigMr => "DIST_MULTI_SIG_MR",
    DistMultiSigMrOfLr => "DIST_MULTI_SIG_MR_OF_LR",
    NextSigId => "NEXT_SIG_ID",
    NextNsigId => "NEXT_NSIG_ID",
    OppSigId => "OPP_SIG_ID",
    OppSigIdTrainpath => "OPP_SIG_ID_TRAINPATH",
    IdSigEnabled => "ID_SIG_ENABLED",
    IdSigLr => "ID_SIG_LR",
    SigFeature => "SIG_FEATURE",
    DefDrawState => "DEF_DRAW_STATE",
    AllowClearToPartialRoute => "ALLOW_CLEAR_TO_PARTIAL_ROUTE",
    ApproachControlPosition => "APPROACH_CONTROL_POSITION",
    ApproachControlPositionForced => "APPROACH_CONTROL_POSITION_FORCED",
    ApproachControlSpeed => "APPROACH_CONTROL_SPEED",
    ApproachControlLockClaim => "APPROACH_CONTROL_LOCK_CLAIM",
    ApproachControlNextStop => "APPROACH_CONTROL_NEXT_STOP",
    ActivateTimingTrigger => "ACTIVATE_TIMING_TRIGGER",
    CheckTimingTrigger => "CHECK_TIMING_TRIGGER",
    TrainHasCallOn => "TRAINHASCALLON",
    TrainHasCallOnRestricted => "TRAINHASCALLON_RESTRICTED",
    TrainHasCallOnAdvanced => "TRAINHASCALLON_ADVANCED",
    TrainHasCallOnRestrictedAdvanced => "TRAINHASCALLON_RESTRICTED_ADVANCED",
    TrainRequiresNextSignal => "TRAIN_REQUIRES_NEXT_SIGNAL",
    FindReqNormalSignal => "FIND_REQ_NORMAL_SIGNAL",
    RouteClearedToSignal => "ROUTE_CLEARED_TO_SIGNAL",
    RouteClearedToSignalCallOn => "ROUTE_CLEARED_TO_SIGNAL_CALLON",
    HasHead => "HASHEAD",
    IncreaseSignalNumClearAhead => "INCREASE_SIGNALNUMCLEARAHEAD",
    DecreaseSignalNumClearAhead => "DECREASE_SIGNALNUMCLEARAHEAD",
    SetSignalNumClearAhead => "SET_SIGNALNUMCLEARAHEAD",
    ResetSignalNumClearAhead => "RESET_SIGNALNUMCLEARAHEAD",
    StoreLvar => "STORE_LVAR",
    ThisSigLvar => "THIS_SIG_LVAR",
    NextSigLvar => "NEXT_SIG_LVAR",
    IdSigLvar => "ID_SIG_LVAR",
    ThisSigNoUpdate => "THIS_SIG_NOUPDATE",
    ThisSigHasNormalSubtype => "THIS_SIG_HASNORMALSUBTYPE",
    NextSigHasNormalSubtype => "NEXT_SIG_HASNORMALSUBTYPE",
    IdSigHasNormalSubtype => "ID_SIG_HASNORMALSUBTYPE",
    SwitchStand => "SWITCHSTAND",
    DebugHeader => "DEBUG_HEADER",
    DebugOut => "DEBUG_OUT",
    Return => "RETURN",
}

impl ExternalFunction {
    pub fn from_name(name: &str) -> Option<ExternalFunction> {
        EXTERNAL_FUNCTION_NAMES.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
            .filter(|f| *f != ExternalFunction::None)
    }

    pub fn name(self) -> &'static str {
        EXTERNAL_FUNCTION_NAMES.iter().find(|(_, f)| *f == self).map(|(n, _)| *n).unwrap_or("NONE")
    }
}

/// A resolved symbol. Every variant reduces to one integer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parameter {
    ExternalFloat(ExternalFloat),
    LocalFloat(usize),
    SignalAspect(Aspect),
    /// Index into the configured signal function list.
    SignalFunction(usize),
    NormalSubtype(usize),
    /// Index into `SIGNAL_SUB_TYPES`.
    SignalFeature(usize),
    BlockState(BlockState),
    Constant(i32),
    Invalid,
}

impl Parameter {
    pub fn payload(&self) -> i32 {
        match *self {
            Parameter::ExternalFloat(f) => f as i32,
            Parameter::LocalFloat(slot) => slot as i32,
            Parameter::SignalAspect(a) => a.ordinal(),
            Parameter::SignalFunction(i) | Parameter::NormalSubtype(i) | Parameter::SignalFeature(i) => i as i32,
            Parameter::BlockState(b) => b as i32,
            Parameter::Constant(c) => c,
            Parameter::Invalid => 0,
        }
    }
}

/// Arithmetic combinator with the previous term of the same group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TermOperator {
    None,
    Minus,
    Multiply,
    Plus,
    Divide,
    Modulo,
}

impl TermOperator {
    pub fn from_operator(op: &str) -> Option<TermOperator> {
        match op {
            "-" => Some(TermOperator::Minus),
            "*" => Some(TermOperator::Multiply),
            "+" => Some(TermOperator::Plus),
            "/" | "/#" | "DIV" => Some(TermOperator::Divide),
            "%" | "MOD" => Some(TermOperator::Modulo),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TermCondition {
    GT,
    GE,
    LT,
    LE,
    EQ,
    NE,
}

impl TermCondition {
    /// A trailing `#` (integer comparison) is accepted and ignored.
    pub fn from_operator(op: &str) -> Option<TermCondition> {
        match op.trim_end_matches('#') {
            ">" => Some(TermCondition::GT),
            ">=" => Some(TermCondition::GE),
            "<" => Some(TermCondition::LT),
            "<=" => Some(TermCondition::LE),
            "==" => Some(TermCondition::EQ),
            "!=" => Some(TermCondition::NE),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TermKind {
    Function(ExternalFunction, SmallVec<[Parameter; 4]>),
    Parameter(Parameter),
    /// Opens the group numbered by the term's `group`.
    SubLevel,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatTerm {
    pub kind: TermKind,
    pub operator: TermOperator,
    pub negate: bool,
    /// Group this term belongs to, 0 for the top level.
    pub nesting: usize,
    /// Group this term opens, 0 if none.
    pub group: usize,
    pub line: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignTarget {
    ExternalFloat(ExternalFloat),
    LocalFloat(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScriptStatement {
    pub target: Option<AssignTarget>,
    pub terms: Vec<StatTerm>,
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub term1: StatTerm,
    pub negate1: bool,
    pub condition: Option<TermCondition>,
    pub term2: Option<StatTerm>,
    pub negate2: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConditionItem {
    Leaf(Comparison),
    And,
    Or,
    Negate,
    Group(Vec<ConditionItem>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElseIfBlock {
    pub conditions: Vec<ConditionItem>,
    pub block: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionBlock {
    pub conditions: Vec<ConditionItem>,
    pub if_block: Vec<Statement>,
    pub else_if_blocks: Vec<ElseIfBlock>,
    pub else_block: Option<Vec<Statement>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Assign(ScriptStatement),
    Condition(ConditionBlock),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignalScript {
    pub name: String,
    /// Local float name to slot; slots are dense from 0 in declaration order.
    pub local_floats: HashMap<String, usize>,
    pub statements: Vec<Statement>,
}
