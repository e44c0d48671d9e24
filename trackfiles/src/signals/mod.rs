//! Signal configuration model: function types, aspects, draw states, lights
//! and signal shapes, as read from the signal configuration file.

pub mod config;
pub mod shapes;
pub mod types;


pub use self::config::{ConfigMode, LightTableEntry, LightTexture, SignalConfig, SignalFunction};
pub use self::shapes::{SignalShape, SignalSubObj};
pub use self::types::{ApproachControlLimits, SignalAspect, SignalDrawLight, SignalDrawState, SignalLight, SignalType};

/// Aspects in order of increasing permissiveness. The ordinal is the value
/// seen by signal scripts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Aspect {
    Stop,
    StopAndProceed,
    Restricting,
    Approach1,
    Approach2,
    Approach3,
    Clear1,
    Clear2,
    Unknown,
}

static ASPECT_NAMES: &[(&str, Aspect)] = &[
    ("STOP", Aspect::Stop),
    ("STOP_AND_PROCEED", Aspect::StopAndProceed),
    ("RESTRICTING", Aspect::Restricting),
    ("APPROACH_1", Aspect::Approach1),
    ("APPROACH_2", Aspect::Approach2),
    ("APPROACH_3", Aspect::Approach3),
    ("CLEAR_1", Aspect::Clear1),
    ("CLEAR_2", Aspect::Clear2),
    ("UNKNOWN", Aspect::Unknown),
];

impl Aspect {
    pub fn from_name(name: &str) -> Option<Aspect> {
        ASPECT_NAMES.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, a)| *a)
    }

    pub fn name(self) -> &'static str {
        ASPECT_NAMES.iter().find(|(_, a)| *a == self).map(|(n, _)| *n).unwrap_or("UNKNOWN")
    }

    pub fn ordinal(self) -> i32 {
        self as i32
    }
}

/// The fixed set of signal function kinds. Custom functions are declared on
/// top of one of these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Normal,
    Distance,
    Repeater,
    Shunting,
    Info,
    Speed,
    Alert,
    Unknown,
}

static FUNCTION_KIND_NAMES: &[(&str, FunctionKind)] = &[
    ("NORMAL", FunctionKind::Normal),
    ("DISTANCE", FunctionKind::Distance),
    ("REPEATER", FunctionKind::Repeater),
    ("SHUNTING", FunctionKind::Shunting),
    ("INFO", FunctionKind::Info),
    ("SPEED", FunctionKind::Speed),
    ("ALERT", FunctionKind::Alert),
    ("UNKNOWN", FunctionKind::Unknown),
];

impl FunctionKind {
    pub fn all() -> impl Iterator<Item = FunctionKind> {
        FUNCTION_KIND_NAMES.iter().map(|(_, k)| *k)
    }

    pub fn from_name(name: &str) -> Option<FunctionKind> {
        FUNCTION_KIND_NAMES.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, k)| *k)
    }

    pub fn name(self) -> &'static str {
        FUNCTION_KIND_NAMES.iter().find(|(_, k)| *k == self).map(|(n, _)| *n).unwrap_or("UNKNOWN")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockState {
    Clear,
    Occupied,
    JnObstructed,
}

static BLOCK_STATE_NAMES: &[(&str, BlockState)] = &[
    ("CLEAR", BlockState::Clear),
    ("OCCUPIED", BlockState::Occupied),
    ("JN_OBSTRUCTED", BlockState::JnObstructed),
];

impl BlockState {
    pub fn from_name(name: &str) -> Option<BlockState> {
        BLOCK_STATE_NAMES.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, b)| *b)
    }

    pub fn name(self) -> &'static str {
        BLOCK_STATE_NAMES.iter().find(|(_, b)| *b == self).map(|(n, _)| *n).unwrap_or("CLEAR")
    }
}

/// Signal sub-object types, indexed by `SIGFEAT_` names in scripts.
pub static SIGNAL_SUB_TYPES: &[&str] = &[
    "DECOR",
    "SIGNAL_HEAD",
    "DUMMY1",
    "DUMMY2",
    "NUMBER_PLATE",
    "GRADIENT_PLATE",
    "USER1",
    "USER2",
    "USER3",
    "USER4",
];

pub fn sub_type_index(name: &str) -> Option<usize> {
    SIGNAL_SUB_TYPES.iter().position(|n| n.eq_ignore_ascii_case(name))
}
