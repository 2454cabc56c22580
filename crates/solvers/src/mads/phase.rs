use std::fmt;

/// Phases of the MADS state machine.
///
/// A run moves `Init → Search → Poll → Update` and then loops back to
/// `Search` or ends in `Terminated`, which no transition leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Validation and evaluation of the initial point.
    Init,

    /// Optional global step proposing promising mesh points.
    Search,

    /// Local step evaluating a positive spanning set around the frame center.
    Poll,

    /// Mesh update and stopping checks.
    Update,

    /// Absorbing final state.
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Search => "search",
            Self::Poll => "poll",
            Self::Update => "update",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
