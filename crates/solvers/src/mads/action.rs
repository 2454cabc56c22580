/// Actions an observer can take during a MADS run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the solver early and return the best points found so far.
    StopEarly,
}
