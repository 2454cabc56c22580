/// Watches a MADS run, one event at a time.
///
/// The solver hands every evaluation, failed evaluation, and completed
/// iteration to its observer. Returning `Some(action)` asks the solver to
/// change course (for MADS, only to stop and report the best points so far);
/// `None` leaves the run alone.
///
/// Any `FnMut(&E) -> Option<A>` closure is an observer, and `()` is an
/// observer that never acts.
pub trait Observer<E, A> {
    /// Called once per event, in the order the solver produces them.
    fn observe(&mut self, event: &E) -> Option<A>;
}

/// Closures observe by being called.
impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

/// Runs without an observer.
impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
