use super::state::State;

/// Static table of allowed state-to-state transitions.
///
/// Every transient state has exactly one forward edge plus the
/// cancellation edge. Terminal states have none.
pub struct StateGraph;

impl StateGraph {
    /// The state every new job starts in.
    pub const INITIAL: State = State::Intake;

    /// Targets reachable from `state`, forward edge first.
    pub fn allowed_targets(state: State) -> &'static [State] {
        match state {
            State::Intake => &[State::Planning, State::Cancelled],
            State::Planning => &[State::Design, State::Cancelled],
            State::Design => &[State::Build, State::Cancelled],
            State::Build => &[State::Test, State::Cancelled],
            State::Test => &[State::Security, State::Cancelled],
            State::Security => &[State::Release, State::Cancelled],
            State::Release => &[State::Done, State::Cancelled],
            State::Done | State::Cancelled => &[],
        }
    }

    /// The linear successor of `state`, if it has one.
    pub fn successor(state: State) -> Option<State> {
        Self::allowed_targets(state)
            .iter()
            .copied()
            .find(|target| *target != State::Cancelled)
    }

    pub fn is_edge(from: State, to: State) -> bool {
        Self::allowed_targets(from).contains(&to)
    }

    /// The forward path from `INITIAL` to `DONE`.
    pub fn forward_path() -> Vec<State> {
        let mut path = vec![Self::INITIAL];
        let mut current = Self::INITIAL;
        while let Some(next) = Self::successor(current) {
            path.push(next);
            current = next;
        }
        path
    }
}
