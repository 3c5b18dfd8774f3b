use std::sync::{Arc, Mutex, PoisonError};

/// Lifecycle of one output stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamState {
    Idle,
    RequestingFrames,
    Finishing,
    Finished,
    Failed,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Finished | StreamState::Failed)
    }

    pub fn can_transition_to(&self, next: StreamState) -> bool {
        use StreamState::*;
        matches!(
            (self, next),
            (Idle, RequestingFrames)
                | (Idle, Failed)
                | (RequestingFrames, Finishing)
                | (RequestingFrames, Failed)
                | (Finishing, Finished)
                | (Finishing, Failed)
        )
    }
}

/// State shared between an encoder, its worker and its handle.
///
/// Every change goes through [`StateCell::transition`], so a stream reaches
/// a terminal state at most once.
#[derive(Clone, Debug)]
pub struct StateCell(Arc<Mutex<StreamState>>);

impl StateCell {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(StreamState::Idle)))
    }

    pub fn get(&self) -> StreamState {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `next` and returns the previous state, or returns the
    /// current state unchanged if the move is illegal.
    pub fn transition(&self, next: StreamState) -> Result<StreamState, StreamState> {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *state;
        if !current.can_transition_to(next) {
            return Err(current);
        }
        *state = next;
        Ok(current)
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use StreamState::*;

    #[test]
    fn test_new_cell_is_idle() {
        assert_eq!(StateCell::new().get(), Idle);
    }

    #[test]
    fn test_happy_path() {
        let cell = StateCell::new();
        assert_eq!(cell.transition(RequestingFrames), Ok(Idle));
        assert_eq!(cell.transition(Finishing), Ok(RequestingFrames));
        assert_eq!(cell.transition(Finished), Ok(Finishing));
        assert_eq!(cell.get(), Finished);
    }

    #[rstest]
    #[case::skip_to_finishing(Idle, Finishing)]
    #[case::skip_to_finished(RequestingFrames, Finished)]
    #[case::restart(RequestingFrames, Idle)]
    #[case::finished_again(Finished, Finished)]
    #[case::fail_after_finish(Finished, Failed)]
    #[case::finish_after_fail(Failed, Finished)]
    #[case::fail_twice(Failed, Failed)]
    fn test_illegal_transitions(#[case] from: StreamState, #[case] to: StreamState) {
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let cell = StateCell::new();
        cell.transition(RequestingFrames).unwrap();
        cell.transition(Failed).unwrap();
        assert_eq!(cell.transition(Finishing), Err(Failed));
        assert_eq!(cell.transition(Failed), Err(Failed));
        assert_eq!(cell.get(), Failed);
        assert!(cell.get().is_terminal());
    }

    #[test]
    fn test_clones_share_state() {
        let cell = StateCell::new();
        let other = cell.clone();
        cell.transition(RequestingFrames).unwrap();
        assert_eq!(other.get(), RequestingFrames);
    }
}
