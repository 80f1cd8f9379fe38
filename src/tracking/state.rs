//! The processing state machine.
//!
//! State moves in response to `start_tracking`, the engine's per-frame
//! status signal, and the external shutdown signal. `Found` is a
//! probationary state after relocalisation: a configurable number of
//! consecutive tracked frames consolidates it back to `Tracking`.

use tracing::{debug, warn};

use crate::engine::{EngineStatus, FrameAttempt};

/// The states the SLAM system can be in, from initialisation through to
/// tracking, including failure and recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Not doing anything, especially before initialisation.
    #[default]
    Idle,
    /// Attempting to initialise tracking.
    Initialising,
    /// Tracking is happening.
    Tracking,
    /// Tracking has been lost (recovery might be in progress).
    Lost,
    /// Tracking was recently recovered (intermediate careful state).
    Found,
    /// Tracking and mapping have finished and will not resume.
    Finished,
}

impl State {
    pub fn is_terminal(self) -> bool {
        self == State::Finished
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(describe_slam_state(*self))
    }
}

/// Readable name for a state.
pub fn describe_slam_state(state: State) -> &'static str {
    match state {
        State::Idle => "Idle",
        State::Initialising => "Initialising",
        State::Tracking => "Tracking",
        State::Lost => "Lost",
        State::Found => "Found",
        State::Finished => "Finished",
    }
}

/// Owns the current [`State`] and applies the transition rules.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: State,
    /// Consecutive tracked frames while in `Found`.
    good_streak: usize,
    /// Tracked frames required to consolidate `Found` back to `Tracking`.
    consolidation_frames: usize,
}

impl StateMachine {
    pub fn new(consolidation_frames: usize) -> Self {
        Self {
            state: State::Idle,
            good_streak: 0,
            consolidation_frames: consolidation_frames.max(1),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Arm initialisation: the next frame becomes an initialisation attempt
    /// regardless of the current state, except once finished.
    pub fn start_tracking(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        debug!(from = %self.state, "start tracking requested");
        self.state = State::Initialising;
        self.good_streak = 0;
    }

    /// External shutdown signal. Terminal: no transition leaves `Finished`.
    pub fn finish(&mut self) {
        debug!(from = %self.state, "finishing");
        self.state = State::Finished;
    }

    /// Back to `Idle`, as if newly constructed.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.good_streak = 0;
    }

    /// What the next frame should ask of the engine, given the current
    /// state. `None` means no engine attempt (idle or finished).
    pub fn attempt(&self) -> Option<FrameAttempt> {
        match self.state {
            State::Idle | State::Finished => None,
            State::Initialising => Some(FrameAttempt::Initialise),
            State::Tracking | State::Found => Some(FrameAttempt::Track),
            State::Lost => Some(FrameAttempt::Relocalise),
        }
    }

    /// Apply the engine's status signal for one processed frame and return
    /// the new state.
    pub fn apply(&mut self, status: EngineStatus) -> State {
        let next = match (self.state, status) {
            (State::Initialising, EngineStatus::Initialised) => State::Tracking,
            // Soft failure: stay initialising, the caller retries with the
            // next frame.
            (State::Initialising, EngineStatus::InitialisationFailed) => State::Initialising,

            (State::Tracking, EngineStatus::Tracked) => State::Tracking,
            (State::Tracking, EngineStatus::TrackingLost) => State::Lost,

            (State::Lost, EngineStatus::Relocalised) => {
                self.good_streak = 0;
                State::Found
            }
            (State::Lost, EngineStatus::RelocalisationFailed) => State::Lost,

            (State::Found, EngineStatus::Tracked) => {
                self.good_streak += 1;
                if self.good_streak >= self.consolidation_frames {
                    State::Tracking
                } else {
                    State::Found
                }
            }
            (State::Found, EngineStatus::TrackingLost) => {
                self.good_streak = 0;
                State::Lost
            }

            (state, status) => {
                // Status the current state has no transition for. The engine
                // contract should not produce these; hold position.
                warn!(?state, ?status, "unexpected engine status for state");
                state
            }
        };

        if next != self.state {
            debug!(from = %self.state, to = %next, "state transition");
        }
        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> StateMachine {
        StateMachine::new(3)
    }

    #[test]
    fn test_initial_state_is_idle() {
        assert_eq!(machine().state(), State::Idle);
        assert_eq!(machine().attempt(), None);
    }

    #[test]
    fn test_start_tracking_arms_initialisation() {
        let mut m = machine();
        m.start_tracking();
        assert_eq!(m.state(), State::Initialising);
        assert_eq!(m.attempt(), Some(FrameAttempt::Initialise));
    }

    #[test]
    fn test_start_tracking_reinitialises_from_any_live_state() {
        let mut m = machine();
        m.start_tracking();
        m.apply(EngineStatus::Initialised);
        assert_eq!(m.state(), State::Tracking);
        m.start_tracking();
        assert_eq!(m.state(), State::Initialising);
    }

    #[test]
    fn test_initialisation_failure_is_soft() {
        let mut m = machine();
        m.start_tracking();
        m.apply(EngineStatus::InitialisationFailed);
        assert_eq!(m.state(), State::Initialising);
        m.apply(EngineStatus::Initialised);
        assert_eq!(m.state(), State::Tracking);
    }

    #[test]
    fn test_tracking_to_lost_and_back_through_found() {
        let mut m = machine();
        m.start_tracking();
        m.apply(EngineStatus::Initialised);
        m.apply(EngineStatus::TrackingLost);
        assert_eq!(m.state(), State::Lost);
        assert_eq!(m.attempt(), Some(FrameAttempt::Relocalise));

        m.apply(EngineStatus::RelocalisationFailed);
        assert_eq!(m.state(), State::Lost);

        m.apply(EngineStatus::Relocalised);
        assert_eq!(m.state(), State::Found);
        assert_eq!(m.attempt(), Some(FrameAttempt::Track));
    }

    #[test]
    fn test_found_consolidates_after_configured_streak() {
        let mut m = machine();
        m.start_tracking();
        m.apply(EngineStatus::Initialised);
        m.apply(EngineStatus::TrackingLost);
        m.apply(EngineStatus::Relocalised);

        m.apply(EngineStatus::Tracked);
        assert_eq!(m.state(), State::Found);
        m.apply(EngineStatus::Tracked);
        assert_eq!(m.state(), State::Found);
        m.apply(EngineStatus::Tracked);
        assert_eq!(m.state(), State::Tracking);
    }

    #[test]
    fn test_found_drops_back_to_lost_and_streak_restarts() {
        let mut m = machine();
        m.start_tracking();
        m.apply(EngineStatus::Initialised);
        m.apply(EngineStatus::TrackingLost);
        m.apply(EngineStatus::Relocalised);
        m.apply(EngineStatus::Tracked);
        m.apply(EngineStatus::TrackingLost);
        assert_eq!(m.state(), State::Lost);

        // Recovery starts the probation over.
        m.apply(EngineStatus::Relocalised);
        m.apply(EngineStatus::Tracked);
        m.apply(EngineStatus::Tracked);
        assert_eq!(m.state(), State::Found);
        m.apply(EngineStatus::Tracked);
        assert_eq!(m.state(), State::Tracking);
    }

    #[test]
    fn test_finished_is_terminal() {
        let mut m = machine();
        m.start_tracking();
        m.finish();
        assert_eq!(m.state(), State::Finished);
        m.start_tracking();
        assert_eq!(m.state(), State::Finished);
        assert_eq!(m.attempt(), None);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut m = machine();
        m.start_tracking();
        m.apply(EngineStatus::Initialised);
        m.reset();
        assert_eq!(m.state(), State::Idle);
    }

    #[test]
    fn test_describe_slam_state() {
        assert_eq!(describe_slam_state(State::Idle), "Idle");
        assert_eq!(describe_slam_state(State::Lost), "Lost");
        assert_eq!(State::Found.to_string(), "Found");
    }
}
