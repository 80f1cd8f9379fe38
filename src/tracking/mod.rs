//! Tracking state machine.

pub mod state;

pub use state::{describe_slam_state, State, StateMachine};
