//! SLAM system facade: the main entry point users interact with.

pub mod slam;

pub use slam::{SlamConfig, SlamSystem};
