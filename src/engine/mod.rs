//! The boundary to the opaque estimation engine.
//!
//! The control layer hands the engine one undistorted, validated frame plus
//! context (what kind of attempt this is, the configured modes, a pending
//! expansion request) and gets back a raw pose, the current point sets, and
//! a status signal that drives the tracking state machine. Retry and
//! recovery policy live entirely inside the engine; this boundary never
//! retries.

pub mod scripted;

use nalgebra as na;

use crate::frame::Frame;
use crate::geometry::{Vector2, Vector3};

pub use scripted::ScriptedEngine;

/// Camera input configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoMode {
    #[default]
    Monocular,
    Stereo,
}

/// Feature representation used for tracking and map expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureMode {
    #[default]
    Patch,
    Descriptor,
}

/// What the control layer is asking the engine to do with this frame,
/// derived from the current tracking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAttempt {
    /// Bootstrap an initial pose and map.
    Initialise,
    /// Localize against the existing map.
    Track,
    /// Recover a lost camera against the existing map.
    Relocalise,
}

/// Per-frame context passed to the engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineContext {
    pub attempt: FrameAttempt,
    pub video_mode: VideoMode,
    pub feature_mode: FeatureMode,
    /// One-shot manual map-expansion request.
    pub expand_requested: bool,
}

/// The engine's success/failure signal for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Initialisation produced a usable pose and map.
    Initialised,
    /// Initialisation was inconclusive; feed more frames.
    InitialisationFailed,
    /// The frame was localized against the map.
    Tracked,
    /// The engine could not localize this frame.
    TrackingLost,
    /// A relocalisation attempt succeeded.
    Relocalised,
    /// A relocalisation attempt failed.
    RelocalisationFailed,
}

/// Everything the engine reports back for one processed frame.
#[derive(Debug, Clone)]
pub struct EngineResult {
    pub status: EngineStatus,
    /// Camera-space rotation: the `R` of `P = K[R|T]`.
    pub rotation: na::Matrix3<f64>,
    /// Camera-space translation: the `T` of `P = K[R|T]`.
    pub translation: na::Vector3<f64>,
    /// Every map point, in world coordinates.
    pub map_points: Vec<Vector3>,
    /// The subset of map points visible from the current pose.
    pub visible_points: Vec<Vector3>,
    /// Image-plane projections of the visible points.
    pub visible_projections: Vec<Vector2>,
    /// Points tracked in this frame, in image coordinates.
    pub tracked_points_2d: Vec<Vector2>,
    /// Points tracked in this frame, in world coordinates.
    pub tracked_points_3d: Vec<Vector3>,
    pub num_keyframes: usize,
    pub num_good_keyframes: usize,
    /// Whether bundle adjustment is running inside the engine.
    pub bundle_adjusting: bool,
}

impl EngineResult {
    /// A result with the given status, identity pose and empty map data.
    pub fn with_status(status: EngineStatus) -> Self {
        Self {
            status,
            rotation: na::Matrix3::identity(),
            translation: na::Vector3::zeros(),
            map_points: Vec::new(),
            visible_points: Vec::new(),
            visible_projections: Vec::new(),
            tracked_points_2d: Vec::new(),
            tracked_points_3d: Vec::new(),
            num_keyframes: 0,
            num_good_keyframes: 0,
            bundle_adjusting: false,
        }
    }
}

/// The opaque tracking/mapping engine behind the control layer.
///
/// The trait seam exists so the engine can be swapped or mocked without
/// touching this layer. Implementations run synchronously: `process_frame`
/// blocks until the engine's own internal time budget is spent, and cannot
/// be cancelled from here.
pub trait EstimationEngine: Send {
    /// Process one undistorted frame and report the outcome.
    fn process_frame(&mut self, frame: &Frame, ctx: &EngineContext) -> EngineResult;

    /// Drop all engine state (map, keyframes), as if newly constructed.
    fn reset(&mut self) {}
}
