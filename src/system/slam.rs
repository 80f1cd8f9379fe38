//! The SLAM system facade.
//!
//! `SlamSystem` is the struct users interact with. It exclusively owns the
//! camera model, the state machine and the snapshot store, and holds the
//! estimation engine behind the [`EstimationEngine`] trait so the opaque
//! engine can be swapped or mocked without touching this layer.
//!
//! `process_frame` runs synchronously in the calling thread; query accessors
//! may run concurrently on another thread through the shared snapshot store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::camera::{CameraModel, RectifiedCamera};
use crate::engine::{EngineContext, EngineResult, EngineStatus, EstimationEngine, FeatureMode, VideoMode};
use crate::error::{CameraParameterError, ProcessFrameError};
use crate::frame::Frame;
use crate::geometry::{Matrix3, Matrix4, Quaternion, Vector2, Vector3};
use crate::snapshot::{FrameSnapshot, RequestFlags, SnapshotStore};
use crate::tracking::{State, StateMachine};

/// Tunable policy parameters of the control layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlamConfig {
    /// Consecutive tracked frames required to consolidate a relocalised
    /// (`Found`) camera back to normal `Tracking`.
    pub found_consolidation_frames: usize,
}

impl Default for SlamConfig {
    fn default() -> Self {
        Self {
            found_consolidation_frames: 5,
        }
    }
}

/// A whole SLAM system: camera model, state machine, engine boundary and
/// snapshot store.
pub struct SlamSystem {
    config: SlamConfig,
    camera: CameraModel,
    machine: StateMachine,
    engine: Box<dyn EstimationEngine>,
    store: Arc<SnapshotStore>,

    flags: RequestFlags,
    video_mode: VideoMode,
    feature_mode: FeatureMode,
    /// Pending one-shot manual expansion request.
    expand_requested: bool,

    /// Latest engine output with a usable pose, feeding `save_snapshot`.
    last_result: Option<EngineResult>,
    /// Wall-clock duration of the last processed frame.
    last_duration: Duration,
}

impl SlamSystem {
    /// Create a system around the given estimation engine, with default
    /// configuration and everything else unset.
    pub fn new(engine: Box<dyn EstimationEngine>) -> Self {
        Self::with_config(engine, SlamConfig::default())
    }

    pub fn with_config(engine: Box<dyn EstimationEngine>, config: SlamConfig) -> Self {
        let machine = StateMachine::new(config.found_consolidation_frames);
        Self {
            config,
            camera: CameraModel::new(),
            machine,
            engine,
            store: Arc::new(SnapshotStore::new()),
            flags: RequestFlags::default(),
            video_mode: VideoMode::default(),
            feature_mode: FeatureMode::default(),
            expand_requested: false,
            last_result: None,
            last_duration: Duration::ZERO,
        }
    }

    /// Crate version string.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    // --- Camera configuration -------------------------------------------

    /// Set the camera intrinsic calibration. Required before processing.
    pub fn set_camera_calibration(
        &mut self,
        width: f64,
        height: f64,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
    ) -> Result<(), CameraParameterError> {
        self.camera.set_calibration(width, height, fx, fy, cx, cy)
    }

    /// Set radial/tangential distortion, activating per-frame undistortion.
    /// Must be called after `set_camera_calibration`.
    pub fn set_camera_distortion(&mut self, coeffs: &[f64]) -> Result<(), CameraParameterError> {
        self.camera.set_distortion(coeffs)
    }

    /// Set distortion separately per stereo side.
    pub fn set_stereo_camera_distortion(
        &mut self,
        left: &[f64],
        right: &[f64],
    ) -> Result<(), CameraParameterError> {
        self.camera.set_stereo_distortion(left, right)
    }

    /// Set stereo rectification. The calibration already set is treated as
    /// the post-rectification intrinsics.
    pub fn set_camera_rectification(
        &mut self,
        left: RectifiedCamera,
        right: RectifiedCamera,
    ) -> Result<(), CameraParameterError> {
        self.camera.set_rectification(left, right)
    }

    /// Clear distortion/rectification; future frames pass through.
    pub fn reset_camera_distortion(&mut self) {
        self.camera.reset_distortion();
    }

    /// Whether the last processed frame was automatically undistorted.
    pub fn frame_was_undistorted(&self) -> bool {
        self.camera.frame_was_undistorted()
    }

    /// Focal length `{fx, fy}`.
    pub fn focal_length(&self) -> Vector2 {
        self.camera.focal_length()
    }

    /// Principal point `{cx, cy}`.
    pub fn principal_point(&self) -> Vector2 {
        self.camera.principal_point()
    }

    /// The 3x3 intrinsics matrix; zero before calibration.
    pub fn calibration_matrix(&self) -> Matrix3 {
        self.camera.calibration_matrix()
    }

    // --- Modes and requests ---------------------------------------------

    /// Expect single-image input. Rejected once tracking has started.
    pub fn set_monocular_mode(&mut self) -> bool {
        self.set_video_mode(VideoMode::Monocular)
    }

    /// Expect stereo input. Rejected once tracking has started.
    pub fn set_stereo_mode(&mut self) -> bool {
        self.set_video_mode(VideoMode::Stereo)
    }

    fn set_video_mode(&mut self, mode: VideoMode) -> bool {
        if self.machine.state() != State::Idle {
            return false;
        }
        self.video_mode = mode;
        true
    }

    /// Track and expand using patches. Rejected once tracking has started.
    pub fn set_patch_mode(&mut self) -> bool {
        self.set_feature_mode(FeatureMode::Patch)
    }

    /// Track and expand using descriptors. Rejected once tracking has started.
    pub fn set_descriptor_mode(&mut self) -> bool {
        self.set_feature_mode(FeatureMode::Descriptor)
    }

    fn set_feature_mode(&mut self, mode: FeatureMode) -> bool {
        if self.machine.state() != State::Idle {
            return false;
        }
        self.feature_mode = mode;
        true
    }

    /// Request manual map expansion at the next opportunity; `false`
    /// cancels a pending request. Not needed in usual operation.
    pub fn set_should_expand(&mut self, should_expand: bool) {
        self.expand_requested = should_expand;
    }

    /// Request camera pose storage (rotations, quaternions, translations in
    /// camera and world space) during snapshots.
    pub fn set_request_camera_poses(&mut self, request: bool) {
        self.flags.camera_poses = request;
    }

    /// Request 4x4 view/transform matrix storage during snapshots.
    pub fn set_request_camera_matrices(&mut self, request: bool) {
        self.flags.camera_matrices = request;
    }

    /// Request 2D point-set storage during snapshots.
    pub fn set_request_points_2d(&mut self, request: bool) {
        self.flags.points_2d = request;
    }

    /// Request 3D point-set storage during snapshots.
    pub fn set_request_points_3d(&mut self, request: bool) {
        self.flags.points_3d = request;
    }

    // --- Lifecycle ------------------------------------------------------

    /// Arm initialisation: SLAM will initialise on the next frame.
    pub fn start_tracking(&mut self) {
        self.machine.start_tracking();
    }

    /// Signal that tracking and mapping have finished and will not resume.
    pub fn finish(&mut self) {
        self.machine.finish();
    }

    /// Return the system to its initial state: calibration, snapshots,
    /// request flags and engine state are all cleared.
    pub fn reset(&mut self) {
        debug!("resetting SLAM system");
        self.camera.reset();
        self.machine.reset();
        self.engine.reset();
        self.store.clear();
        self.flags = RequestFlags::default();
        self.video_mode = VideoMode::default();
        self.feature_mode = FeatureMode::default();
        self.expand_requested = false;
        self.last_result = None;
        self.last_duration = Duration::ZERO;
    }

    /// Current processing state. Tracking quality (Lost/Found) is state,
    /// not an error; check this alongside the `process_frame` return.
    pub fn state(&self) -> State {
        self.machine.state()
    }

    // --- Frame processing -----------------------------------------------

    /// Process one frame of input data.
    ///
    /// The frame is undistorted/rectified in place, handed to the engine
    /// according to the current state, the state machine is advanced from
    /// the engine's signal and a new snapshot is published. A successful
    /// return reports that *processing* succeeded; tracking may still be
    /// lost — check `state()`.
    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<(), ProcessFrameError> {
        // Terminal state: nothing to do, and not an error.
        if self.machine.state().is_terminal() {
            return Ok(());
        }

        let started = Instant::now();

        // Fixed precedence: calibration before input validation.
        if !self.camera.is_calibrated() {
            return Err(ProcessFrameError::Calibration);
        }
        self.validate_frame(frame)?;

        self.camera.undistort_frame(frame);

        // Idle: validated and undistorted, but no estimation attempt.
        let Some(attempt) = self.machine.attempt() else {
            self.last_duration = started.elapsed();
            return Ok(());
        };

        let ctx = EngineContext {
            attempt,
            video_mode: self.video_mode,
            feature_mode: self.feature_mode,
            expand_requested: self.expand_requested,
        };
        // The expansion request is one-shot: consumed by this attempt.
        self.expand_requested = false;

        let result = self.engine.process_frame(frame, &ctx);
        let status = result.status;
        self.machine.apply(status);
        self.last_duration = started.elapsed();

        match status {
            EngineStatus::InitialisationFailed => {
                // Soft failure: no snapshot, no pose; caller retries with
                // the next frame.
                Err(ProcessFrameError::Initialisation)
            }
            _ => {
                self.last_result = Some(result);
                self.save_snapshot();
                Ok(())
            }
        }
    }

    fn validate_frame(&self, frame: &Frame) -> Result<(), ProcessFrameError> {
        let calib = self
            .camera
            .calibration()
            .ok_or(ProcessFrameError::Calibration)?;
        let (w, h) = (calib.width as usize, calib.height as usize);

        if !frame.left.is_valid() || frame.left.width != w || frame.left.height != h {
            return Err(ProcessFrameError::InputImage);
        }
        if self.video_mode == VideoMode::Stereo {
            if !frame.right.is_valid() {
                return Err(ProcessFrameError::InputImage);
            }
            if frame.right.width != frame.left.width || frame.right.height != frame.left.height {
                return Err(ProcessFrameError::InputImage);
            }
        }
        Ok(())
    }

    /// Save the current status of all requested variables (camera poses,
    /// 2D/3D points etc). Called automatically by `process_frame`; returns
    /// whether any state was saved.
    pub fn save_snapshot(&mut self) -> bool {
        let Some(result) = &self.last_result else {
            return false;
        };
        if !self.flags.any() {
            return false;
        }
        let snapshot = FrameSnapshot::capture(result, self.flags, self.last_duration);
        self.store.publish(snapshot);
        true
    }

    /// Shared handle to the snapshot store, for issuing queries from
    /// another thread while `process_frame` runs.
    pub fn snapshot_store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    // --- Pose and map queries -------------------------------------------

    fn snapshot(&self) -> Option<Arc<FrameSnapshot>> {
        self.store.latest()
    }

    /// The camera translation: the `T` in `P = K[R|T]` (world origin in the
    /// camera frame, *not* the camera centre in the world).
    pub fn camera_translation(&self) -> Vector3 {
        self.snapshot().map(|s| s.translation).unwrap_or_default()
    }

    /// The camera rotation: the `R` in `P = K[R|T]`.
    pub fn camera_rotation(&self) -> Matrix3 {
        self.snapshot().map(|s| s.rotation).unwrap_or_default()
    }

    /// The camera rotation as a quaternion (camera-space form).
    pub fn camera_quaternion(&self) -> Quaternion {
        self.snapshot().map(|s| s.quaternion).unwrap_or_default()
    }

    /// The camera centre in the world coordinate frame.
    pub fn camera_position(&self) -> Vector3 {
        self.snapshot().map(|s| s.position).unwrap_or_default()
    }

    /// The camera orientation about its own centre in the world frame.
    pub fn camera_orientation_in_world(&self) -> Matrix3 {
        self.snapshot().map(|s| s.orientation).unwrap_or_default()
    }

    /// The world-frame orientation as a quaternion.
    pub fn camera_quaternion_in_world(&self) -> Quaternion {
        self.snapshot()
            .map(|s| s.quaternion_in_world)
            .unwrap_or_default()
    }

    /// World-to-camera view matrix `[R|T]` (homogeneous).
    pub fn camera_view_matrix(&self) -> Matrix4 {
        self.snapshot().map(|s| s.view_matrix).unwrap_or_default()
    }

    /// Camera-to-world transform matrix `[Rᵀ|C]` (homogeneous).
    pub fn camera_transform_matrix(&self) -> Matrix4 {
        self.snapshot()
            .map(|s| s.transform_matrix)
            .unwrap_or_default()
    }

    /// Map points projected into 2D by the current pose (in-view only).
    pub fn map_points_2d(&self) -> Vec<Vector2> {
        self.snapshot()
            .map(|s| s.map_points_2d.clone())
            .unwrap_or_default()
    }

    /// Points tracked in the last frame, image coordinates.
    pub fn tracked_points_2d(&self) -> Vec<Vector2> {
        self.snapshot()
            .map(|s| s.tracked_points_2d.clone())
            .unwrap_or_default()
    }

    /// The full map in world coordinates.
    pub fn map_points_3d(&self) -> Vec<Vector3> {
        self.snapshot()
            .map(|s| s.map_points_3d.clone())
            .unwrap_or_default()
    }

    /// The currently visible subset of the map (corresponds to
    /// `map_points_2d`).
    pub fn visible_points_3d(&self) -> Vec<Vector3> {
        self.snapshot()
            .map(|s| s.visible_points_3d.clone())
            .unwrap_or_default()
    }

    /// The subset of world points tracked in the last frame.
    pub fn tracked_points_3d(&self) -> Vec<Vector3> {
        self.snapshot()
            .map(|s| s.tracked_points_3d.clone())
            .unwrap_or_default()
    }

    /// Total keyframes accessible to the tracker.
    pub fn num_keyframes(&self) -> usize {
        self.snapshot().map(|s| s.num_keyframes).unwrap_or(0)
    }

    /// Keyframes accessible to the tracker which are not culled.
    pub fn num_good_keyframes(&self) -> usize {
        self.snapshot().map(|s| s.num_good_keyframes).unwrap_or(0)
    }

    /// Processing time of the last frame, seconds.
    pub fn tracking_time(&self) -> f64 {
        self.snapshot().map(|s| s.tracking_time).unwrap_or(0.0)
    }

    /// Effective frame rate as of the last processed frame, Hz.
    pub fn tracking_rate(&self) -> f64 {
        let time = self.tracking_time();
        if time > 0.0 {
            1.0 / time
        } else {
            0.0
        }
    }

    /// Whether bundle adjustment is happening right now.
    pub fn is_bundle_adjusting(&self) -> bool {
        self.snapshot().map(|s| s.bundle_adjusting).unwrap_or(false)
    }

    /// Configuration in effect.
    pub fn config(&self) -> &SlamConfig {
        &self.config
    }
}
