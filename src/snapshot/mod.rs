//! Coherent point-in-time copies of the latest pose and map estimate.
//!
//! `process_frame` runs on one thread while accessors may be called from
//! another. The snapshot is the handoff between them: it is built in full
//! off to the side, then published with a single `Arc` swap under a write
//! lock held only for the swap itself. A reader sees either the previous
//! complete snapshot or the new complete one, never a mix — the same
//! discipline as guarding shared maps behind `parking_lot` locks, but with
//! the lock scope shrunk to the pointer exchange.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::engine::EngineResult;
use crate::geometry::{CameraPose, Matrix3, Matrix4, Quaternion, Vector2, Vector3};

/// Which parts of the snapshot to populate, trading compute cost against
/// data availability. All false by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestFlags {
    pub camera_poses: bool,
    pub camera_matrices: bool,
    pub points_2d: bool,
    pub points_3d: bool,
}

impl RequestFlags {
    pub fn any(&self) -> bool {
        self.camera_poses || self.camera_matrices || self.points_2d || self.points_3d
    }
}

/// The coherent result of the most recently processed frame.
///
/// Pose fields come in two forms: camera-space (`translation`, `rotation`,
/// `quaternion` — the world origin in the camera frame) and world-space
/// (`position`, `orientation`, `quaternion_in_world` — the camera centre in
/// the world frame). Fields whose request flag was off stay at their zero
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    pub translation: Vector3,
    pub rotation: Matrix3,
    pub quaternion: Quaternion,

    pub position: Vector3,
    pub orientation: Matrix3,
    pub quaternion_in_world: Quaternion,

    /// World-to-camera `[R|T]` in homogeneous form.
    pub view_matrix: Matrix4,
    /// Camera-to-world `[Rᵀ|C]` in homogeneous form.
    pub transform_matrix: Matrix4,

    /// Visible map points projected into the image.
    pub map_points_2d: Vec<Vector2>,
    /// Points tracked in this frame, image coordinates.
    pub tracked_points_2d: Vec<Vector2>,
    /// Every map point in world coordinates.
    pub map_points_3d: Vec<Vector3>,
    /// Visible subset of the map in world coordinates.
    pub visible_points_3d: Vec<Vector3>,
    /// Tracked subset in world coordinates.
    pub tracked_points_3d: Vec<Vector3>,

    pub num_keyframes: usize,
    pub num_good_keyframes: usize,
    /// Wall-clock processing time of the frame, seconds.
    pub tracking_time: f64,
    pub bundle_adjusting: bool,
}

impl FrameSnapshot {
    /// Build a snapshot from the engine's latest output, populating only
    /// the flagged subsets.
    pub fn capture(result: &EngineResult, flags: RequestFlags, duration: Duration) -> Self {
        let mut snap = Self {
            num_keyframes: result.num_keyframes,
            num_good_keyframes: result.num_good_keyframes,
            tracking_time: duration.as_secs_f64(),
            bundle_adjusting: result.bundle_adjusting,
            ..Self::default()
        };

        if flags.camera_poses || flags.camera_matrices {
            let pose = CameraPose::new(result.rotation, result.translation);
            if flags.camera_poses {
                snap.translation = pose.translation_raw();
                snap.rotation = pose.rotation_raw();
                snap.quaternion = pose.quaternion();
                snap.position = pose.position().into();
                snap.orientation = pose.orientation_in_world().into();
                snap.quaternion_in_world = pose.quaternion_in_world();
            }
            if flags.camera_matrices {
                snap.view_matrix = pose.view_matrix();
                snap.transform_matrix = pose.transform_matrix();
            }
        }

        if flags.points_2d {
            snap.map_points_2d = result.visible_projections.clone();
            snap.tracked_points_2d = result.tracked_points_2d.clone();
        }
        if flags.points_3d {
            snap.map_points_3d = result.map_points.clone();
            snap.visible_points_3d = result.visible_points.clone();
            snap.tracked_points_3d = result.tracked_points_3d.clone();
        }

        snap
    }
}

/// Single-writer, many-reader store for the published snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<FrameSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically publish a fully built snapshot.
    pub fn publish(&self, snapshot: FrameSnapshot) {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Some(snapshot);
    }

    /// The latest complete snapshot, if any frame has been processed.
    pub fn latest(&self) -> Option<Arc<FrameSnapshot>> {
        self.current.read().clone()
    }

    /// Drop the published snapshot (pre-first-frame condition).
    pub fn clear(&self) {
        *self.current.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineResult, EngineStatus};
    use approx::assert_relative_eq;
    use nalgebra as na;

    fn sample_result() -> EngineResult {
        let mut result = EngineResult::with_status(EngineStatus::Tracked);
        result.rotation = na::Rotation3::from_euler_angles(0.1, 0.2, 0.3).into_inner();
        result.translation = na::Vector3::new(0.5, -1.0, 2.0);
        result.map_points = vec![Vector3::new(1.0, 2.0, 3.0)];
        result.visible_points = vec![Vector3::new(1.0, 2.0, 3.0)];
        result.visible_projections = vec![Vector2::new(100.0, 120.0)];
        result.tracked_points_2d = vec![Vector2::new(101.0, 119.0)];
        result.tracked_points_3d = vec![Vector3::new(1.1, 2.1, 3.1)];
        result.num_keyframes = 7;
        result.num_good_keyframes = 5;
        result
    }

    fn all_flags() -> RequestFlags {
        RequestFlags {
            camera_poses: true,
            camera_matrices: true,
            points_2d: true,
            points_3d: true,
        }
    }

    #[test]
    fn test_capture_populates_flagged_subsets_only() {
        let result = sample_result();
        let flags = RequestFlags {
            camera_poses: true,
            ..Default::default()
        };
        let snap = FrameSnapshot::capture(&result, flags, Duration::from_millis(10));

        assert_relative_eq!(snap.translation.x, 0.5);
        // Matrices were not requested.
        assert_eq!(snap.view_matrix, Matrix4::zeros());
        assert!(snap.map_points_2d.is_empty());
        assert!(snap.map_points_3d.is_empty());
        // Counts and timing are always carried.
        assert_eq!(snap.num_keyframes, 7);
        assert_eq!(snap.num_good_keyframes, 5);
        assert_relative_eq!(snap.tracking_time, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_capture_pose_forms_are_mutual_inverses() {
        let result = sample_result();
        let snap = FrameSnapshot::capture(&result, all_flags(), Duration::ZERO);

        let r: na::Matrix3<f64> = snap.rotation.into();
        let rt: na::Matrix3<f64> = snap.orientation.into();
        assert_relative_eq!(r * rt, na::Matrix3::identity(), epsilon = 1e-12);

        let t: na::Vector3<f64> = snap.translation.into();
        let c: na::Vector3<f64> = snap.position.into();
        assert_relative_eq!(c, -(r.transpose() * t), epsilon = 1e-12);
    }

    #[test]
    fn test_capture_matrices_match_pose_fields() {
        let result = sample_result();
        let snap = FrameSnapshot::capture(&result, all_flags(), Duration::ZERO);

        for row in 0..3 {
            for col in 0..3 {
                assert_relative_eq!(snap.view_matrix.at(row, col), snap.rotation.at(row, col));
                assert_relative_eq!(
                    snap.transform_matrix.at(row, col),
                    snap.orientation.at(row, col)
                );
            }
        }
        assert_relative_eq!(snap.view_matrix.at(0, 3), snap.translation.x);
        assert_relative_eq!(snap.transform_matrix.at(2, 3), snap.position.z);
    }

    #[test]
    fn test_capture_point_sets_are_copied() {
        let result = sample_result();
        let snap = FrameSnapshot::capture(&result, all_flags(), Duration::ZERO);
        assert_eq!(snap.map_points_2d.len(), 1);
        assert_eq!(snap.tracked_points_2d.len(), 1);
        assert_eq!(snap.map_points_3d.len(), 1);
        assert_eq!(snap.visible_points_3d.len(), 1);
        assert_eq!(snap.tracked_points_3d.len(), 1);
    }

    #[test]
    fn test_store_publish_and_clear() {
        let store = SnapshotStore::new();
        assert!(store.latest().is_none());

        store.publish(FrameSnapshot::capture(
            &sample_result(),
            all_flags(),
            Duration::ZERO,
        ));
        let snap = store.latest().expect("snapshot published");
        assert_eq!(snap.num_keyframes, 7);

        store.clear();
        assert!(store.latest().is_none());
    }

    #[test]
    fn test_readers_keep_old_snapshot_alive_across_publish() {
        let store = SnapshotStore::new();
        let mut first = sample_result();
        first.num_keyframes = 1;
        store.publish(FrameSnapshot::capture(&first, all_flags(), Duration::ZERO));
        let held = store.latest().unwrap();

        let mut second = sample_result();
        second.num_keyframes = 2;
        store.publish(FrameSnapshot::capture(&second, all_flags(), Duration::ZERO));

        // The old Arc is still fully intact for the reader that grabbed it.
        assert_eq!(held.num_keyframes, 1);
        assert_eq!(store.latest().unwrap().num_keyframes, 2);
    }
}
