//! Authored walk path and distance-along-path sampling.
//!
//! A path is an ordered polyline of waypoints. Actors never store a 3-D
//! position of their own; they store a scalar distance along the path and
//! ask [`PathSampler`] for the matching world position and heading.
//!
//! Waypoints with non-finite coordinates are treated as missing: segments
//! touching them contribute no length and are skipped by lookups, but node
//! indices stay stable so authored interaction nodes keep pointing at the
//! right place.

use bevy::prelude::*;
use glam::Vec3;

use crate::error::PathError;

/// Samples positions and directions on a waypoint polyline.
///
/// # Examples
///
/// ```
/// use glam::Vec3;
/// use flicker::path::PathSampler;
///
/// let path = PathSampler::new(vec![
///     Vec3::ZERO,
///     Vec3::new(10.0, 0.0, 0.0),
///     Vec3::new(10.0, 0.0, 10.0),
/// ]);
/// assert!((path.total_length() - 20.0).abs() < 1e-6);
/// assert!((path.point_at_distance(15.0) - Vec3::new(10.0, 0.0, 5.0)).length() < 1e-6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSampler {
    waypoints: Vec<Vec3>,
    /// Distance at each node; same length as `waypoints`.
    cumulative: Vec<f32>,
    total_length: f32,
}

impl PathSampler {
    /// Builds a sampler and computes the distance table.
    #[must_use]
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        let mut sampler = Self {
            waypoints,
            cumulative: Vec::new(),
            total_length: 0.0,
        };
        sampler.recalculate();
        sampler
    }

    /// Replaces the waypoints and recomputes derived lengths.
    pub fn set_waypoints(&mut self, waypoints: Vec<Vec3>) {
        self.waypoints = waypoints;
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.cumulative.clear();
        self.total_length = 0.0;

        let mut running = 0.0;
        self.cumulative.push(running);
        for (start, end) in self.waypoints.iter().zip(self.waypoints.iter().skip(1)) {
            running += segment_length(*start, *end);
            self.cumulative.push(running);
        }
        self.cumulative.truncate(self.waypoints.len());
        self.total_length = running;
    }

    /// Authored waypoints, including any invalid ones.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    /// Number of authored nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.waypoints.len()
    }

    /// Sum of all valid segment lengths.
    #[must_use]
    pub const fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Whether at least one segment has positive length.
    #[must_use]
    pub fn is_traversable(&self) -> bool {
        self.segments().next().is_some()
    }

    /// Clamps a distance into `[0, total_length]`, mapping NaN to zero.
    #[must_use]
    pub fn clamp_distance(&self, distance: f32) -> f32 {
        if distance.is_nan() {
            return 0.0;
        }
        distance.clamp(0.0, self.total_length)
    }

    /// World position at `distance` along the path.
    ///
    /// Returns [`Vec3::ZERO`] for paths with fewer than two nodes.
    #[must_use]
    pub fn point_at_distance(&self, distance: f32) -> Vec3 {
        if self.waypoints.len() < 2 {
            return Vec3::ZERO;
        }

        let clamped = self.clamp_distance(distance);
        match self.segment_at(clamped) {
            Some(segment) => {
                let t = (clamped - segment.start_distance) / segment.length;
                segment.start.lerp(segment.end, t.clamp(0.0, 1.0))
            }
            None => self.last_valid_node().unwrap_or(Vec3::ZERO),
        }
    }

    /// Unit travel direction at `distance`, or [`Vec3::ZERO`] when no
    /// segment covers it. Callers must treat zero as "do not rotate".
    #[must_use]
    pub fn direction_at_distance(&self, distance: f32) -> Vec3 {
        if self.waypoints.len() < 2 {
            return Vec3::ZERO;
        }

        self.segment_at(self.clamp_distance(distance))
            .and_then(|segment| (segment.end - segment.start).try_normalize())
            .unwrap_or(Vec3::ZERO)
    }

    /// Distance along the path at which node `index` sits.
    ///
    /// Out-of-range indices yield `0.0` rather than an error; use
    /// [`Self::try_distance_at_node`] at validation boundaries.
    #[must_use]
    pub fn distance_at_node(&self, index: usize) -> f32 {
        self.try_distance_at_node(index).unwrap_or(0.0)
    }

    /// Checked variant of [`Self::distance_at_node`].
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NodeOutOfRange`] when `index` is not a node.
    pub fn try_distance_at_node(&self, index: usize) -> Result<f32, PathError> {
        self.cumulative
            .get(index)
            .copied()
            .ok_or(PathError::NodeOutOfRange {
                index,
                node_count: self.waypoints.len(),
            })
    }

    fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.waypoints
            .iter()
            .zip(self.waypoints.iter().skip(1))
            .zip(self.cumulative.iter())
            .filter_map(|((start, end), start_distance)| {
                let length = segment_length(*start, *end);
                (length > 0.0).then_some(Segment {
                    start: *start,
                    end: *end,
                    start_distance: *start_distance,
                    length,
                })
            })
    }

    /// First segment whose range reaches `distance`; the earlier segment
    /// wins at shared boundaries.
    fn segment_at(&self, distance: f32) -> Option<Segment> {
        self.segments()
            .find(|segment| segment.start_distance + segment.length >= distance)
    }

    fn last_valid_node(&self) -> Option<Vec3> {
        self.waypoints.iter().rev().copied().find(|p| p.is_finite())
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    start: Vec3,
    end: Vec3,
    start_distance: f32,
    length: f32,
}

fn segment_length(start: Vec3, end: Vec3) -> f32 {
    if start.is_finite() && end.is_finite() {
        start.distance(end)
    } else {
        0.0
    }
}

/// The scene's walk path, shared by the player and every companion.
#[derive(Resource, Debug, Clone, Default, PartialEq, Deref, DerefMut)]
pub struct WalkPath(pub PathSampler);

impl WalkPath {
    /// Wraps a waypoint list.
    #[must_use]
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self(PathSampler::new(waypoints))
    }

    /// Builds a path and rejects it up front when nothing can walk on it.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NotTraversable`] if no segment has length.
    pub fn validated(waypoints: Vec<Vec3>) -> Result<Self, PathError> {
        let path = Self::new(waypoints);
        if path.is_traversable() {
            Ok(path)
        } else {
            Err(PathError::NotTraversable {
                node_count: path.node_count(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn corner() -> PathSampler {
        PathSampler::new(vec![
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
        ])
    }

    fn assert_vec_eq(actual: Vec3, expected: Vec3) {
        assert!(
            (actual - expected).length() < 1e-5,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[rstest]
    fn node_distances_accumulate(corner: PathSampler) {
        assert_relative_eq!(corner.distance_at_node(0), 0.0);
        assert_relative_eq!(corner.distance_at_node(1), 10.0);
        assert_relative_eq!(corner.distance_at_node(2), 20.0);
        assert_relative_eq!(corner.total_length(), 20.0);
    }

    #[rstest]
    fn samples_inside_second_segment(corner: PathSampler) {
        assert_vec_eq(corner.point_at_distance(15.0), Vec3::new(10.0, 0.0, 5.0));
        assert_vec_eq(corner.direction_at_distance(15.0), Vec3::Z);
    }

    #[rstest]
    fn boundary_belongs_to_earlier_segment(corner: PathSampler) {
        assert_vec_eq(corner.point_at_distance(10.0), Vec3::new(10.0, 0.0, 0.0));
        assert_vec_eq(corner.direction_at_distance(10.0), Vec3::X);
    }

    #[rstest]
    #[case::below(-5.0, 0.0)]
    #[case::above(25.0, 20.0)]
    #[case::nan(f32::NAN, 0.0)]
    fn out_of_range_distances_clamp(
        corner: PathSampler,
        #[case] distance: f32,
        #[case] clamped: f32,
    ) {
        assert_vec_eq(
            corner.point_at_distance(distance),
            corner.point_at_distance(clamped),
        );
    }

    #[rstest]
    #[case::negative_far(-1000.0)]
    #[case::end(20.0)]
    #[case::mid(7.5)]
    fn outputs_are_finite(corner: PathSampler, #[case] distance: f32) {
        assert!(corner.point_at_distance(distance).is_finite());
        assert!(corner.direction_at_distance(distance).is_finite());
    }

    #[rstest]
    fn out_of_range_node_is_lenient(corner: PathSampler) {
        assert_relative_eq!(corner.distance_at_node(99), 0.0);
        assert_eq!(
            corner.try_distance_at_node(99),
            Err(PathError::NodeOutOfRange {
                index: 99,
                node_count: 3
            })
        );
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::single(vec![Vec3::new(3.0, 1.0, 2.0)])]
    fn degenerate_paths_yield_zero(#[case] waypoints: Vec<Vec3>) {
        let path = PathSampler::new(waypoints);
        assert_eq!(path.point_at_distance(1.0), Vec3::ZERO);
        assert_eq!(path.direction_at_distance(1.0), Vec3::ZERO);
        assert_relative_eq!(path.total_length(), 0.0);
        assert!(!path.is_traversable());
    }

    #[test]
    fn invalid_waypoint_is_skipped_without_shifting_indices() {
        let path = PathSampler::new(vec![
            Vec3::ZERO,
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 4.0),
            Vec3::new(0.0, 0.0, 8.0),
        ]);
        assert_relative_eq!(path.total_length(), 4.0);
        assert_relative_eq!(path.distance_at_node(3), 4.0);
        assert_vec_eq(path.point_at_distance(2.0), Vec3::new(0.0, 0.0, 6.0));
        assert!(path.point_at_distance(0.0).is_finite());
    }

    #[test]
    fn zero_length_segments_do_not_divide_by_zero() {
        let path = PathSampler::new(vec![Vec3::ZERO, Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0)]);
        assert_vec_eq(path.point_at_distance(0.0), Vec3::ZERO);
        assert_vec_eq(path.direction_at_distance(0.0), Vec3::Z);
    }

    #[test]
    fn set_waypoints_recomputes_lengths() {
        let mut path = PathSampler::new(vec![Vec3::ZERO, Vec3::X]);
        path.set_waypoints(vec![Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0)]);
        assert_relative_eq!(path.total_length(), 5.0);
        assert_relative_eq!(path.distance_at_node(1), 5.0);
    }

    #[test]
    fn validated_rejects_untraversable_paths() {
        assert_eq!(
            WalkPath::validated(vec![Vec3::ONE]),
            Err(PathError::NotTraversable { node_count: 1 })
        );
        assert!(WalkPath::validated(vec![Vec3::ZERO, Vec3::X]).is_ok());
    }
}
