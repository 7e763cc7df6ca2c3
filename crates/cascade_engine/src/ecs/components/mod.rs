//! Stock components
//!
//! These are the components the built-in systems react to. Games define
//! their own components alongside these; anything attached through the
//! engine participates in the same lifecycle hooks.

use std::sync::Arc;

use crate::assets::AudioClip;
use crate::audio::SoundCategory;
use crate::ecs::integrable::Integrable;
use crate::foundation::math::{Point3, Quat};

/// World-space position, advanced by the integrator.
#[derive(Debug, Clone)]
pub struct Position(pub Integrable);

impl Position {
    /// Create a stationary position.
    pub fn new(value: Point3) -> Self {
        Self(Integrable::new(value))
    }

    /// Create a position with a velocity.
    pub fn with_velocity(value: Point3, velocity: Point3) -> Self {
        Self(Integrable::with_derivatives(value, vec![velocity]))
    }
}

/// World-space rotation.
#[derive(Debug, Clone)]
pub struct Orientation(pub Quat);

impl Default for Orientation {
    fn default() -> Self {
        Self(Quat::identity())
    }
}

/// Triangle mesh to be uploaded and drawn by the renderer.
///
/// Vertices are a flat triangle list; normals are per-vertex and parallel to
/// `vertices`.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Triangle list, three vertices per face.
    pub vertices: Vec<Point3>,
    /// Per-vertex normals, same length as `vertices`.
    pub normals: Vec<Point3>,
}

impl Model {
    /// Create a model from a triangle list, computing flat face normals.
    pub fn new(vertices: Vec<Point3>) -> Self {
        let mut model = Self {
            vertices,
            normals: Vec::new(),
        };
        model.calculate_normals();
        model
    }

    /// Recompute per-vertex normals from the triangle faces.
    ///
    /// Each vertex of a face receives the face normal, giving flat shading.
    /// Degenerate faces get a zero normal.
    pub fn calculate_normals(&mut self) {
        self.normals.clear();
        self.normals.resize(self.vertices.len(), Point3::zeros());
        for (i, face) in self.vertices.chunks_exact(3).enumerate() {
            let normal = (face[1] - face[0]).cross(&(face[2] - face[0]));
            let normal = if normal.norm() > 0.0 {
                normal.normalize()
            } else {
                Point3::zeros()
            };
            for j in 0..3 {
                self.normals[i * 3 + j] = normal;
            }
        }
    }

    /// Number of vertices in the triangle list.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }
}

/// Camera following the object it is attached to.
///
/// `distance` is the eye offset from the object, integrated so zooming is
/// smooth across interpolated frames.
#[derive(Debug, Clone)]
pub struct PlayerCamera {
    /// Eye offset from the followed object.
    pub distance: Integrable,
    /// View orientation.
    pub orientation: Quat,
}

impl PlayerCamera {
    /// Create a camera at `distance` behind the object.
    pub fn new(distance: Point3) -> Self {
        Self {
            distance: Integrable::new(distance),
            orientation: Quat::identity(),
        }
    }
}

/// Sound source; attaching one starts playback on the mixer thread.
#[derive(Clone)]
pub struct AudioEmitter {
    /// Decoded samples to play.
    pub clip: Arc<AudioClip>,
    /// Volume category the source is mixed under.
    pub category: SoundCategory,
    /// Per-source gain percentage, 0 to 100.
    pub gain: u8,
    /// Frame to rewind to at end of clip; `None` plays once.
    pub loop_start: Option<usize>,
}

impl AudioEmitter {
    /// Play `clip` once under `category` at full gain.
    pub fn once(clip: Arc<AudioClip>, category: SoundCategory) -> Self {
        Self {
            clip,
            category,
            gain: 100,
            loop_start: None,
        }
    }

    /// Loop `clip` forever, rewinding to `loop_start` frames.
    pub fn looping(clip: Arc<AudioClip>, category: SoundCategory, loop_start: usize) -> Self {
        Self {
            clip,
            category,
            gain: 100,
            loop_start: Some(loop_start),
        }
    }

    /// Set the per-source gain percentage.
    pub fn with_gain(mut self, gain: u8) -> Self {
        self.gain = gain.min(100);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_calculate_normals_flat_face() {
        let model = Model::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        assert_eq!(model.normals.len(), 3);
        for n in &model.normals {
            assert_relative_eq!(n.z, 1.0);
        }
    }

    #[test]
    fn test_calculate_normals_degenerate_face() {
        let model = Model::new(vec![Point3::zeros(), Point3::zeros(), Point3::zeros()]);
        assert_relative_eq!(model.normals[0].norm(), 0.0);
    }
}
