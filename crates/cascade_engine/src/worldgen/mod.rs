//! Procedural terrain
//!
//! A seeded noise field sampled into heightfield chunk meshes. Chunks built
//! from the same seed and origin are identical, so terrain can be rebuilt on
//! demand instead of stored.

use noise::{NoiseFn, OpenSimplex};

use crate::ecs::components::Model;
use crate::foundation::math::Point3;

/// Seeded 2D height function.
pub struct NoiseField {
    noise: OpenSimplex,
    frequency: f64,
    amplitude: f32,
}

impl NoiseField {
    /// Create a field from a seed.
    ///
    /// `frequency` scales sample coordinates (smaller is smoother terrain);
    /// `amplitude` scales the output height.
    pub fn new(seed: u32, frequency: f64, amplitude: f32) -> Self {
        Self {
            noise: OpenSimplex::new(seed),
            frequency,
            amplitude,
        }
    }

    /// Terrain height at a world-space column.
    pub fn height(&self, x: f32, z: f32) -> f32 {
        let sample = self
            .noise
            .get([f64::from(x) * self.frequency, f64::from(z) * self.frequency]);
        sample as f32 * self.amplitude
    }
}

/// Build a chunk mesh of `cells` x `cells` quads starting at `origin`, with
/// `spacing` world units between grid columns.
///
/// Vertices are emitted as a flat triangle list so the model gets flat
/// shading from its face normals.
pub fn chunk_mesh(field: &NoiseField, origin: (f32, f32), cells: usize, spacing: f32) -> Model {
    let mut vertices = Vec::with_capacity(cells * cells * 6);
    let corner = |cx: usize, cz: usize| {
        let x = origin.0 + cx as f32 * spacing;
        let z = origin.1 + cz as f32 * spacing;
        Point3::new(x, field.height(x, z), z)
    };
    for cz in 0..cells {
        for cx in 0..cells {
            let a = corner(cx, cz);
            let b = corner(cx + 1, cz);
            let c = corner(cx + 1, cz + 1);
            let d = corner(cx, cz + 1);
            // Two counter-clockwise triangles per cell, seen from above.
            vertices.extend_from_slice(&[a, c, b, a, d, c]);
        }
    }
    Model::new(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_is_deterministic() {
        let first = NoiseField::new(7, 0.05, 10.0);
        let second = NoiseField::new(7, 0.05, 10.0);
        for i in 0..20 {
            let (x, z) = (i as f32 * 3.7, i as f32 * -1.3);
            assert_eq!(first.height(x, z), second.height(x, z));
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let first = NoiseField::new(1, 0.05, 10.0);
        let second = NoiseField::new(2, 0.05, 10.0);
        let differs = (0..20).any(|i| {
            let (x, z) = (i as f32 * 3.7, i as f32 * -1.3);
            first.height(x, z) != second.height(x, z)
        });
        assert!(differs);
    }

    #[test]
    fn test_chunk_mesh_shape() {
        let field = NoiseField::new(7, 0.05, 10.0);
        let model = chunk_mesh(&field, (0.0, 0.0), 4, 1.0);
        assert_eq!(model.vertices.len(), 4 * 4 * 6);
        assert_eq!(model.normals.len(), model.vertices.len());
    }

    #[test]
    fn test_adjacent_chunks_share_edge_heights() {
        let field = NoiseField::new(7, 0.05, 10.0);
        let left = chunk_mesh(&field, (0.0, 0.0), 2, 1.0);
        let right = chunk_mesh(&field, (2.0, 0.0), 2, 1.0);
        let left_edge: Vec<_> = left
            .vertices
            .iter()
            .filter(|v| v.x == 2.0)
            .map(|v| (v.y.to_bits(), v.z.to_bits()))
            .collect();
        for v in right.vertices.iter().filter(|v| v.x == 2.0) {
            assert!(left_edge.contains(&(v.y.to_bits(), v.z.to_bits())));
        }
    }

    #[test]
    fn test_flat_field_normals_point_up() {
        let field = NoiseField::new(7, 0.05, 0.0);
        let model = chunk_mesh(&field, (0.0, 0.0), 2, 1.0);
        for normal in &model.normals {
            assert!(normal.y > 0.99, "normal {normal} does not point up");
        }
    }
}
