//! Math type aliases used throughout the engine
//!
//! All simulation and rendering math is `f32`; these aliases keep the rest of
//! the codebase free of explicit scalar parameters.

/// 3D point or vector.
pub type Point3 = nalgebra::Vector3<f32>;

/// 4D point or vector (e.g. RGBA colors).
pub type Point4 = nalgebra::Vector4<f32>;

/// 4x4 transform matrix.
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Rotation quaternion.
pub type Quat = nalgebra::UnitQuaternion<f32>;
