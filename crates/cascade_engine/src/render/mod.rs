//! Rendering
//!
//! The renderer is a chain of shader stages. Stage zero draws the scene's
//! models; each later stage samples the previous stage's framebuffer
//! textures and draws a fullscreen quad, with the final stage writing to the
//! default framebuffer. Stage wiring is declared in shader assets and
//! validated before any GL object is created.

pub mod device;
pub mod pipeline;
pub mod pool;
pub mod renderer;

use thiserror::Error;

pub use device::Device;
pub use pool::{BufferPool, ModelBuffers};
pub use renderer::RenderSystem;

use crate::foundation::math::{Mat4, Point3};

/// A uniform value broadcast to the pipeline stages that declare its name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Scalar float.
    Float(f32),
    /// Signed integer (also used for sampler units).
    Int(i32),
    /// 3-component vector.
    Vec3(Point3),
    /// 4x4 matrix.
    Mat4(Mat4),
}

/// Render subsystem error.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The configured pipeline has no stages.
    #[error("render pipeline has no stages")]
    EmptyPipeline,

    /// A stage consumes an image the previous stage does not produce.
    #[error("stage '{stage}' input '{input}' has no matching output in the previous stage")]
    UnmatchedInput {
        /// Stage whose input is unmatched.
        stage: String,
        /// Name of the unmatched input slot.
        input: String,
    },

    /// Matching slots disagree on the kind of image they carry.
    #[error("stage '{stage}' input '{input}' does not match the kind produced upstream")]
    SlotKindMismatch {
        /// Stage whose input mismatches.
        stage: String,
        /// Name of the mismatched input slot.
        input: String,
    },

    /// A stage declares two outputs with the same name.
    #[error("stage '{stage}' declares output '{output}' more than once")]
    DuplicateOutput {
        /// Stage with the duplicate.
        stage: String,
        /// The duplicated output name.
        output: String,
    },

    /// A shader failed to compile.
    #[error("shader compile failed in stage '{stage}': {log}")]
    ShaderCompile {
        /// Stage whose shader failed.
        stage: String,
        /// Driver info log.
        log: String,
    },

    /// A program failed to link.
    #[error("program link failed in stage '{stage}': {log}")]
    ProgramLink {
        /// Stage whose program failed.
        stage: String,
        /// Driver info log.
        log: String,
    },

    /// A framebuffer did not reach completeness.
    #[error("framebuffer incomplete: status 0x{status:x}")]
    FramebufferIncomplete {
        /// Raw status returned by the driver.
        status: u32,
    },

    /// Miscellaneous GL object creation failure.
    #[error("gl error: {0}")]
    Gl(String),
}
