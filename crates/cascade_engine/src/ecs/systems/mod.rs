//! Built-in systems

pub mod integrator;

pub use integrator::Integrator;
