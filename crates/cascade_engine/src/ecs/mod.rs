//! Entity-component system
//!
//! Objects are opaque integer ids; components are plain structs attached to
//! objects through the [`Registry`]. Systems observe attach/detach events via
//! lifecycle hooks dispatched by the engine.

pub mod component;
pub mod components;
pub mod integrable;
pub mod registry;
pub mod system;
pub mod systems;

pub use component::Component;
pub use integrable::Integrable;
pub use registry::{BoxedComponent, ObjectId, Registry};
pub use system::System;
