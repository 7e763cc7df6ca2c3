//! Cascade engine
//!
//! A small real-time 3D game engine: objects and components live in a
//! registry, behavior lives in systems owned by a stack of states, and
//! rendering runs through a chain of framebuffer-linked shader stages.
//! Simulation advances on a fixed timestep with interpolated rendering, and
//! audio mixes on the output device's own thread.
//!
//! A game registers states, binds input, and drives the loop:
//!
//! ```no_run
//! use cascade_engine::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.register_state("root", |engine, state| {
//!     state.set_ticking(true);
//!     state.add_system(Box::new(Integrator::new(
//!         engine.config().simulation.timestep(),
//!     )));
//!     state.add_transition("quit", vec![StackAction::Quit]);
//!     Ok(())
//! });
//! engine.input().bind(Key::Escape, InputAction::Transition("quit".to_string()));
//! engine.start("root")?;
//! while engine.is_running() {
//!     engine.frame()?;
//! }
//! engine.shutdown()?;
//! # Ok::<(), cascade_engine::EngineError>(())
//! ```

pub mod assets;
pub mod audio;
pub mod config;
pub mod ecs;
pub mod engine;
pub mod foundation;
pub mod input;
pub mod render;
pub mod state;
pub mod worldgen;

pub use engine::{Engine, EngineError, WindowEvent};

/// Common imports for games built on the engine.
pub mod prelude {
    pub use crate::assets::{Asset, AssetCache, AudioClip, ShaderStage};
    pub use crate::audio::{AudioSystem, SoundCategory};
    pub use crate::config::EngineConfig;
    pub use crate::ecs::components::{
        AudioEmitter, Model, Orientation, PlayerCamera, Position,
    };
    pub use crate::ecs::systems::Integrator;
    pub use crate::ecs::{Component, Integrable, ObjectId, Registry, System};
    pub use crate::engine::{Engine, EngineError, WindowEvent};
    pub use crate::foundation::math::{Mat4, Point3, Point4, Quat};
    pub use crate::input::{BindingId, InputAction, Key};
    pub use crate::render::{RenderSystem, UniformValue};
    pub use crate::state::{EngineState, StackAction};
}
