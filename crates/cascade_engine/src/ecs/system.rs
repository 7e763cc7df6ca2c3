//! System trait
//!
//! Systems hold the engine's behavior. They are owned by states on the state
//! stack and receive lifecycle hooks whenever components are attached or
//! detached, plus a per-frame update and a notification after simulation
//! ticks.

use std::any::{Any, TypeId};
use std::time::Duration;

use crate::ecs::registry::ObjectId;
use crate::engine::{Engine, EngineError};

/// A unit of engine behavior.
///
/// All hooks receive `&mut Engine`; while a system's own hook runs, that
/// system is detached from the engine, so events it raises from inside a hook
/// are delivered to every system but itself.
pub trait System: Any {
    /// Upcast for downcasting via [`Engine::system`].
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting via [`Engine::system_mut`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Called once when the owning state is pushed onto the stack.
    fn init(&mut self, _engine: &mut Engine) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called once per frame with the wall time since the previous frame.
    fn update(&mut self, _engine: &mut Engine, _dt: Duration) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called after a component has been attached to `id`.
    ///
    /// The component is readable through the registry.
    fn component_added(
        &mut self,
        _engine: &mut Engine,
        _id: ObjectId,
        _type_id: TypeId,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called before a component is detached from `id`.
    ///
    /// The component is still readable through the registry, so systems can
    /// release resources keyed on its data.
    fn component_removed(
        &mut self,
        _engine: &mut Engine,
        _id: ObjectId,
        _type_id: TypeId,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called after the integrator has run one or more simulation ticks.
    ///
    /// `ticks` is the number of ticks in the catch-up burst and `step` the
    /// fixed timestep in seconds.
    fn simulation_ticked(
        &mut self,
        _engine: &mut Engine,
        _ticks: u32,
        _step: f32,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called when the window's drawable size changes.
    fn window_resized(
        &mut self,
        _engine: &mut Engine,
        _width: u32,
        _height: u32,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}
