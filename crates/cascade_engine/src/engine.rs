//! Engine core
//!
//! The [`Engine`] owns the registry, the asset cache, input bindings, and the
//! state stack. It drives per-frame updates, dispatches component lifecycle
//! hooks to every system on the stack, and applies queued stack transitions
//! at the end of each frame.

use std::any::TypeId;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info, warn};
use thiserror::Error;

use crate::assets::{AssetCache, AssetError};
use crate::audio::AudioError;
use crate::config::{ConfigError, EngineConfig};
use crate::ecs::component::Component;
use crate::ecs::registry::{ObjectId, Registry};
use crate::ecs::system::System;
use crate::foundation::time::Timer;
use crate::input::{InputAction, InputManager, Key};
use crate::render::RenderError;
use crate::state::{EngineState, StackAction};

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A transition or startup referenced a state name never registered.
    #[error("unknown state '{0}'")]
    UnknownState(String),

    /// The top state has no transition registered under the queued name.
    #[error("state '{state}' has no transition named '{name}'")]
    UnknownTransition {
        /// Name of the state the lookup ran against.
        state: String,
        /// The queued transition name.
        name: String,
    },

    /// A transition tried to pop the last remaining state.
    #[error("transition attempted to pop the root state")]
    PopBelowRoot,

    /// Render subsystem failure.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Audio subsystem failure.
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Asset loading failure.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Window-system event fed into [`Engine::handle_event`] by the host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The user asked to close the window.
    CloseRequested,
    /// The drawable size changed to `width` x `height` pixels.
    Resized {
        /// New drawable width in pixels.
        width: u32,
        /// New drawable height in pixels.
        height: u32,
    },
    /// A key or button changed state.
    Key {
        /// The key that changed.
        key: Key,
        /// `true` on press, `false` on release.
        pressed: bool,
    },
}

/// Builder callback that populates a freshly created state.
///
/// Runs with the engine and the not-yet-pushed state, so it can add systems
/// and transitions to the state while creating objects through the engine.
pub type StateSetup = dyn Fn(&mut Engine, &mut EngineState) -> Result<(), EngineError>;

/// The engine core.
pub struct Engine {
    config: EngineConfig,
    registry: Registry,
    assets: AssetCache,
    input: InputManager,
    states: HashMap<String, Rc<StateSetup>>,
    stack: Vec<EngineState>,
    pending_transition: Option<String>,
    running: bool,
    timer: Timer,
}

impl Engine {
    /// Create an engine from a configuration.
    pub fn new(config: EngineConfig) -> Self {
        let assets = AssetCache::new(&config.asset_root);
        Self {
            config,
            registry: Registry::new(),
            assets,
            input: InputManager::new(),
            states: HashMap::new(),
            stack: Vec::new(),
            pending_transition: None,
            running: false,
            timer: Timer::new(),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Object and component storage.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to object and component storage.
    ///
    /// Mutations made directly on the registry bypass lifecycle hooks; use
    /// [`Engine::add_component`] and friends when systems must observe the
    /// change.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Asset cache.
    pub fn assets(&mut self) -> &mut AssetCache {
        &mut self.assets
    }

    /// Input bindings.
    pub fn input(&mut self) -> &mut InputManager {
        &mut self.input
    }

    /// Frame timing statistics.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Register a state under `name`.
    ///
    /// The setup callback runs every time the state is pushed.
    pub fn register_state<F>(&mut self, name: impl Into<String>, setup: F)
    where
        F: Fn(&mut Engine, &mut EngineState) -> Result<(), EngineError> + 'static,
    {
        self.states.insert(name.into(), Rc::new(setup));
    }

    /// Push the root state and start the main loop.
    pub fn start(&mut self, root: &str) -> Result<(), EngineError> {
        info!("starting engine with root state '{root}'");
        self.running = true;
        self.push_state(root)
    }

    /// Whether the main loop should keep running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop the main loop at the end of the current frame.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Queue a named transition to be applied at the end of this frame.
    ///
    /// Only the most recent queued name survives to the end of the frame.
    pub fn queue_transition(&mut self, name: impl Into<String>) {
        self.pending_transition = Some(name.into());
    }

    /// Names of the states on the stack, bottom first.
    pub fn stack_names(&self) -> Vec<&str> {
        self.stack.iter().map(EngineState::name).collect()
    }

    /// Run one frame: update systems bottom to top, then apply the queued
    /// transition, if any.
    ///
    /// States below the top are skipped unless they are marked ticking; the
    /// top state always runs.
    pub fn frame(&mut self) -> Result<(), EngineError> {
        let dt = self.timer.tick();
        let top = self.stack.len().saturating_sub(1);
        for si in 0..self.stack.len() {
            if si != top && !self.stack[si].is_ticking() {
                continue;
            }
            for i in 0..self.stack[si].systems.len() {
                let Some(mut system) = self.stack[si].systems[i].take() else {
                    continue;
                };
                let result = system.update(self, dt);
                self.stack[si].systems[i] = Some(system);
                result?;
            }
        }
        self.apply_pending_transition()
    }

    /// Feed a window-system event into the engine.
    pub fn handle_event(&mut self, event: WindowEvent) -> Result<(), EngineError> {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested");
                self.running = false;
            }
            WindowEvent::Resized { width, height } => {
                debug!("window resized to {width}x{height}");
                self.for_each_system(|system, engine| system.window_resized(engine, width, height))?;
            }
            WindowEvent::Key { key, pressed } => {
                for action in self.input.process(key, pressed) {
                    match action {
                        InputAction::Transition(name) => self.queue_transition(name),
                        InputAction::Quit => self.quit(),
                    }
                }
            }
        }
        Ok(())
    }

    /// Pop every state off the stack, running destructors.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        info!("shutting down, {} states on stack", self.stack.len());
        while !self.stack.is_empty() {
            self.teardown_top();
        }
        self.running = false;
        Ok(())
    }

    /// Allocate a fresh object.
    pub fn create_object(&mut self) -> ObjectId {
        self.registry.create_object()
    }

    /// Attach `component` to `id`, notifying systems.
    ///
    /// If a component of the same type is already attached, systems first see
    /// it removed, then the replacement added. Attaching to a dead object is
    /// logged and ignored.
    pub fn add_component<C: Component>(
        &mut self,
        id: ObjectId,
        component: C,
    ) -> Result<(), EngineError> {
        if !self.registry.is_alive(id) {
            warn!("ignoring component attach to dead object {id}");
            return Ok(());
        }
        let type_id = TypeId::of::<C>();
        if self.registry.has::<C>(id) {
            self.for_each_system(|system, engine| system.component_removed(engine, id, type_id))?;
            self.registry.remove_by_type(id, type_id);
        }
        self.registry.insert(id, component);
        self.for_each_system(|system, engine| system.component_added(engine, id, type_id))
    }

    /// Detach the component of type `C` from `id`, notifying systems before
    /// it is dropped.
    pub fn remove_component<C: Component>(&mut self, id: ObjectId) -> Result<(), EngineError> {
        let type_id = TypeId::of::<C>();
        if !self.registry.has::<C>(id) {
            return Ok(());
        }
        self.for_each_system(|system, engine| system.component_removed(engine, id, type_id))?;
        self.registry.remove_by_type(id, type_id);
        Ok(())
    }

    /// Destroy `id`, notifying systems of each component before it is
    /// dropped.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<(), EngineError> {
        let Some(attached) = self.registry.attached_types(id).map(<[_]>::to_vec) else {
            return Ok(());
        };
        for type_id in attached {
            self.for_each_system(|system, engine| system.component_removed(engine, id, type_id))?;
        }
        self.registry.destroy_object(id);
        Ok(())
    }

    /// Find the first system of type `S` on the stack, topmost state first.
    pub fn system<S: System>(&self) -> Option<&S> {
        self.stack.iter().rev().find_map(|state| {
            state
                .systems
                .iter()
                .flatten()
                .find_map(|system| system.as_any().downcast_ref())
        })
    }

    /// Mutable variant of [`Engine::system`].
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.stack.iter_mut().rev().find_map(|state| {
            state
                .systems
                .iter_mut()
                .flatten()
                .find_map(|system| system.as_any_mut().downcast_mut())
        })
    }

    /// Notify every system that the integrator ran `ticks` simulation steps
    /// of `step` seconds each.
    pub fn notify_simulation_ticked(&mut self, ticks: u32, step: f32) -> Result<(), EngineError> {
        self.for_each_system(|system, engine| system.simulation_ticked(engine, ticks, step))
    }

    /// Dispatch `f` to every system on the stack, bottom to top.
    ///
    /// Each system is taken out of its slot for the duration of its call, so
    /// re-entrant dispatch from inside a hook skips the running system.
    fn for_each_system<F>(&mut self, mut f: F) -> Result<(), EngineError>
    where
        F: FnMut(&mut Box<dyn System>, &mut Engine) -> Result<(), EngineError>,
    {
        for si in 0..self.stack.len() {
            for i in 0..self.stack[si].systems.len() {
                let Some(mut system) = self.stack[si].systems[i].take() else {
                    continue;
                };
                let result = f(&mut system, self);
                self.stack[si].systems[i] = Some(system);
                result?;
            }
        }
        Ok(())
    }

    fn apply_pending_transition(&mut self) -> Result<(), EngineError> {
        let Some(name) = self.pending_transition.take() else {
            return Ok(());
        };
        let top = match self.stack.last() {
            Some(top) => top,
            None => return Err(EngineError::UnknownState(name)),
        };
        let actions = top
            .transition(&name)
            .map(<[_]>::to_vec)
            .ok_or_else(|| EngineError::UnknownTransition {
                state: top.name().to_string(),
                name: name.clone(),
            })?;
        debug!("applying transition '{name}' with {} actions", actions.len());
        for action in actions {
            match action {
                StackAction::Push(state) => self.push_state(&state)?,
                StackAction::Pop => self.pop_state()?,
                StackAction::Quit => self.running = false,
            }
        }
        Ok(())
    }

    /// Build and push the named state, then init its systems.
    fn push_state(&mut self, name: &str) -> Result<(), EngineError> {
        let setup = self
            .states
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownState(name.to_string()))?;
        debug!("pushing state '{name}'");
        let mut state = EngineState::new(name);
        setup(self, &mut state)?;
        self.stack.push(state);

        let si = self.stack.len() - 1;
        for i in 0..self.stack[si].systems.len() {
            let Some(mut system) = self.stack[si].systems[i].take() else {
                continue;
            };
            let result = system.init(self);
            self.stack[si].systems[i] = Some(system);
            result?;
        }
        Ok(())
    }

    fn pop_state(&mut self) -> Result<(), EngineError> {
        if self.stack.len() <= 1 {
            return Err(EngineError::PopBelowRoot);
        }
        self.teardown_top();
        Ok(())
    }

    fn teardown_top(&mut self) {
        let Some(mut state) = self.stack.pop() else {
            return;
        };
        debug!("popping state '{}'", state.name());
        while let Some(dtor) = state.dtors.pop() {
            dtor(self);
        }
    }
}
