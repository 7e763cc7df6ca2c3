//! Engine state stack elements
//!
//! Each [`EngineState`] on the stack owns a set of systems and declares, as
//! data, how named transitions rewrite the stack. Destructors registered on a
//! state run in reverse order when the state is popped.

use std::collections::HashMap;

use log::warn;

use crate::ecs::registry::ObjectId;
use crate::ecs::system::System;
use crate::engine::Engine;
use crate::input::BindingId;

/// A single rewrite step applied to the state stack by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackAction {
    /// Push the named state on top of the stack.
    Push(String),
    /// Pop the current top state.
    Pop,
    /// Stop the engine's main loop.
    Quit,
}

/// Teardown callback run when the owning state is popped.
pub type StateDtor = Box<dyn FnOnce(&mut Engine)>;

/// One element of the engine's state stack.
///
/// States below the top only run their systems each frame if `ticking` is
/// set; the top state always runs.
pub struct EngineState {
    name: String,
    ticking: bool,
    pub(crate) systems: Vec<Option<Box<dyn System>>>,
    transitions: HashMap<String, Vec<StackAction>>,
    pub(crate) dtors: Vec<StateDtor>,
}

impl EngineState {
    /// Create an empty state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticking: false,
            systems: Vec::new(),
            transitions: HashMap::new(),
            dtors: Vec::new(),
        }
    }

    /// Name this state was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this state's systems run even when it is not on top.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Keep this state's systems running while states sit above it.
    pub fn set_ticking(&mut self, ticking: bool) {
        self.ticking = ticking;
    }

    /// Add a system to this state.
    pub fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(Some(system));
    }

    /// Declare the stack rewrite performed by the named transition.
    ///
    /// Redeclaring a name replaces its actions.
    pub fn add_transition(&mut self, name: impl Into<String>, actions: Vec<StackAction>) {
        self.transitions.insert(name.into(), actions);
    }

    /// Look up the actions for a transition name.
    pub fn transition(&self, name: &str) -> Option<&[StackAction]> {
        self.transitions.get(name).map(Vec::as_slice)
    }

    /// Register a teardown callback; callbacks run in reverse registration
    /// order when the state is popped.
    pub fn add_dtor(&mut self, dtor: StateDtor) {
        self.dtors.push(dtor);
    }

    /// Tie an object's lifetime to this state: popping the state destroys
    /// the object, firing removal hooks for its components.
    pub fn own_object(&mut self, id: ObjectId) {
        self.add_dtor(Box::new(move |engine| {
            if let Err(err) = engine.remove_object(id) {
                warn!("failed to remove object {id} on state pop: {err}");
            }
        }));
    }

    /// Tie an input binding's lifetime to this state: popping the state
    /// releases the binding.
    pub fn own_binding(&mut self, binding: BindingId) {
        self.add_dtor(Box::new(move |engine| {
            engine.input().unbind(binding);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_lookup() {
        let mut state = EngineState::new("title");
        state.add_transition(
            "forward",
            vec![StackAction::Pop, StackAction::Push("playing".to_string())],
        );
        let actions = state.transition("forward").unwrap();
        assert_eq!(actions[0], StackAction::Pop);
        assert_eq!(actions[1], StackAction::Push("playing".to_string()));
        assert!(state.transition("back").is_none());
    }

    #[test]
    fn test_redeclaring_transition_replaces_actions() {
        let mut state = EngineState::new("title");
        state.add_transition("forward", vec![StackAction::Pop]);
        state.add_transition("forward", vec![StackAction::Quit]);
        assert_eq!(state.transition("forward").unwrap(), [StackAction::Quit]);
    }
}
