//! Input bindings
//!
//! Keys are bound to declarative actions. Bindings fire on the press edge
//! only; key repeat from the window system is suppressed by tracking held
//! keys.

use std::collections::{HashMap, HashSet};

/// Keys and buttons the engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Space,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
    MouseLeft,
    MouseRight,
    ControllerA,
    ControllerBack,
}

/// What a binding does when its key is pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Queue the named stack transition.
    Transition(String),
    /// Stop the engine's main loop.
    Quit,
}

/// Handle used to remove a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingId(u64);

struct Binding {
    id: BindingId,
    action: InputAction,
}

/// Edge-triggered key-to-action dispatcher.
#[derive(Default)]
pub struct InputManager {
    next_id: u64,
    bindings: HashMap<Key, Vec<Binding>>,
    held: HashSet<Key>,
}

impl InputManager {
    /// Create an input manager with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `action` to fire when `key` is pressed.
    ///
    /// Multiple bindings may share a key; all fire on the press edge in
    /// binding order.
    pub fn bind(&mut self, key: Key, action: InputAction) -> BindingId {
        let id = BindingId(self.next_id);
        self.next_id += 1;
        self.bindings
            .entry(key)
            .or_default()
            .push(Binding { id, action });
        id
    }

    /// Remove a binding by its handle.
    pub fn unbind(&mut self, id: BindingId) {
        for bindings in self.bindings.values_mut() {
            bindings.retain(|b| b.id != id);
        }
    }

    /// Whether `key` is currently held down.
    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Process a key state change, returning the actions to apply.
    ///
    /// Only a fresh press fires bindings; repeats while held and releases
    /// return nothing.
    pub fn process(&mut self, key: Key, pressed: bool) -> Vec<InputAction> {
        if !pressed {
            self.held.remove(&key);
            return Vec::new();
        }
        if !self.held.insert(key) {
            return Vec::new();
        }
        self.bindings
            .get(&key)
            .map(|bindings| bindings.iter().map(|b| b.action.clone()).collect())
            .unwrap_or_default()
    }
}
