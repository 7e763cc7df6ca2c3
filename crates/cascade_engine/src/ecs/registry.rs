//! Object and component storage
//!
//! The registry owns every live object and its attached components. Ids are
//! monotonically increasing and never reused, so a stale id held by a system
//! simply fails lookups instead of aliasing a newer object.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::ecs::component::Component;

/// Opaque handle to a live object.
pub type ObjectId = u64;

/// Type-erased component as stored by the registry.
///
/// Stored as `dyn Any` rather than `dyn Component` so lookups downcast on
/// the erased value itself; downcasting through a second trait object would
/// see the box, not the component.
pub type BoxedComponent = Box<dyn Any + Send + Sync>;

/// Central store of objects and their components.
///
/// At most one component of a given type can be attached to an object;
/// attaching a second replaces the first. The registry itself performs no
/// event dispatch; the engine wraps mutations and notifies systems so hooks
/// can observe the registry in a consistent state.
#[derive(Default)]
pub struct Registry {
    next_id: ObjectId,
    components: HashMap<TypeId, HashMap<ObjectId, BoxedComponent>>,
    objects: HashMap<ObjectId, Vec<TypeId>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            components: HashMap::new(),
            objects: HashMap::new(),
        }
    }

    /// Allocate a fresh object with no components.
    pub fn create_object(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, Vec::new());
        id
    }

    /// Whether `id` refers to a live object.
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Attach `component` to `id`, returning the displaced component of the
    /// same type if one was present.
    ///
    /// Returns `None` without attaching when the object is not alive.
    pub fn insert<C: Component>(&mut self, id: ObjectId, component: C) -> Option<BoxedComponent> {
        self.insert_boxed(id, TypeId::of::<C>(), Box::new(component))
    }

    /// Type-erased variant of [`Registry::insert`]. `type_id` must be the
    /// `TypeId` of the boxed value, or typed lookups will miss it.
    pub fn insert_boxed(
        &mut self,
        id: ObjectId,
        type_id: TypeId,
        component: BoxedComponent,
    ) -> Option<BoxedComponent> {
        let attached = self.objects.get_mut(&id)?;
        if !attached.contains(&type_id) {
            attached.push(type_id);
        }
        self.components
            .entry(type_id)
            .or_default()
            .insert(id, component)
    }

    /// Detach the component of type `C` from `id`, returning it.
    pub fn remove<C: Component>(&mut self, id: ObjectId) -> Option<BoxedComponent> {
        self.remove_by_type(id, TypeId::of::<C>())
    }

    /// Type-erased variant of [`Registry::remove`].
    pub fn remove_by_type(&mut self, id: ObjectId, type_id: TypeId) -> Option<BoxedComponent> {
        let removed = self.components.get_mut(&type_id)?.remove(&id)?;
        if let Some(attached) = self.objects.get_mut(&id) {
            attached.retain(|t| *t != type_id);
        }
        Some(removed)
    }

    /// Destroy `id`, dropping all of its components.
    ///
    /// Returns the list of component types that were attached, or `None` if
    /// the object was not alive.
    pub fn destroy_object(&mut self, id: ObjectId) -> Option<Vec<TypeId>> {
        let attached = self.objects.remove(&id)?;
        for type_id in &attached {
            if let Some(store) = self.components.get_mut(type_id) {
                store.remove(&id);
            }
        }
        Some(attached)
    }

    /// Component types currently attached to `id`.
    pub fn attached_types(&self, id: ObjectId) -> Option<&[TypeId]> {
        self.objects.get(&id).map(Vec::as_slice)
    }

    /// Look up the component of type `C` on `id`.
    pub fn get<C: Component>(&self, id: ObjectId) -> Option<&C> {
        self.components
            .get(&TypeId::of::<C>())?
            .get(&id)?
            .downcast_ref()
    }

    /// Mutable lookup of the component of type `C` on `id`.
    pub fn get_mut<C: Component>(&mut self, id: ObjectId) -> Option<&mut C> {
        self.components
            .get_mut(&TypeId::of::<C>())?
            .get_mut(&id)?
            .downcast_mut()
    }

    /// Whether `id` has a component of type `C`.
    pub fn has<C: Component>(&self, id: ObjectId) -> bool {
        self.components
            .get(&TypeId::of::<C>())
            .is_some_and(|store| store.contains_key(&id))
    }

    /// Iterate all components of type `C`.
    pub fn iter<C: Component>(&self) -> impl Iterator<Item = (ObjectId, &C)> {
        self.components
            .get(&TypeId::of::<C>())
            .into_iter()
            .flatten()
            .filter_map(|(id, c)| Some((*id, c.downcast_ref()?)))
    }

    /// Mutable iteration over all components of type `C`.
    pub fn iter_mut<C: Component>(&mut self) -> impl Iterator<Item = (ObjectId, &mut C)> {
        self.components
            .get_mut(&TypeId::of::<C>())
            .into_iter()
            .flatten()
            .filter_map(|(id, c)| Some((*id, c.downcast_mut()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health(i32);
    struct Name(String);

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = Registry::new();
        let a = registry.create_object();
        registry.destroy_object(a);
        let b = registry.create_object();
        assert_ne!(a, b);
        assert!(!registry.is_alive(a));
        assert!(registry.is_alive(b));
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = Registry::new();
        let id = registry.create_object();
        registry.insert(id, Health(10));
        registry.insert(id, Name("rock".to_string()));
        assert_eq!(registry.get::<Health>(id).unwrap().0, 10);
        assert_eq!(registry.get::<Name>(id).unwrap().0, "rock");
        assert!(registry.get::<Health>(id + 1).is_none());
    }

    #[test]
    fn test_type_erased_insert_is_visible_to_typed_access() {
        let mut registry = Registry::new();
        let id = registry.create_object();
        registry.insert_boxed(id, TypeId::of::<Health>(), Box::new(Health(9)));
        assert_eq!(registry.get::<Health>(id).unwrap().0, 9);

        registry.get_mut::<Health>(id).unwrap().0 += 1;
        let visited: Vec<_> = registry.iter::<Health>().map(|(_, h)| h.0).collect();
        assert_eq!(visited, vec![10]);
    }

    #[test]
    fn test_insert_replaces_existing_component() {
        let mut registry = Registry::new();
        let id = registry.create_object();
        assert!(registry.insert(id, Health(10)).is_none());
        let displaced = registry.insert(id, Health(20)).unwrap();
        assert_eq!(displaced.downcast_ref::<Health>().unwrap().0, 10);
        assert_eq!(registry.get::<Health>(id).unwrap().0, 20);
        assert_eq!(registry.attached_types(id).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_on_dead_object_is_ignored() {
        let mut registry = Registry::new();
        let id = registry.create_object();
        registry.destroy_object(id);
        assert!(registry.insert(id, Health(10)).is_none());
        assert!(registry.get::<Health>(id).is_none());
    }

    #[test]
    fn test_remove_detaches_component() {
        let mut registry = Registry::new();
        let id = registry.create_object();
        registry.insert(id, Health(10));
        let removed = registry.remove::<Health>(id).unwrap();
        assert_eq!(removed.downcast_ref::<Health>().unwrap().0, 10);
        assert!(registry.get::<Health>(id).is_none());
        assert!(registry.attached_types(id).unwrap().is_empty());
    }

    #[test]
    fn test_destroy_reports_attached_types() {
        let mut registry = Registry::new();
        let id = registry.create_object();
        registry.insert(id, Health(10));
        registry.insert(id, Name("rock".to_string()));
        let attached = registry.destroy_object(id).unwrap();
        assert_eq!(attached.len(), 2);
        assert!(registry.destroy_object(id).is_none());
    }

    #[test]
    fn test_iter_visits_all_of_one_type() {
        let mut registry = Registry::new();
        for hp in [1, 2, 3] {
            let id = registry.create_object();
            registry.insert(id, Health(hp));
        }
        let mut total = 0;
        for (_, health) in registry.iter::<Health>() {
            total += health.0;
        }
        assert_eq!(total, 6);

        for (_, health) in registry.iter_mut::<Health>() {
            health.0 *= 2;
        }
        let total: i32 = registry.iter::<Health>().map(|(_, h)| h.0).sum();
        assert_eq!(total, 12);
    }
}
