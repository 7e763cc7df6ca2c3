//! Component trait

use std::any::Any;

/// Marker trait for data that can be attached to an object.
///
/// Components are plain structs; behavior lives in systems. Storage is
/// type-erased behind `Any`, so any thread-safe `'static` type qualifies
/// without a manual impl.
pub trait Component: Any + Send + Sync {}

impl<T: Any + Send + Sync> Component for T {}
