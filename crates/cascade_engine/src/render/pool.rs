//! Vertex buffer pool
//!
//! Detached models return their GPU buffers here instead of freeing them.
//! New models first look for a recycled buffer whose capacity is the best
//! fit at or above what they need; if every pooled buffer is too small, the
//! smallest is taken anyway and grown in place by the upload.

use std::collections::BTreeMap;

/// GPU buffers backing one model.
pub struct ModelBuffers {
    /// Vertex array describing the attribute layout.
    pub vao: glow::VertexArray,
    /// Buffer holding packed positions.
    pub vertex_vbo: glow::Buffer,
    /// Buffer holding packed normals.
    pub normal_vbo: glow::Buffer,
    /// Allocated capacity, in vertices.
    pub capacity: i32,
    /// Vertices currently uploaded.
    pub num_vertices: i32,
}

/// Recycled model buffers, keyed by capacity.
#[derive(Default)]
pub struct BufferPool {
    free: BTreeMap<i32, Vec<ModelBuffers>>,
    count: usize,
}

impl BufferPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pooled buffers.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Take the buffer whose capacity best fits `required` vertices.
    ///
    /// Prefers the smallest capacity at or above `required`; when none is
    /// large enough, returns the smallest pooled buffer so the caller can
    /// grow it. `None` only when the pool is empty.
    pub fn acquire(&mut self, required: i32) -> Option<ModelBuffers> {
        let key = self
            .free
            .range(required..)
            .next()
            .map(|(capacity, _)| *capacity)
            .or_else(|| self.free.keys().next().copied())?;
        let entry = self.free.get_mut(&key)?;
        let buffers = entry.pop()?;
        if entry.is_empty() {
            self.free.remove(&key);
        }
        self.count -= 1;
        Some(buffers)
    }

    /// Return buffers to the pool for reuse.
    pub fn release(&mut self, buffers: ModelBuffers) {
        self.free.entry(buffers.capacity).or_default().push(buffers);
        self.count += 1;
    }

    /// Empty the pool, yielding every buffer for deletion.
    pub fn drain(&mut self) -> Vec<ModelBuffers> {
        self.count = 0;
        let mut drained = Vec::new();
        for (_, mut entry) in std::mem::take(&mut self.free) {
            drained.append(&mut entry);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn fake_buffers(capacity: i32) -> ModelBuffers {
        let raw = NonZeroU32::new(1).unwrap();
        ModelBuffers {
            vao: glow::NativeVertexArray(raw),
            vertex_vbo: glow::NativeBuffer(raw),
            normal_vbo: glow::NativeBuffer(raw),
            capacity,
            num_vertices: 0,
        }
    }

    fn pool_with(capacities: &[i32]) -> BufferPool {
        let mut pool = BufferPool::new();
        for &capacity in capacities {
            pool.release(fake_buffers(capacity));
        }
        pool
    }

    #[test]
    fn test_acquire_prefers_smallest_sufficient_capacity() {
        let mut pool = pool_with(&[10, 50, 200]);
        let buffers = pool.acquire(40).unwrap();
        assert_eq!(buffers.capacity, 50);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_acquire_exact_fit() {
        let mut pool = pool_with(&[10, 50, 200]);
        assert_eq!(pool.acquire(50).unwrap().capacity, 50);
    }

    #[test]
    fn test_acquire_falls_back_to_smallest_when_all_too_small() {
        let mut pool = pool_with(&[10, 50, 200]);
        let buffers = pool.acquire(300).unwrap();
        assert_eq!(buffers.capacity, 10);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_acquire_from_empty_pool() {
        let mut pool = BufferPool::new();
        assert!(pool.acquire(10).is_none());
    }

    #[test]
    fn test_duplicate_capacities_pool_separately() {
        let mut pool = pool_with(&[50, 50]);
        assert_eq!(pool.acquire(40).unwrap().capacity, 50);
        assert_eq!(pool.acquire(40).unwrap().capacity, 50);
        assert!(pool.acquire(40).is_none());
    }

    #[test]
    fn test_drain_empties_the_pool() {
        let mut pool = pool_with(&[10, 50, 200]);
        let drained = pool.drain();
        assert_eq!(drained.len(), 3);
        assert!(pool.is_empty());
    }
}
