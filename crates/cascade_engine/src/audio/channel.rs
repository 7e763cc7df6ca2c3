//! Fixed-capacity SPSC channel
//!
//! A lock-free single-producer single-consumer ring used to hand sound
//! messages from the game thread to the mixer callback. Capacity is fixed at
//! creation; a full ring rejects the message rather than blocking, since the
//! consumer runs inside a real-time audio callback that must never be waited
//! on.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default ring capacity for sound channels.
pub const CHANNEL_SIZE: usize = 8;

/// Error returned when the ring has no free slot, carrying the rejected
/// message back to the caller.
#[derive(Debug, PartialEq, Eq)]
pub struct ChannelFull<T>(pub T);

struct Shared<T> {
    slots: Box<[UnsafeCell<Option<T>>]>,
    /// Number of occupied slots. The producer raises it after writing, the
    /// consumer lowers it after taking, so each side only ever touches slots
    /// the count proves are theirs.
    waiting: AtomicUsize,
}

// Slots are only touched by whichever side the waiting count assigns them to.
unsafe impl<T: Send> Sync for Shared<T> {}

/// Sending half of the ring.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
    head: usize,
}

/// Receiving half of the ring.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
    tail: usize,
}

/// Create a connected producer/consumer pair with `capacity` slots.
pub fn channel<T: Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(None))
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let shared = Arc::new(Shared {
        slots,
        waiting: AtomicUsize::new(0),
    });
    (
        Producer {
            shared: Arc::clone(&shared),
            head: 0,
        },
        Consumer { shared, tail: 0 },
    )
}

impl<T: Send> Producer<T> {
    /// Send `value`, or hand it back if every slot is occupied.
    pub fn send(&mut self, value: T) -> Result<(), ChannelFull<T>> {
        let capacity = self.shared.slots.len();
        if self.shared.waiting.load(Ordering::Acquire) == capacity {
            return Err(ChannelFull(value));
        }
        // The waiting count is below capacity, so the slot at `head` has
        // been drained by the consumer and is ours to fill.
        unsafe {
            *self.shared.slots[self.head].get() = Some(value);
        }
        self.head = (self.head + 1) % capacity;
        self.shared.waiting.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

impl<T: Send> Consumer<T> {
    /// Take the oldest message, if any.
    pub fn try_recv(&mut self) -> Option<T> {
        if self.shared.waiting.load(Ordering::Acquire) == 0 {
            return None;
        }
        // The waiting count is nonzero, so the slot at `tail` holds a fully
        // written message.
        let value = unsafe { (*self.shared.slots[self.tail].get()).take() };
        self.tail = (self.tail + 1) % self.shared.slots.len();
        self.shared.waiting.fetch_sub(1, Ordering::Release);
        value
    }
}
