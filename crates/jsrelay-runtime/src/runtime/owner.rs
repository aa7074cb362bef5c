//! Owning-thread state shared by the event loop and native bindings.
//!
//! Boa values are `!Send`, so everything a native thread refers to is kept
//! here, in arena-indexed tables, and addressed from other threads by id only.
//! The [`Owner`] handle is a cheap `Rc` clone that can be captured by native
//! functions installed into the context.

use boa_engine::{JsObject, JsValue};
use boa_gc::{Finalize, Trace};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedSender;

use crate::callback::request::Envelope;

/// Identifier of a channel in the owner's callback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Id-keyed storage with monotonically increasing ids; ids are never reused.
pub(crate) struct HandleTable<T> {
    entries: HashMap<u64, T>,
    next_id: u64,
}

impl<T> HandleTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, value);
        id
    }

    pub(crate) fn get(&self, id: u64) -> Option<&T> {
        self.entries.get(&id)
    }

    pub(crate) fn remove(&mut self, id: u64) -> Option<T> {
        self.entries.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Callback and receiver kept alive for as long as the channel is.
pub(crate) struct StoredCallback {
    pub(crate) callback: JsObject,
    pub(crate) receiver: JsValue,
}

struct OwnerState {
    channels: RefCell<HandleTable<StoredCallback>>,
    pins: RefCell<HandleTable<JsValue>>,
    queue: UnboundedSender<Envelope>,
    released: Cell<u64>,
    invoked: Cell<u64>,
}

/// Handle to the owning thread's tables.
///
/// Only usable on the owning thread (`Owner` is `!Send`). It implements
/// `Trace` so it can be captured by `NativeFunction`s; the tables hold
/// rooted handles and need no tracing.
#[derive(Clone, Trace, Finalize)]
pub struct Owner {
    #[unsafe_ignore_trace]
    state: Rc<OwnerState>,
}

impl Owner {
    pub(crate) fn new(queue: UnboundedSender<Envelope>) -> Self {
        Self {
            state: Rc::new(OwnerState {
                channels: RefCell::new(HandleTable::new()),
                pins: RefCell::new(HandleTable::new()),
                queue,
                released: Cell::new(0),
                invoked: Cell::new(0),
            }),
        }
    }

    pub(crate) fn queue(&self) -> &UnboundedSender<Envelope> {
        &self.state.queue
    }

    pub(crate) fn register_channel(&self, stored: StoredCallback) -> ChannelId {
        ChannelId(self.state.channels.borrow_mut().insert(stored))
    }

    /// Clones the callback and receiver out so the table is not borrowed
    /// while JavaScript runs (callbacks may create channels themselves).
    pub(crate) fn channel(&self, id: ChannelId) -> Option<(JsObject, JsValue)> {
        self.state
            .channels
            .borrow()
            .get(id.0)
            .map(|stored| (stored.callback.clone(), stored.receiver.clone()))
    }

    pub(crate) fn release_channel(&self, id: ChannelId) -> bool {
        let removed = self.state.channels.borrow_mut().remove(id.0).is_some();
        if removed {
            self.state.released.set(self.state.released.get() + 1);
            tracing::info!(channel = %id, "Thread-safe callback released");
        } else {
            tracing::error!(channel = %id, "Release requested for unknown channel");
        }
        removed
    }

    pub(crate) fn record_invocation(&self) {
        self.state.invoked.set(self.state.invoked.get() + 1);
    }

    /// Keeps `value` alive on the owning thread and returns a token native
    /// threads can carry back into a marshaling function.
    pub fn pin(&self, value: &JsValue) -> Pinned {
        let id = self.state.pins.borrow_mut().insert(value.clone());
        Pinned {
            id,
            queue: self.state.queue.clone(),
        }
    }

    pub(crate) fn pinned(&self, id: u64) -> Option<JsValue> {
        self.state.pins.borrow().get(id).cloned()
    }

    pub(crate) fn unpin(&self, id: u64) {
        self.state.pins.borrow_mut().remove(id);
    }

    /// Channels created and not yet released.
    pub fn live_channels(&self) -> usize {
        self.state.channels.borrow().len()
    }

    pub fn released_channels(&self) -> u64 {
        self.state.released.get()
    }

    pub fn invoked_calls(&self) -> u64 {
        self.state.invoked.get()
    }

    pub fn pinned_values(&self) -> usize {
        self.state.pins.borrow().len()
    }

    /// Drops every stored value. Returns how many channels were still live.
    pub(crate) fn clear(&self) -> usize {
        let leaked = self.live_channels();
        self.state.channels.borrow_mut().clear();
        self.state.pins.borrow_mut().clear();
        leaked
    }
}

/// A `Send` token for a value pinned on the owning thread.
///
/// Resolve it inside a marshaling function with
/// [`MarshalContext::pinned`](crate::callback::MarshalContext::pinned).
/// Dropping the token unpins the value on the owning thread.
pub struct Pinned {
    id: u64,
    queue: UnboundedSender<Envelope>,
}

impl Pinned {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for Pinned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pinned").field("id", &self.id).finish()
    }
}

impl Drop for Pinned {
    fn drop(&mut self) {
        // The loop may already be gone, in which case the table went with it.
        let _ = self.queue.send(Envelope::Unpin(self.id));
    }
}
