//! Synchronous change notification.

use std::fmt;

/// Handle returned by [`Signal::connect`], used to disconnect a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// A list of callbacks invoked in connection order on every [`emit`](Signal::emit).
///
/// Callbacks run synchronously on the emitting thread.
pub struct Signal<T> {
    slots: Vec<(ConnectionId, Box<dyn FnMut(&T)>)>,
    next_id: u64,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
        }
    }

    pub fn connect(&mut self, slot: impl FnMut(&T) + 'static) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.slots.push((id, Box::new(slot)));
        id
    }

    /// Remove a callback. Returns false if it was not connected.
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(slot_id, _)| *slot_id != id);
        self.slots.len() != before
    }

    pub fn emit(&mut self, value: &T) {
        for (_, slot) in &mut self.slots {
            slot(value);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn emit_reaches_connected_slots_until_disconnected() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::new();

        let sink = seen.clone();
        let id = signal.connect(move |v: &u32| sink.borrow_mut().push(*v));
        signal.emit(&1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(&2);

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(signal.connection_count(), 0);
    }
}
