/// An event tagged with the order it was queued in.
#[derive(Debug, Clone, PartialEq)]
pub struct Queued<E> {
    pub seq: u64,
    pub event: E,
}

/// FIFO of notifications that must not be delivered while the producer is
/// still mutating its own state.
///
/// Producers `push` during an update; the host drains after the update has
/// returned, so listeners never observe a half-applied change.
#[derive(Debug)]
pub struct EventQueue<E> {
    next_seq: u64,
    pending: Vec<Queued<E>>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: E) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.push(Queued { seq, event });
    }

    pub fn pending(&self) -> &[Queued<E>] {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes every pending event in push order.
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|q| q.event)
            .collect()
    }

    /// Drops pending events without delivering them.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
