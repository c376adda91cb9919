/// Generational handle: (index, generation).
///
/// Used wherever an opaque, cheaply comparable reference to an externally
/// owned object is needed, e.g. fake SDK objects in tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32, u32);

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn generation(self) -> u32 {
        self.1
    }
}

/// Hands out handles with monotonically increasing indices.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u32,
    generation: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose handles never compare equal to another generation's.
    pub fn with_generation(generation: u32) -> Self {
        Self {
            next: 0,
            generation,
        }
    }

    pub fn alloc(&mut self) -> Handle {
        let h = Handle::new(self.next, self.generation);
        self.next = self.next.wrapping_add(1);
        h
    }

    pub fn allocated(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::HandleAllocator;

    #[test]
    fn handles_are_unique_and_ordered() {
        let mut a = HandleAllocator::with_generation(3);
        let h0 = a.alloc();
        let h1 = a.alloc();
        assert_ne!(h0, h1);
        assert!(h0 < h1);
        assert_eq!(h1.generation(), 3);
        assert_eq!(a.allocated(), 2);
    }
}
