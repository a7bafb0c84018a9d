/// Fixed-capacity view over the tail of a byte stream.
///
/// `[start, pos)` holds the most recently consumed frame and `[pos, end)` the
/// bytes not yet consumed. `start <= pos <= end <= capacity` always holds.
#[derive(Debug)]
pub struct PacketWindow {
    buffer: Box<[u8]>,
    start: usize,
    pos: usize,
    end: usize,
}

impl PacketWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            pos: 0,
            end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_full(&self) -> bool {
        self.end == self.buffer.len()
    }

    /// Bytes received but not consumed yet.
    pub fn lookahead(&self) -> &[u8] {
        &self.buffer[self.pos..self.end]
    }

    /// The bytes of the frame consumed last. Invalidated by [`Self::compact`].
    pub fn last_frame(&self) -> &[u8] {
        &self.buffer[self.start..self.pos]
    }

    /// Marks the next `n` lookahead bytes as one consumed frame.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.end - self.pos, "consumed past the end of the window");
        self.start = self.pos;
        self.pos += n;
    }

    /// Moves the unconsumed bytes to the front of the buffer.
    pub fn compact(&mut self) {
        self.buffer.copy_within(self.pos..self.end, 0);
        self.end -= self.pos;
        self.start = 0;
        self.pos = 0;
    }

    /// Free space to read into, compacting first when the window is full.
    /// Returns `None` when the unconsumed bytes alone fill the whole window.
    pub fn writable(&mut self) -> Option<&mut [u8]> {
        if self.is_full() {
            self.compact();
        }
        if self.is_full() {
            return None;
        }
        Some(&mut self.buffer[self.end..])
    }

    /// Records that `n` bytes were written into the slice from [`Self::writable`].
    pub fn fill(&mut self, n: usize) {
        assert!(n <= self.buffer.len() - self.end, "filled past the window capacity");
        self.end += n;
    }

    /// Copies as much of `bytes` as fits. Returns the number of bytes taken.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let Some(free) = self.writable() else {
            return 0;
        };
        let n = free.len().min(bytes.len());
        free[..n].copy_from_slice(&bytes[..n]);
        self.fill(n);
        n
    }
}
