//! Growable read buffer with parse and write cursors.

const INITIAL_CAPACITY: usize = 8192;

/// Byte buffer the socket reads into and the message decoder parses from.
///
/// Two cursors: `written` marks the end of received bytes, `parsed` the end
/// of consumed bytes. Before a read the unparsed tail is compacted to the
/// front; capacity grows geometrically when a message exceeds it.
#[derive(Debug)]
pub struct ReadBuffer {
    data: Vec<u8>,
    written: usize,
    parsed: usize,
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadBuffer {
    /// Create an empty buffer with the default capacity.
    pub fn new() -> Self {
        Self {
            data: vec![0; INITIAL_CAPACITY],
            written: 0,
            parsed: 0,
        }
    }

    /// Received bytes not yet consumed.
    pub fn unparsed(&self) -> &[u8] {
        &self.data[self.parsed..self.written]
    }

    /// Mark `n` bytes as consumed. Cursors rewind to the front once
    /// everything received has been parsed.
    pub fn consume(&mut self, n: usize) {
        self.parsed += n;
        debug_assert!(self.parsed <= self.written);
        if self.parsed == self.written {
            self.parsed = 0;
            self.written = 0;
        }
    }

    /// Mark `n` freshly read bytes as received.
    pub fn note_read(&mut self, n: usize) {
        self.written += n;
        debug_assert!(self.written <= self.data.len());
    }

    /// Prepare to receive at least `min_spare` more bytes: compact the
    /// unparsed tail to the front and grow geometrically if needed, then
    /// return the writable spare region.
    pub fn read_target(&mut self, min_spare: usize) -> &mut [u8] {
        if self.parsed > 0 {
            self.data.copy_within(self.parsed..self.written, 0);
            self.written -= self.parsed;
            self.parsed = 0;
        }
        let mut capacity = self.data.len().max(INITIAL_CAPACITY);
        while capacity - self.written < min_spare {
            capacity *= 2;
        }
        if capacity > self.data.len() {
            self.data.resize(capacity, 0);
        }
        &mut self.data[self.written..]
    }

    /// Discard everything, rewinding both cursors.
    pub fn clear(&mut self) {
        self.parsed = 0;
        self.written = 0;
    }

    /// Number of unparsed bytes.
    pub fn len(&self) -> usize {
        self.written - self.parsed
    }

    /// True when no unparsed bytes remain.
    pub fn is_empty(&self) -> bool {
        self.written == self.parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(buf: &mut ReadBuffer, data: &[u8]) {
        let target = buf.read_target(data.len());
        target[..data.len()].copy_from_slice(data);
        buf.note_read(data.len());
    }

    #[test]
    fn test_consume_rewinds() {
        let mut buf = ReadBuffer::new();
        fill(&mut buf, b"hello");
        assert_eq!(buf.unparsed(), b"hello");
        buf.consume(5);
        assert!(buf.is_empty());
        assert_eq!(buf.unparsed(), b"");
    }

    #[test]
    fn test_compaction_preserves_tail() {
        let mut buf = ReadBuffer::new();
        fill(&mut buf, b"aaabbb");
        buf.consume(3);
        assert_eq!(buf.unparsed(), b"bbb");

        // Compacts the unparsed tail to the front
        let _ = buf.read_target(1);
        assert_eq!(buf.unparsed(), b"bbb");
    }

    #[test]
    fn test_geometric_growth() {
        let mut buf = ReadBuffer::new();
        let target = buf.read_target(INITIAL_CAPACITY * 3);
        assert!(target.len() >= INITIAL_CAPACITY * 3);
    }

    #[test]
    fn test_partial_reads_accumulate() {
        let mut buf = ReadBuffer::new();
        fill(&mut buf, b"par");
        fill(&mut buf, b"tial");
        assert_eq!(buf.unparsed(), b"partial");
    }
}
