use std::collections::VecDeque;

/// Bytes waiting to be written to a data socket.
///
/// Producers push whole chunks; the writer consumes from the front in
/// whatever sizes the socket accepts. `len` is the number of unsent bytes.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    chunks: VecDeque<Vec<u8>>,
    offset: usize,
    len: usize,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push_back(chunk);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The unsent part of the front chunk.
    pub fn front(&self) -> &[u8] {
        match self.chunks.front() {
            Some(chunk) => &chunk[self.offset..],
            None => &[],
        }
    }

    /// Marks `n` bytes of the front chunk as written.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.front().len());
        self.offset += n;
        self.len -= n;
        if let Some(chunk) = self.chunks.front() {
            if self.offset == chunk.len() {
                self.chunks.pop_front();
                self.offset = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_writes_advance_within_a_chunk() {
        let mut queue = OutboundQueue::new();
        queue.push(b"hello".to_vec());
        queue.push(b"world".to_vec());
        assert_eq!(queue.len(), 10);

        queue.consume(3);
        assert_eq!(queue.front(), b"lo");
        assert_eq!(queue.len(), 7);

        queue.consume(2);
        assert_eq!(queue.front(), b"world");
        queue.consume(5);
        assert!(queue.is_empty());
        assert_eq!(queue.front(), b"");
    }

    #[test]
    fn empty_chunks_are_ignored() {
        let mut queue = OutboundQueue::new();
        queue.push(Vec::new());
        assert!(queue.is_empty());
        queue.consume(10);
        assert_eq!(queue.len(), 0);
    }
}
