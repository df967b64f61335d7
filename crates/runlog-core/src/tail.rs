use std::collections::VecDeque;

/// Bounded sliding window over a byte stream.
///
/// Retains whole chunks: once the retained total exceeds `max_bytes`, the
/// oldest chunks are dropped until it fits again. Chunks are never split or
/// mutated, so the retained bytes are always a suffix of the stream aligned
/// to a chunk boundary. `max_bytes == 0` disables retention.
#[derive(Debug, Clone, Default)]
pub struct TailBuffer {
    max_bytes: usize,
    chunks: VecDeque<Vec<u8>>,
    total: usize,
}

impl TailBuffer {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            chunks: VecDeque::new(),
            total: 0,
        }
    }

    pub fn add(&mut self, chunk: &[u8]) {
        if chunk.is_empty() || self.max_bytes == 0 {
            return;
        }
        self.chunks.push_back(chunk.to_vec());
        self.total += chunk.len();
        while self.total > self.max_bytes {
            match self.chunks.pop_front() {
                Some(evicted) => self.total -= evicted.len(),
                None => break,
            }
        }
    }

    /// Number of bytes currently retained.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Concatenation of the retained chunks.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    /// Retained bytes decoded as UTF-8, replacing invalid sequences.
    ///
    /// Eviction is chunk-aligned, but a chunk may still start mid-character
    /// when the producer split one across reads.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_retains_nothing() {
        let mut buf = TailBuffer::new(0);
        buf.add(b"hello");
        assert!(buf.is_empty());
        assert!(buf.to_bytes().is_empty());
    }

    #[test]
    fn under_limit_keeps_everything() {
        let mut buf = TailBuffer::new(16);
        buf.add(b"abc");
        buf.add(b"def");
        assert_eq!(buf.to_bytes(), b"abcdef");
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn evicts_whole_chunks_from_front() {
        let mut buf = TailBuffer::new(6);
        buf.add(b"aaaa");
        buf.add(b"bbb");
        // 7 > 6: the first chunk goes entirely.
        assert_eq!(buf.to_bytes(), b"bbb");
        buf.add(b"ccc");
        assert_eq!(buf.to_bytes(), b"bbbccc");
    }

    #[test]
    fn oversized_chunk_is_dropped() {
        let mut buf = TailBuffer::new(4);
        buf.add(b"ab");
        buf.add(b"0123456789");
        assert!(buf.is_empty());
    }

    #[test]
    fn retained_bytes_are_a_suffix_of_the_stream() {
        let mut buf = TailBuffer::new(100);
        let mut stream = Vec::new();
        for i in 0..500u32 {
            let chunk: Vec<u8> = (0..(i % 13 + 1)).map(|j| (i + j) as u8).collect();
            stream.extend_from_slice(&chunk);
            buf.add(&chunk);
        }
        let tail = buf.to_bytes();
        assert!(tail.len() <= 100);
        assert!(!tail.is_empty());
        assert!(stream.ends_with(&tail));
    }

    #[test]
    fn empty_chunks_are_ignored() {
        let mut buf = TailBuffer::new(8);
        buf.add(b"");
        assert!(buf.is_empty());
        assert_eq!(buf.max_bytes(), 8);
    }

    #[test]
    fn lossy_decoding() {
        let mut buf = TailBuffer::new(8);
        buf.add(&[0xff, b'o', b'k']);
        assert_eq!(buf.to_string_lossy(), "\u{fffd}ok");
    }
}
