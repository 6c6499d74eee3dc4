use crate::error::{ModemError, Result};

/// Fixed-capacity circular store for a live sample stream.
///
/// Writing past capacity silently discards the oldest sample; a live
/// capture has no way to pause, so loss is preferred over blocking the
/// audio thread. The valid region is the contiguous `[head, tail)`
/// range modulo the backing length.
pub struct RingBuffer {
    head: usize,
    tail: usize,
    inner: Vec<f64>,
}

impl RingBuffer {
    /// Create a buffer that retains up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            head: 0,
            tail: 0,
            // One slot is sacrificed to distinguish full from empty.
            inner: vec![0.0; capacity + 1],
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.len() - 1
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        (self.tail + self.inner.len() - self.head) % self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Append one sample, overwriting the oldest when full.
    pub fn write(&mut self, sample: f64) {
        self.inner[self.tail] = sample;
        self.tail = (self.tail + 1) % self.inner.len();
        if self.tail == self.head {
            self.head = (self.head + 1) % self.inner.len();
        }
    }

    /// Copy out `count` samples ending `back_offset` samples before the
    /// newest one, oldest first.
    ///
    /// Fails when the window reaches past the oldest retained sample.
    /// In a correctly sized session this is unreachable, so callers
    /// treat the error as fatal rather than retrying.
    pub fn window(&self, back_offset: usize, count: usize) -> Result<Vec<f64>> {
        let available = self.len();
        let requested = back_offset + count;
        if requested > available {
            return Err(ModemError::InsufficientData {
                requested,
                available,
            });
        }

        let n = self.inner.len();
        let end = (self.tail + n - back_offset % n) % n;
        let start = (end + n - count % n) % n;

        let mut out = Vec::with_capacity(count);
        if start <= end && count < n {
            out.extend_from_slice(&self.inner[start..end]);
        } else {
            out.extend_from_slice(&self.inner[start..]);
            out.extend_from_slice(&self.inner[..end]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, count: usize) -> RingBuffer {
        let mut rb = RingBuffer::new(capacity);
        for i in 0..count {
            rb.write(i as f64);
        }
        rb
    }

    #[test]
    fn test_empty_buffer() {
        let rb = RingBuffer::new(8);
        assert_eq!(rb.capacity(), 8);
        assert_eq!(rb.len(), 0);
        assert!(rb.is_empty());
        assert_eq!(rb.window(0, 0).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_window_returns_newest_samples_in_order() {
        let rb = filled(8, 5);
        assert_eq!(rb.window(0, 5).unwrap(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(rb.window(0, 3).unwrap(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_window_with_back_offset() {
        let rb = filled(8, 6);
        assert_eq!(rb.window(2, 3).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_overwrite_keeps_most_recent() {
        // 10 writes into capacity 4: only 6..=9 survive.
        let rb = filled(4, 10);
        assert_eq!(rb.len(), 4);
        assert_eq!(rb.window(0, 4).unwrap(), vec![6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_window_across_wrap_point() {
        let mut rb = RingBuffer::new(5);
        for i in 0..8 {
            rb.write(i as f64);
        }
        // Backing array has wrapped; the window must still come out
        // contiguous in logical time.
        assert_eq!(rb.window(0, 5).unwrap(), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(rb.window(1, 3).unwrap(), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_underflow_is_an_error() {
        let rb = filled(8, 3);
        match rb.window(0, 4) {
            Err(ModemError::InsufficientData {
                requested,
                available,
            }) => {
                assert_eq!(requested, 4);
                assert_eq!(available, 3);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
        assert!(rb.window(2, 2).is_err());
    }

    #[test]
    fn test_invariant_under_long_write_sequence() {
        let mut rb = RingBuffer::new(16);
        for i in 0..1000u32 {
            rb.write(i as f64);
            let expect = (i as usize + 1).min(16);
            assert_eq!(rb.len(), expect);
            let win = rb.window(0, expect).unwrap();
            for (j, &v) in win.iter().enumerate() {
                assert_eq!(v, (i as usize + 1 - expect + j) as f64);
            }
        }
    }
}
