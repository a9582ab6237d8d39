use std::collections::VecDeque;

/// Fixed capacity FIFO of 0/1 observations. Pushing onto a full buffer
/// evicts the oldest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricBuffer {
    capacity: usize,
    values: VecDeque<u8>,
}

impl HistoricBuffer {
    /// Create an empty buffer. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: u8) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Copy of the stored values, oldest first.
    pub fn to_vec(&self) -> Vec<u8> {
        self.values.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let buffer = HistoricBuffer::new(120);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 120);
        assert_eq!(buffer.to_vec(), Vec::<u8>::new());
    }

    #[test]
    fn test_keeps_push_order_below_capacity() {
        let mut buffer = HistoricBuffer::new(5);
        for value in [1, 0, 0, 1] {
            buffer.push(value);
        }
        assert_eq!(buffer.to_vec(), vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_evicts_oldest_on_overflow() {
        let mut buffer = HistoricBuffer::new(3);
        for value in [1, 0, 1, 1] {
            buffer.push(value);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.to_vec(), vec![0, 1, 1]);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buffer = HistoricBuffer::new(4);
        for i in 0..50u8 {
            buffer.push(i % 2);
            assert_eq!(buffer.len(), usize::from(i + 1).min(4));
        }
    }

    #[test]
    fn test_copy_is_independent() {
        let mut buffer = HistoricBuffer::new(2);
        buffer.push(1);
        let mut copy = buffer.to_vec();
        copy.push(0);
        assert_eq!(buffer.to_vec(), vec![1]);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut buffer = HistoricBuffer::new(0);
        buffer.push(1);
        buffer.push(0);
        assert_eq!(buffer.to_vec(), vec![0]);
    }
}
