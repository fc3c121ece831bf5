use std::collections::VecDeque;

use tracing::trace;

use crate::scan_pipeline::common::error::{Result, ScanError};

/// FIFO that holds lines back until `depth` of them have accumulated, then
/// releases the oldest one per newly queued line.
///
/// The queue never holds more than `capacity` lines; when a line arrives at
/// a full queue the oldest pending line is discarded and counted.
#[derive(Debug)]
pub struct DelayBuffer<T> {
    queue: VecDeque<T>,
    depth: usize,
    capacity: usize,
    dropped: u64,
}

impl<T> DelayBuffer<T> {
    pub fn new(depth: usize, capacity: usize) -> Result<Self> {
        if depth == 0 {
            return Err(ScanError::InvalidConfig(
                "delay depth must be at least 1".to_string(),
            ));
        }
        if capacity < depth {
            return Err(ScanError::InvalidConfig(format!(
                "max buffer size {capacity} is smaller than delay depth {depth}"
            )));
        }
        Ok(Self {
            queue: VecDeque::with_capacity(capacity),
            depth,
            capacity,
            dropped: 0,
        })
    }

    /// Queues `line` and returns the line released by this push, if any.
    pub fn push(&mut self, line: T) -> Option<T> {
        self.enqueue(line);
        self.release()
    }

    /// Queues `line` without releasing anything.
    pub fn enqueue(&mut self, line: T) {
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
            self.dropped += 1;
            trace!("delay buffer full, dropped oldest line ({} total)", self.dropped);
        }
        self.queue.push_back(line);
    }

    /// Releases the oldest line if at least `depth` lines are queued.
    pub fn release(&mut self) -> Option<T> {
        if self.queue.len() >= self.depth {
            self.queue.pop_front()
        } else {
            None
        }
    }

    /// Releases every queued line, oldest first, regardless of depth.
    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, T> {
        self.queue.drain(..)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.dropped = 0;
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lines discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_all(buffer: &mut DelayBuffer<u32>, lines: impl IntoIterator<Item = u32>) -> Vec<u32> {
        lines.into_iter().filter_map(|l| buffer.push(l)).collect()
    }

    #[test]
    fn test_nothing_released_below_depth() {
        let mut buffer = DelayBuffer::new(3, 8).unwrap();
        assert!(push_all(&mut buffer, [1, 2]).is_empty());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_first_release_at_depth() {
        let mut buffer = DelayBuffer::new(3, 8).unwrap();
        assert_eq!(push_all(&mut buffer, [1, 2, 3]), vec![1]);
    }

    #[test]
    fn test_release_order_matches_push_order() {
        let mut buffer = DelayBuffer::new(3, 8).unwrap();
        let released = push_all(&mut buffer, 1..=5);
        assert_eq!(released, vec![1, 2, 3]);

        let rest: Vec<_> = buffer.drain().collect();
        assert_eq!(rest, vec![4, 5]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_before_depth_reached() {
        let mut buffer = DelayBuffer::new(10, 10).unwrap();
        push_all(&mut buffer, [7, 8, 9]);
        assert_eq!(buffer.drain().collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut buffer = DelayBuffer::new(2, 3).unwrap();
        for line in 1..=5 {
            buffer.enqueue(line);
        }
        assert_eq!(buffer.dropped(), 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.release(), Some(3));
        assert_eq!(buffer.release(), Some(4));
        assert_eq!(buffer.release(), None);
    }

    #[test]
    fn test_push_never_drops_when_capacity_covers_depth() {
        let mut buffer = DelayBuffer::new(4, 4).unwrap();
        let released = push_all(&mut buffer, 0..100);
        assert_eq!(released.len(), 97);
        assert_eq!(buffer.dropped(), 0);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(DelayBuffer::<u32>::new(0, 4).is_err());
        assert!(DelayBuffer::<u32>::new(5, 4).is_err());
    }
}
