//! A fixed-capacity stack of loop-start offsets.

/// Errors raised by [`LoopStack`] when its bounds are violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// A push was attempted while the stack already held `capacity` entries.
    #[error("loop stack overflow (capacity {capacity})")]
    Overflow { capacity: usize },

    /// A pop was attempted on an empty stack.
    #[error("loop stack underflow")]
    Underflow,
}

/// Bounded stack recording the stream offsets of currently open loops.
///
/// The capacity is fixed when the stack is created and never grows.
#[derive(Debug, Clone)]
pub struct LoopStack {
    entries: Vec<usize>,
    capacity: usize,
}

impl LoopStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, offset: usize) -> Result<(), StackError> {
        if self.is_full() {
            return Err(StackError::Overflow { capacity: self.capacity });
        }
        self.entries.push(offset);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<usize, StackError> {
        self.entries.pop().ok_or(StackError::Underflow)
    }

    /// The most recently pushed offset, if any.
    pub fn peek(&self) -> Option<usize> {
        self.entries.last().copied()
    }

    /// The oldest offset still on the stack, i.e. the outermost open loop.
    pub fn bottom(&self) -> Option<usize> {
        self.entries.first().copied()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_until_full_then_overflow() {
        let mut stack = LoopStack::with_capacity(2);
        assert!(stack.push(1).is_ok());
        assert!(stack.push(5).is_ok());
        assert!(stack.is_full());
        assert_eq!(stack.push(9), Err(StackError::Overflow { capacity: 2 }));
        // A rejected push leaves the contents alone.
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.peek(), Some(5));
    }

    #[test]
    fn pop_is_lifo() {
        let mut stack = LoopStack::with_capacity(4);
        stack.push(3).unwrap();
        stack.push(7).unwrap();
        assert_eq!(stack.bottom(), Some(3));
        assert_eq!(stack.pop(), Ok(7));
        assert_eq!(stack.pop(), Ok(3));
        assert_eq!(stack.bottom(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_empty_underflows() {
        let mut stack = LoopStack::with_capacity(1);
        assert_eq!(stack.pop(), Err(StackError::Underflow));
    }

    #[test]
    fn zero_capacity_is_always_full() {
        let mut stack = LoopStack::with_capacity(0);
        assert!(stack.is_full());
        assert!(stack.is_empty());
        assert!(stack.push(0).is_err());
    }
}
