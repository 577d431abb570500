//! Testability ports for injecting randomness.

#[cfg_attr(test, mockall::automock)]
pub trait RandomPort: Send + Sync {
    /// Returns an index in `0..len`. Callers never pass zero.
    fn pick_index(&self, len: usize) -> usize;
}
