use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Observer notified once per completed block window.
///
/// Purely observational: a missing or slow sink never changes the outcome
/// of the pipeline. Calls may arrive from worker threads.
pub trait ProgressSink: Send + Sync {
    fn advance(&self, completed: usize, total: usize);
}

impl<F: Fn(usize, usize) + Send + Sync> ProgressSink for F {
    fn advance(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Cooperative cancellation flag checked between window iterations.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn closures_are_sinks() {
        let sink = |completed: usize, total: usize| {
            assert!(completed <= total);
        };
        sink.advance(1, 4);
    }
}
