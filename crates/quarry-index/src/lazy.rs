use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// A value computed on first request and then shared.
///
/// The builder runs at most once. Callers that arrive while the build is in progress block
/// until it finishes and then receive the same `Arc`; once built, reads are a single atomic
/// load. If the builder panics the slot stays empty and a later caller builds again.
pub struct LazyIndex<T> {
    name: &'static str,
    cell: OnceLock<Arc<T>>,
}

impl<T> LazyIndex<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get_or_build(&self, build: impl FnOnce() -> T) -> Arc<T> {
        let value = self.cell.get_or_init(|| {
            let started = Instant::now();
            let value = build();
            tracing::debug!(
                target = "quarry.index",
                index = self.name,
                elapsed_us = started.elapsed().as_micros() as u64,
                "built derived index"
            );
            Arc::new(value)
        });
        Arc::clone(value)
    }

    /// The value if it has already been built. Never builds.
    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }

    pub fn is_built(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> fmt::Debug for LazyIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyIndex")
            .field("name", &self.name)
            .field("built", &self.is_built())
            .finish()
    }
}
