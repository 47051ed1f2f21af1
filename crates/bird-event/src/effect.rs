#![forbid(unsafe_code)]

//! Deferred actions.

use std::rc::Rc;

/// A configured side effect that has not run yet.
///
/// Every adapter takes its configuration eagerly and returns an `Effect`;
/// calling [`Effect::run`] performs the registration (or playback) and
/// completes with unit. An effect may be run any number of times and each run
/// performs the side effect again with fresh private state.
#[derive(Clone)]
pub struct Effect {
    run: Rc<dyn Fn()>,
}

impl Effect {
    #[must_use]
    pub fn new(run: impl Fn() + 'static) -> Self {
        Self { run: Rc::new(run) }
    }

    /// An effect that does nothing when run.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn run(&self) {
        (self.run)();
    }
}

impl core::fmt::Debug for Effect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Effect(..)")
    }
}
