//! Test lifecycle observers and the fan-out that notifies them.

use crate::test_case::TestCase;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result returned by listener callbacks.
pub type ListenerResult = std::result::Result<(), Box<dyn Error + Send + Sync>>;

/// Observer of test lifecycle transitions.
///
/// Every callback defaults to a no-op. Listeners are shared across the
/// threads executing tests, so implementations must be `Send + Sync`.
pub trait TestListener: Send + Sync {
    /// A test is about to run.
    fn on_test_start(&self, _test: &dyn TestCase) -> ListenerResult {
        Ok(())
    }

    /// A test completed successfully.
    fn on_test_success(&self, _test: &dyn TestCase) -> ListenerResult {
        Ok(())
    }

    /// A test failed; `cause` is the original error.
    fn on_test_failure(&self, _test: &dyn TestCase, _cause: &dyn Error) -> ListenerResult {
        Ok(())
    }

    /// A test was skipped without running.
    fn on_test_skipped(&self, _test: &dyn TestCase) -> ListenerResult {
        Ok(())
    }

    /// A started test is done, whatever its outcome.
    fn on_test_finish(&self, _test: &dyn TestCase) -> ListenerResult {
        Ok(())
    }
}

/// Ordered set of listeners notified in registration order.
///
/// A failing or panicking listener is logged and skipped; the remaining
/// listeners are still notified and nothing propagates to the caller.
#[derive(Default, Clone)]
pub struct TestListeners {
    listeners: Vec<Arc<dyn TestListener>>,
}

impl TestListeners {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn register(&mut self, listener: impl TestListener + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    /// Registers a listener the caller keeps a handle to.
    pub fn register_shared(&mut self, listener: Arc<dyn TestListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// True if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Notifies `on_test_start`.
    pub fn on_test_start(&self, test: &dyn TestCase) {
        self.notify("on_test_start", test, |l| l.on_test_start(test));
    }

    /// Notifies `on_test_success`.
    pub fn on_test_success(&self, test: &dyn TestCase) {
        self.notify("on_test_success", test, |l| l.on_test_success(test));
    }

    /// Notifies `on_test_failure`.
    pub fn on_test_failure(&self, test: &dyn TestCase, cause: &dyn Error) {
        self.notify("on_test_failure", test, |l| l.on_test_failure(test, cause));
    }

    /// Notifies `on_test_skipped`.
    pub fn on_test_skipped(&self, test: &dyn TestCase) {
        self.notify("on_test_skipped", test, |l| l.on_test_skipped(test));
    }

    /// Notifies `on_test_finish`.
    pub fn on_test_finish(&self, test: &dyn TestCase) {
        self.notify("on_test_finish", test, |l| l.on_test_finish(test));
    }

    fn notify<F>(&self, event: &str, test: &dyn TestCase, callback: F)
    where
        F: Fn(&dyn TestListener) -> ListenerResult,
    {
        for (index, listener) in self.listeners.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(listener.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    listener = index,
                    event,
                    test = %test.qualified_name(),
                    "test listener failed: {}",
                    e
                ),
                Err(payload) => error!(
                    listener = index,
                    event,
                    test = %test.qualified_name(),
                    "test listener panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }
    }
}

/// Extracts the text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Listener that reports every transition through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl TestListener for LoggingListener {
    fn on_test_start(&self, test: &dyn TestCase) -> ListenerResult {
        info!(test = %test.qualified_name(), "test started");
        Ok(())
    }

    fn on_test_success(&self, test: &dyn TestCase) -> ListenerResult {
        info!(
            test = %test.qualified_name(),
            parameters = ?test.parameters(),
            "test succeeded"
        );
        Ok(())
    }

    fn on_test_failure(&self, test: &dyn TestCase, cause: &dyn Error) -> ListenerResult {
        error!(test = %test.qualified_name(), "test failed: {}", cause);
        Ok(())
    }

    fn on_test_skipped(&self, test: &dyn TestCase) -> ListenerResult {
        info!(test = %test.qualified_name(), "test skipped");
        Ok(())
    }

    fn on_test_finish(&self, test: &dyn TestCase) -> ListenerResult {
        info!(test = %test.qualified_name(), "test finished");
        Ok(())
    }
}
