use anyhow::Error as AnyError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Captures the first unrecoverable error of a run and cancels the run so the
/// remaining workers wind down at their next suspension point.
#[derive(Clone)]
pub struct FatalErrorHandler {
    inner: Arc<FatalInner>,
}

struct FatalInner {
    triggered: AtomicBool,
    root_shutdown: CancellationToken,
    run_shutdown: CancellationToken,
    captured_error: Mutex<Option<CapturedFatalError>>,
}

#[derive(Clone)]
struct CapturedFatalError {
    inner: Arc<AnyError>,
}

impl fmt::Debug for CapturedFatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapturedFatalError")
            .field(&self.inner)
            .finish()
    }
}

impl fmt::Display for CapturedFatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner.as_ref(), f)
    }
}

impl std::error::Error for CapturedFatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        // skip the outermost layer, which Display already renders
        self.inner.source()
    }
}

impl FatalErrorHandler {
    pub fn new(root_shutdown: CancellationToken, run_shutdown: CancellationToken) -> Self {
        Self {
            inner: Arc::new(FatalInner {
                triggered: AtomicBool::new(false),
                root_shutdown,
                run_shutdown,
                captured_error: Mutex::new(None),
            }),
        }
    }

    /// Records `error` if it is the first one and cancels both tokens.
    ///
    /// Later errors are only logged at debug level.
    pub fn trigger(&self, context: &str, error: AnyError) {
        if self.inner.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!(context, error = %error, "additional fatal error after shutdown began");
            return;
        }

        tracing::error!(
            context,
            error = %error,
            "fatal transfer error; initiating shutdown"
        );

        {
            let mut slot = self.lock_slot();
            if slot.is_none() {
                *slot = Some(CapturedFatalError {
                    inner: Arc::new(error),
                });
            }
        }

        self.inner.run_shutdown.cancel();
        self.inner.root_shutdown.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<AnyError> {
        self.lock_slot()
            .as_ref()
            .map(|error| AnyError::new(error.clone()))
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<CapturedFatalError>> {
        self.inner
            .captured_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
