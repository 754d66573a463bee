//! Scoped background tasks.
//!
//! A [`ScopedTask`] owns a spawned tokio task and cancels it when dropped,
//! so a polling loop can never outlive the value that started it. Tasks are
//! spawned on an explicit runtime [`Handle`], so starting one does not
//! require the caller to be inside the runtime.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

/// Cancellation flag handed to the task body.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Whether the owning [`ScopedTask`] has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A spawned task that is cancelled on drop.
#[derive(Debug)]
pub struct ScopedTask {
    name: &'static str,
    flag: CancelFlag,
    handle: Option<JoinHandle<()>>,
}

impl ScopedTask {
    /// Spawn `body` on `runtime`.
    pub fn spawn<F, Fut>(name: &'static str, runtime: &Handle, body: F) -> Self
    where
        F: FnOnce(CancelFlag) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let flag = CancelFlag::default();
        let handle = runtime.spawn(body(flag.clone()));
        trace!("Spawned task {}", name);

        Self {
            name,
            flag,
            handle: Some(handle),
        }
    }

    /// Cancel the task. Safe to call any number of times.
    ///
    /// The flag is raised before the abort, so a body that checks
    /// [`CancelFlag::is_cancelled`] after every await never acts again.
    pub fn cancel(&self) {
        if !self.flag.is_cancelled() {
            trace!("Cancelling task {}", self.name);
        }
        self.flag.set();
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    /// Raise the flag without aborting and let the task run to its end.
    ///
    /// Used when the task itself is the caller, where an abort would
    /// interrupt the remainder of its own teardown.
    pub fn release(mut self) {
        self.flag.set();
        // Dropping the JoinHandle detaches the task.
        self.handle.take();
    }

    /// Whether [`cancel`](Self::cancel) or [`release`](Self::release) ran.
    pub fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }

    /// Whether the task body has returned or was aborted.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_further_iterations() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let task = ScopedTask::spawn("ticker", &Handle::current(), move |flag| async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if flag.is_cancelled() {
                    break;
                }
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        task.cancel();
        task.cancel();
        let seen = ticks.load(Ordering::SeqCst);
        assert_eq!(seen, 3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
        assert!(task.is_cancelled());
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        let task = ScopedTask::spawn("ticker", &Handle::current(), move |_| async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(task);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_lets_body_finish() {
        let done = Arc::new(AtomicBool::new(false));
        let finished = done.clone();

        let task = ScopedTask::spawn("finisher", &Handle::current(), move |flag| async move {
            while !flag.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            finished.store(true, Ordering::SeqCst);
        });

        task.release();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_spawn_from_outside_the_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime");
        let ran = Arc::new(AtomicBool::new(false));
        let flag_ran = ran.clone();

        let task = ScopedTask::spawn("outside", runtime.handle(), move |_| async move {
            flag_ran.store(true, Ordering::SeqCst);
        });

        runtime.block_on(async { tokio::time::sleep(Duration::from_millis(10)).await });
        assert!(ran.load(Ordering::SeqCst));
        assert!(task.is_finished());
    }
}
