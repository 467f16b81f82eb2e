use std::future::Future;
use std::sync::{atomic::{AtomicUsize, Ordering}, Arc};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::warn;
use crate::telemetry::METRICS;

/// Submits fire-and-forget work onto a tokio runtime.
///
/// Nobody awaits a submitted task: a failure is logged at `warn` and dropped. The
/// in-flight count exists so shutdown (and tests) can wait for outstanding work.
#[derive(Clone, Debug)]
pub struct TaskSpawner {
    handle: Handle,
    in_flight: Arc<AtomicUsize>,
}

struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        METRICS.background_tasks.inc();
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
        METRICS.background_tasks.dec();
    }
}

impl TaskSpawner {
    pub fn new(handle: Handle) -> Self { Self { handle, in_flight: Arc::new(AtomicUsize::new(0)) } }

    /// Binds to the runtime the caller is running on.
    pub fn current() -> anyhow::Result<Self> { Ok(Self::new(Handle::try_current()?)) }

    pub fn spawn<F>(&self, task: &'static str, fut: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let guard = InFlight::enter(&self.in_flight);
        self.handle.spawn(async move {
            let _guard = guard;
            if let Err(e) = fut.await { warn!(task, error = %e, "background task failed"); }
        });
    }

    pub fn in_flight(&self) -> usize { self.in_flight.load(Ordering::SeqCst) }

    /// Polls until no task is running or `timeout` passes. Returns whether it went idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight() > 0 {
            if Instant::now() >= deadline { return false; }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        true
    }
}
