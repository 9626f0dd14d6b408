use log::trace;
use parking_lot::Mutex;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
    time::Instant,
};
use vista_utils::{Pool, PoolHandle};

/// Handle of a tracked [`Process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(PoolHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessKind {
    AssetLoad,
}

/// An asynchronous operation owned by a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub kind: ProcessKind,
    /// What the process works on, the URI for asset loads.
    pub description: String,
    /// Number of the frame that started the process.
    pub started_frame: u64,
    pub started_at: Instant,
}

impl Process {
    pub fn asset_load(uri: &str, frame: u64) -> Self {
        Self {
            kind: ProcessKind::AssetLoad,
            description: uri.to_string(),
            started_frame: frame,
            started_at: Instant::now(),
        }
    }
}

type IdleCallback = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct TrackerState {
    processes: Pool<Process>,
    wakers: Vec<Waker>,
    callbacks: Vec<IdleCallback>,
    closed: bool,
}

/// Registry of in-flight asynchronous operations.
///
/// Besides counting, the tracker provides the completion signal: the [`Idle`] future and
/// [`ProcessTracker::on_idle`] callbacks fire whenever the count drops to zero. Cloned trackers
/// share their state.
#[derive(Clone, Default)]
pub struct ProcessTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, process: Process) -> ProcessId {
        let mut state = self.state.lock();
        trace!("New {:?} process for `{}`", process.kind, process.description);
        ProcessId(state.processes.allocate(process))
    }

    /// Removes a process. Returns [`None`] if it was already gone.
    pub fn retire(&self, id: ProcessId) -> Option<Process> {
        let mut state = self.state.lock();
        let process = state.processes.try_deallocate(id.0)?;
        trace!("Retired process for `{}`", process.description);

        if state.processes.is_empty() {
            self.notify_idle(state);
        }
        Some(process)
    }

    pub fn count(&self) -> usize {
        self.state.lock().processes.len()
    }

    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }

    /// Snapshot of all live processes.
    pub fn list(&self) -> Vec<(ProcessId, Process)> {
        self.state
            .lock()
            .processes
            .iter()
            .map(|(handle, process)| (ProcessId(handle), process.clone()))
            .collect()
    }

    /// Returns a future resolving once no processes are left, or the tracker is closed.
    pub fn idle(&self) -> Idle {
        Idle {
            state: self.state.clone(),
        }
    }

    /// Registers a callback, invoked every time the process count drops to zero.
    ///
    /// Callbacks run on the thread that retired the last process, with no locks held, so they
    /// may query the tracker.
    pub fn on_idle(&self, callback: impl FnMut() + Send + 'static) {
        self.state.lock().callbacks.push(Box::new(callback));
    }

    /// Drops every process and resolves all pending [`Idle`] futures. Futures created afterwards
    /// resolve immediately.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        if state.processes.is_empty() {
            state.wakers.drain(..).for_each(Waker::wake);
            return;
        }

        trace!("Dropping {} processes", state.processes.len());
        state.processes.clear();
        self.notify_idle(state);
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn notify_idle(&self, mut state: parking_lot::MutexGuard<TrackerState>) {
        let wakers = std::mem::take(&mut state.wakers);
        let mut callbacks = std::mem::take(&mut state.callbacks);
        drop(state);

        wakers.into_iter().for_each(Waker::wake);
        for callback in &mut callbacks {
            callback();
        }

        // Keep callbacks registered by the callbacks themselves
        let mut state = self.state.lock();
        callbacks.append(&mut state.callbacks);
        state.callbacks = callbacks;
    }
}

/// Future resolving once its [`ProcessTracker`] has no processes left.
///
/// ```
/// use vista::scene::{Process, ProcessTracker};
///
/// let tracker = ProcessTracker::new();
/// let id = tracker.create(Process::asset_load("teapot.js", 1));
///
/// let waiter = std::thread::spawn({
///     let idle = tracker.idle();
///     move || pollster::block_on(idle)
/// });
///
/// tracker.retire(id);
/// waiter.join().unwrap();
/// assert!(tracker.is_idle());
/// ```
#[must_use = "futures do nothing unless polled"]
pub struct Idle {
    state: Arc<Mutex<TrackerState>>,
}

impl Future for Idle {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.lock();
        if state.closed || state.processes.is_empty() {
            return Poll::Ready(());
        }

        if !state.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn counts_processes() {
        let tracker = ProcessTracker::new();
        assert!(tracker.is_idle());

        let a = tracker.create(Process::asset_load("a", 1));
        let b = tracker.create(Process::asset_load("b", 1));
        assert_eq!(tracker.count(), 2);
        assert_eq!(tracker.list()[0].1.description, "a");

        assert!(tracker.retire(a).is_some());
        assert!(tracker.retire(a).is_none());
        assert_eq!(tracker.count(), 1);

        let listed = tracker.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, b);
    }

    #[test]
    fn callbacks_fire_on_every_transition_to_zero() {
        let tracker = ProcessTracker::new();
        let fired = Arc::new(AtomicUsize::new(0));

        tracker.on_idle({
            let fired = fired.clone();
            let tracker = tracker.clone();
            move || {
                assert_eq!(tracker.count(), 0);
                fired.fetch_add(1, Ordering::SeqCst);
            }
        });

        let a = tracker.create(Process::asset_load("a", 1));
        let b = tracker.create(Process::asset_load("b", 1));
        tracker.retire(a);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tracker.retire(b);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let c = tracker.create(Process::asset_load("c", 2));
        tracker.retire(c);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn idle_future() {
        let tracker = ProcessTracker::new();
        pollster::block_on(tracker.idle());

        tracker.create(Process::asset_load("a", 1));
        let waiter = std::thread::spawn({
            let idle = tracker.idle();
            move || pollster::block_on(idle)
        });

        tracker.close();
        waiter.join().unwrap();
        assert!(tracker.is_idle());
        assert!(tracker.is_closed());
        pollster::block_on(tracker.idle());
    }
}
