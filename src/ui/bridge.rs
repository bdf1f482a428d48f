// EventLoopBridge - Coordinates between the tokio runtime and the Slint event loop
//
// Slint owns the main thread and is single-threaded; service calls run on a
// multi-threaded tokio runtime. The bridge lets callbacks spawn tokio tasks and
// lets any thread queue closures that run against the window on the event loop.

use crate::services::{SavePayload, SaveStatus, SaveTarget};
use anyhow::Context;
use slint::ComponentHandle;
use std::future::Future;
use std::sync::Arc;
use std::thread::ThreadId;
use tokio::sync::mpsc;

/// A closure to run against the window on the event loop thread
type UiUpdate<T> = Box<dyn FnOnce(&T) + Send>;

/// Updates waiting for the event loop; bounded so a stalled window cannot grow memory without limit
const UI_UPDATE_CAPACITY: usize = 100;

/// Queue `update` without blocking. Returns whether it was accepted.
fn queue_update<U>(tx: &mpsc::Sender<U>, update: U) -> bool {
    match tx.try_send(update) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!("UI update channel full - dropping update");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::warn!("Failed to send UI update - handler thread has stopped");
            false
        }
    }
}

/// Owner of the bridge's forwarding thread
///
/// Keep it alive as long as the window; hand [`EventLoopBridgeHandle`]s to callbacks.
///
/// # Example
/// ```ignore
/// let bridge = EventLoopBridge::new(&ui, runtime.handle().clone());
/// let handle = bridge.clone_handle();
///
/// ui.on_submit(move || {
///     let ui_handle = handle.clone();
///     handle.spawn_async(move || async move {
///         let outcome = orchestrator.submit().await;
///         ui_handle.update_ui(move |ui| ui.set_status_text(format!("{:?}", outcome).into()));
///     });
/// });
/// ```
pub struct EventLoopBridge<T: ComponentHandle> {
    handle: EventLoopBridgeHandle<T>,
}

impl<T: ComponentHandle + 'static> EventLoopBridge<T> {
    /// Create the bridge and start the thread that forwards queued updates
    /// to the event loop with `upgrade_in_event_loop`.
    pub fn new(ui: &T, tokio_handle: tokio::runtime::Handle) -> Self {
        let ui_weak = ui.as_weak();
        let (ui_update_tx, mut ui_update_rx) = mpsc::channel::<UiUpdate<T>>(UI_UPDATE_CAPACITY);

        std::thread::spawn(move || {
            tracing::debug!("EventLoopBridge handler thread started");

            while let Some(update_fn) = ui_update_rx.blocking_recv() {
                let result = ui_weak.upgrade_in_event_loop(move |ui| {
                    update_fn(&ui);
                });

                // The event loop has stopped; nothing left to update
                if let Err(e) = result {
                    tracing::warn!("Failed to queue UI update to event loop: {:?}", e);
                    break;
                }
            }

            tracing::debug!("EventLoopBridge handler thread terminated");
        });

        Self {
            handle: EventLoopBridgeHandle {
                tokio_handle,
                ui_update_tx,
            },
        }
    }

    /// Cloneable handle for capturing in callbacks and worker threads
    pub fn clone_handle(&self) -> EventLoopBridgeHandle<T> {
        self.handle.clone()
    }
}

/// Lightweight, cloneable side of the bridge
pub struct EventLoopBridgeHandle<T: ComponentHandle> {
    tokio_handle: tokio::runtime::Handle,
    ui_update_tx: mpsc::Sender<UiUpdate<T>>,
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T: ComponentHandle> Clone for EventLoopBridgeHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tokio_handle: self.tokio_handle.clone(),
            ui_update_tx: self.ui_update_tx.clone(),
        }
    }
}

impl<T: ComponentHandle + 'static> EventLoopBridgeHandle<T> {
    /// Queue `update` to run on the event loop thread; dropped with a warning when the queue is full
    pub fn update_ui<F>(&self, update: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        queue_update(&self.ui_update_tx, Box::new(update) as UiUpdate<T>);
    }

    pub fn spawn_async<F, Fut>(&self, future_factory: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tokio_handle.spawn(async move {
            future_factory().await;
        });
    }
}

/// Runs another save target on the event loop thread
///
/// Native save dialogs must be opened from the thread that owns the event
/// loop on macOS. Calls made on that thread go straight through; calls from
/// tokio workers are posted to the event loop and wait for the answer.
pub struct EventLoopSaveTarget {
    inner: Arc<dyn SaveTarget>,
    event_loop_thread: ThreadId,
}

impl EventLoopSaveTarget {
    /// Wrap `inner`. Call this on the thread that will run the event loop.
    pub fn new(inner: Arc<dyn SaveTarget>) -> Self {
        Self {
            inner,
            event_loop_thread: std::thread::current().id(),
        }
    }

    fn on_event_loop_thread(&self) -> bool {
        std::thread::current().id() == self.event_loop_thread
    }
}

impl SaveTarget for EventLoopSaveTarget {
    fn trigger_save(&self, payload: &SavePayload) -> anyhow::Result<SaveStatus> {
        if self.on_event_loop_thread() {
            return self.inner.trigger_save(payload);
        }

        let inner = Arc::clone(&self.inner);
        let payload = payload.clone();
        // std channel: the caller may be inside the tokio runtime, where blocking_recv panics
        let (tx, rx) = std::sync::mpsc::sync_channel(1);

        slint::invoke_from_event_loop(move || {
            let _ = tx.send(inner.trigger_save(&payload));
        })
        .context("Failed to hand the save to the event loop")?;

        rx.recv()
            .context("Event loop stopped before the save finished")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A real window needs a display, so these exercise the queue on its own

    type Job = dyn FnOnce(&mut Vec<u32>) + Send;

    #[test]
    fn test_queue_update_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel::<Box<Job>>(4);

        assert!(queue_update(&tx, Box::new(|v: &mut Vec<u32>| v.push(1)) as Box<Job>));
        assert!(queue_update(&tx, Box::new(|v: &mut Vec<u32>| v.push(2)) as Box<Job>));

        let mut seen = Vec::new();
        while let Ok(job) = rx.try_recv() {
            job(&mut seen);
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_queue_update_drops_when_full() {
        let (tx, _rx) = mpsc::channel::<Box<Job>>(1);

        assert!(queue_update(&tx, Box::new(|v: &mut Vec<u32>| v.push(1)) as Box<Job>));
        assert!(!queue_update(&tx, Box::new(|v: &mut Vec<u32>| v.push(2)) as Box<Job>));
    }

    #[test]
    fn test_queue_update_after_receiver_gone() {
        let (tx, rx) = mpsc::channel::<Box<Job>>(1);
        drop(rx);

        assert!(!queue_update(&tx, Box::new(|v: &mut Vec<u32>| v.push(1)) as Box<Job>));
    }

    #[test]
    fn test_save_on_event_loop_thread_runs_inline() {
        let mut inner = crate::services::save::MockSaveTarget::new();
        inner
            .expect_trigger_save()
            .withf(|p| p.filename == "Sheet1.tex")
            .times(1)
            .returning(|_| Ok(SaveStatus::Cancelled));

        let target = EventLoopSaveTarget::new(Arc::new(inner));

        let status = target
            .trigger_save(&SavePayload::text("Sheet1.tex", "\\begin{table}"))
            .unwrap();
        assert_eq!(status, SaveStatus::Cancelled);
    }

    #[test]
    fn test_event_loop_thread_is_the_creating_thread() {
        let inner = crate::services::DirectorySaveTarget::new("out");
        let target = EventLoopSaveTarget::new(Arc::new(inner));
        assert!(target.on_event_loop_thread());

        let target = Arc::new(target);
        let elsewhere = Arc::clone(&target);
        let on_worker = std::thread::spawn(move || elsewhere.on_event_loop_thread())
            .join()
            .unwrap();
        assert!(!on_worker);
    }

    #[test]
    fn test_save_from_worker_without_event_loop_fails() {
        let mut inner = crate::services::save::MockSaveTarget::new();
        inner.expect_trigger_save().never();
        let target = Arc::new(EventLoopSaveTarget::new(Arc::new(inner)));

        let worker = Arc::clone(&target);
        let result = std::thread::spawn(move || {
            worker.trigger_save(&SavePayload::archive(vec![0x50, 0x4b]))
        })
        .join()
        .unwrap();

        assert!(result.is_err());
    }
}
