use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::clipboard::ClipboardEvent;
use crate::error::EmissionError;
use crate::sink::Sink;

/// Cloneable handle the notification listener uses to hand events to the
/// emission worker. Sending never blocks the message loop.
#[derive(Clone)]
pub struct EventSender(mpsc::UnboundedSender<ClipboardEvent>);

impl EventSender {
    pub fn send(&self, event: ClipboardEvent) {
        if self.0.send(event).is_err() {
            tracing::warn!("emission worker is gone, dropping clipboard event");
        }
    }
}

/// Owns the worker thread that delivers events to the configured sink.
///
/// Events are delivered one at a time in arrival order, each attempt bounded
/// by `timeout`, so a slow or unreachable sink delays later deliveries but
/// can never starve change detection. Delivery results are fire-and-forget:
/// failures are logged and the queue keeps draining.
pub struct Emitter {
    tx: mpsc::UnboundedSender<ClipboardEvent>,
    shutdown_tx: oneshot::Sender<()>,
    worker: thread::JoinHandle<()>,
}

impl Emitter {
    /// Spawns the emission worker. `timeout` bounds each delivery attempt;
    /// `grace` bounds how long queued deliveries may still finish once
    /// shutdown is requested.
    pub fn spawn(sink: Sink, timeout: Duration, grace: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<ClipboardEvent>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let worker = thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .worker_threads(2)
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("failed to build emission runtime: {e}");
                    return;
                }
            };

            rt.block_on(drain(sink, rx, shutdown_rx, timeout, grace));
        });

        Self {
            tx,
            shutdown_tx,
            worker,
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender(self.tx.clone())
    }

    /// Closes the queue and waits for the worker, bounded by the grace
    /// period. Deliveries still pending when it expires are abandoned.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        drop(self.tx);
        if self.worker.join().is_err() {
            tracing::warn!("emission worker panicked during shutdown");
        }
    }
}

async fn drain(
    sink: Sink,
    mut rx: mpsc::UnboundedReceiver<ClipboardEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    timeout: Duration,
    grace: Duration,
) {
    let sink = Arc::new(sink);

    let deliver = async {
        while let Some(event) = rx.recv().await {
            deliver_one(&sink, &event, timeout).await;
        }
    };
    tokio::pin!(deliver);

    tokio::select! {
        // Queue closed and fully drained.
        _ = &mut deliver => {}
        _ = shutdown_rx => {
            // Shutdown requested: let what is already queued finish within
            // the grace period, then abandon the rest.
            if tokio::time::timeout(grace, &mut deliver).await.is_err() {
                tracing::warn!("abandoning undelivered clipboard events after grace period");
            }
        }
    }
}

async fn deliver_one(sink: &Sink, event: &ClipboardEvent, timeout: Duration) {
    match tokio::time::timeout(timeout, sink.emit(event)).await {
        Ok(Ok(())) => {
            tracing::debug!(sequence = event.sequence, "clipboard event delivered");
        }
        Ok(Err(e)) => {
            tracing::warn!(sequence = event.sequence, "clipboard event delivery failed: {e}");
        }
        Err(_) => {
            let e = EmissionError::Timeout(timeout);
            tracing::warn!(sequence = event.sequence, "clipboard event {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardPayload;

    #[test]
    fn shutdown_with_empty_queue_returns_promptly() {
        let emitter = Emitter::spawn(
            Sink::Log,
            Duration::from_millis(100),
            Duration::from_millis(500),
        );
        let started = std::time::Instant::now();
        emitter.shutdown();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn queued_events_drain_through_log_sink() {
        let emitter = Emitter::spawn(
            Sink::Log,
            Duration::from_millis(100),
            Duration::from_secs(1),
        );
        let sender = emitter.sender();
        for i in 0..20 {
            sender.send(ClipboardEvent::new(
                i,
                Some(ClipboardPayload::Text(format!("copy {i}"))),
            ));
        }
        drop(sender);
        emitter.shutdown();
    }

    #[test]
    fn sender_outliving_emitter_does_not_panic() {
        let emitter = Emitter::spawn(
            Sink::Log,
            Duration::from_millis(100),
            Duration::from_millis(100),
        );
        let sender = emitter.sender();
        emitter.shutdown();
        // Worker is gone; the send is dropped with a warning.
        sender.send(ClipboardEvent::new(1, None));
    }
}
