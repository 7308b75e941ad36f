use tokio::sync::mpsc;
use tracing::trace;

/// Sending half of the upward event channel.
///
/// Cheap to clone; marker click handlers each hold one. Emitting after the
/// host dropped its [`EventStream`] is not an error, the event is discarded.
#[derive(Debug)]
pub struct EventBus<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Receiving half, owned by the host UI.
#[derive(Debug)]
pub struct EventStream<E> {
    rx: mpsc::UnboundedReceiver<E>,
}

impl<E> EventBus<E> {
    pub fn channel() -> (EventBus<E>, EventStream<E>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventBus { tx }, EventStream { rx })
    }

    /// Returns `false` if no one is listening anymore.
    pub fn emit(&self, event: E) -> bool {
        if self.tx.send(event).is_err() {
            trace!("event dropped: no subscriber");
            return false;
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<E> EventStream<E> {
    pub async fn recv(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Takes every event that is already queued.
    pub fn drain(&mut self) -> Vec<E> {
        let mut out = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            out.push(event);
        }
        out
    }
}
