use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

pub(crate) fn shutdown_signal() -> (ReplicaShutdownHandle, ReplicaShutdownSignal) {
    let (tx, rx) = oneshot::channel();

    (ReplicaShutdownHandle { tx }, ReplicaShutdownSignal { rx })
}

/// Shuts the replica down when triggered or dropped.
pub(crate) struct ReplicaShutdownHandle {
    tx: oneshot::Sender<()>,
}

pub(crate) struct ReplicaShutdownSignal {
    rx: oneshot::Receiver<()>,
}

impl ReplicaShutdownHandle {
    pub(crate) fn trigger(self) {
        // Replica task already gone, nothing to stop.
        let _ = self.tx.send(());
    }
}

impl Future for ReplicaShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let rx = Pin::new(&mut self.rx);

        match rx.poll(cx) {
            Poll::Pending => Poll::Pending,
            // We don't care if oneshot Sender sent value or dropped
            Poll::Ready(_) => Poll::Ready(()),
        }
    }
}
