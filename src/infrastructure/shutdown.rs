use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal,
    /// The browser closed stdin: the extension disconnected or the browser exited.
    BrowserDisconnected,
    StreamCorrupted,
}

#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<Option<ShutdownReason>>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<Option<ShutdownReason>>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, ShutdownListener { receiver })
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// First reason wins; later triggers are ignored.
    pub fn trigger(&self, reason: ShutdownReason) {
        self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            tracing::info!(target: "lifecycle", ?reason, "shutdown requested");
            *current = Some(reason);
            true
        });
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.sender.borrow()
    }
}

impl ShutdownListener {
    pub async fn notified(&mut self) {
        if self.receiver.borrow().is_some() {
            return;
        }
        let _ = self.receiver.wait_for(Option::is_some).await;
    }

    #[cfg(test)]
    pub fn is_triggered(&self) -> bool {
        self.receiver.borrow().is_some()
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc.trigger(ShutdownReason::Signal);
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let term = shutdown.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                term.trigger(ShutdownReason::Signal);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_reason_is_kept() {
        let (shutdown, mut listener) = Shutdown::new();
        assert!(!listener.is_triggered());

        shutdown.trigger(ShutdownReason::BrowserDisconnected);
        shutdown.trigger(ShutdownReason::Signal);

        listener.notified().await;
        assert!(listener.is_triggered());
        assert_eq!(shutdown.reason(), Some(ShutdownReason::BrowserDisconnected));
    }
}
