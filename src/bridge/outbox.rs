use tokio::{io::AsyncWrite, sync::mpsc};

use crate::infrastructure::shutdown::ShutdownListener;

use super::{codec::write_frame, protocol::BrowserCommand};

/// Capability to act on the browser: redirect or navigate tabs, inject
/// banners, raise notifications and answer UI requests.
pub trait Browser: Send + Sync {
    fn dispatch(&self, command: BrowserCommand);
}

/// `Browser` backed by the native messaging writer task.
#[derive(Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<BrowserCommand>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BrowserCommand>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Browser for Outbox {
    fn dispatch(&self, command: BrowserCommand) {
        if let Err(err) = self.sender.send(command) {
            tracing::warn!(
                target: "bridge",
                command = ?err.0,
                "writer is gone; dropping browser command"
            );
        }
    }
}

/// Drains queued commands onto `writer` until every `Outbox` is dropped or
/// shutdown is requested. Commands already queued at shutdown are still
/// written.
pub async fn run_writer<W>(
    mut receiver: mpsc::UnboundedReceiver<BrowserCommand>,
    mut writer: W,
    mut shutdown: ShutdownListener,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let command = tokio::select! {
            command = receiver.recv() => command,
            _ = shutdown.notified() => {
                receiver.close();
                receiver.recv().await
            }
        };
        let Some(command) = command else {
            break;
        };
        if let Err(err) = write_frame(&mut writer, &command).await {
            tracing::error!(target: "bridge", error = %err, "failed to write frame");
            if matches!(err, super::codec::FrameError::Io(_)) {
                break;
            }
        }
    }
    tracing::debug!(target: "bridge", "writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bridge::codec::read_frame,
        domain::TabId,
        infrastructure::shutdown::{Shutdown, ShutdownReason},
    };

    #[tokio::test]
    async fn writes_dispatched_commands_in_order() {
        let (outbox, receiver) = Outbox::channel();
        let (shutdown, listener) = Shutdown::new();

        outbox.dispatch(BrowserCommand::GoBack { tab_id: TabId(1) });
        outbox.dispatch(BrowserCommand::Navigate {
            tab_id: TabId(1),
            url: "http://example.com/".into(),
        });
        drop(outbox);

        let mut sink = Vec::new();
        run_writer(receiver, &mut sink, listener).await;
        drop(shutdown);

        let mut reader = sink.as_slice();
        let first = read_frame(&mut reader, 1024).await.unwrap().unwrap();
        let second = read_frame(&mut reader, 1024).await.unwrap().unwrap();
        assert_eq!(first, br#"{"type":"goBack","tabId":1}"#);
        let second: serde_json::Value = serde_json::from_slice(&second).unwrap();
        assert_eq!(second["type"], "navigate");
    }

    #[tokio::test]
    async fn flushes_queue_on_shutdown() {
        let (outbox, receiver) = Outbox::channel();
        let (shutdown, listener) = Shutdown::new();
        outbox.dispatch(BrowserCommand::GoBack { tab_id: TabId(5) });
        shutdown.trigger(ShutdownReason::Signal);

        let mut sink = Vec::new();
        run_writer(receiver, &mut sink, listener).await;
        assert!(!sink.is_empty());
    }
}
