use std::{sync::Arc, time::Duration};

use anyhow::Result;
use reqwest::Client;
use tokio::{
    io::{AsyncRead, BufReader},
    task::JoinHandle,
};

use crate::{
    bridge::{read_frame, run_writer, BrowserEvent, FrameError, Outbox},
    classifier::HttpClassifier,
    config::AppConfig,
    controller::Controller,
    infrastructure::shutdown::{Shutdown, ShutdownReason},
    navigation::NavigationContext,
    report::ReportClient,
};

pub struct PhishGateApp {
    controller: Controller,
    writer_handle: JoinHandle<()>,
    shutdown: Shutdown,
    config: Arc<AppConfig>,
}

impl PhishGateApp {
    pub async fn initialize(config: AppConfig, shutdown: Shutdown) -> Result<Self> {
        let config = Arc::new(config);

        let http_client = Client::builder()
            .user_agent(format!("phish-gate/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let classifier = Arc::new(HttpClassifier::new(
            http_client.clone(),
            config.backend.clone(),
        )?);
        let reports = Arc::new(ReportClient::new(http_client, &config.backend)?);

        match classifier.health().await {
            Ok(health) => tracing::info!(
                target: "classifier",
                status = %health.status,
                model_loaded = ?health.model_loaded,
                "classification service reachable"
            ),
            Err(err) => tracing::warn!(
                target: "classifier",
                error = %err,
                "classification service unavailable; navigations will fail open"
            ),
        }

        let (outbox, commands) = Outbox::channel();
        let writer_handle = tokio::spawn(run_writer(
            commands,
            tokio::io::stdout(),
            shutdown.subscribe(),
        ));

        let ctx = Arc::new(NavigationContext::new(
            config.policy,
            classifier,
            Arc::new(outbox),
            config.surface.warning_page.clone(),
        ));
        let controller = Controller::new(ctx, reports);

        Ok(Self {
            controller,
            writer_handle,
            shutdown,
            config,
        })
    }

    pub async fn run(self) -> Result<()> {
        let PhishGateApp {
            controller,
            mut writer_handle,
            shutdown,
            config,
        } = self;

        tracing::info!(
            target: "lifecycle",
            classifier = %config.backend.base_url,
            threshold = config.policy.confidence_threshold,
            "phish-gate host started"
        );

        let mut shutdown_listener = shutdown.subscribe();
        let reason = {
            let stdin = BufReader::new(tokio::io::stdin());
            let read_loop = read_events(stdin, config.bridge.max_inbound_frame, &controller);
            tokio::pin!(read_loop);
            tokio::select! {
                _ = shutdown_listener.notified() => None,
                reason = &mut read_loop => Some(reason),
            }
        };
        if let Some(reason) = reason {
            shutdown.trigger(reason);
        }
        tracing::info!(target: "lifecycle", reason = ?shutdown.reason(), "shutting down");

        // the writer exits once the last outbox is dropped
        drop(controller);

        let shutdown_timeout = Duration::from_secs(5);
        let writer_sleep = tokio::time::sleep(shutdown_timeout);
        tokio::pin!(writer_sleep);
        tokio::select! {
            res = &mut writer_handle => {
                if let Err(err) = res {
                    if err.is_panic() {
                        tracing::error!(target: "bridge", "writer task panicked");
                    }
                }
            }
            _ = &mut writer_sleep => {
                tracing::warn!(
                    target: "bridge",
                    "writer did not drain within {:?}; aborting",
                    shutdown_timeout
                );
                writer_handle.abort();
            }
        }

        tracing::info!(target: "lifecycle", "phish-gate host stopped");
        Ok(())
    }
}

/// Reads frames until the stream ends or breaks. Undecodable events are
/// logged and skipped; a broken frame ends the session because the stream
/// can no longer be resynchronised.
async fn read_events<R>(mut reader: R, max_frame: usize, controller: &Controller) -> ShutdownReason
where
    R: AsyncRead + Unpin,
{
    loop {
        let frame = match read_frame(&mut reader, max_frame).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(target: "bridge", "browser closed the connection");
                return ShutdownReason::BrowserDisconnected;
            }
            Err(FrameError::Io(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::warn!(target: "bridge", "connection closed mid-frame");
                return ShutdownReason::BrowserDisconnected;
            }
            Err(err) => {
                tracing::error!(target: "bridge", error = %err, "unreadable frame");
                return ShutdownReason::StreamCorrupted;
            }
        };

        match serde_json::from_slice::<BrowserEvent>(&frame) {
            Ok(event) => {
                tracing::trace!(target: "bridge", ?event, "event received");
                controller.handle(event);
            }
            Err(err) => {
                tracing::warn!(target: "bridge", error = %err, "ignoring undecodable event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::{config::BackendConfig, domain::TabId, navigation::testing::Harness};

    fn frame(body: &str) -> Vec<u8> {
        let mut out = (body.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(body.as_bytes());
        out
    }

    fn controller(h: &Harness) -> Controller {
        let backend = BackendConfig {
            base_url: Url::parse("http://127.0.0.1:9/").unwrap(),
            request_timeout: Duration::from_millis(50),
            report_timeout: Duration::from_millis(50),
        };
        let reports = ReportClient::new(Client::new(), &backend).unwrap();
        Controller::new(h.ctx.clone(), Arc::new(reports))
    }

    #[tokio::test]
    async fn bad_events_are_skipped_until_eof() {
        let h = Harness::new();
        let controller = controller(&h);
        h.ctx.store.approve(TabId(1), "http://a.test/");

        let mut input = frame("{not json");
        input.extend(frame(r#"{"type":"warp","tabId":1}"#));
        input.extend(frame(r#"{"type":"tabRemoved","tabId":1}"#));

        let reason = read_events(input.as_slice(), 1024, &controller).await;
        assert_eq!(reason, ShutdownReason::BrowserDisconnected);
        assert_eq!(h.ctx.store.tab_count(), 0);
    }

    #[tokio::test]
    async fn oversized_frame_ends_session() {
        let h = Harness::new();
        let controller = controller(&h);

        let input = frame(&format!(r#"{{"type":"tabRemoved","tabId":1,"pad":"{}"}}"#, "x".repeat(64)));
        let reason = read_events(input.as_slice(), 32, &controller).await;
        assert_eq!(reason, ShutdownReason::StreamCorrupted);
    }

    #[tokio::test]
    async fn truncated_frame_counts_as_disconnect() {
        let h = Harness::new();
        let controller = controller(&h);

        let mut input = frame(r#"{"type":"tabRemoved","tabId":1}"#);
        input.truncate(input.len() - 3);
        let reason = read_events(input.as_slice(), 1024, &controller).await;
        assert_eq!(reason, ShutdownReason::BrowserDisconnected);
    }
}
