use std::sync::Arc;

use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::{
    bridge::{protocol::format_percent, BrowserCommand, BrowserEvent},
    navigation::{
        is_network_url, MessageRouter, NavigationContext, NavigationGate, PostLoadMonitor,
    },
    policy::evaluate,
    report::{ReportClient, ReportRequest},
};

/// Routes decoded browser events to their handlers. Anything that talks to a
/// remote service runs on its own task so the read loop never waits on it.
pub struct Controller {
    ctx: Arc<NavigationContext>,
    gate: NavigationGate,
    monitor: PostLoadMonitor,
    router: MessageRouter,
    reports: Arc<ReportClient>,
}

impl Controller {
    pub fn new(ctx: Arc<NavigationContext>, reports: Arc<ReportClient>) -> Self {
        Self {
            gate: NavigationGate::new(ctx.clone()),
            monitor: PostLoadMonitor::new(ctx.clone()),
            router: MessageRouter::new(ctx.clone()),
            ctx,
            reports,
        }
    }

    /// Returns the handle of the spawned task, if the event needed one.
    pub fn handle(&self, event: BrowserEvent) -> Option<JoinHandle<()>> {
        match event {
            BrowserEvent::BeforeNavigate {
                tab_id,
                url,
                frame_id,
            } => {
                let gate = self.gate.clone();
                Some(tokio::spawn(async move {
                    gate.on_before_navigate(tab_id, &url, frame_id).await;
                }))
            }
            BrowserEvent::LoadComplete { tab_id, url } => {
                let monitor = self.monitor.clone();
                Some(tokio::spawn(async move {
                    monitor.on_load_complete(tab_id, &url).await;
                }))
            }
            BrowserEvent::TabActivated { tab_id, url } => {
                let monitor = self.monitor.clone();
                Some(tokio::spawn(async move {
                    monitor.on_activated(tab_id, url.as_deref()).await;
                }))
            }
            BrowserEvent::TabRemoved { tab_id } => {
                self.ctx.store.remove(tab_id);
                tracing::debug!(
                    target: "router",
                    %tab_id,
                    tracked = self.ctx.store.tab_count(),
                    "tab closed; state dropped"
                );
                None
            }
            BrowserEvent::UiMessage {
                request_id,
                payload,
            } => {
                let body = match self.router.handle(payload) {
                    Ok(_) => json!({ "ok": true }),
                    Err(err) => {
                        tracing::warn!(target: "router", error = %err, "rejected UI message");
                        json!({ "error": err.to_string() })
                    }
                };
                if let Some(request_id) = request_id {
                    self.reply(request_id, body);
                }
                None
            }
            BrowserEvent::SubmitReport { request_id, report } => {
                let ctx = self.ctx.clone();
                let reports = self.reports.clone();
                Some(tokio::spawn(async move {
                    let body = submit_report(&reports, &report).await;
                    ctx.browser.dispatch(BrowserCommand::Reply { request_id, body });
                }))
            }
            BrowserEvent::GetLastCheck { request_id } => {
                self.reply(request_id, json!({ "lastCheck": self.ctx.last_check.get() }));
                None
            }
            BrowserEvent::CheckNow { request_id, url } => {
                let ctx = self.ctx.clone();
                Some(tokio::spawn(async move {
                    let body = check_now(&ctx, &url).await;
                    ctx.browser.dispatch(BrowserCommand::Reply { request_id, body });
                }))
            }
        }
    }

    fn reply(&self, request_id: u64, body: Value) {
        self.ctx
            .browser
            .dispatch(BrowserCommand::Reply { request_id, body });
    }
}

async fn submit_report(reports: &ReportClient, report: &ReportRequest) -> Value {
    match reports.submit(report).await {
        Ok(report_id) => json!({ "reportId": report_id }),
        Err(err) => {
            tracing::warn!(target: "report", url = %report.url, error = %err, "report failed");
            json!({ "error": err.to_string() })
        }
    }
}

/// Popup "check this page" request. Errors are reported to the popup rather
/// than failing open, since nothing is being navigated.
async fn check_now(ctx: &NavigationContext, url: &str) -> Value {
    if !is_network_url(url) {
        return json!({ "error": "Please navigate to a valid webpage first" });
    }
    match ctx.classifier.classify(url).await {
        Ok(prediction) => {
            let decision = evaluate(prediction.result, ctx.policy.confidence_threshold);
            ctx.last_check
                .record(url, decision.label, decision.confidence);
            tracing::info!(
                target: "classifier",
                url,
                label = %decision.label,
                confidence = decision.confidence,
                "manual check"
            );
            json!({
                "result": decision.label,
                "verdict": decision.verdict,
                "confidence": decision.confidence,
                "confidenceText": format_percent(decision.confidence),
                "note": prediction.note,
            })
        }
        Err(err) => {
            tracing::warn!(target: "classifier", url, error = %err, "manual check failed");
            json!({ "error": err.to_string() })
        }
    }
}
