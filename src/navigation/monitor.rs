use std::{sync::Arc, time::Instant};

use crate::{
    classifier::classify_or_fail_open,
    domain::TabId,
    policy::{evaluate, Decision},
    state::{CheckTicket, LoadSettlement},
};

use super::{is_network_url, NavigationContext};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorOutcome {
    Ignored,
    /// The pre-navigation check already covered this load.
    Deduplicated,
    Annotated(Decision),
    Superseded,
}

/// Post-load checks. The page is already showing, so the only thing left to
/// do is annotate it.
#[derive(Clone)]
pub struct PostLoadMonitor {
    ctx: Arc<NavigationContext>,
}

impl PostLoadMonitor {
    pub fn new(ctx: Arc<NavigationContext>) -> Self {
        Self { ctx }
    }

    pub async fn on_load_complete(&self, tab_id: TabId, url: &str) -> MonitorOutcome {
        if !is_network_url(url) {
            return MonitorOutcome::Ignored;
        }
        match self.ctx.store.settle_load(tab_id, url, Instant::now()) {
            LoadSettlement::AlreadyAdjudicated(decision) => {
                tracing::debug!(target: "monitor", %tab_id, url, "load already checked before navigation");
                // blocked pages are being replaced; undecided ones are annotated by the gate
                if let Some(decision) = decision.filter(|decision| !decision.is_block()) {
                    self.ctx.annotate(tab_id, decision);
                }
                MonitorOutcome::Deduplicated
            }
            LoadSettlement::NeedsCheck(ticket) => self.check_and_annotate(ticket).await,
        }
    }

    /// Focus switches always re-check, whatever is pending.
    pub async fn on_activated(&self, tab_id: TabId, url: Option<&str>) -> MonitorOutcome {
        let Some(url) = url.filter(|url| is_network_url(url)) else {
            return MonitorOutcome::Ignored;
        };
        let ticket = self.ctx.store.observe(tab_id, url);
        self.check_and_annotate(ticket).await
    }

    async fn check_and_annotate(&self, ticket: CheckTicket) -> MonitorOutcome {
        let result = classify_or_fail_open(self.ctx.classifier.as_ref(), &ticket.url).await;
        let decision = evaluate(result, self.ctx.policy.confidence_threshold).as_notice();

        if !self.ctx.store.commit(&ticket, decision) {
            tracing::debug!(
                target: "monitor",
                tab_id = %ticket.tab_id,
                url = %ticket.url,
                "tab moved on; dropping annotation"
            );
            return MonitorOutcome::Superseded;
        }
        self.ctx
            .last_check
            .record(&ticket.url, decision.label, decision.confidence);

        tracing::info!(
            target: "monitor",
            tab_id = %ticket.tab_id,
            url = %ticket.url,
            label = %decision.label,
            confidence = decision.confidence,
            "annotating page"
        );
        self.ctx.annotate(ticket.tab_id, decision);
        MonitorOutcome::Annotated(decision)
    }
}
