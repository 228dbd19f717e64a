use std::{sync::Arc, time::Instant};

use url::Url;

use crate::{
    bridge::BrowserCommand,
    classifier::classify_or_fail_open,
    domain::TabId,
    policy::{evaluate, Decision},
    state::NavigationCommit,
};

use super::{is_network_url, NavigationContext, TOP_LEVEL_FRAME};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateOutcome {
    /// Sub-frame or non-network navigation.
    Ignored,
    /// The user already approved this exact URL in this tab.
    Approved,
    Decided(Decision),
    /// A newer navigation in the same tab took over while classifying.
    Superseded,
}

/// Pre-navigation check. Runs before the page loads and may still send the
/// tab to the warning page instead.
#[derive(Clone)]
pub struct NavigationGate {
    ctx: Arc<NavigationContext>,
}

impl NavigationGate {
    pub fn new(ctx: Arc<NavigationContext>) -> Self {
        Self { ctx }
    }

    pub async fn on_before_navigate(&self, tab_id: TabId, url: &str, frame_id: u64) -> GateOutcome {
        if frame_id != TOP_LEVEL_FRAME || !is_network_url(url) {
            tracing::trace!(target: "gate", %tab_id, url, frame_id, "navigation ignored");
            return GateOutcome::Ignored;
        }

        let store = &self.ctx.store;
        let decision = Decision::approved();
        if store.pass_approved(tab_id, url, decision) {
            self.ctx
                .last_check
                .record(url, decision.label, decision.confidence);
            tracing::info!(target: "gate", %tab_id, url, "user-approved URL; skipping check");
            return GateOutcome::Approved;
        }
        if store.revoke_approval_unless(tab_id, url) {
            tracing::debug!(target: "gate", %tab_id, url, "approval revoked by new navigation");
        }

        let ticket = store.begin_check(tab_id, url, Instant::now());
        let result = classify_or_fail_open(self.ctx.classifier.as_ref(), url).await;
        let decision = evaluate(result, self.ctx.policy.confidence_threshold);

        let commit = store.commit_navigation(&ticket, decision);
        if commit == NavigationCommit::Stale {
            tracing::debug!(
                target: "gate",
                %tab_id,
                url,
                generation = ticket.generation,
                "discarding result of superseded check"
            );
            return GateOutcome::Superseded;
        }
        self.ctx
            .last_check
            .record(url, decision.label, decision.confidence);

        if decision.is_block() {
            let target = warning_url(&self.ctx.warning_page, url, decision.confidence, tab_id);
            tracing::warn!(
                target: "gate",
                %tab_id,
                url,
                label = %decision.label,
                confidence = decision.confidence,
                "navigation blocked"
            );
            self.ctx.browser.dispatch(BrowserCommand::Redirect {
                tab_id,
                url: target.into(),
            });
        } else {
            tracing::info!(
                target: "gate",
                %tab_id,
                url,
                label = %decision.label,
                confidence = decision.confidence,
                "navigation allowed"
            );
            if commit == NavigationCommit::Loaded {
                // the load finished first and left the banner to us
                self.ctx.annotate(tab_id, decision);
            }
        }

        GateOutcome::Decided(decision)
    }
}

/// Warning page address carrying the blocked destination, the confidence and
/// the tab to act on when the user decides.
pub fn warning_url(page: &Url, blocked: &str, confidence: f64, tab_id: TabId) -> Url {
    let mut target = page.clone();
    target
        .query_pairs_mut()
        .clear()
        .append_pair("url", blocked)
        .append_pair("confidence", &confidence.to_string())
        .append_pair("tabId", &tab_id.to_string());
    target
}
