use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{bridge::BrowserCommand, domain::TabId};

use super::{is_network_url, NavigationContext};

/// Actions sent by the warning and report pages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiMessage {
    GoBack {
        tab_id: TabId,
    },
    Proceed {
        tab_id: TabId,
        url: String,
    },
    ReportSuccess {
        report_id: String,
        #[serde(default)]
        tab_id: Option<TabId>,
    },
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("malformed UI message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("refusing to approve non-network URL {0:?}")]
    NotNavigable(String),
}

#[derive(Clone)]
pub struct MessageRouter {
    ctx: Arc<NavigationContext>,
}

impl MessageRouter {
    pub fn new(ctx: Arc<NavigationContext>) -> Self {
        Self { ctx }
    }

    /// Decodes and applies a raw UI message. Unknown actions are errors.
    pub fn handle(&self, payload: Value) -> Result<UiMessage, RouterError> {
        let message: UiMessage = serde_json::from_value(payload)?;
        self.dispatch(&message)?;
        Ok(message)
    }

    pub fn dispatch(&self, message: &UiMessage) -> Result<(), RouterError> {
        match message {
            UiMessage::GoBack { tab_id } => {
                tracing::info!(target: "router", %tab_id, "user went back");
                self.ctx
                    .browser
                    .dispatch(BrowserCommand::GoBack { tab_id: *tab_id });
            }
            UiMessage::Proceed { tab_id, url } => {
                if !is_network_url(url) {
                    return Err(RouterError::NotNavigable(url.clone()));
                }
                self.ctx.store.approve(*tab_id, url);
                tracing::warn!(target: "router", %tab_id, url = %url, "user chose to proceed despite warning");
                self.ctx.browser.dispatch(BrowserCommand::Navigate {
                    tab_id: *tab_id,
                    url: url.clone(),
                });
            }
            UiMessage::ReportSuccess { report_id, tab_id } => {
                tracing::info!(target: "router", report_id = %report_id, tab_id = ?tab_id, "report acknowledged");
                self.ctx.browser.dispatch(BrowserCommand::Notify {
                    title: "Report submitted".to_string(),
                    message: format!("Thank you! Your report ID is {report_id}."),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        domain::ClassificationResult,
        navigation::{gate::GateOutcome, testing::Harness, NavigationGate},
    };

    #[tokio::test]
    async fn proceed_approves_exactly_one_url_in_one_tab() {
        let h = Harness::new();
        h.classifier
            .answer("http://phish.test", ClassificationResult::phishing(0.99));
        let router = MessageRouter::new(h.ctx.clone());
        let gate = NavigationGate::new(h.ctx.clone());

        let message = router
            .handle(json!({"action": "proceed", "tabId": "1", "url": "http://phish.test"}))
            .unwrap();
        assert_eq!(
            message,
            UiMessage::Proceed {
                tab_id: TabId(1),
                url: "http://phish.test".into()
            }
        );
        assert_eq!(
            h.browser.commands(),
            vec![BrowserCommand::Navigate {
                tab_id: TabId(1),
                url: "http://phish.test".into()
            }]
        );

        assert_eq!(
            gate.on_before_navigate(TabId(1), "http://phish.test", 0).await,
            GateOutcome::Approved
        );
        assert!(h.classifier.calls().is_empty());

        let other_tab = gate.on_before_navigate(TabId(2), "http://phish.test", 0).await;
        assert!(matches!(other_tab, GateOutcome::Decided(d) if d.is_block()));
        assert_eq!(h.classifier.calls().len(), 1);
    }

    #[test]
    fn go_back_leaves_state_alone() {
        let h = Harness::new();
        let router = MessageRouter::new(h.ctx.clone());

        router.handle(json!({"action": "goBack", "tabId": "3"})).unwrap();
        assert_eq!(
            h.browser.commands(),
            vec![BrowserCommand::GoBack { tab_id: TabId(3) }]
        );
        assert_eq!(h.ctx.store.tab_count(), 0);
    }

    #[test]
    fn report_success_raises_notification() {
        let h = Harness::new();
        let router = MessageRouter::new(h.ctx.clone());

        router
            .handle(json!({"action": "reportSuccess", "reportId": "r-42"}))
            .unwrap();
        let commands = h.browser.commands();
        let [BrowserCommand::Notify { message, .. }] = commands.as_slice() else {
            panic!("expected a notification, got {commands:?}");
        };
        assert!(message.contains("r-42"));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let h = Harness::new();
        let router = MessageRouter::new(h.ctx.clone());

        let err = router
            .handle(json!({"action": "whitelistDomain", "tabId": "1"}))
            .unwrap_err();
        assert!(matches!(err, RouterError::Malformed(_)));
        assert!(h.browser.commands().is_empty());
    }

    #[test]
    fn proceed_requires_url_and_network_scheme() {
        let h = Harness::new();
        let router = MessageRouter::new(h.ctx.clone());

        assert!(router
            .handle(json!({"action": "proceed", "tabId": "1"}))
            .is_err());
        assert!(matches!(
            router.handle(json!({"action": "proceed", "tabId": "1", "url": "javascript:alert(1)"})),
            Err(RouterError::NotNavigable(_))
        ));
        assert_eq!(h.ctx.store.approved_url(TabId(1)), None);
        assert!(h.browser.commands().is_empty());
    }
}
