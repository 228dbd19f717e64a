use std::sync::Arc;

use url::Url;

use crate::{
    bridge::{Banner, Browser, BrowserCommand},
    classifier::ClassificationClient,
    domain::TabId,
    policy::{Decision, Policy},
    state::{LastCheckCell, TabStateStore},
};

pub mod gate;
pub mod monitor;
pub mod router;
#[cfg(test)]
pub(crate) mod testing;

pub use gate::NavigationGate;
pub use monitor::PostLoadMonitor;
pub use router::MessageRouter;

pub const TOP_LEVEL_FRAME: u64 = 0;

/// Everything the navigation handlers share. Owned by the controller; the
/// store is the only mutable part.
pub struct NavigationContext {
    pub store: TabStateStore,
    pub policy: Policy,
    pub classifier: Arc<dyn ClassificationClient>,
    pub browser: Arc<dyn Browser>,
    pub last_check: LastCheckCell,
    pub warning_page: Url,
}

impl NavigationContext {
    pub fn new(
        policy: Policy,
        classifier: Arc<dyn ClassificationClient>,
        browser: Arc<dyn Browser>,
        warning_page: Url,
    ) -> Self {
        Self {
            store: TabStateStore::new(policy.pending_check_ttl),
            policy,
            classifier,
            browser,
            last_check: LastCheckCell::new(),
            warning_page,
        }
    }

    /// Shows the verdict on the loaded page.
    pub fn annotate(&self, tab_id: TabId, decision: Decision) {
        self.browser.dispatch(BrowserCommand::InjectBanner {
            tab_id,
            banner: Banner::new(decision.label, decision.confidence),
        });
    }
}

/// Only http(s) pages are classified; extension pages, `about:`, `file:` and
/// friends pass through untouched.
pub fn is_network_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_schemes() {
        assert!(is_network_url("http://example.com"));
        assert!(is_network_url("https://example.com/login?next=/"));
        assert!(!is_network_url("chrome-extension://abc/warning.html"));
        assert!(!is_network_url("about:blank"));
        assert!(!is_network_url("file:///etc/passwd"));
        assert!(!is_network_url("not a url"));
    }
}
