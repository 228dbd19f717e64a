use std::{collections::HashMap, time::Duration, time::Instant};

use parking_lot::Mutex;

use crate::{domain::TabId, policy::Decision};

/// Per-tab navigation state. All access goes through one mutex and no lock is
/// ever held across an await, so every read-modify-write below is atomic with
/// respect to the other handlers.
#[derive(Debug)]
pub struct TabStateStore {
    inner: Mutex<Inner>,
    pending_ttl: Duration,
}

/// Generations come from one store-wide counter, so a tab id that is closed
/// and later reused can never match a ticket issued before the close.
#[derive(Debug, Default)]
struct Inner {
    tabs: HashMap<TabId, TabState>,
    next_generation: u64,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    fn tab(&mut self, tab_id: TabId) -> &mut TabState {
        let next_generation = &mut self.next_generation;
        self.tabs.entry(tab_id).or_insert_with(|| {
            *next_generation += 1;
            TabState {
                generation: *next_generation,
                ..TabState::default()
            }
        })
    }
}

#[derive(Debug, Default)]
struct TabState {
    approved_url: Option<String>,
    pending: Option<PendingCheck>,
    generation: u64,
    last_result: Option<Decision>,
    /// Pre-navigation verdict and the generation it was issued for.
    adjudicated: Option<(u64, Decision)>,
}

#[derive(Debug, Clone)]
struct PendingCheck {
    url: String,
    issued_at: Instant,
}

/// Identifies one in-flight check. Only a ticket carrying the tab's current
/// generation may publish a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTicket {
    pub tab_id: TabId,
    pub url: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadSettlement {
    /// The pre-navigation check already ruled on this load. The decision is
    /// absent while that check is still waiting on the classifier.
    AlreadyAdjudicated(Option<Decision>),
    NeedsCheck(CheckTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationCommit {
    Stale,
    /// The page has not finished loading; the load handler will use the result.
    AwaitingLoad,
    /// The load completed while the classifier was busy.
    Loaded,
}

impl TabStateStore {
    pub fn new(pending_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            pending_ttl,
        }
    }

    #[cfg(test)]
    pub fn approved_url(&self, tab_id: TabId) -> Option<String> {
        self.inner
            .lock()
            .tabs
            .get(&tab_id)
            .and_then(|tab| tab.approved_url.clone())
    }

    /// Approves `url` for the tab. Any check still in flight for the tab is
    /// superseded, since the user has already decided where the tab goes.
    pub fn approve(&self, tab_id: TabId, url: &str) {
        let mut inner = self.inner.lock();
        inner.tab(tab_id);
        let generation = inner.bump();
        let tab = inner.tab(tab_id);
        tab.generation = generation;
        tab.pending = None;
        tab.approved_url = Some(url.to_string());
    }

    /// Lets an approved navigation through without a check. When `url` is the
    /// tab's approved URL this supersedes any in-flight check, clears the
    /// pending slot and records `decision`; otherwise nothing changes.
    pub fn pass_approved(&self, tab_id: TabId, url: &str, decision: Decision) -> bool {
        let mut inner = self.inner.lock();
        let approved = inner
            .tabs
            .get(&tab_id)
            .is_some_and(|tab| tab.approved_url.as_deref() == Some(url));
        if !approved {
            return false;
        }
        let generation = inner.bump();
        let tab = inner.tab(tab_id);
        tab.generation = generation;
        tab.pending = None;
        tab.last_result = Some(decision);
        true
    }

    /// Drops the approval unless it is for exactly `url`. Returns whether an
    /// approval was revoked.
    pub fn revoke_approval_unless(&self, tab_id: TabId, url: &str) -> bool {
        let mut inner = self.inner.lock();
        let tab = inner.tab(tab_id);
        match tab.approved_url.as_deref() {
            Some(approved) if approved != url => {
                tab.approved_url = None;
                true
            }
            _ => false,
        }
    }

    /// Registers a pre-navigation check, overwriting any earlier pending check
    /// for the tab and superseding its in-flight result.
    pub fn begin_check(&self, tab_id: TabId, url: &str, now: Instant) -> CheckTicket {
        let mut inner = self.inner.lock();
        inner.tab(tab_id);
        let generation = inner.bump();
        let tab = inner.tab(tab_id);
        tab.generation = generation;
        tab.pending = Some(PendingCheck {
            url: url.to_string(),
            issued_at: now,
        });
        CheckTicket {
            tab_id,
            url: url.to_string(),
            generation: tab.generation,
        }
    }

    /// Ticket for a post-load or activation check. It does not supersede
    /// anything but goes stale as soon as a new navigation begins.
    pub fn observe(&self, tab_id: TabId, url: &str) -> CheckTicket {
        let mut inner = self.inner.lock();
        let tab = inner.tab(tab_id);
        CheckTicket {
            tab_id,
            url: url.to_string(),
            generation: tab.generation,
        }
    }

    #[cfg(test)]
    pub fn is_current(&self, ticket: &CheckTicket) -> bool {
        self.inner
            .lock()
            .tabs
            .get(&ticket.tab_id)
            .is_some_and(|tab| tab.generation == ticket.generation)
    }

    /// Stores the result if the ticket is still current. A closed tab never
    /// accepts results, so this does not create entries.
    pub fn commit(&self, ticket: &CheckTicket, decision: Decision) -> bool {
        let mut inner = self.inner.lock();
        match inner.tabs.get_mut(&ticket.tab_id) {
            Some(tab) if tab.generation == ticket.generation => {
                tab.last_result = Some(decision);
                true
            }
            _ => false,
        }
    }

    /// Like `commit`, for pre-navigation tickets: also remembers the verdict
    /// so the matching load can reuse it, and reports whether that load has
    /// already happened.
    pub fn commit_navigation(&self, ticket: &CheckTicket, decision: Decision) -> NavigationCommit {
        let mut inner = self.inner.lock();
        match inner.tabs.get_mut(&ticket.tab_id) {
            Some(tab) if tab.generation == ticket.generation => {
                tab.last_result = Some(decision);
                tab.adjudicated = Some((ticket.generation, decision));
                if tab.pending.is_some() {
                    NavigationCommit::AwaitingLoad
                } else {
                    NavigationCommit::Loaded
                }
            }
            _ => NavigationCommit::Stale,
        }
    }

    pub fn settle_load(&self, tab_id: TabId, url: &str, now: Instant) -> LoadSettlement {
        let mut inner = self.inner.lock();
        let pending_ttl = self.pending_ttl;
        let tab = inner.tab(tab_id);

        if tab.approved_url.as_deref().is_some_and(|approved| approved != url) {
            tab.approved_url = None;
        }

        if let Some(pending) = tab.pending.take() {
            let expired = now.saturating_duration_since(pending.issued_at) > pending_ttl;
            if !expired && pending.url == url {
                let generation = tab.generation;
                let decision = tab
                    .adjudicated
                    .filter(|(issued_for, _)| *issued_for == generation)
                    .map(|(_, decision)| decision);
                return LoadSettlement::AlreadyAdjudicated(decision);
            }
            if !expired {
                // belongs to a navigation that has not completed yet
                tab.pending = Some(pending);
            }
        }

        LoadSettlement::NeedsCheck(CheckTicket {
            tab_id,
            url: url.to_string(),
            generation: tab.generation,
        })
    }

    #[cfg(test)]
    pub fn has_pending(&self, tab_id: TabId) -> bool {
        self.inner
            .lock()
            .tabs
            .get(&tab_id)
            .is_some_and(|tab| tab.pending.is_some())
    }

    #[cfg(test)]
    pub fn last_result(&self, tab_id: TabId) -> Option<Decision> {
        self.inner.lock().tabs.get(&tab_id).and_then(|tab| tab.last_result)
    }

    pub fn remove(&self, tab_id: TabId) -> bool {
        self.inner.lock().tabs.remove(&tab_id).is_some()
    }

    pub fn tab_count(&self) -> usize {
        self.inner.lock().tabs.len()
    }
}
