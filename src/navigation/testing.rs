use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use url::Url;

use crate::{
    bridge::{Browser, BrowserCommand},
    classifier::{
        wire::{ClassificationError, Prediction},
        ClassificationClient,
    },
    domain::ClassificationResult,
    policy::Policy,
};

use super::NavigationContext;

pub const WARNING_PAGE: &str = "chrome-extension://guard/warning.html";

#[derive(Default)]
pub struct RecordingBrowser {
    commands: Mutex<Vec<BrowserCommand>>,
}

impl RecordingBrowser {
    pub fn commands(&self) -> Vec<BrowserCommand> {
        self.commands.lock().clone()
    }
}

impl Browser for RecordingBrowser {
    fn dispatch(&self, command: BrowserCommand) {
        self.commands.lock().push(command);
    }
}

/// Answers from a fixed table. Unknown URLs time out; gated URLs wait until
/// released.
#[derive(Default)]
pub struct ScriptedClassifier {
    answers: Mutex<HashMap<String, ClassificationResult>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn answer(&self, url: &str, result: ClassificationResult) {
        self.answers.lock().insert(url.to_string(), result);
    }

    pub fn hold(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(url.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ClassificationClient for ScriptedClassifier {
    async fn classify(&self, url: &str) -> Result<Prediction, ClassificationError> {
        self.calls.lock().push(url.to_string());
        let gate = self.gates.lock().get(url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let answer = self.answers.lock().get(url).copied();
        answer
            .map(|result| Prediction { result, note: None })
            .ok_or(ClassificationError::Timeout(Duration::from_secs(5)))
    }
}

pub struct Harness {
    pub ctx: Arc<NavigationContext>,
    pub classifier: Arc<ScriptedClassifier>,
    pub browser: Arc<RecordingBrowser>,
}

impl Harness {
    pub fn new() -> Self {
        let classifier = Arc::new(ScriptedClassifier::default());
        let browser = Arc::new(RecordingBrowser::default());
        let ctx = Arc::new(NavigationContext::new(
            Policy::default(),
            classifier.clone(),
            browser.clone(),
            Url::parse(WARNING_PAGE).expect("valid warning page"),
        ));
        Self {
            ctx,
            classifier,
            browser,
        }
    }
}

/// Lets spawned tasks run until `done` holds.
pub async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
