use std::time::Duration;

use serde::Serialize;

use crate::domain::{ClassificationResult, Label};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_PENDING_CHECK_TTL: Duration = Duration::from_secs(30);

/// Process-wide policy, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub confidence_threshold: f64,
    pub pending_check_ttl: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            pending_check_ttl: DEFAULT_PENDING_CHECK_TTL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Allow,
    AllowWithNotice,
    Block,
}

/// Outcome of policy evaluation. `label` and `confidence` are what the user
/// sees; `source` keeps the classifier output untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub label: Label,
    pub confidence: f64,
    pub source: ClassificationResult,
}

impl Decision {
    /// Decision used when the user already chose to proceed to this exact URL.
    pub fn approved() -> Self {
        Self {
            verdict: Verdict::Allow,
            label: Label::Legitimate,
            confidence: 1.0,
            source: ClassificationResult::legitimate(1.0),
        }
    }

    pub fn is_block(&self) -> bool {
        self.verdict == Verdict::Block
    }

    /// Once a page has loaded it can no longer be blocked, only flagged.
    pub fn as_notice(self) -> Self {
        match self.verdict {
            Verdict::Block => Self {
                verdict: Verdict::AllowWithNotice,
                ..self
            },
            _ => self,
        }
    }
}

pub fn evaluate(result: ClassificationResult, threshold: f64) -> Decision {
    let confidence = clamp_confidence(result.confidence);
    let threshold = clamp_confidence(threshold);

    let (verdict, label, confidence) = match result.label {
        Label::Error => (Verdict::Allow, Label::Error, 0.0),
        Label::Phishing => (Verdict::Block, Label::Phishing, confidence),
        Label::Legitimate if confidence >= threshold => {
            (Verdict::Allow, Label::Legitimate, confidence)
        }
        // the binary label alone is not trusted below the threshold
        Label::Legitimate => (Verdict::Block, Label::Phishing, confidence),
    };

    Decision {
        verdict,
        label,
        confidence,
        source: result,
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
