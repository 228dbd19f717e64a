use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Browser tab identifier. The extension sends it as a JSON integer on
/// lifecycle events but as a decimal string from the warning page query
/// string, so both forms are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for TabId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(id) => Ok(TabId(id)),
            Raw::Text(text) => text
                .trim()
                .parse::<u64>()
                .map(TabId)
                .map_err(|_| de::Error::custom(format!("invalid tab id: {text:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Legitimate,
    Phishing,
    Error,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Legitimate => "Legitimate",
            Label::Phishing => "Phishing",
            Label::Error => "Error",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw classifier output. `confidence` carries no meaning for `Label::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn legitimate(confidence: f64) -> Self {
        Self {
            label: Label::Legitimate,
            confidence,
        }
    }

    #[cfg(test)]
    pub fn phishing(confidence: f64) -> Self {
        Self {
            label: Label::Phishing,
            confidence,
        }
    }

    pub fn error() -> Self {
        Self {
            label: Label::Error,
            confidence: 0.0,
        }
    }
}

/// Most recent check, kept for the popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastCheck {
    pub url: String,
    pub result: Label,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}
