use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{domain::{Label, TabId}, report::ReportRequest};

/// Frames forwarded by the extension.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BrowserEvent {
    BeforeNavigate {
        tab_id: TabId,
        url: String,
        /// 0 is the top-level frame.
        #[serde(default)]
        frame_id: u64,
    },
    LoadComplete {
        tab_id: TabId,
        url: String,
    },
    TabActivated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    TabRemoved {
        tab_id: TabId,
    },
    /// Message from the warning or report page, decoded by the router.
    UiMessage {
        #[serde(default)]
        request_id: Option<u64>,
        payload: Value,
    },
    SubmitReport {
        request_id: u64,
        report: ReportRequest,
    },
    GetLastCheck {
        request_id: u64,
    },
    CheckNow {
        request_id: u64,
        url: String,
    },
}

/// Instructions the extension carries out on the host's behalf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BrowserCommand {
    Redirect { tab_id: TabId, url: String },
    Navigate { tab_id: TabId, url: String },
    GoBack { tab_id: TabId },
    InjectBanner { tab_id: TabId, banner: Banner },
    Notify { title: String, message: String },
    Reply { request_id: u64, body: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BannerTone {
    Safe,
    Warning,
    Unavailable,
}

/// What the in-page banner shows. Styling is up to the extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub label: Label,
    pub confidence: f64,
    pub confidence_text: String,
    pub tone: BannerTone,
}

impl Banner {
    pub fn new(label: Label, confidence: f64) -> Self {
        let tone = match label {
            Label::Legitimate => BannerTone::Safe,
            Label::Phishing => BannerTone::Warning,
            Label::Error => BannerTone::Unavailable,
        };
        Self {
            label,
            confidence,
            confidence_text: format_percent(confidence),
            tone,
        }
    }
}

pub fn format_percent(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}
