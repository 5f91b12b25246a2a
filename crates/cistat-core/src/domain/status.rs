//! Status entries, reports and the state display table.

use serde::{Deserialize, Serialize};

/// Detail shown for a report with no checks and no explanatory message.
pub const NO_CHECKS_MESSAGE: &str = "checks have not yet begun";

/// Message carried by the synthetic report for a ref the remote does not know.
pub const NOT_FOUND_MESSAGE: &str = "ref not found on remote";

/// Parsed form of the `state` field reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatusState {
    /// No state was reported.
    Absent,
    Error,
    Failure,
    Pending,
    Success,
    /// A state string outside the known vocabulary (e.g. `"neutral"`).
    Unknown(String),
}

impl StatusState {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => StatusState::Absent,
            Some("error") => StatusState::Error,
            Some("failure") => StatusState::Failure,
            Some("pending") => StatusState::Pending,
            Some("success") => StatusState::Success,
            Some(other) => StatusState::Unknown(other.to_string()),
        }
    }

    /// The display spec for this state, falling back to [`UNKNOWN_SPEC`].
    pub fn spec(&self) -> &'static StateSpec {
        state_spec(self)
    }
}

/// Style tag handed to the UI; colouring is the UI's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleTag {
    Neutral,
    Error,
    Failure,
    Pending,
    Success,
    Unknown,
}

/// Display label and style for one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSpec {
    pub label: &'static str,
    pub style: StyleTag,
}

/// Keys of the display table. Unknown states have no key and use the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateKey {
    Absent,
    Error,
    Failure,
    Pending,
    Success,
}

const STATE_SPECS: [(StateKey, StateSpec); 5] = [
    (
        StateKey::Absent,
        StateSpec {
            label: "None",
            style: StyleTag::Neutral,
        },
    ),
    (
        StateKey::Error,
        StateSpec {
            label: "Error",
            style: StyleTag::Error,
        },
    ),
    (
        StateKey::Failure,
        StateSpec {
            label: "Failure",
            style: StyleTag::Failure,
        },
    ),
    (
        StateKey::Pending,
        StateSpec {
            label: "Pending",
            style: StyleTag::Pending,
        },
    ),
    (
        StateKey::Success,
        StateSpec {
            label: "Success",
            style: StyleTag::Success,
        },
    ),
];

/// Fallback for any state outside the known vocabulary.
pub const UNKNOWN_SPEC: StateSpec = StateSpec {
    label: "Unknown",
    style: StyleTag::Unknown,
};

/// Look up the display spec for `state`.
pub fn state_spec(state: &StatusState) -> &'static StateSpec {
    let key = match state {
        StatusState::Absent => StateKey::Absent,
        StatusState::Error => StateKey::Error,
        StatusState::Failure => StateKey::Failure,
        StatusState::Pending => StateKey::Pending,
        StatusState::Success => StateKey::Success,
        StatusState::Unknown(_) => return &UNKNOWN_SPEC,
    };
    STATE_SPECS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, spec)| spec)
        .unwrap_or(&UNKNOWN_SPEC)
}

/// One CI service's result for a ref.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Raw state string as reported by the remote.
    #[serde(default)]
    pub state: Option<String>,

    /// Service or check name, e.g. `"ci/build"`.
    #[serde(default)]
    pub context: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub target_url: Option<String>,
}

impl StatusEntry {
    pub fn new(state: &str, context: &str) -> Self {
        Self {
            state: Some(state.to_string()),
            context: context.to_string(),
            description: None,
            target_url: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_target_url(mut self, url: &str) -> Self {
        self.target_url = Some(url.to_string());
        self
    }

    pub fn status_state(&self) -> StatusState {
        StatusState::parse(self.state.as_deref())
    }

    pub fn is_success(&self) -> bool {
        self.state.as_deref() == Some("success")
    }

    /// The target URL, if present and non-blank.
    pub fn usable_url(&self) -> Option<&str> {
        self.target_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Combined status of every check reported for one ref.
///
/// `total_count == statuses.len()` for real payloads; the synthetic
/// not-found report has `total_count == 0` and carries a `message`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub total_count: usize,

    /// Overall state as rolled up by the remote.
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub statuses: Vec<StatusEntry>,

    /// Explanation for zero-count reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusReport {
    /// Build a report from entries, keeping `total_count` consistent.
    pub fn new(state: Option<&str>, statuses: Vec<StatusEntry>) -> Self {
        Self {
            total_count: statuses.len(),
            state: state.map(str::to_string),
            statuses,
            message: None,
        }
    }

    /// The report substituted for a ref the remote does not know.
    pub fn not_found() -> Self {
        Self {
            total_count: 0,
            state: Some("error".to_string()),
            statuses: Vec::new(),
            message: Some(NOT_FOUND_MESSAGE.to_string()),
        }
    }

    pub fn status_state(&self) -> StatusState {
        StatusState::parse(self.state.as_deref())
    }

    /// Number of entries whose state is `success`.
    pub fn passed_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.is_success()).count()
    }
}

/// Reduced view of a report, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub label: String,
    pub style: StyleTag,
    pub detail: String,
}
