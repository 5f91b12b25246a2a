//! Text for individual statuses and URL selection for navigation.

use crate::domain::{GitRef, StatusEntry, StatusReport, StatusState};
use crate::error::{Result, StatusError};

/// Label of an entry's state; unmapped states show their raw string.
pub fn entry_label(entry: &StatusEntry) -> String {
    match entry.status_state() {
        StatusState::Unknown(raw) => raw,
        state => state.spec().label.to_string(),
    }
}

/// `"<label> <description>"`, or just the label without a description.
pub fn format_entry(entry: &StatusEntry) -> String {
    let label = entry_label(entry);
    match entry.description.as_deref() {
        Some(description) if !description.is_empty() => format!("{label} {description}"),
        _ => label,
    }
}

/// Label offered when the user picks one of several statuses:
/// `"(<label>) <context>: <description>"`.
pub fn choice_label(entry: &StatusEntry) -> String {
    let label = entry_label(entry);
    match entry.description.as_deref() {
        Some(description) if !description.is_empty() => {
            format!("({label}) {}: {description}", entry.context)
        }
        _ => format!("({label}) {}", entry.context),
    }
}

/// UI hook for picking one status out of several.
pub trait Chooser: Send + Sync {
    /// Index of the chosen option, `None` if the user cancelled.
    fn choose(&self, prompt: &str, options: &[String]) -> Option<usize>;
}

/// What to navigate to: a URL already bound to a rendered section, or a ref
/// whose statuses should be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    Url(String),
    Ref(GitRef),
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavAction {
    /// Open this URL.
    Open(String),
    /// The user dismissed the choice.
    Cancelled,
    /// No report is available: the feature is disabled or fetching is
    /// suppressed.
    Suppressed,
}

/// Pick the URL to open for `report`, asking `chooser` when there are
/// several statuses.
pub fn select_url(report: &StatusReport, chooser: &dyn Chooser) -> Result<NavAction> {
    let entry = match report.statuses.as_slice() {
        [] => {
            return Err(StatusError::NoUsableUrl {
                context: report
                    .message
                    .clone()
                    .unwrap_or_else(|| "(no statuses)".to_string()),
            })
        }
        [only] => only,
        many => {
            let options: Vec<String> = many.iter().map(choice_label).collect();
            match chooser.choose("CI service: ", &options) {
                Some(idx) => many.get(idx).ok_or_else(|| StatusError::NoUsableUrl {
                    context: format!("choice {idx} out of range"),
                })?,
                None => return Ok(NavAction::Cancelled),
            }
        }
    };

    entry
        .usable_url()
        .map(|url| NavAction::Open(url.to_string()))
        .ok_or_else(|| StatusError::NoUsableUrl {
            context: entry.context.clone(),
        })
}
