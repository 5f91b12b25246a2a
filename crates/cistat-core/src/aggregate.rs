//! Reduces a combined status report to a single display state.
//!
//! The overall state is the remote's own rollup and is never recomputed
//! from the entries; only the pass count is computed locally.

use crate::domain::{DisplayState, StatusReport, NO_CHECKS_MESSAGE};
use crate::present;

/// Summarise `report` for display.
pub fn summarize(report: &StatusReport) -> DisplayState {
    match (report.total_count, report.statuses.as_slice()) {
        (1, [entry]) => {
            let spec = entry.status_state().spec();
            DisplayState {
                label: spec.label.to_string(),
                style: spec.style,
                detail: present::format_entry(entry),
            }
        }
        (0, _) | (1, []) => {
            let spec = report.status_state().spec();
            DisplayState {
                label: spec.label.to_string(),
                style: spec.style,
                detail: report
                    .message
                    .clone()
                    .unwrap_or_else(|| NO_CHECKS_MESSAGE.to_string()),
            }
        }
        (total, _) => {
            let spec = report.status_state().spec();
            DisplayState {
                label: spec.label.to_string(),
                style: spec.style,
                detail: format!("{} ({}/{})", spec.label, report.passed_count(), total),
            }
        }
    }
}
