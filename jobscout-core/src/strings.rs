//! User-facing status and log texts (Hebrew, matching the dashboard).

/// Status line before any run has started.
pub const READY: &str = "מוכן";

/// Status line after a stop request was acknowledged.
pub const RUN_STOPPED: &str = "הריצה נעצרה";

/// Log message recorded when the event stream drops.
pub const STREAM_DISCONNECTED: &str = "חיבור SSE נותק";

/// Status line right after a run was accepted.
pub fn run_started(run_id: &str) -> String {
    format!("ריצה {run_id}")
}

/// Shown when a start is attempted without any source.
pub const NO_SOURCES: &str = "אנא הזן לפחות מקור אחד";
