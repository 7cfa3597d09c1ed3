//! Paths of the run-control and event endpoints, relative to the server root.

pub const RUNS_START: &str = "/runs/start";
pub const RUNS_STOP: &str = "/runs/stop";
pub const SOURCES_SUGGEST: &str = "/sources/suggest";
pub const EVENTS_STREAM: &str = "/events/stream";
