//! Narrow debug-sink interface (§4.K / §6). Telemetry transport itself is
//! out of scope; the core only ever writes key/value pairs and lines to
//! whatever the host plugs in.

/// A narrow key/value/line sink. Implementations must be no-ops-safe to
/// call every cycle and must never panic.
pub trait DebugSink {
    fn add_data(&mut self, key: &str, value: f64);
    fn add_line(&mut self, text: &str);
}

/// Writes every call through the `log` facade at `debug!`, logging state
/// straight from the component that owns it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DebugSink for LogSink {
    fn add_data(&mut self, key: &str, value: f64) {
        log::debug!("{key} = {value}");
    }

    fn add_line(&mut self, text: &str) {
        log::debug!("{text}");
    }
}

/// Helper for the common `debug_dump(prefix)` delegation pattern: every
/// component writes `"{prefix}.field"` keys and hands owned components
/// `"{prefix}.child"` (§9 "Debug dump prefix convention").
pub fn child_prefix(prefix: &str, child: &str) -> String {
    format!("{prefix}.{child}")
}

/// Calls `f` with an optional sink, doing nothing when `sink` is `None`.
/// Every `debug_dump` in this crate is built on top of this so the
/// no-sink-is-a-no-op contract can't be forgotten at a call site.
pub fn with_sink<F: FnOnce(&mut dyn DebugSink)>(sink: Option<&mut dyn DebugSink>, f: F) {
    if let Some(sink) = sink {
        f(sink);
    }
}
