//! Logging facilities.
//!
//! The macros prefix every message with the current simulation time, the level and the component name,
//! and use the component name as the log target, so that output can be filtered per component
//! with `RUST_LOG=<component>=debug`.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;
use serde_json::json;
use serde_type_name::type_name;

use crate::event::Event;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_component {
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $msg:expr) => (
        log::$level!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $msg
        )
    );
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $format:expr, $($arg:tt)+) => (
        log::$level!(
            target: $ctx.name(),
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a message at the info level on behalf of a component.
///
/// The first argument is anything with `time()` and `name()`, usually a [`SimulationContext`](crate::SimulationContext).
/// The rest is either a single displayable value or a format string with arguments:
///
/// ```text
/// log_info!(self.ctx, "task #{} is finished", task_id);
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(info, "INFO ", Green, $ctx, $($arg)+));
}

/// Logs a message at the debug level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message at the trace level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(trace, "TRACE", Cyan, $ctx, $($arg)+));
}

/// Logs a message at the warn level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(warn, "WARN ", Yellow, $ctx, $($arg)+));
}

/// Logs a message at the error level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_component!(error, "ERROR", Red, $ctx, $($arg)+));
}

fn log_dropped_event(reason: &str, event: Event) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] {} event: {}",
        event.time,
        get_colored("ERROR", Color::Red),
        reason,
        json!({
            "type": type_name(&event.data).unwrap_or("unknown"),
            "data": event.data,
            "src": event.src,
            "dst": event.dst,
        })
    );
}

/// Logs an event which payload matched no arm of [`cast!`](crate::cast!).
pub fn log_unhandled_event(event: Event) {
    log_dropped_event("Unhandled", event);
}

/// Logs an event whose destination has no registered handler.
pub(crate) fn log_undelivered_event(event: Event) {
    log_dropped_event("Undelivered", event);
}
