use chrono::Local;

use crate::util::logging::{LogSink, MessageLevel, ProgressSink};

/// Prints sink traffic to stdout, errors to stderr.
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn on_log(&self, message: &str, level: MessageLevel) {
        let stamp = Local::now().format("%H:%M:%S");

        match level {
            MessageLevel::Error => eprintln!("{stamp} [{}] {message}", level.as_str()),
            _ => println!("{stamp} [{}] {message}", level.as_str()),
        }
    }
}

impl ProgressSink for ConsoleSink {
    fn on_progress(&self, current: u32, total: u32, message: &str) {
        println!("({current}/{total}) {message}");
    }
}
