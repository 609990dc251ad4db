use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;

pub(crate) static LOGGER_CONFIG: Lazy<RwLock<LoggingConfig>> =
    Lazy::new(|| RwLock::new(LoggingConfig::default()));

#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub enum LogLevel {
    INFO,
    VERBOSE,
}

#[macro_export]
macro_rules! logln {
    ($fmt:literal) => {
        if $crate::util::logging::is_enabled(Self::CC) {
            println!("[{}:{}] {}", file!(), line!(), $fmt);
        }
    };
    ($fmt:literal, $($arg:tt)*) => {
        if $crate::util::logging::is_enabled(Self::CC) {
            print!("[{}:{}] ", file!(), line!());
            println!($fmt, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! logvbln {
    ($fmt:literal) => {
        if $crate::util::logging::is_enabled(Self::CC) && $crate::util::logging::is_at_level(Self::CC, $crate::util::logging::LogLevel::VERBOSE) {
            println!("[{}:{}] {}", file!(), line!(), $fmt);
        }
    };
    ($fmt:literal, $($arg:tt)*) => {
        if $crate::util::logging::is_enabled(Self::CC) && $crate::util::logging::is_at_level(Self::CC, $crate::util::logging::LogLevel::VERBOSE) {
            print!("[{}:{}] ", file!(), line!());
            println!($fmt, $($arg)*);
        }
    }
}

fn config() -> RwLockReadGuard<'static, LoggingConfig> {
    LOGGER_CONFIG.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn config_mut() -> RwLockWriteGuard<'static, LoggingConfig> {
    LOGGER_CONFIG.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

pub fn is_enabled(cc: &'static str) -> bool {
    config().cc_enabled(cc)
}

pub fn is_at_level(cc: &'static str, level: LogLevel) -> bool {
    config().cc_at_level(cc, level)
}

pub fn disable_cc(cc: &'static str) {
    config_mut().disable_cc(cc);
}

pub fn enable_cc(cc: &'static str, level: LogLevel) {
    config_mut().enable_cc(cc, level);
}

pub fn set_global_logging(enabled: bool) {
    if enabled {
        config_mut().enable_global_tracing();
    } else {
        config_mut().disable_global_tracing();
    }
}

pub fn set_global_level(level: LogLevel) {
    config_mut().set_global_level(level);
}

pub struct LoggingConfig {
    global_tracing_enabled: bool,
    global_level: LogLevel,
    flags: HashMap<&'static str, (bool, LogLevel)>, // <component, (tracing enabled, trace level)>
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_tracing_enabled: true,
            global_level: LogLevel::INFO,
            flags: Default::default(),
        }
    }
}

impl LoggingConfig {
    pub fn cc_enabled(&self, cc: &'static str) -> bool {
        if !self.global_tracing_enabled {
            return false;
        }

        self.flags.get(cc).unwrap_or(&(true, LogLevel::INFO)).0
    }

    pub fn cc_at_level(&self, cc: &str, level: LogLevel) -> bool {
        if self.global_level >= level {
            return true;
        }

        self.flags.get(cc).unwrap_or(&(true, LogLevel::INFO)).1 == level
    }

    pub fn enable_cc(&mut self, cc: &'static str, level: LogLevel) {
        self.flags.insert(cc, (true, level));
    }

    pub fn disable_cc(&mut self, cc: &'static str) {
        self.flags.insert(cc, (false, LogLevel::INFO));
    }

    pub fn enable_global_tracing(&mut self) {
        self.global_tracing_enabled = true;
    }

    pub fn disable_global_tracing(&mut self) {
        self.global_tracing_enabled = false;
    }

    pub fn set_global_level(&mut self, level: LogLevel) {
        self.global_level = level;
    }
}

/// Severity of a message handed to a [`LogSink`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl MessageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
            MessageLevel::Success => "success",
        }
    }
}

/// Receives user-facing log lines. Called from the worker thread.
pub trait LogSink: Send + Sync {
    fn on_log(&self, message: &str, level: MessageLevel);
}

/// Receives coarse progress milestones. Called from the worker thread.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, current: u32, total: u32, message: &str);
}

/// Discards everything.
pub struct NullSink;

impl LogSink for NullSink {
    fn on_log(&self, _message: &str, _level: MessageLevel) {}
}

impl ProgressSink for NullSink {
    fn on_progress(&self, _current: u32, _total: u32, _message: &str) {}
}
