//! Global pluggable logger.
//!
//! Симуляция — библиотека: host (графический клиент, headless binary, тесты)
//! сам решает куда писать. По умолчанию — stdout через `ConsoleLogger`.

use once_cell::sync::Lazy;
use std::sync::Mutex;

/// Уровень логирования (по возрастанию severity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Sink для сообщений (Godot print, stdout, test capture...).
pub trait LogPrinter: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

struct LoggerState {
    printer: Option<Box<dyn LogPrinter>>,
    min_level: LogLevel,
}

static LOGGER: Lazy<Mutex<LoggerState>> = Lazy::new(|| {
    Mutex::new(LoggerState {
        printer: None,
        min_level: LogLevel::Debug,
    })
});

pub fn set_logger(printer: Box<dyn LogPrinter>) {
    LOGGER.lock().unwrap().printer = Some(printer);
}

pub fn set_log_level(level: LogLevel) {
    LOGGER.lock().unwrap().min_level = level;
}

/// Устанавливает logger только если его ещё нет (не перетираем host-logger).
pub fn set_logger_if_needed(printer: Box<dyn LogPrinter>) {
    let mut state = LOGGER.lock().unwrap();
    if state.printer.is_none() {
        state.printer = Some(printer);
    }
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    let state = LOGGER.lock().unwrap();
    if level < state.min_level {
        return;
    }
    if let Some(printer) = state.printer.as_ref() {
        // Timestamp добавляем здесь, а не в printer'е
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        printer.log(level, &format!("[{}] {}", timestamp, message));
    }
}

pub struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

pub fn init_logger() {
    set_logger_if_needed(Box::new(ConsoleLogger));
}
