//! `log` backend writing to the browser console.

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::JsValue;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => zoon::eprintln!("{}", record.args()),
            Level::Warn => web_sys::console::warn_1(&JsValue::from_str(&record.args().to_string())),
            Level::Info | Level::Debug | Level::Trace => zoon::println!("{}", record.args()),
        }
    }

    fn flush(&self) {}
}

/// Installs the console logger unless the application already set one.
pub fn install_console_logger(max_level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(max_level);
    }
}
