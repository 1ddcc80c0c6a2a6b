use log::LevelFilter;

#[cfg(target_os = "android")]
use log::{Level, Log, Metadata, Record};
#[cfg(target_os = "android")]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(target_os = "android")]
use std::sync::OnceLock;

#[cfg(target_os = "android")]
static LOGGER: OnceLock<LogcatLogger> = OnceLock::new();

#[cfg(target_os = "android")]
const TAG: &str = "signpad";

/// Routes the `log` facade to logcat.
#[cfg(target_os = "android")]
struct LogcatLogger {
    level: AtomicUsize,
}

#[cfg(target_os = "android")]
impl LogcatLogger {
    fn new(level: LevelFilter) -> Self {
        Self {
            level: AtomicUsize::new(level as usize),
        }
    }

    fn set_level(&self, level: LevelFilter) {
        self.level.store(level as usize, Ordering::Relaxed);
    }

    fn level(&self) -> usize {
        self.level.load(Ordering::Relaxed)
    }
}

#[cfg(target_os = "android")]
impl Log for LogcatLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        (metadata.level() as usize) <= self.level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = format!("{}: {}", record.target(), record.args());
        write_line(record.level(), &msg);
    }

    fn flush(&self) {}
}

#[cfg(target_os = "android")]
fn write_line(level: Level, msg: &str) {
    use android_log_sys::LogPriority;
    use std::ffi::CString;

    let prio = match level {
        Level::Error => LogPriority::ERROR,
        Level::Warn => LogPriority::WARN,
        Level::Info => LogPriority::INFO,
        Level::Debug => LogPriority::DEBUG,
        Level::Trace => LogPriority::VERBOSE,
    };
    let tag = CString::new(TAG).unwrap_or_default();
    let c_msg = CString::new(msg.replace('\0', "?")).unwrap_or_default();
    unsafe {
        android_log_sys::__android_log_print(
            prio as _,
            tag.as_ptr(),
            b"%s\0".as_ptr() as *const _,
            c_msg.as_ptr(),
        );
    }
}

pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    raw.trim().parse::<LevelFilter>().ok()
}

/// Installs the logger once; later calls only move the level.
#[cfg(target_os = "android")]
pub fn init(level: LevelFilter) {
    let logger = LOGGER.get_or_init(|| LogcatLogger::new(level));
    logger.set_level(level);
    let _ = log::set_logger(logger);
    log::set_max_level(level);
}

/// Installs env_logger once with everything enabled, then narrows through the
/// global max level so a later `init` can raise it again. `RUST_LOG` still
/// applies on top.
#[cfg(not(target_os = "android"))]
pub fn init(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Trace)
        .parse_default_env()
        .is_test(cfg!(test))
        .try_init();
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names_case_insensitively() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level(" WARN "), Some(LevelFilter::Warn));
        assert_eq!(parse_level("loud"), None);
    }

    #[cfg(target_os = "android")]
    #[test]
    fn logcat_filter_follows_configured_level() {
        let logger = LogcatLogger::new(LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).build();
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&debug));
        logger.set_level(LevelFilter::Debug);
        assert!(logger.enabled(&debug));
    }
}
