use crate::logger::severity::LogSeverity;
use crate::logger::time::now;
use once_cell::sync::OnceCell;

static MIN_SEVERITY: OnceCell<LogSeverity> = OnceCell::new();

/// Sets the lowest severity that gets printed. Only the first call has an effect;
/// until then everything from `Info` upwards is printed.
pub fn set_min_severity(severity: LogSeverity) {
    let _ = MIN_SEVERITY.set(severity);
}

pub fn enabled(log_severity: LogSeverity) -> bool {
    log_severity >= *MIN_SEVERITY.get().unwrap_or(&LogSeverity::Info)
}

pub fn log(msg: String, log_severity: LogSeverity) {
    if enabled(log_severity) {
        println!("[{}] {} {}", log_severity, now(), msg);
    }
}
