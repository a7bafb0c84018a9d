use std::ffi::CStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current time in the format YYYY-MM-DD HH:MM:SS TZ
#[cfg(target_family = "unix")]
pub fn now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0) as libc::time_t;

    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    let mut buf = [0 as libc::c_char; 100];
    let fmt = c"%Y-%m-%d %H:%M:%S %Z";

    unsafe {
        libc::localtime_r(&secs, &mut tm);
        libc::strftime(buf.as_mut_ptr(), buf.len(), fmt.as_ptr(), &tm);
        CStr::from_ptr(buf.as_ptr()).to_string_lossy().to_string()
    }
}

/// Returns the current time in the format YYYY-MM-DD HH:MM:SS
#[cfg(target_family = "windows")]
pub fn now() -> String {
    let mut tm: windows_sys::Win32::Foundation::SYSTEMTIME = unsafe { std::mem::zeroed() };

    unsafe {
        windows_sys::Win32::System::SystemInformation::GetLocalTime(&mut tm);
    }

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        tm.wYear, tm.wMonth, tm.wDay, tm.wHour, tm.wMinute, tm.wSecond
    )
}
