//! Utilities pertaining to filesystem and other os-level settings
//!

use camino::Utf8Path;
use simple_error::{SimpleResult, bail};

/// Create a novel directory path if it does not exist already
///
/// If the directory already exists no operations are performed
///
/// * `label` - used to describe the error directory in an error message
///
pub fn create_dir_all(dir: &Utf8Path, label: &str) -> SimpleResult<()> {
    if !dir.is_dir() {
        if let Err(e) = std::fs::create_dir_all(dir) {
            bail!("Can't create new {} directory at '{}': {}", label, dir, e);
        }
    }
    Ok(())
}

/// Peak resident set size of this process in megabytes
///
/// Returns None if the usage query fails.
///
pub fn get_max_rss_mb() -> Option<f64> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::uninit();
    let ret = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if ret != 0 {
        return None;
    }
    let usage = unsafe { usage.assume_init() };

    // ru_maxrss is reported in bytes on macOS and kilobytes elsewhere
    let max_rss = usage.ru_maxrss as f64;
    let max_rss_mb = if cfg!(target_os = "macos") {
        max_rss / (1024.0 * 1024.0)
    } else {
        max_rss / 1024.0
    };
    Some(max_rss_mb)
}
