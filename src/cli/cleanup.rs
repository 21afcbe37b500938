use camino::Utf8PathBuf;
use clap::Args;
use simple_error::{SimpleResult, bail};

use super::defaults::CLEANUP_TIMEOUT_HOURS;

#[derive(Args)]
pub struct CleanupSettings {
    /// Background SV store directory
    #[arg(long, value_name = "DIR")]
    pub store_dir: Utf8PathBuf,

    /// Delete background SV sets which are not active and older than this many hours
    ///
    /// The two most recent active sets are always kept. A negative value keeps all sets which are
    /// not active.
    ///
    #[arg(
        long,
        env = "BGSV_CLEANUP_TIMEOUT_HOURS",
        default_value_t = CLEANUP_TIMEOUT_HOURS,
        allow_negative_numbers = true
    )]
    pub timeout_hours: i64,
}

pub fn validate_and_fix_cleanup_settings(
    settings: CleanupSettings,
) -> SimpleResult<CleanupSettings> {
    if !settings.store_dir.is_dir() {
        bail!(
            "Background SV store directory does not exist: '{}'",
            settings.store_dir
        );
    }
    Ok(settings)
}
