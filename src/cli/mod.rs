mod build;
mod cleanup;
mod defaults;
mod shared;
mod utils;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use simple_error::SimpleResult;

pub use self::build::BuildSettings;
use self::build::validate_and_fix_build_settings;
pub use self::cleanup::CleanupSettings;
use self::cleanup::validate_and_fix_cleanup_settings;
pub use self::shared::SharedSettings;

#[derive(Subcommand)]
pub enum Commands {
    /// Build a new background SV set from the SV calls of all cases
    Build(BuildSettings),

    /// Delete superseded and stalled background SV sets
    Cleanup(CleanupSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    pub fn get_store_dir(&self) -> &Utf8Path {
        match &self.command {
            Commands::Build(x) => &x.store_dir,
            Commands::Cleanup(x) => &x.store_dir,
        }
    }
}

/// Validate settings and update parameters that can't be processed by clap
///
fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.command = match settings.command {
        Commands::Build(x) => {
            let x = validate_and_fix_build_settings(x)?;
            Commands::Build(x)
        }
        Commands::Cleanup(x) => {
            let x = validate_and_fix_cleanup_settings(x)?;
            Commands::Cleanup(x)
        }
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes no logger has been configured yet
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
