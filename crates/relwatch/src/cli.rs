use clap::Parser;

use crate::settings::{AppSettings, MAX_POLL_INTERVAL_HOURS};

/// Watch a GitHub repository and report releases newer than the installed
/// version.
#[derive(Debug, Default, Parser)]
#[command(name = "relwatch", version, about)]
pub struct Cli {
    /// User or organisation owning the repository
    #[arg(long)]
    pub account: Option<String>,

    /// Repository name, also sent as the User-Agent
    #[arg(long)]
    pub repository: Option<String>,

    /// Version tag considered installed
    #[arg(long = "current")]
    pub current_version: Option<String>,

    /// Hours between checks (minimum 1); 0 checks once and exits
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=MAX_POLL_INTERVAL_HOURS))]
    pub interval_hours: Option<u64>,

    /// API root, for GitHub Enterprise
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Open the release asset in the system handler when an update is found
    #[arg(long)]
    pub download: bool,

    /// Index of the asset to download when a release has several
    #[arg(long)]
    pub asset: Option<usize>,

    /// Print one release ("latest" or a numeric id) and exit
    #[arg(long, value_name = "ID")]
    pub show: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Persist the effective settings before running
    #[arg(long)]
    pub save: bool,
}

impl Cli {
    /// Overlay the flags that were given on top of `settings`.
    pub fn apply_to(&self, settings: &mut AppSettings) {
        if let Some(account) = &self.account {
            settings.account = Some(account.clone());
        }
        if let Some(repository) = &self.repository {
            settings.repository = Some(repository.clone());
        }
        if let Some(current_version) = &self.current_version {
            settings.current_version = Some(current_version.clone());
        }
        if let Some(hours) = self.interval_hours {
            settings.poll_interval_hours = hours;
        }
        if let Some(base) = &self.api_base_url {
            settings.api_base_url = base.clone();
        }
        if self.download {
            settings.auto_download = true;
        }
        if self.asset.is_some() {
            settings.download_asset = self.asset;
        }
        if self.debug {
            settings.debug_logging = true;
        }
    }
}
