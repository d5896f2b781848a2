mod cli;
mod error;
mod logging;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{debug, error, info, warn};
use relwatch_core::{
    FetchError, HttpTransport, PollInterval, Release, ReleaseChecker, StateChanged, StateField,
    UpdateCallback, UpdateMonitor,
};
use relwatch_platform::AppPaths;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::cli::Cli;
use crate::error::RunError;
use crate::settings::{AppSettings, MAX_POLL_INTERVAL_HOURS};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let paths = AppPaths::new();
    let (mut settings, load_error) = match &paths {
        Ok(paths) => match AppSettings::read_from(&paths.settings_file()) {
            Ok(settings) => (settings, None),
            Err(error) => (AppSettings::default(), Some(error)),
        },
        Err(_) => (AppSettings::default(), None),
    };
    cli.apply_to(&mut settings);

    match &paths {
        Ok(paths) => {
            logging::init_logging(paths, settings.debug_logging, settings.max_log_size_bytes);
        }
        Err(error) => eprintln!("relwatch: logging disabled: {error}"),
    }
    if let Some(error) = load_error {
        warn!("Using default settings: {error}");
        eprintln!("relwatch: using default settings: {error}");
    }

    if cli.save {
        let saved = match &paths {
            Ok(paths) => settings.save(paths),
            Err(error) => Err(std::io::Error::other(error.to_string())),
        };
        if let Err(error) = saved {
            warn!("Failed to save settings: {error}");
        }
    }

    match run(&cli, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");
            eprintln!("relwatch: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, settings: &AppSettings) -> Result<(), RunError> {
    let transport = HttpTransport::new(settings.http_timeout())?;
    let checker = ReleaseChecker::new(
        settings.account.clone(),
        settings.repository.clone(),
        Arc::new(transport),
    )
    .with_base_url(settings.api_base_url.as_str());

    if let Some(release_id) = &cli.show {
        let release = checker.fetch_release(release_id).await?;
        print_release(&release);
        return Ok(());
    }

    let current = settings
        .current_version
        .clone()
        .ok_or(RunError::MissingCurrentVersion)?;
    let monitor = UpdateMonitor::new(checker);
    let changes = monitor.subscribe_changes();
    let errors = monitor.subscribe_errors();

    let interval = settings
        .poll_interval()
        .ok_or(RunError::IntervalOutOfRange {
            hours: settings.poll_interval_hours,
            max: MAX_POLL_INTERVAL_HOURS,
        })?;
    let on_update = update_reporter(settings);
    monitor.start(current, Some(on_update), interval)?;

    if interval == PollInterval::Infinite {
        return single_check(&monitor, errors).await;
    }

    watch(changes, errors).await;
    monitor.stop();
    Ok(())
}

fn update_reporter(settings: &AppSettings) -> UpdateCallback {
    let auto_download = settings.auto_download;
    let asset_index = settings.download_asset;

    Arc::new(move |release: &Release| {
        println!(
            "Update available: {} ({})",
            release.version, release.permalink
        );
        if auto_download && let Err(error) = release.launch_download(asset_index) {
            warn!("Not downloading {}: {error}", release.version);
            eprintln!("relwatch: not downloading {}: {error}", release.version);
        }
    })
}

async fn single_check(
    monitor: &UpdateMonitor,
    mut errors: broadcast::Receiver<FetchError>,
) -> Result<(), RunError> {
    let mut state = monitor.watch_state();
    if state
        .wait_for(|state| state.last_checked.is_some())
        .await
        .is_err()
    {
        return Ok(());
    }

    monitor.wait_idle().await;

    if let Ok(error) = errors.try_recv() {
        return Err(error.into());
    }
    if !monitor.state().update_available {
        println!("Up to date");
    }
    Ok(())
}

async fn watch(
    mut changes: broadcast::Receiver<StateChanged>,
    mut errors: broadcast::Receiver<FetchError>,
) {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
            change = changes.recv() => match change {
                Ok(change) if change.field == StateField::LastChecked => {
                    debug!("Checked for releases at {}", change.new);
                }
                Ok(change) => info!("{:?}: {} -> {}", change.field, change.old, change.new),
                Err(RecvError::Lagged(missed)) => debug!("Missed {missed} state changes"),
                Err(RecvError::Closed) => break,
            },
            failure = errors.recv() => match failure {
                Ok(failure) => eprintln!("relwatch: release check failed: {failure}"),
                Err(RecvError::Lagged(missed)) => debug!("Missed {missed} check failures"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn print_release(release: &Release) {
    println!("{} ({})", release.name, release.version);
    println!("{}", release.permalink);
    if release.prerelease {
        println!("pre-release");
    }
    for (index, asset) in release.assets.iter().enumerate() {
        println!("  [{index}] {} ({} bytes)", asset.name, asset.size);
    }
    if !release.notes.is_empty() {
        println!();
        println!("{}", release.notes);
    }
}
