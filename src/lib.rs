//! geocam - video recording with per-second location logging.
//!
//! Records a camera to a video file while sampling the device position once
//! a second, then writes the samples to a text log when recording stops.

pub mod capture;
pub mod commands;
pub mod config;
pub mod location;
pub mod permissions;
pub mod persistence;
pub mod recorder;
pub mod utils;

use capture::FfmpegCapture;
use config::RecorderConfig;
use location::ReplayLocationSource;
use permissions::{ConfiguredPermissions, PermissionGate};
use persistence::FileSink;
use recorder::SessionController;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utils::error::AppResult;

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geocam=debug,geocam_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build a controller wired to the desktop services: ffmpeg capture, trace
/// replay for location, files for the logs.
pub fn build_controller(config: &RecorderConfig) -> AppResult<SessionController> {
    config.validate()?;

    let location = match &config.location.trace_path {
        Some(path) => ReplayLocationSource::from_file(path)?,
        None => {
            tracing::warn!("No location trace configured; sessions will have no fixes");
            ReplayLocationSource::new(Vec::new())
        }
    };

    let permissions = ConfiguredPermissions::new(config.granted_permissions.iter().copied());

    Ok(SessionController::new(
        config,
        Box::new(FfmpegCapture::new(config.capture.clone())),
        Box::new(location),
        Box::new(FileSink::new(&config.documents_dir)),
        PermissionGate::new(Box::new(permissions)),
    ))
}
