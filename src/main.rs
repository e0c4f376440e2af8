//! Terminal host for the recorder
//!
//! Enter (or `r`) toggles recording, `s` prints the recorder status, `p`
//! asks for permissions again and `q` quits, saving any active session.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use geocam_lib::capture::VideoQuality;
use geocam_lib::commands::{spawn_recorder, RecorderHandle};
use geocam_lib::config::{RecorderConfig, SamplingPolicy};
use geocam_lib::permissions::{Capability, PERMISSION_REQUEST_CODE};
use geocam_lib::recorder::{NoticeDuration, RecordingState};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

fn cli() -> Command {
    Command::new("geocam")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Record video while logging the device location every second")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON configuration file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("base-dir")
                .long("base-dir")
                .help("Put Movies/ and Documents/ under this directory")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("movies-dir")
                .long("movies-dir")
                .help("Directory for recorded videos")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("documents-dir")
                .long("documents-dir")
                .help("Directory for location logs")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("policy")
                .long("policy")
                .help("Location sampling: push (subscription) or poll (last known fix)")
                .value_parser(["push", "poll"])
                .value_name("POLICY"),
        )
        .arg(
            Arg::new("interval-ms")
                .long("interval-ms")
                .help("Sampling period in milliseconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .value_name("MS"),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .help("Location trace to replay (JSON or lat,lon lines)")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .help("Camera device passed to ffmpeg")
                .value_name("DEVICE"),
        )
        .arg(
            Arg::new("input-format")
                .long("input-format")
                .help("ffmpeg input format for the camera (v4l2, avfoundation, dshow, lavfi)")
                .value_name("FORMAT"),
        )
        .arg(
            Arg::new("ffmpeg")
                .long("ffmpeg")
                .help("ffmpeg executable")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("quality")
                .long("quality")
                .help("Video quality")
                .value_parser(["sd", "hd", "fhd"])
                .value_name("QUALITY"),
        )
        .arg(
            Arg::new("grant")
                .long("grant")
                .help("Treat a capability as granted (camera, coarse-location, fine-location)")
                .value_name("CAPABILITY")
                .action(clap::ArgAction::Append),
        )
}

/// Load the config file (if any) and apply command-line overrides
fn resolve_config(matches: &ArgMatches) -> Result<RecorderConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => RecorderConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config {}", path))?,
        None => RecorderConfig::default(),
    };

    if let Some(base) = matches.get_one::<String>("base-dir") {
        config = config.with_base_dir(Path::new(base));
    }
    if let Some(dir) = matches.get_one::<String>("movies-dir") {
        config.movies_dir = PathBuf::from(dir);
    }
    if let Some(dir) = matches.get_one::<String>("documents-dir") {
        config.documents_dir = PathBuf::from(dir);
    }
    if let Some(policy) = matches.get_one::<String>("policy") {
        config.sampling = policy.parse::<SamplingPolicy>().map_err(anyhow::Error::msg)?;
    }
    if let Some(interval) = matches.get_one::<u64>("interval-ms") {
        config.interval_ms = *interval;
    }
    if let Some(trace) = matches.get_one::<String>("trace") {
        config.location.trace_path = Some(PathBuf::from(trace));
    }
    if let Some(device) = matches.get_one::<String>("device") {
        config.capture.device = device.clone();
    }
    if let Some(format) = matches.get_one::<String>("input-format") {
        config.capture.input_format = format.clone();
    }
    if let Some(ffmpeg) = matches.get_one::<String>("ffmpeg") {
        config.capture.ffmpeg_path = PathBuf::from(ffmpeg);
    }
    if let Some(quality) = matches.get_one::<String>("quality") {
        config.capture.quality = quality.parse::<VideoQuality>().map_err(anyhow::Error::msg)?;
    }
    if let Some(grants) = matches.get_many::<String>("grant") {
        for grant in grants {
            let capability = grant.parse::<Capability>().map_err(anyhow::Error::msg)?;
            if !config.granted_permissions.contains(&capability) {
                config.granted_permissions.push(capability);
            }
        }
    }

    Ok(config)
}

/// Ask on the terminal and forward the answer as a permission result
async fn prompt_permissions(
    handle: &RecorderHandle,
    input: &mut Lines<BufReader<Stdin>>,
    missing: &[Capability],
) -> Result<()> {
    let names: Vec<_> = missing.iter().map(Capability::identifier).collect();
    println!("Grant access to {}? [y/N]", names.join(", "));

    let answer = input.next_line().await?.unwrap_or_default();
    let granted = matches!(answer.trim(), "y" | "Y" | "yes");

    let results = Capability::REQUIRED
        .iter()
        .map(|c| (*c, granted || !missing.contains(c)))
        .collect();
    handle
        .permissions_result(PERMISSION_REQUEST_CODE, results)
        .await
        .map_err(anyhow::Error::msg)
}

async fn ensure_armed(handle: &RecorderHandle, input: &mut Lines<BufReader<Stdin>>) -> Result<()> {
    if handle.arm().await.map_err(anyhow::Error::msg)? {
        return Ok(());
    }

    let status = handle.get_recording_state().await.map_err(anyhow::Error::msg)?;
    if !status.missing_permissions.is_empty() {
        prompt_permissions(handle, input, &status.missing_permissions).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    geocam_lib::init_tracing();

    let matches = cli().get_matches();
    let config = resolve_config(&matches)?;

    tracing::info!("Starting geocam v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Config: {:?}", config);

    let controller = geocam_lib::build_controller(&config).context("Failed to set up recorder")?;
    let (handle, task) = spawn_recorder(controller);

    let mut notices = handle.notices();
    let printer = tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice.duration() {
                NoticeDuration::Long => println!(">> {}", notice),
                NoticeDuration::Short => println!("> {}", notice),
            }
        }
    });

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    ensure_armed(&handle, &mut input).await?;

    println!("[Enter/r] record/stop  [s] status  [p] permissions  [q] quit");

    while let Some(line) = input.next_line().await? {
        match line.trim() {
            "" | "r" => match handle.toggle_recording().await {
                Ok(RecordingState::Recording) => println!("Recording... press Enter to stop"),
                Ok(RecordingState::Idle) => {}
                Err(e) => tracing::error!("Toggle failed: {}", e),
            },
            "s" => {
                let status = handle.get_recording_state().await.map_err(anyhow::Error::msg)?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            "p" => ensure_armed(&handle, &mut input).await?,
            "q" => break,
            other => println!("Unknown command: {}", other),
        }
    }

    handle.shutdown().await.map_err(anyhow::Error::msg)?;
    task.await.context("Recorder task panicked")?;

    // The notice channel closes once the last handle is gone, letting the
    // printer finish the notices from the final flush
    drop(handle);
    printer.await.context("Notice printer panicked")?;

    tracing::info!("geocam stopped");
    Ok(())
}
