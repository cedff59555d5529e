//! Helper binary for the Gleaner farm assistant.
//!
//! This is the main entry point that wires together the configuration,
//! the demo farm harness, and the pass loop. It loads configuration,
//! initializes structured logging, seeds the scripted demo world, and
//! runs the loop until stopped.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `gleaner-config.yaml` (or the first CLI
//!    argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the demo farm world from the `demo` config section
//! 4. Assemble the pass loop
//! 5. Wire Ctrl-C to the stop handle
//! 6. Run the loop
//! 7. Log the final quota snapshot

mod error;
mod harness;

use std::path::Path;

use chrono::Local;
use gleaner_core::config::GleanerConfig;
use gleaner_core::runner::PassLoop;
use gleaner_types::UserId;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::harness::HarnessConfig;

/// Application entry point for the helper.
///
/// # Errors
///
/// Returns an error if configuration loading or world construction
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_arg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("gleaner-config.yaml"));
    let config_path = Path::new(&config_arg);
    let config = load_config(config_path)?;

    // 2. Initialize structured logging. `RUST_LOG` overrides the
    //    configured default level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("gleaner-engine starting");
    info!(
        config_file = %config_path.display(),
        found = config_path.exists(),
        enabled = config.helper.enabled,
        self_id = config.helper.self_id,
        pass_interval_secs = config.helper.pass_interval_secs,
        call_pause_ms = config.helper.call_pause_ms,
        quiet_hours = config.quiet_hours.enabled,
        mischief = config.features.mischief_enabled,
        "Configuration loaded"
    );

    // 3. Build the demo farm world.
    let harness_config = load_harness_config(config_path)?;
    info!(
        friend_count = harness_config.friend_count,
        lands_per_farm = harness_config.lands_per_farm,
        "Harness configuration loaded"
    );
    let farm = harness::build_demo_farm(&harness_config, UserId::new(config.helper.self_id))?;

    // 4. Assemble the pass loop.
    let today = Local::now().date_naive();
    let mut pass_loop = PassLoop::new(farm, &config, today);
    info!("Pass loop assembled");

    // 5. Stop at the next pass or target boundary on Ctrl-C.
    let stop = pass_loop.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; stopping at the next boundary");
            stop.request_stop();
        }
    });

    // 6. Run until stopped.
    pass_loop.run().await;

    // 7. Log the final quota snapshot.
    for entry in pass_loop.quota_snapshot() {
        info!(
            kind = %entry.kind,
            count_today = entry.count_today,
            count_limit = entry.count_limit,
            remaining = entry.remaining,
            "Final quota"
        );
    }
    info!("gleaner-engine shutdown complete");

    Ok(())
}

/// Load the main helper configuration.
///
/// A missing file yields the built-in defaults so the binary stays
/// runnable without any setup.
fn load_config(path: &Path) -> Result<GleanerConfig, EngineError> {
    if path.exists() {
        Ok(GleanerConfig::from_file(path)?)
    } else {
        Ok(GleanerConfig::default())
    }
}

/// Load the demo harness configuration.
///
/// Reads the `demo` section from the YAML config file. If the file does
/// not exist or lacks the `demo` key, defaults are used.
fn load_harness_config(path: &Path) -> Result<HarnessConfig, EngineError> {
    if !path.exists() {
        return Ok(HarnessConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Harness {
        message: format!("failed to read config file: {e}"),
    })?;

    // Parse the full YAML and extract just the "demo" section.
    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Harness {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    raw.get("demo").map_or_else(
        || Ok(HarnessConfig::default()),
        |demo_value| {
            serde_yml::from_value(demo_value.clone()).map_err(|e| EngineError::Harness {
                message: format!("failed to parse demo config: {e}"),
            })
        },
    )
}
