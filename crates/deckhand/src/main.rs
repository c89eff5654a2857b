//! Binary entrypoint for the deckhand daemon.

use std::{env, path::PathBuf, process, sync::Arc};

use clap::Parser;
use deckhand_device::{Device, SimDevice};
use deckhand_engine::{CommandSpawner, Deck, Engine, EngineHandle, ResourceGroup, Services};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*};

mod ipc;

/// Name of the resource group spawned children are moved into.
const CHILD_SCOPE: &str = "deckhand.scope";

#[derive(Parser, Debug)]
#[command(
    name = "deckhand",
    about = "Driver daemon for multi-button key/display decks",
    version
)]
/// Command-line interface for the `deckhand` binary.
struct Cli {
    /// Deck file to load at startup, relative to the working directory
    #[arg(long, value_name = "PATH", default_value = "main.deck")]
    deck: PathBuf,

    /// Serial number of the deck to open when several are connected
    #[arg(long, value_name = "SERIAL")]
    device: Option<String>,

    /// Initial panel brightness in percent
    #[arg(long, value_name = "PERCENT", default_value_t = 80)]
    brightness: u8,

    /// Drive a simulated deck with the given key count instead of hardware
    #[arg(long, value_name = "KEYS")]
    simulate: Option<u8>,

    /// Logging controls
    #[command(flatten)]
    log: logging::LogArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter = logging::env_filter_from_spec(&cli.log.spec());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().without_time())
        .try_init()
        .ok();

    if let Err(e) = run(cli).await {
        error!("{}", e.pretty());
        process::exit(1);
    }
}

async fn run(cli: Cli) -> deckhand_engine::Result<()> {
    let dev = open_device(&cli)?;
    let geometry = dev.geometry();
    info!(
        keys = geometry.keys,
        rows = geometry.rows,
        columns = geometry.columns,
        "deck opened"
    );

    let group = Arc::new(ResourceGroup::create(CHILD_SCOPE));
    let services = Services {
        ipc: Some(Arc::new(ipc::DbusCaller)),
        spawner: CommandSpawner::new(group),
        ..Services::detached()
    };
    warn!("audio, input, clipboard, and window collaborators are not configured; dependent actions log and skip");

    let cwd = env::current_dir()?;
    let deck = Deck::load(geometry, &cwd, &cli.deck, &services)?;

    let engine = Engine::new(dev, deck, services, cli.brightness.clamp(1, 100));
    spawn_signal_task(engine.handle());
    engine.run().await
}

/// Open the device named on the command line, or a simulator.
fn open_device(cli: &Cli) -> deckhand_engine::Result<Arc<dyn Device>> {
    if let Some(keys) = cli.simulate {
        info!(keys, "driving a simulated deck");
        let dev = Arc::new(SimDevice::new(keys));
        // Leftover firmware state (stale images, a sleeping panel) is
        // wiped before the first render.
        dev.reset()?;
        return Ok(dev);
    }
    // No hardware transport is wired into this build.
    if let Some(serial) = &cli.device {
        warn!(serial, "device selection has no effect without hardware support");
    }
    Err(deckhand_device::Error::NotFound.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_flag_opens_a_reset_simulator() {
        let cli = Cli::parse_from(["deckhand", "--simulate", "6"]);
        let dev = open_device(&cli).unwrap();
        assert_eq!(dev.geometry().keys, 6);
    }

    #[test]
    fn no_hardware_is_reported_at_open() {
        let cli = Cli::parse_from(["deckhand"]);
        assert!(open_device(&cli).is_err());
    }
}

/// Map process signals onto engine control messages: SIGINT/SIGTERM
/// shut down, SIGHUP reloads the deck file.
fn spawn_signal_task(handle: EngineHandle) {
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};
        let (mut interrupt, mut terminate, mut hangup) = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
            signal(SignalKind::hangup()),
        ) {
            (Ok(i), Ok(t), Ok(h)) => (i, t, h),
            _ => {
                warn!("cannot install signal handlers");
                return;
            }
        };
        loop {
            tokio::select! {
                _ = interrupt.recv() => {
                    info!("interrupt received; shutting down");
                    handle.shutdown();
                }
                _ = terminate.recv() => {
                    info!("termination requested; shutting down");
                    handle.shutdown();
                }
                _ = hangup.recv() => {
                    info!("hangup received; reloading deck");
                    handle.reload();
                }
            }
        }
    });
}
