//! trickster - Halloween prop controller
//!
//! Plays spooky sounds and jumps a servo when the button is pressed or the
//! HTTP API is called.

mod selftest;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

use trickster_core::{open_backend, open_driver, Config, Controller, SoundLibrary};
use trickster_http::{endpoint_summary, AppState};

/// How long a running sequence may hold up process exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "trickster")]
#[command(author, version, about = "Halloween prop controller: spooky sounds and a jumping servo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (default: ~/.config/trickster/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Folder with .wav/.mp3 files
    #[arg(long, global = true)]
    audio_folder: Option<PathBuf>,

    /// Address the HTTP API binds to
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port the HTTP API listens on
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Use simulated GPIO pins even on a Raspberry Pi
    #[arg(long, global = true)]
    simulate: bool,

    /// Do not open an audio device
    #[arg(long, global = true)]
    no_audio: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Start the controller and the HTTP API (default)
    Run,
    /// Load the audio folder and list what was found
    Sounds,
    /// Move the servo and blink the LED to check the wiring
    Selftest,
    /// Create a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show the configuration file path
    ConfigPath,
    /// Print version information
    Version,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init { force } => init_config(cli.config.as_deref(), force),
        Commands::ConfigPath => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::Version => {
            println!("trickster {}", env!("CARGO_PKG_VERSION"));
            println!(
                "  audio: {}, gpio: {}",
                if cfg!(feature = "audio") { "rodio" } else { "null only" },
                if cfg!(feature = "gpio") { "rppal" } else { "simulated only" }
            );
            Ok(())
        }
        Commands::Sounds => list_sounds(&load_config(&cli)?, cli.no_audio),
        Commands::Selftest => selftest::run(&load_config(&cli)?, cli.simulate),
        Commands::Run => run(load_config(&cli)?, cli.simulate, cli.no_audio),
    }
}

/// Defaults, then the config file, then `TRICKSTER_*`, then flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    config
        .apply_env()
        .context("Invalid TRICKSTER_* environment variable")?;

    if let Some(folder) = &cli.audio_folder {
        config.audio.folder = folder.clone();
    }
    if let Some(host) = &cli.host {
        config.api.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.api.port = port;
    }

    config.validate()?;
    Ok(config)
}

fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    Config::create_default_config_file(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Created default config at: {}", path.display());
    Ok(())
}

fn list_sounds(config: &Config, no_audio: bool) -> Result<()> {
    let folder = config.audio.folder.clone();
    let library = SoundLibrary::new(&folder, open_backend(no_audio));
    library.load(&folder);

    let assets = library.assets();
    println!("{} sounds in {}", assets.len(), folder.display());
    for asset in assets.iter() {
        println!(
            "  {} ({:.1}s, {} Hz, {} ch)",
            asset.filename,
            asset.clip.duration().as_secs_f64(),
            asset.clip.sample_rate(),
            asset.clip.channels()
        );
    }
    library.shutdown();
    Ok(())
}

fn run(config: Config, simulate: bool, no_audio: bool) -> Result<()> {
    log::info!("🎃 Trickster Halloween System Starting... 👻");

    let addr = resolve_bind_address(&config)?;

    // 1. Audio
    log::info!("1. Opening audio output...");
    let audio = open_backend(no_audio);
    log::info!("   ✓ Audio backend: {}", audio.name());

    // 2. GPIO
    log::info!("2. Setting up GPIO...");
    let pins = open_driver(&config, simulate);
    log::info!("   ✓ GPIO driver: {}", pins.name());

    // 3. Sounds and button
    log::info!("3. Loading sounds and arming the button...");
    let controller = Controller::start(config, audio, pins).context("Failed to start controller")?;
    log::info!(
        "   ✓ {} sounds loaded from {}",
        controller.library().len(),
        controller.config().audio.folder.display()
    );

    // 4. HTTP API
    log::info!("4. Starting REST API server...");
    log::info!("API endpoints available:");
    for (route, description) in endpoint_summary(&controller.delay_range_label()) {
        log::info!("  {} - {}", route, description);
    }
    log::info!("Press Ctrl+C to exit.");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    spawn_signal_listener(shutdown_tx)?;

    let state = AppState::from_controller(&controller);
    let served = runtime.block_on(trickster_http::serve(state, addr, async {
        let _ = shutdown_rx.await;
    }));

    log::info!("🎃 Exiting Trickster... 👻");
    controller.shutdown();
    // A sequence still running on the blocking pool is abandoned
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    served.with_context(|| format!("HTTP API server on {} failed", addr))?;
    log::info!("Cleanup completed. Happy Halloween! 🎃");
    Ok(())
}

fn resolve_bind_address(config: &Config) -> Result<SocketAddr> {
    let bind = config.bind_address();
    bind.to_socket_addrs()
        .with_context(|| format!("Invalid API address {}", bind))?
        .next()
        .with_context(|| format!("API address {} did not resolve", bind))
}

/// First SIGINT/SIGTERM starts a graceful shutdown, a second one exits.
fn spawn_signal_listener(shutdown: oneshot::Sender<()>) -> Result<()> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;

    thread::Builder::new()
        .name("trickster-signals".to_string())
        .spawn(move || {
            let mut shutdown = Some(shutdown);
            for signal in signals.forever() {
                match shutdown.take() {
                    Some(tx) => {
                        let name = if signal == SIGINT { "Ctrl+C" } else { "SIGTERM" };
                        log::info!("⚠️  Interrupted ({}), shutting down...", name);
                        let _ = tx.send(());
                    }
                    None => {
                        log::warn!("Second signal received, exiting immediately");
                        std::process::exit(130);
                    }
                }
            }
        })
        .context("Failed to start signal thread")?;
    Ok(())
}
