#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{Level as TraceLevel, debug};
use tracing_subscriber::FmtSubscriber;

use wallsaver::config::Settings;
use wallsaver::{
    DesktopSettings, DirectoryCatalog, IndexedDisplays, Scope, ScreenIdentifier, WallpaperOptions,
    WallpaperStyle,
};

#[derive(Debug, Parser)]
#[command(
    name = "wallsaver",
    version,
    about = "Manage macOS screen saver and wallpaper settings"
)]
struct Cli {
    /// Target display UUID
    #[arg(long, global = true)]
    display: Option<String>,

    /// Target display by numeric screen id
    #[arg(long, global = true, conflicts_with = "display")]
    screen: Option<u32>,

    /// Target space UUID
    #[arg(long, global = true)]
    space: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Settings file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List installed screen saver modules
    List,
    /// List spaces
    ListSpaces,
    /// List displays
    ListDisplays,
    /// Show the active screen saver
    Get,
    /// Set the screen saver (everywhere unless a target is given)
    Set { module: String },
    /// Show the active wallpaper
    GetWallpaper,
    /// Set the wallpaper image
    SetWallpaper {
        image: PathBuf,
        #[arg(long, default_value_t = WallpaperStyle::Fill)]
        style: WallpaperStyle,
    },
    /// Show or set the idle time in seconds (0 = never)
    IdleTime { seconds: Option<u32> },
    /// Copy the store to <store>.backup
    Backup,
    /// Replace the store with a backup copy
    Restore { backup: PathBuf },
    /// SHA-256 of the store file
    Checksum,
}

fn init_logging(settings: &Settings) -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| settings.log_level.clone())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "info" => TraceLevel::INFO,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;
    Ok(())
}

fn build(settings: &Settings) -> Result<DesktopSettings> {
    let locations = settings.locations();
    let probe = settings.version_probe()?;
    let catalog = DirectoryCatalog::new(settings.module_dirs.clone());
    Ok(match settings.configured_displays() {
        Some(displays) => DesktopSettings::new(locations, probe, displays, catalog),
        None => {
            let displays = IndexedDisplays::new(&settings.spaces_path);
            DesktopSettings::new(locations, probe, displays, catalog)
        }
    })
}

/// Scope selected by `--display`/`--screen`/`--space`
fn scope(cli: &Cli, desktop: &DesktopSettings) -> Result<Scope> {
    let display = match (&cli.display, cli.screen) {
        (Some(uuid), _) => Some(uuid.clone()),
        (None, Some(id)) => Some(
            desktop
                .display_for_screen(ScreenIdentifier(id))
                .context(format!("Failed to resolve screen {id}"))?,
        ),
        (None, None) => None,
    };
    Ok(match (cli.space.clone(), display) {
        (Some(space), Some(display)) => Scope::Space { space, display },
        (Some(space), None) => Scope::SpaceDefault(space),
        (None, Some(display)) => Scope::Display(display),
        (None, None) => Scope::Global,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn run(cli: &Cli, desktop: &DesktopSettings) -> Result<()> {
    match &cli.command {
        Command::List => {
            let modules = desktop.list_screensavers().context("Failed to list screen savers")?;
            if cli.json {
                return print_json(&modules);
            }
            for m in &modules {
                let system = if m.is_system { " (system)" } else { "" };
                println!("{:<32} {:<14} {}{system}", m.name, m.kind, m.identifier);
            }
        }
        Command::ListSpaces => {
            let spaces = desktop.spaces().context("Failed to read spaces")?;
            if cli.json {
                return print_json(&spaces);
            }
            for s in &spaces {
                let mut flags = Vec::new();
                if s.is_current {
                    flags.push("current");
                }
                if s.is_historical() {
                    flags.push("historical");
                }
                println!("{:>4}  {:<38} {:<38} {}", s.id, s.uuid, s.display, flags.join(","));
            }
        }
        Command::ListDisplays => {
            let displays = desktop.displays().context("Failed to enumerate displays")?;
            if cli.json {
                return print_json(&displays);
            }
            for d in &displays {
                let screen = d.screen.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
                let main = if d.is_main { " (main)" } else { "" };
                println!("{screen:>4}  {}{main}", d.uuid);
            }
        }
        Command::Get => {
            let scope = scope(cli, desktop)?;
            let active = desktop
                .screensaver(&scope)
                .context(format!("Failed to read screen saver for {scope}"))?;
            if cli.json {
                return print_json(&active);
            }
            match active {
                Some(a) => println!(
                    "{} ({}) [{:?}]",
                    a.name.as_deref().unwrap_or("<unnamed>"),
                    a.kind,
                    a.source
                ),
                None => println!("No screen saver set"),
            }
        }
        Command::Set { module } => {
            let scope = scope(cli, desktop)?;
            let written = desktop
                .set_screensaver(&scope, module)
                .context(format!("Failed to set screen saver '{module}' for {scope}"))?;
            println!("Set {module} for {scope} ({written} entries)");
        }
        Command::GetWallpaper => {
            let scope = scope(cli, desktop)?;
            let active = desktop
                .wallpaper(&scope)
                .context(format!("Failed to read wallpaper for {scope}"))?;
            if cli.json {
                return print_json(&active);
            }
            match active {
                Some(w) => println!(
                    "{} ({}) [{:?}]",
                    w.url.as_deref().unwrap_or("<unknown>"),
                    w.style.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                    w.source
                ),
                None => println!("No wallpaper set"),
            }
        }
        Command::SetWallpaper { image, style } => {
            let scope = scope(cli, desktop)?;
            let written = desktop
                .set_wallpaper(&scope, image, WallpaperOptions { style: *style })
                .context(format!("Failed to set wallpaper {} for {scope}", image.display()))?;
            println!("Set wallpaper for {scope} ({written} entries)");
        }
        Command::IdleTime { seconds: Some(seconds) } => {
            desktop.set_idle_time(*seconds).context("Failed to set idle time")?;
            println!("Idle time set to {seconds}s");
        }
        Command::IdleTime { seconds: None } => {
            match desktop.idle_time().context("Failed to read idle time")? {
                Some(secs) if cli.json => print_json(&secs)?,
                Some(secs) => println!("{secs}"),
                None => println!("Idle time not set"),
            }
        }
        Command::Backup => {
            let path = desktop.backup().context("Failed to back up store")?;
            println!("{}", path.display());
        }
        Command::Restore { backup } => {
            desktop
                .restore(backup)
                .context(format!("Failed to restore {}", backup.display()))?;
            println!("Restored {}", backup.display());
        }
        Command::Checksum => {
            println!("{}", desktop.checksum().context("Failed to checksum store")?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config_path, first_run) = Settings::locate(cli.config.as_deref());
    let mut settings = Settings::read(&config_path)?;
    init_logging(&settings)?;
    settings.finish(&config_path, first_run)?;
    debug!(?settings, "Loaded settings");

    let desktop = build(&settings)?;
    run(&cli, &desktop)
}
