//! SkyCast CLI
//!
//! Terminal front end for the weather screen.

mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skycast_core::{App, Config, Units};
use skycast_screen::ForecastScreen;
use skycast_weather::{Coordinates, FileStore, RecentLocationsStore};
use tokio::io::{AsyncBufReadExt, BufReader};

/// SkyCast weather lookup
#[derive(Parser)]
#[command(name = "skycast")]
#[command(author, version, about = "Five-day weather forecasts in the terminal", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Measurement system, overrides the config file
    #[arg(long, global = true)]
    units: Option<Units>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast for the current location
    Here {
        /// Latitude, skips the location lookup
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude, skips the location lookup
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// Forecast for a city by name
    Search {
        /// City name, e.g. "San Francisco" or "Paris,FR"
        #[arg(required = true)]
        city: Vec<String>,
    },

    /// List or clear recent searches
    Recent {
        /// Forget all recent searches
        #[arg(long)]
        clear: bool,
    },

    /// Type to search; each line is a new search text
    ///
    /// Commands: `:units` toggles units, `:recent` lists recent searches,
    /// `:recent N` searches entry N, `:clear` forgets them, `:quit` exits.
    Interactive,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(units) = cli.units {
        config.weather.units = units;
    }
    Ok(config)
}

fn file_store(config: &Config) -> FileStore {
    FileStore::new(&config.storage.data_dir)
}

fn build_screen(config: &Config) -> Result<ForecastScreen<FileStore>> {
    ForecastScreen::from_config(config, file_store(config)).map_err(|e| {
        tracing::error!("Failed to set up weather screen: {}", e);
        anyhow::anyhow!(e.user_message())
    })
}

/// Print the outcome of a one-shot command; an alert makes the command fail.
fn finish(screen: &ForecastScreen<FileStore>) -> Result<()> {
    let state = screen.state();
    if let Some(alert) = &state.alert {
        anyhow::bail!("{}", alert);
    }
    match &state.forecast {
        Some(list) => print!("{}", render::forecast(list)),
        None => println!("No forecast to show."),
    }
    Ok(())
}

async fn here(config: &Config, lat: Option<f64>, lon: Option<f64>) -> Result<()> {
    let mut screen = build_screen(config)?;
    match (lat, lon) {
        (Some(lat), Some(lon)) => screen.show_coordinates(Coordinates::new(lat, lon)),
        _ => screen.start(),
    }
    screen.settle().await;
    finish(&screen)
}

async fn search(config: &Config, city: &str) -> Result<()> {
    let mut screen = build_screen(config)?;
    screen.on_text_changed(city);
    screen.submit_search();
    screen.settle().await;

    if screen.state().forecast.is_none() && screen.state().alert.is_none() {
        anyhow::bail!(
            "Type at least {} characters to search",
            config.search.min_query_chars
        );
    }
    finish(&screen)
}

fn recent(config: &Config, clear: bool) -> Result<()> {
    let store = RecentLocationsStore::new(file_store(config));
    if clear {
        store.clear().context("Failed to clear recent searches")?;
        println!("Recent searches cleared.");
    } else {
        print!("{}", render::recent(&store.load()));
    }
    Ok(())
}

/// Apply one line of interactive input. Returns false to quit.
fn handle_line(screen: &mut ForecastScreen<FileStore>, line: &str) -> bool {
    let trimmed = line.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);

    match parts.next() {
        Some(":quit") | Some(":q") => return false,
        Some(":units") => screen.toggle_units(),
        Some(":clear") => {
            screen.clear_recent();
            println!("Recent searches cleared.");
        }
        Some(":recent") => match parts.next().map(|n| n.trim().parse::<usize>()) {
            None => print!("{}", render::recent(&screen.state().recent)),
            Some(Ok(n)) if n > 0 && screen.select_recent(n - 1) => {}
            Some(_) => println!("No recent search with that number."),
        },
        _ => screen.on_text_changed(trimmed),
    }
    true
}

async fn interactive(config: &Config) -> Result<()> {
    let mut screen = build_screen(config)?;
    screen.start();

    println!("Type a city to search. :units, :recent [N], :clear, :quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read input")? {
                    Some(line) => {
                        if !handle_line(&mut screen, &line) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            Some(msg) = screen.recv() => {
                screen.handle_message(msg);
                if !screen.is_busy() {
                    print!("{}", render::screen(screen.state()));
                    screen.dismiss_alert();
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    skycast_core::init(log_filter_from_verbosity(cli.verbose))?;

    let config = load_config(&cli)?;
    let mut app = App::with_config(config)?;
    for warning in app.warnings() {
        tracing::warn!("Config: {}", warning);
    }

    let config = app.shared_config();
    let result = match cli.command {
        Commands::Here { lat, lon } => here(&config, lat, lon).await,
        Commands::Search { city } => search(&config, &city.join(" ")).await,
        Commands::Recent { clear } => recent(&config, clear),
        Commands::Interactive => interactive(&config).await,
    };

    app.shutdown()?;
    result
}
