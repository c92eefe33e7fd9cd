use clap::{Parser, Subcommand};
use panel_recognition::config::{load_config_or_default, ConfigFormat};
use panel_recognition::logging::{init_logging, LoggingConfig};
use panel_recognition::{Config, PanelCamera};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "panel")]
#[command(about = "Read an appliance control panel's power state and set temperature from a camera")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Capture device index, /dev/videoN path or stream URI
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Reference layout location (http(s) URL, file:// URL or path)
    #[arg(short, long, global = true)]
    reference: Option<String>,

    /// Bench-work logging: debug levels, alignment at trace, file locations
    #[arg(long, global = true)]
    bench: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current set temperature
    Temperature,

    /// Print whether the appliance is on
    Power,

    /// Print power state and, when on, the set temperature
    State,

    /// Validate the configuration and print it
    CheckConfig {
        /// Also write the effective configuration here (.json for JSON, TOML otherwise)
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(device) = cli.device.clone() {
        config.camera.device = device;
    }
    if let Some(reference) = cli.reference.clone() {
        config.reference.source = reference;
    }
    if cli.bench {
        config.logging = LoggingConfig {
            console_output: config.logging.console_output,
            json_console: config.logging.json_console,
            log_directory: config.logging.log_directory.take(),
            ..LoggingConfig::development()
        };
    }
    config.logging = config.logging.clone().with_verbosity(cli.verbose);

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("  - {error}");
        }
        anyhow::bail!("configuration has {} problem(s)", errors.len());
    }

    match command {
        Commands::CheckConfig { write } => {
            println!("{}", toml::to_string_pretty(config)?);
            if let Some(path) = write {
                config.save_to_file(&path, ConfigFormat::from_path(&path))?;
                println!("Configuration written to {}", path.display());
            }
            println!("Configuration is valid.");
        }
        Commands::Temperature => {
            let camera = PanelCamera::open(config)?;
            println!("{}", camera.get_temperature()?);
        }
        Commands::Power => {
            let camera = PanelCamera::open(config)?;
            let on = camera.is_power_on()?;
            println!("{}", if on { "on" } else { "off" });
        }
        Commands::State => {
            let camera = PanelCamera::open(config)?;
            if camera.is_power_on()? {
                println!("power: on");
                println!("temperature: {}", camera.get_temperature()?);
            } else {
                println!("power: off");
            }
        }
    }

    Ok(())
}
