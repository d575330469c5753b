// Command line front end for OE10 pan-tilt units
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use oe10_ptu::config::{AxisLimits, DEFAULT_MOVE_SPEED, DriverConfig, FULL_TURN_DEG};
use oe10_ptu::ptu::{Driver, PtuError};

#[derive(Parser, Debug)]
#[command(
    name = "oe10-ptu",
    version,
    about = "Control a Kongsberg OE10 pan-tilt unit"
)]
struct Cli {
    /// Device URI, e.g. serial:///dev/ttyUSB0:9600 or tcp://192.168.1.20:4001
    device: String,

    /// Device ID, 0xFF for broadcast
    #[arg(value_parser = parse_device_id)]
    device_id: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Largest accepted pan angle, in degrees
    #[arg(long, global = true, default_value_t = FULL_TURN_DEG)]
    pan_max: u16,

    /// Largest accepted tilt angle, in degrees (some units stop at 270)
    #[arg(long, global = true, default_value_t = FULL_TURN_DEG)]
    tilt_max: u16,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report the device's general info
    Info,
    /// Report the axis positions, speeds and end stop usage
    Status,
    /// Move the pan axis to ANGLE degrees at SPEED (fraction of max)
    Pan {
        #[arg(allow_negative_numbers = true)]
        angle: f64,
        #[arg(default_value_t = DEFAULT_MOVE_SPEED)]
        speed: f32,
    },
    /// Move the tilt axis to ANGLE degrees at SPEED (fraction of max)
    Tilt {
        #[arg(allow_negative_numbers = true)]
        angle: f64,
        #[arg(default_value_t = DEFAULT_MOVE_SPEED)]
        speed: f32,
    },
}

/// Accept decimal or 0x-prefixed hexadecimal ids
fn parse_device_id(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid device ID '{s}': {e}"))
}

fn run(cli: Cli) -> Result<(), PtuError> {
    let config = DriverConfig {
        limits: AxisLimits {
            pan_max_deg: cli.pan_max,
            tilt_max_deg: cli.tilt_max,
        },
        ..DriverConfig::default()
    };
    let mut driver = Driver::open_with_config(&cli.device, config)?;
    let id = cli.device_id;

    match cli.command {
        Command::Info => {
            let status = driver.get_status(id)?;
            if cli.json {
                print_json(&status);
            } else {
                println!("Capabilities");
                println!("  Pan: {}", status.ptu.pan);
                println!("  Tilt: {}", status.ptu.tilt);
                println!("Temperature: {}", status.temperature);
                println!("Humidity: {}", status.humidity);
                println!("Pan: {}", status.pan.to_degrees().round());
                println!("Tilt: {}", status.tilt.to_degrees().round());
            }
        }
        Command::Status => {
            let status = driver.get_pan_tilt_status(id)?;
            if cli.json {
                print_json(&status);
            } else {
                println!("Status");
                println!("Pan Speed: {}", status.pan_speed);
                println!("Tilt Speed: {}", status.tilt_speed);
                println!("Pan: {} deg", status.pan.to_degrees().round());
                println!("Tilt: {} deg", status.tilt.to_degrees().round());
                println!("Uses Pan Stop: {}", status.uses_pan_stop);
                println!("Uses Tilt Stop: {}", status.uses_tilt_stop);
            }
        }
        Command::Pan { angle, speed } => {
            driver.set_pan_speed(id, speed)?;
            driver.set_pan_position(id, angle.to_radians())?;
        }
        Command::Tilt { angle, speed } => {
            driver.set_tilt_speed(id, speed)?;
            driver.set_tilt_position(id, angle.to_radians())?;
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn main() {
    // Setup logging (set RUST_LOG=debug to see every frame)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            let _ = e.print();
            return;
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(-1);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
