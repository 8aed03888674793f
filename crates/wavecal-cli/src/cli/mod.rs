mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use commands::{run_calibrate, CalibrateArgs};

pub fn run_from_env() -> i32 {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    }
}

pub fn run<I, S>(args: I) -> anyhow::Result<i32>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{err}");
                Ok(0)
            }
            _ => Err(anyhow::anyhow!(err.to_string())),
        },
    }
}

fn dispatch(command: Command) -> anyhow::Result<i32> {
    match command {
        Command::Calibrate(args) => run_calibrate(&args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(name = "wavecal-rs", about = "RANSAC wavelength calibration for spectrometers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Calibrate a measured spectrum against a Fraunhofer reference
    Calibrate(CalibrateArgs),
}
