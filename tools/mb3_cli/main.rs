// tools/mb3_cli/main.rs
//
// Operator CLI for the MB3: find the device on the local subnet, push a
// layout file, or fire the built-in test payload without the studio UI.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use markstudio::io::mb3::{codec, scanner};
use markstudio::{layout_store, load_settings, Transmitter};

#[derive(Parser)]
#[command(name = "mb3_cli", version, about = "MB3 marking device toolkit")]
struct Cli {
    /// Device TCP port (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Per-host probe timeout in milliseconds during discovery.
    #[arg(long)]
    probe_timeout_ms: Option<u64>,

    /// Also write logs to a file under the app data dir.
    #[arg(long)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep the local /24 for a host accepting the device port.
    Discover,
    /// Print the wire payload for a layout file without sending it.
    Encode {
        /// Layout file (`<cell index>:<record>` lines).
        file: PathBuf,
    },
    /// Transmit a layout file to the device.
    Send {
        /// Layout file (`<cell index>:<record>` lines).
        file: PathBuf,
    },
    /// Transmit the built-in connectivity-test payload.
    Test,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_file {
        match markstudio::default_log_dir() {
            Some(dir) => {
                if let Err(e) = markstudio::init_file_logging(&dir) {
                    eprintln!("{}", e);
                }
            }
            None => eprintln!("No data dir available for log files"),
        }
    }

    match run(cli).await {
        Ok(message) => println!("{}", message),
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String, String> {
    let mut settings = load_settings().unwrap_or_default();
    if let Some(port) = cli.port {
        settings.device_port = port;
    }
    if let Some(ms) = cli.probe_timeout_ms {
        settings.probe_timeout_ms = ms;
    }
    let config = settings.session_config();

    match cli.command {
        Command::Discover => {
            let cancel = AtomicBool::new(false);
            let address = scanner::discover(config.port, config.probe_timeout, &cancel)
                .await
                .map_err(|e| e.to_string())?;
            Ok(address)
        }
        Command::Encode { file } => {
            let layout = layout_store::read_layout_file(&file)?;
            let payload = codec::build_payload(&layout);
            Ok(format!(
                "{}{}",
                codec::file_write_command(&payload),
                payload
            ))
        }
        Command::Send { file } => {
            let layout = layout_store::read_layout_file(&file)?;
            if layout.is_empty() {
                return Err(format!("No markings in {}", file.display()));
            }
            Transmitter::new(config).send_layout(&layout).await
        }
        Command::Test => Transmitter::new(config).send_test().await,
    }
}
