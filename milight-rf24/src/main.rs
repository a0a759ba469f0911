use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use milight_rf24_lib::control_interface::{Controller, ControllerEvent, SendPayload};
use milight_rf24_lib::led::led_color::Rgb;
use milight_rf24_lib::protocol::button::Button;
use milight_rf24_lib::protocol::codec::{encode, DecodedEvent};
use milight_rf24_lib::protocol::command::{Command, RemoteId, Zone};
use milight_rf24_lib::util::config::Config;
use milight_rf24_lib::util::serial::SerialTransport;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    handle_cli(cli).await
}

/// This struct defines the command line interface of the application
#[derive(Parser)]
#[clap(
    name = "milight-rf24",
    about = "Controls MiLight RGBW bulbs through an RF24 serial bridge",
    version = "0.1.0"
)]
pub struct Cli {
    /// Serial port of the bridge, overrides the config file
    #[clap(long, global = true)]
    pub port: Option<String>,

    /// Baud rate of the bridge, overrides the config file
    #[clap(long, global = true)]
    pub baud: Option<u32>,

    /// YAML or JSON config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Supported output formats for the `listen` command.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    /// Plain text format.
    Plaintext,
    /// JSON format, one event per line.
    Json,
    /// YAML format.
    Yaml,
}

/// Remote and zone a command is addressed to.
#[derive(Args, Clone)]
pub struct Target {
    /// Remote id as four hex digits, e.g. 1122
    #[clap(long)]
    pub id: RemoteId,

    /// Zone of the remote (1-4)
    #[clap(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    pub zone: u8,
}

/// Commands sent to the bulbs.
#[derive(Subcommand, Clone)]
pub enum LightCommand {
    /// Sets the color of a zone.
    #[clap(name = "set-color")]
    SetColor {
        #[clap(flatten)]
        target: Target,

        /// The color by name (e.g. "orange") or as #rrggbb
        color: Option<String>,

        /// Red component of the color (0-255)
        #[clap(short = 'r', long = "red")]
        red: Option<u8>,

        /// Green component of the color (0-255)
        #[clap(short = 'g', long = "green")]
        green: Option<u8>,

        /// Blue component of the color (0-255)
        #[clap(short = 'b', long = "blue")]
        blue: Option<u8>,
    },
    /// Sets the brightness of a zone.
    #[clap(name = "set-brightness")]
    SetBrightness {
        #[clap(flatten)]
        target: Target,

        /// Brightness in percent (0-100)
        #[clap(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
    /// Presses a button of the remote.
    #[clap(name = "button")]
    Button {
        #[clap(flatten)]
        target: Target,

        #[clap(value_enum)]
        button: Button,

        /// Holds the button down instead of a short press
        #[clap(long)]
        long_press: bool,
    },
    /// Starts a disco mode.
    #[clap(name = "disco")]
    Disco {
        #[clap(flatten)]
        target: Target,

        /// Disco mode (0-8)
        #[clap(long)]
        mode: u8,
    },
}

impl LightCommand {
    fn target(&self) -> &Target {
        match self {
            LightCommand::SetColor { target, .. }
            | LightCommand::SetBrightness { target, .. }
            | LightCommand::Button { target, .. }
            | LightCommand::Disco { target, .. } => target,
        }
    }

    fn to_command(&self) -> Result<Command> {
        let command = match self {
            LightCommand::SetColor {
                color,
                red,
                green,
                blue,
                ..
            } => {
                let rgb = match (color, red, green, blue) {
                    (Some(color), None, None, None) => color
                        .parse::<Rgb>()
                        .with_context(|| format!("Invalid color {:?}", color))?,
                    (None, Some(r), Some(g), Some(b)) => Rgb::new(*r, *g, *b),
                    _ => return Err(anyhow!("Invalid color specification")),
                };
                Command::SetColor(rgb)
            }
            LightCommand::SetBrightness { percent, .. } => {
                Command::SetBrightness { percent: *percent }
            }
            LightCommand::Button {
                button, long_press, ..
            } => Command::SendButton {
                button: *button,
                long_press: *long_press,
            },
            LightCommand::Disco { mode, .. } => Command::disco_mode(*mode)?,
        };
        Ok(command)
    }
}

/// Subcommands available for the CLI
#[derive(Subcommand)]
pub enum Commands {
    #[clap(flatten)]
    Light(LightCommand),
    /// Prints the remote packets the bridge overhears
    #[clap(name = "listen")]
    Listen {
        /// Output format (plaintext, json, yaml)
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Plaintext)]
        output: OutputFormat,

        /// Stop after this many events
        #[clap(short = 'n', long)]
        count: Option<usize>,
    },
    /// Prints the packet for a command without a bridge attached
    #[clap(name = "encode")]
    Encode {
        /// Packet counter to stamp on the packet
        #[clap(long, default_value_t = 1)]
        counter: u8,

        /// Print the whole packet with its padding, escaped
        #[clap(long)]
        raw: bool,

        #[clap(subcommand)]
        command: LightCommand,
    },
}

async fn handle_cli(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.serial.port = port;
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }

    match cli.command {
        Commands::Light(light) => {
            let command = light.to_command()?;
            let target = light.target();
            transmit(config, target, command).await?;
        }
        Commands::Listen { output, count } => {
            listen(config, output, count).await?;
        }
        Commands::Encode {
            counter,
            raw,
            command: light,
        } => {
            let command = light.to_command()?;
            let target = light.target();
            let packet = encode(&target.id, Zone::new(target.zone)?, &command, counter)?;
            if raw {
                println!("{:?}", String::from_utf8_lossy(packet.as_bytes()));
            } else {
                println!("{}", packet);
            }
        }
    }

    Ok(())
}

fn connect(config: Config) -> Controller {
    info!(
        "Using bridge on {} at {} baud",
        config.serial.port, config.serial.baud_rate
    );
    Controller::new(SerialTransport::new(config.serial), config.controller)
}

async fn transmit(config: Config, target: &Target, command: Command) -> Result<()> {
    let mut controller = connect(config);
    let mut events = controller.subscribe();

    controller.send(&target.id, target.zone, command)?;
    controller.open().await?;
    println!("Waiting for the bridge to warm up...");

    loop {
        match next_event(&mut events).await? {
            ControllerEvent::Sending(SendPayload::Packet(packet)) => {
                println!("Sent {}", packet);
            }
            ControllerEvent::Sending(SendPayload::QueueFinished) => break,
            ControllerEvent::Received(_) => {}
        }
    }

    controller.shutdown().await?;
    Ok(())
}

async fn listen(config: Config, output: OutputFormat, count: Option<usize>) -> Result<()> {
    let mut controller = connect(config);
    let mut events = controller.subscribe();
    controller.open().await?;

    let mut seen = 0;
    while count.map_or(true, |count| seen < count) {
        let event = tokio::select! {
            event = next_event(&mut events) => event?,
            _ = tokio::signal::ctrl_c() => break,
        };
        if let ControllerEvent::Received(event) = event {
            print_event(&event, output)?;
            seen += 1;
        }
    }

    controller.shutdown().await?;
    Ok(())
}

async fn next_event(events: &mut broadcast::Receiver<ControllerEvent>) -> Result<ControllerEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Ok(event),
            Err(RecvError::Lagged(missed)) => warn!("Missed {} events", missed),
            Err(RecvError::Closed) => bail!("Controller stopped unexpectedly"),
        }
    }
}

fn print_event(event: &DecodedEvent, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Plaintext => {
            println!("{}", event);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string(event)?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(event)?;
            println!("---\n{}", yaml);
        }
    }
    Ok(())
}
