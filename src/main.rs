use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use murmur_gateway::api::ApiServerBuilder;
use murmur_gateway::client::{ChatLog, ChatMessage, ResponsePresenter, Speaker, Uploader};
use murmur_gateway::voice::{AudioCapture, TextToSpeech, rms};
use murmur_gateway::{Config, GeminiModel, TranscribeAndRespond};

/// Murmur - talk to a generative speech model
#[derive(Parser)]
#[command(name = "murmur", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Server base URL for client commands (overrides config)
    #[arg(long)]
    server: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the chat server (default)
    Serve,
    /// Upload one recorded file and print the exchange
    Send {
        /// Audio file to upload
        file: PathBuf,
        /// Declared MIME type (guessed from the extension if omitted)
        #[arg(long)]
        mime: Option<String>,
        /// Speak the reply aloud
        #[arg(long)]
        speak: bool,
    },
    /// Interactive push-to-talk session
    Talk {
        /// Speak replies aloud
        #[arg(long)]
        speak: bool,
    },
    /// Query the server's health endpoint
    Health,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,murmur_gateway=info",
        1 => "info,murmur_gateway=debug,tower_http=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config.client.server_url = server;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, cli.port).await,
        Command::Send { file, mime, speak } => send(&config, &file, mime.as_deref(), speak).await,
        Command::Talk { speak } => talk(&config, speak).await,
        Command::Health => health(&config).await,
        Command::TestMic { duration } => test_mic(duration).await,
    }
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.port);
    tracing::info!(port, model = %config.model.id, "starting murmur gateway");

    let model = GeminiModel::new(&config.model)?;
    let pipeline = TranscribeAndRespond::new(Arc::new(model))
        .validate_audio(config.server.validate_audio);

    ApiServerBuilder::new(pipeline, port)
        .server_config(&config.server)
        .build()
        .run()
        .await?;

    Ok(())
}

/// Upload a single file
async fn send(config: &Config, file: &Path, mime: Option<&str>, speak: bool) -> anyhow::Result<()> {
    let uploader = Uploader::new(&config.client.server_url);
    let mut presenter = build_presenter(config, speak);

    println!("Sending {}...", file.display());
    let result = uploader.upload(file, mime).await?;
    presenter.present(&result).await?;

    Ok(())
}

/// Push-to-talk loop: Enter starts and stops a recording, `q` quits
#[allow(clippy::future_not_send)]
async fn talk(config: &Config, speak: bool) -> anyhow::Result<()> {
    let uploader = Uploader::new(&config.client.server_url);
    let mut presenter = build_presenter(config, speak);
    let mut capture = AudioCapture::new()?;
    let scratch = std::env::temp_dir();

    for message in presenter.log().messages() {
        print_message(message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("\n[Enter] record  [q] quit");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }

        if let Err(e) = capture.start() {
            eprintln!("Could not start recording: {e}");
            continue;
        }
        println!("Recording... press Enter to stop");
        if lines.next_line().await?.is_none() {
            break;
        }

        let recording = match capture.stop(&scratch) {
            Ok(Some(file)) => file,
            Ok(None) => {
                eprintln!("Nothing was recorded");
                continue;
            }
            Err(e) => {
                eprintln!("Recording failed: {e}");
                continue;
            }
        };

        println!("Sending...");
        match uploader.upload(recording.path(), Some("audio/wav")).await {
            Ok(result) => {
                if let Err(e) = presenter.present(&result).await {
                    tracing::warn!(error = %e, "could not speak reply");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "exchange failed");
                eprintln!("Error: {e}");
            }
        }
    }

    Ok(())
}

async fn health(config: &Config) -> anyhow::Result<()> {
    let uploader = Uploader::new(&config.client.server_url);
    let info = uploader.health().await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn build_presenter(config: &Config, speak: bool) -> ResponsePresenter {
    let speaker: Option<Box<dyn Speaker>> = if speak {
        match TextToSpeech::from_config(&config.client) {
            Ok(tts) => Some(Box::new(tts)),
            Err(e) => {
                tracing::warn!(error = %e, "speech disabled");
                None
            }
        }
    } else {
        None
    };

    ResponsePresenter::new(ChatLog::with_greeting(), speaker).with_display(print_message)
}

fn print_message(message: &ChatMessage) {
    let who = if message.from_user { "You" } else { "Murmur" };
    println!(
        "[{}] {who}: {}",
        message.timestamp.format("%H:%M:%S"),
        message.text
    );
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        capture.clear_buffer();
    }

    // Nothing to upload; the recording is discarded
    drop(capture.stop(&std::env::temp_dir())?);

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: arecord -l (to list devices)");

    Ok(())
}
