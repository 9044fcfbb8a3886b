use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use vocalink::voice::{AudioCapture, AudioPlayback, rms};
use vocalink::{Config, VoiceSession};

/// Vocalink - streaming duplex voice pipeline for AI assistants
#[derive(Parser)]
#[command(name = "vocalink", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture one utterance and print the transcript
    Listen,
    /// Speak text through the synthesis/playback pipeline
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the voice pipeline.")]
        text: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,vocalink=info",
        1 => "info,vocalink=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Listen => cmd_listen().await,
        Command::Say { text } => cmd_say(&text).await,
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker(),
    }
}

/// Capture one VAD session and print the transcript
async fn cmd_listen() -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = VoiceSession::from_config(config)?;

    println!("Listening... (speech ends after silence, Ctrl+C to stop early)");

    // Live volume meter, fed by the display-only level stream
    let mut level_rx = session.input_level();
    let meter = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let level = *level_rx.borrow_and_update();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bar = ((level.volume / level.peak.max(0.005)) * 40.0).min(40.0) as usize;
            print!("\r[{}{}] {:.4}", "█".repeat(bar), " ".repeat(40 - bar), level.volume);
            let _ = std::io::Write::flush(&mut std::io::stdout());
        }
    });

    let transcript = {
        let listen = session.listen();
        tokio::pin!(listen);
        loop {
            tokio::select! {
                result = &mut listen => break result?,
                _ = tokio::signal::ctrl_c() => {
                    session.cancel_listen();
                }
            }
        }
    };
    meter.abort();
    println!();

    if transcript.is_empty() {
        println!("(no speech recognized)");
    } else {
        println!("Transcript: {transcript}");
    }

    session.stop().await;
    Ok(())
}

/// Speak text through the full sentence/synthesis/playback pipeline
async fn cmd_say(text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = VoiceSession::from_config(config)?;

    println!("Speaking: \"{text}\"");
    session.speak(text);

    // stop() drains the queues, so every sentence plays out before we return
    session.stop().await;
    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples: Vec<f32> = capture
            .take_frames()
            .into_iter()
            .flat_map(|frame| frame.samples().to_vec())
            .collect();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    // Generate 2 seconds of 440Hz sine wave at 24kHz sample rate
    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {} Hz...", samples.len(), sample_rate);

    playback.play_samples(samples)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}
