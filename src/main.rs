//! imp CLI: play a WAD's music track live or export it to WAV.
//!
//! Usage:
//!   imp-cli doom.wad e1m1
//!   imp-cli doom.wad e1m1 --wav e1m1.wav --seconds 60

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use imp_master::{load_config, render_track_to_wav, AudioConfig, LiveAudio, MusicState, ToneSynth, Wad};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "imp-cli", about = "Play or render music from a WAD")]
struct Args {
    /// WAD archive holding the score
    wad: PathBuf,

    /// Track name; the score is read from lump D_<TRACK>
    track: String,

    /// Render to this WAV file instead of playing
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long, default_value_t = 120.0)]
    seconds: f32,

    /// Restart the score when it ends
    #[arg(long = "loop")]
    looping: bool,

    /// Audio settings file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path.display()))?,
        None => AudioConfig::default(),
    };
    let wad = open_wad(&args.wad)?;
    let synth = ToneSynth::for_mus(config.music_effects);

    match &args.wav {
        Some(out) => {
            let bytes = render_track_to_wav(wad, &args.track, synth, config, args.seconds, args.looping)
                .with_context(|| format!("rendering {}", args.track))?;
            std::fs::write(out, bytes).with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {}", out.display());
        }
        None => play(wad, &args, config, synth)?,
    }
    Ok(())
}

fn open_wad(path: &Path) -> Result<Wad> {
    Wad::open(path).with_context(|| format!("opening {}", path.display()))
}

fn play(wad: Wad, args: &Args, config: AudioConfig, synth: ToneSynth) -> Result<()> {
    let mut live = LiveAudio::open(config, wad, synth, None).context("opening audio output")?;
    live.system
        .start_music(&args.track, args.looping)
        .with_context(|| format!("starting {}", args.track))?;

    println!("Playing {}...", args.track);
    let started = Instant::now();
    let limit = Duration::from_secs_f32(args.seconds.max(0.0));

    while started.elapsed() < limit {
        if let Some(err) = live.system.take_music_error() {
            anyhow::bail!("score decode failed: {err}");
        }
        if live.system.music_state() == MusicState::EndReached {
            break;
        }
        print!("\r{:>6.1}s", started.elapsed().as_secs_f32());
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(10));
    }

    println!("\rDone.          ");
    Ok(())
}
