//! Decode map frames from a file and print a JSON summary.
//!
//! Each non-empty line of the input is one raw frame. Frames are folded in
//! order, so a file holding an Initial frame followed by its partials yields
//! the reconstructed map.
//!
//! # Usage
//!
//! ```bash
//! naksha-decode frames.txt --key <vendor-key>
//! naksha-decode frames.txt --config configs/default.toml
//! ```

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use naksha_map::{MapBuilder, MapState, NakshaConfig, decode};

#[derive(Parser)]
#[command(name = "naksha-decode")]
#[command(about = "Decode robot vacuum map frames and print a JSON summary")]
struct Args {
    /// File with one raw frame per line
    input: PathBuf,

    /// Vendor key (overrides the config file)
    #[arg(short, long)]
    key: Option<String>,

    /// AES IV (overrides the config file)
    #[arg(long)]
    iv: Option<String>,

    /// Vision-SLAM device pixel layout
    #[arg(long)]
    vslam: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match NakshaConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => NakshaConfig::default(),
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(&config.logging.level)).init();

    if let Err(e) = run(&args, config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args, config: NakshaConfig) -> Result<(), Box<dyn std::error::Error>> {
    let key = args.key.clone().or(config.device.aes_key);
    let iv = args.iv.clone().or(config.device.aes_iv);
    let builder = MapBuilder::new(args.vslam || config.device.vslam)
        .with_encryption(key.clone(), iv.clone());

    let content = std::fs::read_to_string(&args.input)?;
    let mut state: Option<MapState> = None;
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let frame = match decode(line, iv.as_deref(), key.as_deref()) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Line {}: {}", line_no + 1, e);
                continue;
            }
        };
        log::info!(
            "Line {}: {:?} frame {}/{} ({}x{})",
            line_no + 1,
            frame.frame_type,
            frame.map_id,
            frame.frame_id,
            frame.dimensions.width,
            frame.dimensions.height
        );
        match builder.merge(state.as_ref(), &frame) {
            Ok(next) => state = Some(next),
            Err(e) => log::warn!("Line {}: {}", line_no + 1, e),
        }
    }

    let state = state.ok_or("no frame could be decoded")?;
    println!("{}", serde_json::to_string_pretty(&state.summary())?);
    Ok(())
}
