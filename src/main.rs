mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use cli::{AnalyzeArgs, Cli, Command};
use tunebeat::audio::{self, decode::decode_audio, AnalysisResult};
use tunebeat::config::{self, AnalysisConfig, Config};
use tunebeat::store::{JsonDirStore, ResultStore};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    // Load config: explicit --config path, or auto-detect tunebeat.toml / global config
    let config_path = cli.config.clone().or_else(config::find_config);
    let file_config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) if cli.config.is_some() => return Err(err),
            Err(err) => {
                log::warn!("Ignoring config {}: {:#}", path.display(), err);
                Config::default()
            }
        },
        None => Config::default(),
    };

    let store_dir = match cli.store_dir.clone().or(file_config.store.dir.clone()) {
        Some(dir) => dir,
        None => JsonDirStore::default_dir()?,
    };
    let store = JsonDirStore::new(store_dir);

    match cli.command {
        Command::Analyze(args) => {
            let analysis = merge_analysis_config(&args, file_config.analysis);
            analysis.validate()?;
            run_analyze(&args, &analysis, &store)
        }
        Command::List => {
            let keys = store.keys()?;
            if keys.is_empty() {
                println!("No saved results in {}", store.dir().display());
            }
            for key in keys {
                println!("{}", key);
            }
            Ok(())
        }
        Command::Show { key } => {
            let result = store
                .get(&key)?
                .with_context(|| format!("No saved result named '{}'", key))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

/// Config values apply only where the CLI flag is at its default.
fn merge_analysis_config(args: &AnalyzeArgs, mut cfg: AnalysisConfig) -> AnalysisConfig {
    if args.min_hz != 60.0 { cfg.min_detectable_hz = args.min_hz; }
    if args.window_ms != 20 { cfg.onset_window_ms = args.window_ms; }
    if args.min_bpm != 60.0 { cfg.tempo_range[0] = args.min_bpm; }
    if args.max_bpm != 240.0 { cfg.tempo_range[1] = args.max_bpm; }
    if args.no_pitch_track { cfg.pitch_track = false; }
    cfg
}

fn run_analyze(args: &AnalyzeArgs, cfg: &AnalysisConfig, store: &JsonDirStore) -> Result<()> {
    for input in &args.inputs {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
    }

    let pb = ProgressBar::new(args.inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    // One independent buffer per recording; results keep input order.
    let results: Vec<(PathBuf, Result<AnalysisResult>)> = args
        .inputs
        .par_iter()
        .map(|input| {
            let result = analyze_file(input, args.channel, cfg);
            pb.inc(1);
            (input.clone(), result)
        })
        .collect();

    pb.finish_and_clear();

    let mut failures = 0;
    for (input, result) in results {
        let result = match result {
            Ok(r) => r,
            Err(err) => {
                log::error!("{}: {:#}", input.display(), err);
                failures += 1;
                continue;
            }
        };

        if args.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_summary(&input, &result);
        }

        if args.save {
            let key = result_key(&input);
            match store.put(&key, &result) {
                Ok(()) => log::info!("Saved '{}' to {}", key, store.dir().display()),
                Err(err) => {
                    log::error!("{}: {:#}", input.display(), err);
                    failures += 1;
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} file(s) failed", failures, args.inputs.len());
    }
    Ok(())
}

fn analyze_file(input: &Path, channel: Option<usize>, cfg: &AnalysisConfig) -> Result<AnalysisResult> {
    let decoded = decode_audio(input)?;
    let buffer = match channel {
        Some(index) => decoded.channel(index).with_context(|| {
            format!(
                "Channel {} out of range ({} channel(s))",
                index,
                decoded.channel_count()
            )
        })?,
        None => decoded.downmix(),
    };
    drop(decoded);
    Ok(audio::analyze(&buffer, cfg)?)
}

fn result_key(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("result")
        .to_string()
}

fn print_summary(input: &Path, result: &AnalysisResult) {
    println!("{}", input.display());
    if result.pitch_hz > 0.0 {
        println!(
            "  Pitch:    {:.1} Hz ({})",
            result.pitch_hz,
            result.pitch.note.as_deref().unwrap_or("?")
        );
    } else {
        println!("  Pitch:    not enough signal");
    }
    if let Some(note) = &result.pitch.most_common_note {
        println!(
            "  Track:    most common {} over {} voiced frame(s), {:.1}-{:.1} Hz",
            note, result.pitch.voiced_frames, result.pitch.min_hz, result.pitch.max_hz
        );
    }
    if result.tempo.detected {
        println!(
            "  Tempo:    {} BPM ({} onsets)",
            result.tempo_bpm, result.tempo.onset_count
        );
    } else {
        println!("  Tempo:    {} BPM (fallback, not enough onsets)", result.tempo_bpm);
    }
    println!(
        "  Dynamics: avg {:.1} dB, min {:.1} dB, max {:.1} dB",
        result.dynamics.average_db, result.dynamics.min_db, result.dynamics.max_db
    );
    println!("  Duration: {:.1}s @ {}Hz", result.duration_secs, result.sample_rate);
}
