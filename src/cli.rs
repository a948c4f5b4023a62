use clap::{Args, Parser, Subcommand, ValueEnum};
use clipboard::{ClipboardContext, ClipboardProvider};
use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heart_sound::analysis::{
    self, AnalysisConfig, AnalysisError, AnalysisResult, PeakLabeling, RecordingComparison,
};
use heart_sound::audio;
use heart_sound::config;

/// Heart-sound analysis for stethoscope recordings
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file with [analysis] overrides (./config.toml is used if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a WAV recording
    Analyze(AnalyzeArgs),

    /// Analyze two WAV recordings side by side
    Compare(CompareArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Path to the input WAV file
    #[arg(required = true)]
    wav_file: String,

    #[command(flatten)]
    options: OutputOptions,
}

#[derive(Parser)]
struct CompareArgs {
    /// The earlier recording
    #[arg(required = true)]
    first: String,

    /// The later recording
    #[arg(required = true)]
    second: String,

    #[command(flatten)]
    options: OutputOptions,
}

#[derive(Args)]
struct OutputOptions {
    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Copy output to clipboard instead of console
    #[arg(short, long)]
    copy: bool,

    /// How detected peaks are split into S1 and S2
    #[arg(long, value_enum)]
    labeling: Option<Labeling>,

    /// Minimum time between two peaks (seconds)
    #[arg(long)]
    refractory: Option<f32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Labeling {
    Alternating,
    Interval,
}

impl From<Labeling> for PeakLabeling {
    fn from(labeling: Labeling) -> Self {
        match labeling {
            Labeling::Alternating => PeakLabeling::Alternating,
            Labeling::Interval => PeakLabeling::Interval,
        }
    }
}

/// File configuration with command line overrides applied
fn analysis_config(
    config_path: Option<&Path>,
    options: &OutputOptions,
) -> Result<AnalysisConfig, Box<dyn Error>> {
    let mut analysis = match config_path {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config()?,
    }
    .analysis;
    if let Some(labeling) = options.labeling {
        analysis.peak_labeling = labeling.into();
    }
    if let Some(refractory) = options.refractory {
        analysis.refractory_period = refractory;
    }
    Ok(analysis)
}

fn load_recording(path: &str) -> Result<analysis::SampleBuffer, AnalysisError> {
    let wav_path = Path::new(path);
    if !wav_path.exists() {
        return Err(AnalysisError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("WAV file not found: {}", path),
        )));
    }
    audio::read_wav_file(wav_path)
}

fn format_peaks(peaks: &[f32]) -> String {
    if peaks.is_empty() {
        return "none".to_string();
    }
    let times = peaks
        .iter()
        .map(|t| format!("{:.2}s", t))
        .collect::<Vec<String>>()
        .join(", ");
    format!("{} at {}", peaks.len(), times)
}

fn format_result(result: &AnalysisResult) -> String {
    let metrics = &result.quality_metrics;
    let heart_rate = if result.heart_rate == 0 {
        "not detected".to_string()
    } else {
        format!("{} BPM", result.heart_rate)
    };

    format!(
        "Duration:        {:.2}s\n\
         Heart rate:      {}\n\
         Signal quality:  {} (SNR {:.1}dB, peak consistency {:.2}, clean spectrum: {})\n\
         Abnormal sounds: {}\n\
         S1 peaks:        {}\n\
         S2 peaks:        {}\n",
        result.duration_secs,
        heart_rate,
        result.signal_quality,
        metrics.snr_db,
        metrics.peak_consistency,
        if metrics.clean_spectrum { "yes" } else { "no" },
        if result.abnormal_sounds { "Yes" } else { "No" },
        format_peaks(&result.s1_peaks),
        format_peaks(&result.s2_peaks),
    )
}

fn format_comparison(comparison: &RecordingComparison, first: &str, second: &str) -> String {
    format!(
        "== {} ==\n{}\n== {} ==\n{}\nHeart rate change: {:+} BPM\nQuality change:    {:?}\n",
        first,
        format_result(&comparison.first),
        second,
        format_result(&comparison.second),
        comparison.heart_rate_delta,
        comparison.quality_change,
    )
}

/// Writes to stdout, or to the clipboard when requested
fn emit(output: String, copy: bool) -> Result<(), Box<dyn Error>> {
    if copy {
        let mut ctx: ClipboardContext =
            ClipboardContext::new().map_err(|e| format!("Clipboard error: {}", e))?;
        ctx.set_contents(output)
            .map_err(|e| format!("Clipboard error: {}", e))?;
        println!("Successfully copied to clipboard!");
    } else {
        io::stdout().write_all(output.as_bytes())?;
    }
    Ok(())
}

fn run_analyze_command(
    args: &AnalyzeArgs,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let config = analysis_config(config_path, &args.options)?;

    let decoded = load_recording(&args.wav_file);
    let result = analysis::analyze_decoded(decoded, &config)?;

    let output = if args.options.json {
        serde_json::to_string_pretty(&result)?
    } else {
        format_result(&result)
    };

    emit(output, args.options.copy)
}

fn run_compare_command(
    args: &CompareArgs,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let config = analysis_config(config_path, &args.options)?;

    let first = load_recording(&args.first)?;
    let second = load_recording(&args.second)?;
    let comparison = analysis::compare_recordings(&first, &second, &config)?;

    let output = if args.options.json {
        serde_json::to_string_pretty(&comparison)?
    } else {
        format_comparison(&comparison, &args.first, &args.second)
    };

    emit(output, args.options.copy)
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Analyze(args) => run_analyze_command(args, cli.config.as_deref())?,
        Commands::Compare(args) => run_compare_command(args, cli.config.as_deref())?,
    }

    Ok(())
}

fn main() {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heart_sound=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run() {
        Ok(_) => {}
        Err(err) => {
            eprintln!("\nERROR: {}\n", err);
            match err.downcast_ref::<AnalysisError>() {
                Some(AnalysisError::Io(ref io_err)) if io_err.kind() == io::ErrorKind::NotFound => {
                    eprintln!("Please check that:");
                    eprintln!("1. The file path is correct");
                    eprintln!("2. The file exists");
                    eprintln!("3. You have permission to read the file");
                }
                Some(AnalysisError::InsufficientData { .. }) => {
                    eprintln!("Record a longer sample and try again.");
                }
                Some(AnalysisError::Decode(_)) => {
                    eprintln!("Only PCM WAV files (16/24/32-bit integer or 32-bit float) are supported.");
                }
                _ => {}
            }
            process::exit(1);
        }
    }
}
