//! Cirrus CLI - cloud classification tools

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use cirrus_algorithms::neural::NetworkModel;
use cirrus_algorithms::pipeline::{ClassificationOutput, PipelineConfig};
use cirrus_algorithms::threshold::{table_names, ThresholdTable};
use cirrus_core::{PixelFlag, Raster};
use cirrus_parallel::{CancelToken, TileIterator};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(author, version, about = "Neural network cloud classification", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the topology of a network model
    Inspect {
        /// Model file (.json or plane text)
        model: PathBuf,
    },
    /// Evaluate a network model on one input vector
    Evaluate {
        /// Model file (.json or plane text)
        model: PathBuf,
        /// Comma-separated input values
        #[arg(short, long, allow_hyphen_values = true)]
        input: String,
    },
    /// Classify scores with a named threshold table
    Classify {
        /// Threshold table name (see `cirrus tables`)
        #[arg(short, long, default_value = "global-v2")]
        table: String,
        /// Scores to classify
        #[arg(required = true, allow_negative_numbers = true)]
        scores: Vec<f64>,
    },
    /// List the named threshold tables
    Tables,
    /// Run a pipeline configuration on a synthetic scene
    Demo {
        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: PathBuf,
        /// Scene rows
        #[arg(long, default_value = "512")]
        rows: usize,
        /// Scene columns
        #[arg(long, default_value = "512")]
        cols: usize,
        /// Seed for the synthetic scene
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn tile_bar(total: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} tiles ({eta})")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn load_model(path: &Path) -> Result<NetworkModel> {
    let pb = spinner("Loading model...")?;
    let model = NetworkModel::from_path(path)
        .with_context(|| format!("failed to load model {}", path.display()));
    pb.finish_and_clear();
    model
}

fn parse_vector(s: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid input value '{}'", t.trim()))
        })
        .collect()
}

fn format_flags(flags: &[PixelFlag]) -> String {
    flags.iter().map(|f| f.name()).collect::<Vec<_>>().join(" / ")
}

/// Splitmix64: small deterministic generator for synthetic scenes
struct SceneRng(u64);

impl SceneRng {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Positive band samples with a few bright cloud blobs over a darker
/// surface, plus a validity mask with scattered invalid pixels.
fn synthetic_scene(rows: usize, cols: usize, n_bands: usize, seed: u64) -> (Vec<Raster<f64>>, Raster<u8>) {
    let mut rng = SceneRng(seed);
    let blobs: Vec<(f64, f64, f64)> = (0..6)
        .map(|_| {
            (
                rng.next_f64() * rows as f64,
                rng.next_f64() * cols as f64,
                (0.03 + 0.1 * rng.next_f64()) * rows.max(cols) as f64,
            )
        })
        .collect();

    let cloud = Raster::from_array(ndarray::Array2::from_shape_fn((rows, cols), |(r, c)| {
        blobs
            .iter()
            .map(|&(br, bc, s)| {
                let d2 = (r as f64 - br).powi(2) + (c as f64 - bc).powi(2);
                (-d2 / (2.0 * s * s)).exp()
            })
            .fold(0.0_f64, f64::max)
    }));

    let bands = (0..n_bands)
        .map(|b| {
            let falloff = 1.0 - 0.08 * b as f64;
            let mut band = cloud.like(0.0_f64);
            for ((r, c), v) in band.data_mut().indexed_iter_mut() {
                let surface = 0.04 + 0.06 * rng.next_f64();
                *v = surface + 0.85 * falloff.max(0.1) * cloud.data()[[r, c]];
            }
            band
        })
        .collect();

    let mut validity = cloud.like(1_u8);
    for v in validity.data_mut().iter_mut() {
        if rng.next_f64() < 0.005 {
            *v = 0;
        }
    }
    (bands, validity)
}

fn print_summary(output: &ClassificationOutput) {
    let s = &output.summary;
    let pct = |n: usize| 100.0 * n as f64 / s.pixels.max(1) as f64;
    println!("Pixels: {}", s.pixels);
    for flag in PixelFlag::ALL {
        if flag == PixelFlag::Buffer {
            continue;
        }
        println!("  {:<12} {:>10} ({:.2}%)", flag.name(), s.count(flag), pct(s.count(flag)));
    }
    if output.buffer.is_some() {
        println!("  {:<12} {:>10} ({:.2}%)", "buffered", s.buffered, pct(s.buffered));
    }
    println!("Tiles: {}/{}", s.tiles_done, s.tiles_total);
    if output.cancelled {
        println!("Run was cancelled; remaining tiles are unprocessed");
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Inspect { model: path } => {
            let model = load_model(&path)?;
            println!("Model: {}", path.display());
            println!("Topology: {}", model.describe());
            for (i, layer) in model.layers().iter().enumerate() {
                println!("  layer {}: {} -> {}", i + 1, layer.inputs(), layer.outputs());
            }
            if let Some(norm) = model.input_normalization() {
                println!("Input normalization: {} channels", norm.len());
            }
            if let Some(norm) = model.output_normalization() {
                println!("Output normalization: {} channels", norm.len());
            }
        }

        Commands::Evaluate { model: path, input } => {
            let model = load_model(&path)?;
            let input = parse_vector(&input)?;
            let start = Instant::now();
            let output = model
                .evaluate(&input)
                .with_context(|| format!("evaluating {}", model.describe()))?;
            debug!("evaluated in {:.2?}", start.elapsed());
            for (i, v) in output.iter().enumerate() {
                println!("output[{}] = {:.6}", i, v);
            }
        }

        Commands::Classify { table, scores } => {
            let t = ThresholdTable::named(&table).with_context(|| format!("table '{}'", table))?;
            for score in scores {
                println!("{:>12.6} -> {}", score, t.classify(score));
            }
        }

        Commands::Tables => {
            for name in table_names() {
                let t = ThresholdTable::named(&name)?;
                let bounds: Vec<String> = t.boundaries().iter().map(|b| format!("{:.2}", b)).collect();
                println!(
                    "{:<18} {}-class  [{}]  {}",
                    name,
                    t.arity(),
                    bounds.join(", "),
                    format_flags(t.flags())
                );
            }
        }

        Commands::Demo {
            config,
            rows,
            cols,
            seed,
        } => {
            if rows == 0 || cols == 0 {
                bail!("scene must have at least one row and one column");
            }
            let cfg = PipelineConfig::from_path(&config)
                .with_context(|| format!("failed to read {}", config.display()))?;
            let classifier = cfg.build().context("failed to build pipeline")?;
            let n_bands = classifier.variant().bands().len();

            let pb = spinner("Generating synthetic scene...")?;
            let (bands, validity) = synthetic_scene(rows, cols, n_bands, seed);
            pb.finish_and_clear();
            info!("scene {}x{}, {} bands, seed {}", rows, cols, n_bands, seed);

            let bar = tile_bar(TileIterator::count_tiles(rows, cols, classifier.tile_size()))?;
            let start = Instant::now();
            let output = classifier
                .classify_raster_with_progress(&bands, Some(&validity), &CancelToken::new(), |_| {
                    bar.inc(1)
                })
                .context("classification failed")?;
            bar.finish_and_clear();
            let elapsed = start.elapsed();

            println!("Variant: {}", classifier.variant().name());
            print_summary(&output);
            println!("  Processing time: {:.2?}", elapsed);
        }
    }

    Ok(())
}
