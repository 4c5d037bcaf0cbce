use clap::{Parser, Subcommand};
use qr_ec_probe::tools::{dataset_iter, dataset_root_from_env, expected_payload, limit_from_env};
use qr_ec_probe::{
    AnalysisOutcome, DecoderSource, ECLevel, ErrorKind, ImageSource, ProbeConfig, RequestChannel, enhance,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qrtool", version, about = "QR payload and EC level probe")]
struct Cli {
    /// Decoder backend: auto, bundled or fallback (overrides QR_PROBE_DECODER)
    #[arg(long, global = true)]
    decoder: Option<DecoderSource>,
    /// Per-request timeout in milliseconds (overrides QR_PROBE_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode one image and report payload, EC level and winning attempt
    Analyze {
        #[arg(long)]
        image: PathBuf,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the contrast-enhanced variant of an image
    Enhance {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Analyze every image under a directory and summarize
    Batch {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ProbeConfig::from_env();
    if let Some(source) = cli.decoder {
        config = config.with_decoder_source(source);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }

    match cli.command {
        Command::Analyze { image, json } => analyze_cmd(config, &image, json).await,
        Command::Enhance { image, out } => enhance_cmd(&image, &out),
        Command::Batch { root, limit } => batch_cmd(config, root, limit).await,
    }
}

fn spawn_channel(config: ProbeConfig) -> Option<RequestChannel> {
    match RequestChannel::spawn(config) {
        Ok(channel) => Some(channel),
        Err(err) => {
            eprintln!("Failed to start decode worker: {}", err);
            None
        }
    }
}

async fn analyze_cmd(config: ProbeConfig, image: &Path, json: bool) -> ExitCode {
    let Some(channel) = spawn_channel(config) else {
        return ExitCode::FAILURE;
    };

    let start = Instant::now();
    let outcome = channel.analyze(ImageSource::Path(image.to_path_buf())).await;
    let elapsed = start.elapsed();
    channel.shutdown();

    if json {
        println!("{}", outcome.to_json());
    } else {
        print_outcome(image, &outcome, elapsed);
    }

    if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_outcome(image: &Path, outcome: &AnalysisOutcome, elapsed: Duration) {
    println!("Image: {}", image.display());
    match (&outcome.data, &outcome.error) {
        (Some(data), _) => {
            let ec = outcome
                .ec_level
                .map(|ec| format!("{} (~{}% recovery)", ec, ec.recovery_percent()))
                .unwrap_or_else(|| "unknown".to_string());
            println!("  payload: {}", data);
            println!("  EC level: {}", ec);
            if let Some(index) = outcome.attempt_index {
                println!("  attempt: {}", index);
            }
        }
        (None, Some(error)) => println!("  {}", describe_failure(error)),
        (None, None) => println!("  no result"),
    }
    println!("  time: {:.2?}", elapsed);
}

/// NotFound and Timeout are "try again" states, not errors
fn describe_failure(error: &ErrorKind) -> String {
    if error.is_transient() {
        format!("no code read ({}), try again", error.tag())
    } else {
        format!("error: {}", error)
    }
}

fn enhance_cmd(image: &Path, out: &Path) -> ExitCode {
    let buffer = match ImageSource::Path(image.to_path_buf()).load() {
        Ok(buffer) => buffer,
        Err(err) => {
            eprintln!("Failed to load image {}: {}", image.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let start = Instant::now();
    let enhanced = enhance(&buffer);
    let elapsed = start.elapsed();

    let Some(raster) = enhanced.to_dynamic() else {
        eprintln!("Enhanced buffer has inconsistent dimensions");
        return ExitCode::FAILURE;
    };
    if let Err(err) = raster.save(out) {
        eprintln!("Failed to write {}: {}", out.display(), err);
        return ExitCode::FAILURE;
    }
    println!(
        "Enhanced {} ({}x{}) -> {} in {:.2?}",
        image.display(),
        buffer.width(),
        buffer.height(),
        out.display(),
        elapsed
    );
    ExitCode::SUCCESS
}

#[derive(Default)]
struct BatchSummary {
    total: usize,
    decoded: usize,
    labeled: usize,
    matched: usize,
    by_attempt: BTreeMap<u8, usize>,
    by_level: HashMap<ECLevel, usize>,
    errors: BTreeMap<&'static str, usize>,
}

impl BatchSummary {
    fn record(&mut self, outcome: &AnalysisOutcome, expected: Option<&str>) {
        self.total += 1;
        if let Some(expected) = expected {
            self.labeled += 1;
            if outcome.data.as_deref() == Some(expected) {
                self.matched += 1;
            }
        }
        if outcome.success {
            self.decoded += 1;
            if let Some(index) = outcome.attempt_index {
                *self.by_attempt.entry(index).or_default() += 1;
            }
            if let Some(level) = outcome.ec_level {
                *self.by_level.entry(level).or_default() += 1;
            }
        }
        if let Some(error) = &outcome.error {
            *self.errors.entry(error.tag()).or_default() += 1;
        }
    }

    fn print(&self, elapsed: Duration) {
        let rate = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 * 100.0 };
        println!("\n=====================================");
        println!(
            "Decoded: {}/{} = {:.2}%",
            self.decoded,
            self.total,
            rate(self.decoded, self.total)
        );
        if self.labeled > 0 {
            println!(
                "Payload matches label: {}/{} = {:.2}%",
                self.matched,
                self.labeled,
                rate(self.matched, self.labeled)
            );
        }
        for (index, count) in &self.by_attempt {
            println!("  attempt {}: {}", index, count);
        }
        for level in ECLevel::ALL {
            if let Some(count) = self.by_level.get(&level) {
                println!("  EC {}: {}", level, count);
            }
        }
        for (tag, count) in &self.errors {
            println!("  {}: {}", tag, count);
        }
        println!("Total time: {:.2?}", elapsed);
        println!("=====================================");
    }
}

async fn batch_cmd(config: ProbeConfig, root: Option<PathBuf>, limit: Option<usize>) -> ExitCode {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(limit_from_env);

    if !root.exists() {
        eprintln!("Dataset root not found: {}", root.display());
        return ExitCode::FAILURE;
    }
    let images: Vec<PathBuf> = dataset_iter(&root, limit).collect();
    if images.is_empty() {
        println!("No images found under {}", root.display());
        return ExitCode::SUCCESS;
    }

    let Some(channel) = spawn_channel(config) else {
        return ExitCode::FAILURE;
    };

    let start = Instant::now();
    let mut summary = BatchSummary::default();
    for path in images {
        let expected = expected_payload(&path);
        let image_start = Instant::now();
        let outcome = channel.analyze(ImageSource::Path(path.clone())).await;
        let status = match (&outcome.data, &outcome.error) {
            (Some(_), _) => format!(
                "OK attempt={} ec={}",
                outcome.attempt_index.unwrap_or_default(),
                outcome.ec_level.map(|ec| ec.as_str()).unwrap_or("?")
            ),
            (None, Some(error)) => describe_failure(error),
            (None, None) => "?".to_string(),
        };
        println!(
            "  {} -> {} ({:.2?})",
            path.strip_prefix(&root).unwrap_or(&path).display(),
            status,
            image_start.elapsed()
        );
        summary.record(&outcome, expected.as_deref());
    }
    channel.shutdown();

    summary.print(start.elapsed());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_failure() {
        assert_eq!(
            describe_failure(&ErrorKind::Timeout),
            "no code read (Timeout), try again"
        );
        assert_eq!(
            describe_failure(&ErrorKind::NotFound),
            "no code read (NotFound), try again"
        );
        assert_eq!(
            describe_failure(&ErrorKind::InternalFault("boom".into())),
            "error: InternalFault: boom"
        );
        assert_eq!(
            describe_failure(&ErrorKind::LibraryUnavailable),
            "error: LibraryUnavailable"
        );
    }
}
