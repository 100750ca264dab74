use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use upload_derivatives::imaging::RustBackend;
use upload_derivatives::storage::LocalStorage;
use upload_derivatives::{config, output, pipeline};

#[derive(Parser)]
#[command(name = "upload-derivatives")]
#[command(about = "Derive web-ready image variants from an upload")]
#[command(long_about = "\
Derive web-ready image variants from an upload

Every upload is stored verbatim plus re-encoded in each configured codec,
once at full size and once per bounding box:

  folder/
  └── photo/
      ├── original.jpg             # Uploaded bytes, untouched
      ├── webp/
      │   ├── full.webp            # Source dimensions
      │   ├── thumbnail.webp       # Fits 150x150
      │   ├── 400w.webp            # Fits 400x400
      │   ├── 800w.webp
      │   └── 1200w.webp
      └── avif/
          └── ...

Images are scaled down to fit, never up. Uploading the same name again
overwrites every artifact in place.

Diagnostics go to stderr; set RUST_LOG (e.g. RUST_LOG=debug) for more.
Run 'upload-derivatives gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults apply when it does not exist)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct DeriveArgs {
    /// Image file to process
    file: PathBuf,

    /// Upload filename to derive the storage key from (default: FILE's name)
    #[arg(long)]
    name: Option<String>,

    /// Override `upload_root` from the config
    #[arg(long)]
    upload_root: Option<PathBuf>,

    /// Override `public_prefix` from the config
    #[arg(long)]
    public_prefix: Option<String>,

    /// Exit with an error if any derivative failed
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate every derivative of FILE and print the manifest as JSON
    Derive(DeriveArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Validate the config and show the variant matrix it produces
    CheckConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Derive(args) => {
            let mut config = config::load_config(&cli.config)?;
            if let Some(root) = args.upload_root {
                config.upload_root = root;
            }
            if let Some(prefix) = args.public_prefix {
                config.public_prefix = prefix;
            }
            config.validate()?;
            init_thread_pool(&config.processing);

            let content = std::fs::read(&args.file)?;
            let filename = match args.name {
                Some(name) => name,
                None => args
                    .file
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_pipeline_event(&event);
                }
            });
            let result = pipeline::generate_derivatives_with(
                &RustBackend::new(),
                &LocalStorage::new(),
                &config,
                &filename,
                &content,
                Some(tx),
            );
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let manifest = result?;

            println!("{}", serde_json::to_string_pretty(&manifest)?);
            if args.strict && !manifest.is_complete() {
                return Err(format!(
                    "{} of {} derivatives failed",
                    manifest.failures.len(),
                    config.matrix().artifact_count() - 1
                )
                .into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::CheckConfig => {
            let config = config::load_config(&cli.config)?;
            output::print_matrix(&config);
        }
    }

    Ok(())
}

/// Send diagnostics to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can lower it, not raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
