use clap::{Parser, Subcommand};
use docimg::imaging::RustProbe;
use docimg::{config, logging, output, pipeline};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docimg")]
#[command(about = "Extract embedded images from PDF and DOCX documents")]
#[command(long_about = "\
Extract embedded images from PDF and DOCX documents

Every document in the input directory gets its own staging directory. Its
embedded images are written there, filtered, and bundled into one archive:

  input/
  ├── report.pdf       → output/report.zip
  │                        image_001_p001.jpg   (ordinal, page)
  │                        image_002_p003.png
  ├── letter.docx      → output/letter.zip
  │                        image_001.png        (position in package)
  │                        image_003.jpg
  └── notes.txt        → skipped

Filters, in order:
  Duplicate:   byte-identical to an image already kept from this document
  Size:        smaller than filters.min_kb kilobytes
  Dimensions:  narrower than filters.min_width or shorter than filters.min_height

Documents with no surviving images produce no archive.

Run 'docimg gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Input directory (overrides paths.input_dir)
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Output directory for archives (overrides paths.output_dir)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Staging directory root (overrides paths.temp_dir)
    #[arg(long, global = true)]
    temp_dir: Option<PathBuf>,

    /// Print the batch summary as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process every .pdf and .docx file in the input directory
    Run,
    /// Process the given files (unsupported extensions are reported as skipped)
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let explicit_files = match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::Run => None,
        Command::Extract { files } => Some(files.clone()),
    };

    let mut config = config::load_config(&cli.config)?;
    if let Some(input) = &cli.input {
        config.paths.input_dir = input.clone();
    }
    if let Some(output) = &cli.output {
        config.paths.output_dir = output.clone();
    }
    if let Some(temp_dir) = &cli.temp_dir {
        config.paths.temp_dir = temp_dir.clone();
    }
    config.validate()?;

    logging::init_logging(&config.logging)?;
    std::fs::create_dir_all(&config.paths.input_dir)?;
    std::fs::create_dir_all(&config.paths.output_dir)?;
    std::fs::create_dir_all(&config.paths.temp_dir)?;

    let files = match explicit_files {
        Some(files) => files,
        None => pipeline::list_input_files(&config.paths.input_dir)?,
    };
    if files.is_empty() {
        println!("{}", output::format_empty_input(&config.paths.input_dir));
        return Ok(());
    }

    init_thread_pool(&config.processing);
    let probe = RustProbe::new();

    let summary = if cli.json {
        pipeline::run_batch(&files, &config, &probe, None)
    } else {
        let (tx, rx) = std::sync::mpsc::channel();
        let printer = std::thread::spawn(move || {
            for report in rx {
                output::print_document_report(&report);
            }
        });
        let summary = pipeline::run_batch(&files, &config, &probe, Some(tx));
        printer.join().ok();
        summary
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        output::print_summary(&summary);
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
