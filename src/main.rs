use clap::{Parser, Subcommand};
use fsfreader::archive::{read_index, ExtractOptions, Extractor};
use fsfreader::crypto::{validate_credentials, Scramble};
use fsfreader::index::format_timestamp;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fsfreader", version, about = "Reads FSFILE (.tp4) containers written by TPDesign4")]
struct Cli {
    /// Log how the internal block structure is read
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every file of a container
    Extract {
        /// The .tp4 file to read
        #[arg(short, long)]
        file: PathBuf,
        /// Output directory, created if it does not exist
        #[arg(short = 'd', long = "directory", default_value = ".")]
        directory: PathBuf,
        /// Move images, sounds and fonts into their own directories and
        /// write manifest.xma
        #[arg(short, long)]
        transfer: bool,
    },
    /// List the index without extracting
    List {
        /// The .tp4 file to read
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Decrypt an AES-encrypted payload
    Decrypt {
        input: PathBuf,
        /// 16 character password
        #[arg(short, long)]
        password: String,
        /// 8 character salt
        #[arg(short, long)]
        salt: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encrypt a payload the way the design tool expects it
    Encrypt {
        input: PathBuf,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        salt: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { file, directory, transfer } => {
            let opts = ExtractOptions {
                output_dir: directory,
                reorganize: transfer,
                verbose:    cli.verbose,
            };
            let report = Extractor::new(opts).extract_path(&file)?;
            if report.index_end.is_truncated() {
                log::warn!("index was truncated: {:?}", report.index_end);
            }
            if report.decompress_failures > 0 {
                log::warn!("{} file(s) left compressed", report.decompress_failures);
            }
            println!("Extracted {} file(s) from {}", report.written.len(), file.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { file } => {
            let (header, index) = read_index(&file)?;
            println!("Archive: {}  (index starts at block {})", file.display(), header.list_start_block);
            println!("{:<40} {:>10} {:>7} {:>7}  {:<19}  {:<19}",
                     "Name", "Size", "Start", "Blocks", "Created", "Modified");
            for ub in &index.entries {
                println!("{:<40} {:>10} {:>7} {:>7}  {:<19}  {:<19}",
                    String::from_utf8_lossy(ub.path_bytes()),
                    ub.size_bytes, ub.start_block, ub.size_blocks,
                    format_timestamp(ub.created), format_timestamp(ub.modified));
            }
            if index.end.is_truncated() {
                println!("(index truncated: {:?})", index.end);
            }
        }

        // ── Decrypt / Encrypt ────────────────────────────────────────────────
        Commands::Decrypt { input, password, salt, output } => {
            let scramble = keyed(&password, &salt)?;
            let plain = scramble.decrypt_file(&input)?;
            emit(output.as_deref(), &plain)?;
        }
        Commands::Encrypt { input, password, salt, output } => {
            let scramble = keyed(&password, &salt)?;
            let cipher = scramble.encrypt_file(&input)?;
            emit(output.as_deref(), &cipher)?;
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn keyed(password: &str, salt: &str) -> Result<Scramble, Box<dyn std::error::Error>> {
    validate_credentials(password, salt)?;
    let mut scramble = Scramble::new();
    scramble.derive_key(password, salt)?;
    Ok(scramble)
}

fn emit(output: Option<&Path>, data: &[u8]) -> std::io::Result<()> {
    match output {
        Some(path) => std::fs::write(path, data),
        None       => std::io::stdout().lock().write_all(data),
    }
}
