#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use plugforge_config::Declaration;
use plugforge_engine::{ArtifactPipeline, Classpath, Signer};

type CliResult = Result<(), Box<dyn Error>>;

const DEFAULT_OUTPUT_DIR: &str = "build/generated-artifacts";

#[derive(Debug, Parser)]
#[command(name = "plugforge", about = "Synthesizes deployable plugin archives for test runs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a declaration file to an artifact path
    Build {
        /// Path to the declaration TOML file
        #[arg(long)]
        decl: PathBuf,
        /// Output directory for synthesized artifacts
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        out: PathBuf,
        /// Classpath to scan (defaults to the CLASSPATH environment variable)
        #[arg(long)]
        classpath: Option<String>,
    },
    /// List an archive's entries in order
    Entries {
        /// Path to the archive
        archive: PathBuf,
    },
    /// Generate the shared test key store eagerly
    Keygen {
        /// Directory to place the key store in
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        dir: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Build {
            decl,
            out,
            classpath,
        } => cmd_build(&decl, out, classpath.as_deref()),
        Command::Entries { archive } => cmd_entries(&archive),
        Command::Keygen { dir } => cmd_keygen(dir),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn cmd_build(decl: &Path, out: PathBuf, classpath: Option<&str>) -> CliResult {
    let descriptor = Declaration::from_path(decl)?.into_descriptor()?;
    let classpath = match classpath {
        Some(raw) => Classpath::parse(raw),
        None => Classpath::from_env(),
    };

    let pipeline = ArtifactPipeline::new(classpath, out)?;
    let artifact = pipeline.resolve(&descriptor)?;
    println!("{}", artifact.display());
    Ok(())
}

fn cmd_entries(archive: &Path) -> CliResult {
    let file = std::fs::File::open(archive)?;
    let mut zipped = zip::ZipArchive::new(std::io::BufReader::new(file))?;
    for index in 0..zipped.len() {
        let entry = zipped.by_index(index)?;
        println!("{}", entry.name());
    }
    Ok(())
}

fn cmd_keygen(dir: PathBuf) -> CliResult {
    std::fs::create_dir_all(&dir)?;
    let store = Signer::new(dir).ensure_key_store()?;
    println!("{}", store.display());
    Ok(())
}
