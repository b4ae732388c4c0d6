use clap::{Args, Parser, Subcommand};
use log::debug;
use mld_reader::mld::report;
use mld_reader::{
    decode, upgrade_to_mfi3, ExportOptions, ExportOutcome, Exporter, MldError, ReportOptions, ScanMode,
    ScanOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "mld")]
#[command(author, version, about = "Inspect, carve and edit MLD (MFi) ringtone files")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the metadata of MLD files (directories are searched for *.mld)
    Info {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// List unknown metadata tags instead of failing on them
        #[arg(long)]
        lenient: bool,
    },

    /// Extract MLD containers embedded in arbitrary files
    Extract(ExtractArgs),

    /// Rewrite the version field to MFi 3.00, writing copies into MFi3/
    SetVersion {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct ExtractArgs {
    /// Host files or directories to scan
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output directory (defaults to the scanned directory or the file's directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Delete host files after extracting from them
    #[arg(short, long)]
    delete: bool,

    /// Accept candidates on header bounds alone and take the title by raw search
    #[arg(long)]
    heuristic: bool,

    /// Cut candidates that run past the end of the host file instead of rejecting them
    #[arg(long)]
    clamp: bool,

    /// Largest candidate size in bytes (0 disables the limit)
    #[arg(long, default_value_t = mld_reader::mld::carve::DEFAULT_MAX_CANDIDATE_SIZE)]
    max_size: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let all_ok = match cli.command {
        Commands::Info { paths, lenient } => run_info(&paths, &ReportOptions { strict: !lenient }),
        Commands::Extract(args) => run_extract(&args),
        Commands::SetVersion { paths } => run_set_version(&paths),
    };

    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Expands directories into the files below them.
fn collect_files(path: &Path, only_mld: bool) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !only_mld || has_mld_extension(p))
        .collect()
}

fn has_mld_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mld"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_info(paths: &[PathBuf], options: &ReportOptions) -> bool {
    let mut all_ok = true;
    for file in paths.iter().flat_map(|p| collect_files(p, true)) {
        println!("\n[{}]", display_name(&file));
        let result = fs::read(&file)
            .map_err(MldError::from)
            .and_then(|bytes| decode(&bytes))
            .and_then(|doc| report::render(&doc, options));
        match result {
            Ok(text) => print!("{}", text),
            Err(e @ MldError::Io(_)) => {
                eprintln!("ERROR: {}", e);
                all_ok = false;
            }
            Err(e) if e.is_structural() => println!("It's not a mld. ({})", e),
            Err(e) => eprintln!("ERROR: {}", e),
        }
    }
    all_ok
}

fn run_extract(args: &ExtractArgs) -> bool {
    let scan = ScanOptions {
        mode: if args.heuristic { ScanMode::TitleHeuristic } else { ScanMode::Strict },
        max_candidate_size: (args.max_size > 0).then_some(args.max_size),
        clamp_to_buffer: args.clamp,
    };
    let exporter = Exporter::new();
    let mut all_ok = true;

    for input in &args.paths {
        let output_dir = match &args.output {
            Some(dir) => dir.clone(),
            None if input.is_dir() => input.clone(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let export = ExportOptions {
            output_dir,
            delete_source: args.delete,
        };

        // Collect up front so files written into the scanned directory are not rescanned.
        for file in collect_files(input, false) {
            let name = display_name(&file);
            match exporter.extract_file(&file, &scan, &export) {
                Ok(summary) if summary.found == 0 => println!("{}: There is no mld.", name),
                Ok(summary) => {
                    for outcome in &summary.outcomes {
                        match outcome {
                            ExportOutcome::Written(path) => println!("{}: done!", display_name(path)),
                            ExportOutcome::Duplicate { skipped, existing } => {
                                println!("Duplicate file found: {}", skipped.display());
                                println!("Matches existing file: {}", existing.display());
                            }
                        }
                    }
                    if summary.source_deleted {
                        println!("Deleted original file: {}", file.display());
                    }
                }
                Err(e) => {
                    eprintln!("ERROR: {}: {}", name, e);
                    all_ok = false;
                }
            }
        }
    }
    all_ok
}

fn run_set_version(paths: &[PathBuf]) -> bool {
    let mut all_ok = true;
    for path in paths {
        if let Err(e) = set_version_file(path) {
            match e {
                MldError::Io(_) => {
                    eprintln!("ERROR: {}: {}", display_name(path), e);
                    all_ok = false;
                }
                e if e.is_structural() => {
                    debug!("{} rejected: {}", path.display(), e);
                    println!("It's not a mld.");
                }
                e => eprintln!("ERROR: {}: {}", display_name(path), e),
            }
        }
    }
    all_ok
}

fn set_version_file(path: &Path) -> mld_reader::Result<()> {
    let mut data = fs::read(path)?;
    upgrade_to_mfi3(&mut data)?;

    let out_dir = path.parent().unwrap_or(Path::new("")).join("MFi3");
    fs::create_dir_all(&out_dir)?;
    let out_path = out_dir.join(path.file_name().unwrap_or(path.as_os_str()));
    fs::write(&out_path, data)?;
    println!("{}: done!", out_path.display());
    Ok(())
}
