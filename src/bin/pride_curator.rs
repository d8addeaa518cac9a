use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use pride_curator::app::{
    App, DownloadResult, IndexOptions, IndexResult, InfoOptions, InfoResult, ProjectsResult,
    ScanResult,
};
use pride_curator::archive::FtpArchiveClient;
use pride_curator::config::{ConfigLoader, ResolvedConfig};
use pride_curator::error::CuratorError;
use pride_curator::output::{JsonOutput, OutputMode};
use pride_curator::pride::PrideHttpClient;

#[derive(Parser)]
#[command(name = "pride-curator")]
#[command(about = "Resolve PRIDE project metadata and download dataset files from the PRIDE archive")]
#[command(version, author)]
struct Cli {
    /// Config file (defaults to ./pride-curator.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory for metadata caches, index dumps and downloads
    #[arg(long, global = true)]
    output_dir: Option<Utf8PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List every public project identifier")]
    Projects,
    #[command(about = "Show project metadata and its transfer URL")]
    Info(InfoArgs),
    #[command(about = "Resolve the transfer URL of every project")]
    Scan(ScanArgs),
    #[command(about = "Walk the FTP archive and dump the dataset index")]
    Index(IndexArgs),
    #[command(about = "Download dataset files of one format")]
    Download(DownloadArgs),
}

#[derive(Args)]
struct InfoArgs {
    identifier: String,

    /// Read cached metadata without contacting PRIDE
    #[arg(long)]
    offline: bool,
}

#[derive(Args)]
struct ScanArgs {
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct IndexArgs {
    /// Restrict the walk to these year directories
    #[arg(long = "year")]
    years: Vec<String>,

    /// Where to write the JSON index dump
    #[arg(long)]
    dump: Option<Utf8PathBuf>,

    /// Reuse an existing dump instead of walking the archive
    #[arg(long)]
    from_dump: Option<Utf8PathBuf>,

    /// Also write the dataset list as CSV
    #[arg(long)]
    csv: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct DownloadArgs {
    #[arg(required = true)]
    datasets: Vec<String>,

    /// raw, mgf or mgf.gz
    #[arg(long, default_value = "raw")]
    format: String,

    /// Index dump to look datasets up in
    #[arg(long)]
    index: Option<Utf8PathBuf>,

    /// Restrict the archive walk to these years when no dump exists
    #[arg(long = "year")]
    years: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<CuratorError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CuratorError) -> u8 {
    match error {
        CuratorError::InvalidIdentifier(_)
        | CuratorError::InvalidFormat(_)
        | CuratorError::DatasetNotFound(_)
        | CuratorError::ConfigRead(_)
        | CuratorError::ConfigParse(_) => 2,
        CuratorError::PrideHttp(_)
        | CuratorError::PrideConnection(_)
        | CuratorError::PrideStatus { .. }
        | CuratorError::UnreachableUrl { .. }
        | CuratorError::Archive(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    match cli.command {
        Commands::Projects => {
            let result = build_app(config)?.projects()?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_projects(&result).into_diagnostic(),
                OutputMode::Text => {
                    print_projects(&result);
                    Ok(())
                }
            }
        }
        Commands::Info(args) => {
            let options = InfoOptions {
                offline: args.offline,
            };
            let result = build_app(config)?.info(&args.identifier, options)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_info(&result).into_diagnostic(),
                OutputMode::Text => {
                    print_info(&result);
                    Ok(())
                }
            }
        }
        Commands::Scan(args) => {
            let result = build_app(config)?.scan(args.limit)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_scan(&result).into_diagnostic(),
                OutputMode::Text => {
                    print_scan(&result);
                    Ok(())
                }
            }
        }
        Commands::Index(args) => {
            if !args.years.is_empty() {
                config.archive.years = args.years;
            }
            let options = IndexOptions {
                from_dump: args.from_dump,
                dump_path: args.dump,
                csv_path: args.csv,
            };
            let result = build_app(config)?.index(options)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_index(&result).into_diagnostic(),
                OutputMode::Text => {
                    print_index(&result);
                    Ok(())
                }
            }
        }
        Commands::Download(args) => {
            if !args.years.is_empty() {
                config.archive.years = args.years;
            }
            let result =
                build_app(config)?.download(&args.datasets, &args.format, args.index.as_ref())?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_download(&result).into_diagnostic()?,
                OutputMode::Text => print_download(&result),
            }
            let failures = result.failures();
            if failures > 0 {
                return Err(miette::Report::msg(format!(
                    "{failures} of {} downloads failed",
                    result.items.len()
                )));
            }
            Ok(())
        }
    }
}

fn build_app(config: ResolvedConfig) -> miette::Result<App<PrideHttpClient, FtpArchiveClient>> {
    let pride = PrideHttpClient::new(&config.rest)?;
    let archive = FtpArchiveClient::from_settings(&config.archive);
    Ok(App::new(config, pride, archive))
}

fn print_projects(result: &ProjectsResult) {
    for id in &result.projects {
        println!("{id}");
    }
}

fn print_info(result: &InfoResult) {
    let project = &result.project;
    println!("Project: {}", project.id);
    if let Some(title) = &project.title {
        println!("Title: {title}");
    }
    if let Some(doi) = &project.doi {
        println!("DOI: {doi}");
    }
    if let Some(description) = &project.description {
        println!("Description: {description}");
    }
    if let Some(protocol) = &project.sample_processing_protocol {
        println!("Sample processing: {protocol}");
    }
    if let Some(protocol) = &project.data_processing_protocol {
        println!("Data processing: {protocol}");
    }
    println!("FTP Location: {}", result.transfer_url);
    println!("Metadata cache: {}", result.cache_path);
}

fn print_scan(result: &ScanResult) {
    for item in &result.items {
        match (&item.transfer_url, &item.error) {
            (Some(url), _) => println!("Project: {}\nFTP Location: {url}\n", item.id),
            (None, Some(err)) => println!("Error processing project {}: {err}\n", item.id),
            (None, None) => println!("Project: {}\n", item.id),
        }
    }
}

fn print_index(result: &IndexResult) {
    println!("Indexed datasets: {}", result.datasets);
    if let Some(path) = &result.dump_path {
        println!("Index dump: {path}");
    }
    if let Some(path) = &result.csv_path {
        println!("Dataset list has been written to {path}");
    }
}

fn print_download(result: &DownloadResult) {
    for item in &result.items {
        match (&item.report, &item.error) {
            (Some(report), _) => {
                println!(
                    "{}: {} {} file(s) in {}",
                    item.dataset,
                    report.files.len(),
                    report.format,
                    report.local_dir
                );
                for file in &report.files {
                    println!("   {file}");
                }
            }
            (None, Some(err)) => println!("{}: failed ({err})", item.dataset),
            (None, None) => println!("{}: failed", item.dataset),
        }
    }
}
