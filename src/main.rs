use anyhow::{bail, Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use mediadump::config::{validate_timeout, Env, OutputOverrides, RADARR, SONARR};
use mediadump::export::read_json;
use mediadump::fetch::{HttpTransport, DEFAULT_TIMEOUT};
use mediadump::upstream::{EmptyPolicy, Upstream};
use mediadump::ExportSummary;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mediadump",
    about = "Export Radarr movies, Sonarr shows and Deezer favourite artists to json and csv."
)]
struct Opt {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export every movie in a Radarr library (RADARR_API_KEY, RADARR_BASE_URL)
    Movies(ExportOpt),
    /// Export every series in a Sonarr library (SONARR_API_KEY, SONARR_BASE_URL)
    Shows(ExportOpt),
    /// Export the ids of a Deezer user's favourite artists (DEEZER_USER_ID)
    DeezerArtists(ExportOpt),
    /// Count the records in an existing json export
    Inspect {
        /// Location of the json export
        path: PathBuf,
    },
}

#[derive(Args)]
struct ExportOpt {
    /// Write the json export here instead
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write the csv export here instead
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Skip the json export
    #[arg(long)]
    no_json: bool,

    /// Skip the csv export
    #[arg(long)]
    no_csv: bool,

    /// What to do when nothing is found: skip, write or fail
    #[arg(long, value_name = "POLICY")]
    on_empty: Option<EmptyPolicy>,

    /// Per request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Stop after requesting this many pages
    #[arg(long, value_name = "N", value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    max_pages: Option<usize>,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    init_logging(opt.verbose);

    run(opt.command)
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "mediadump=debug"
    } else {
        "mediadump=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    let env = Env::from_process();
    let (upstream, opt) = match command {
        Command::Inspect { path } => return inspect(&path),
        Command::Movies(opt) => {
            let config = env.servarr(RADARR).context("API key or base URL not found")?;
            let upstream = Upstream::radarr(&config).with_outputs(&env.servarr_outputs(RADARR));
            (upstream, opt)
        }
        Command::Shows(opt) => {
            let config = env.servarr(SONARR).context("API key or base URL not found")?;
            let upstream = Upstream::sonarr(&config).with_outputs(&env.servarr_outputs(SONARR));
            (upstream, opt)
        }
        Command::DeezerArtists(opt) => {
            let config = env.deezer().context("Deezer user ID not usable")?;
            let upstream = Upstream::deezer_artists(&config).with_outputs(&env.deezer_outputs());
            (upstream, opt)
        }
    };

    let timeout = match opt.timeout {
        Some(secs) => validate_timeout(secs)?,
        None => env.timeout()?.unwrap_or(DEFAULT_TIMEOUT),
    };
    let upstream = apply_options(upstream, &opt)?;

    let summary = mediadump::dump(&upstream, &HttpTransport::new(timeout))
        .with_context(|| format!("failed to export {}", upstream.noun))?;

    for line in report(&upstream, &summary) {
        println!("{}", line);
    }

    Ok(())
}

/// The lines printed after an export.
fn report(upstream: &Upstream, summary: &ExportSummary) -> Vec<String> {
    if summary.count == 0 && summary.written.is_empty() {
        return vec![format!("No {} found", upstream.noun)];
    }
    summary
        .written
        .iter()
        .map(|path| upstream.report.line(summary.count, upstream.noun, path))
        .collect()
}

fn apply_options(mut upstream: Upstream, opt: &ExportOpt) -> Result<Upstream> {
    upstream = upstream.with_outputs(&OutputOverrides {
        json: opt.json.clone(),
        csv: opt.csv.clone(),
    });
    if opt.no_json {
        upstream.json = None;
    }
    if opt.no_csv {
        upstream.csv = None;
    }
    if let Some(policy) = opt.on_empty {
        upstream.on_empty = policy;
    }
    if let Some(max) = opt.max_pages {
        upstream = upstream.with_max_pages(max);
    }
    if upstream.json.is_none() && upstream.csv.is_none() {
        bail!("nothing to export {} to, every output is disabled", upstream.noun);
    }
    Ok(upstream)
}

fn inspect(path: &Path) -> Result<()> {
    let items = read_json(path)?;
    println!("{} records in {}", items.len(), path.display());
    Ok(())
}
