use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use indicador::render::render_view;
use indicador::{run, DashboardConfig, OutputFormat};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Svg,
}

#[derive(Parser, Debug)]
#[command(name = "indicador")]
#[command(about = "Build the social-initiative indicator dashboard from a spreadsheet", long_about = None)]
struct Args {
    /// Source table (.xlsx, .xls, .ods, .csv, .json, or - for CSV on stdin)
    input: PathBuf,

    /// Directory that receives graph1..graph7
    #[arg(short, long, default_value = "graphs")]
    out_dir: PathBuf,

    /// Image format (overrides the config file)
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Compute the views on separate threads
    #[arg(long)]
    parallel: bool,

    /// Print the dashboard tables as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<DashboardConfig> {
    let mut config = match &args.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::default(),
    };

    if let Some(format) = args.format {
        config.render.format = match format {
            Format::Png => OutputFormat::Png,
            Format::Svg => OutputFormat::Svg,
        };
    }
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    config.parallel |= args.parallel;

    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;

    let dashboard = run(&args.input, &config)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let ext = config.render.format.extension();
    let mut written = 0;
    for view in dashboard.successes() {
        let path = args.out_dir.join(format!("{}.{}", view.id, ext));
        match render_view(view, &config.render) {
            Ok(bytes) => {
                fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
                info!("wrote {}", path.display());
                written += 1;
            }
            Err(e) => error!("{}: {:#}", view.id, e),
        }
    }

    if args.json {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, &dashboard.to_json())
            .context("Failed to write JSON to stdout")?;
        writeln!(handle).context("Failed to write JSON to stdout")?;
        handle.flush().context("Failed to flush stdout")?;
    }

    if written == 0 {
        bail!("No view could be rendered");
    }

    Ok(())
}
