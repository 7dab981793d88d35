use clap::{Parser, Subcommand};
use hugopix::config::{self, ConfigOverrides};
use hugopix::profile::RunProfile;
use hugopix::{output, pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, info};

/// Flags for the default build action.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Directory to read photos from (walked recursively)
    #[arg(long, default_value = ".")]
    source: PathBuf,

    /// Output directory for the gallery
    #[arg(short, long, required = true)]
    output: Option<PathBuf>,

    /// Thumbnail width
    #[arg(long = "tw")]
    thumbnail_width: Option<u32>,

    /// Thumbnail height
    #[arg(long = "th")]
    thumbnail_height: Option<u32>,

    /// Small image max width
    #[arg(long = "sw")]
    small_width: Option<u32>,

    /// Small image max height
    #[arg(long = "sh")]
    small_height: Option<u32>,

    /// Gallery title
    #[arg(short, long)]
    title: Option<String>,

    /// Config file [default: <source>/hugopix.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON timing report for the whole run to this file
    #[arg(long)]
    cpuprofile: Option<PathBuf>,

    /// Verbose logging: what gets generated
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Very verbose logging: skipped files and chosen crops
    #[arg(short = 'V', long)]
    very_verbose: bool,
}

#[derive(Parser)]
#[command(name = "hugopix")]
#[command(about = "Build Hugo photo-gallery assets from a directory of photos")]
#[command(long_about = "\
Build Hugo photo-gallery assets from a directory of photos

Every .jpg, .jpeg and .png below --source is published into the flat output
directory together with two derivatives and an index.md page:

  out/
  ├── index.md           # front matter + {{< photo >}} shortcode per photo
  ├── dawn.jpg           # full-size (hard link, or copy across filesystems)
  ├── dawn_small.jpg     # fits in 800x800, never upscaled
  └── dawn_thm.jpg       # exactly 256x256, content-aware crop

Derivatives are only rebuilt when missing or older than their source, so
re-running over an unchanged directory writes nothing new.

Run 'hugopix gen-config' to generate a documented hugopix.toml.")]
#[command(version, disable_version_flag = true)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(flatten)]
    build: BuildArgs,

    /// Print version
    #[arg(long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stock hugopix.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format_fatal(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

/// `error: <message>`, followed by each underlying cause not already part
/// of the message.
fn format_fatal(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = format!("error: {error}");
    let mut seen = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !seen.contains(&text) {
            message.push_str(&format!("\n  caused by: {text}"));
            seen.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let args = cli.build;
    init_logging(args.verbose, args.very_verbose);

    let output_dir = args
        .output
        .ok_or("must specify an output directory using -o")?;
    let config_path = args
        .config
        .unwrap_or_else(|| args.source.join(config::CONFIG_FILENAME));
    let mut gallery_config = config::load_config(&config_path)?;
    gallery_config.apply(ConfigOverrides {
        title: args.title,
        thumbnail_width: args.thumbnail_width,
        thumbnail_height: args.thumbnail_height,
        small_width: args.small_width,
        small_height: args.small_height,
    });
    gallery_config.validate()?;

    let threads = init_thread_pool(&gallery_config.processing);
    let profile = args.cpuprofile.as_deref().map(RunProfile::start);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_pipeline_event(&event) {
                println!("{}", line);
            }
        }
    });
    let date = chrono::Local::now().date_naive();
    let result = pipeline::run(&args.source, &output_dir, &gallery_config, date, Some(tx));
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let result = result?;
    output::print_run_summary(&result);

    if let Some(profile) = profile {
        let path = profile.finish(threads, &result.timings, &result.stats)?;
        info!(path = %path.display(), "wrote profile");
    }

    Ok(())
}

/// Log to stderr: warnings by default, `-v` adds info, `-V` adds debug.
fn init_logging(verbose: bool, very_verbose: bool) {
    let level = if very_verbose {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) -> usize {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
    threads
}
