use clap::{Parser, Subcommand};
use iconsmith::archive::{ArchiveSink, ZipSink};
use iconsmith::config::{self, EditorConfig, ExportConfig};
use iconsmith::export::{ExportOptions, write_individual};
use iconsmith::handoff::HandoffSlot;
use iconsmith::imaging::encode_png;
use iconsmith::model::{Edit, load_edits};
use iconsmith::output;
use iconsmith::session::EditorSession;
use iconsmith::sizes::IOS;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Where the source image comes from and which edits to apply to it.
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Image file or http(s) URL to edit (defaults to the handoff slot)
    #[arg(long)]
    source: Option<String>,

    /// TOML file with the edits to apply
    #[arg(long)]
    edits: Option<PathBuf>,
}

/// Size table selection on top of the configured platforms.
#[derive(clap::Args, Clone)]
struct PlatformArgs {
    /// Include the iOS app icon set
    #[arg(long)]
    ios: bool,

    /// Include the 512px store listing icon
    #[arg(long)]
    store: bool,
}

impl PlatformArgs {
    fn apply(&self, export: &mut ExportConfig) {
        if self.ios && !export.platforms.iter().any(|p| p == IOS) {
            export.platforms.push(IOS.to_string());
        }
        if self.store {
            export.store_listing = true;
        }
    }
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "iconsmith")]
#[command(about = "Compose launcher icons from one image and export every size")]
#[command(long_about = "\
Compose launcher icons from one image and export every size

Edits are described in a small TOML file; every key is optional:

  scale = 1.2                 # absolute; omit to keep the fit-to-canvas scale
  rotation = 15               # degrees clockwise
  x_offset = 0                # reference pixels (512px canvas)
  y_offset = -20
  background_color = \"#1e88e5\"
  padding = { value = 8, unit = \"percent\" }
  border_width = 12
  border_color = \"#ffffff\"
  icon_shape = \"rounded-square\" # none | circle | rounded-square
  filter = \"none\"             # none | grayscale | sepia | invert | blur

  [text]
  content = \"Beta\"
  font_size = 64
  font_color = \"#000000\"

Android output layout:
  res/drawable-mdpi/ic_launcher.png      48px
  res/drawable-hdpi/ic_launcher.png      72px
  res/drawable-xhdpi/ic_launcher.png     96px
  res/drawable-xxhdpi/ic_launcher.png    144px
  res/drawable-xxxhdpi/ic_launcher.png   192px

Run 'iconsmith gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Handoff slot file
    #[arg(long, global = true)]
    handoff: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one icon and write it as PNG
    Preview {
        #[command(flatten)]
        input: SourceArgs,

        /// Output PNG
        #[arg(long, default_value = "preview.png")]
        out: PathBuf,

        /// Pixel size (defaults to the reference canvas size)
        #[arg(long)]
        size: Option<u32>,
    },
    /// Render every size in the table and write files and/or an archive
    Export {
        #[command(flatten)]
        input: SourceArgs,

        #[command(flatten)]
        platforms: PlatformArgs,

        /// Output directory
        #[arg(long, default_value = "icons")]
        out: PathBuf,

        /// Sharpen every icon after compositing
        #[arg(long)]
        sharpen: bool,

        /// Skip the ZIP archive
        #[arg(long)]
        no_archive: bool,

        /// Skip the individual PNG files
        #[arg(long)]
        no_files: bool,
    },
    /// List the sizes an export would produce
    Sizes(PlatformArgs),
    /// Pass an image location to the next run
    Handoff {
        #[command(subcommand)]
        action: HandoffAction,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum HandoffAction {
    /// Store a location in the slot
    Set { location: String },
    /// Print the stored location and clear the slot
    Take,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let slot = HandoffSlot::new(cli.handoff.clone().unwrap_or_else(HandoffSlot::default_path));

    match cli.command {
        Command::Preview { input, out, size } => {
            let config = config::load_config_file(&cli.config)?;
            let session = open_session(&config, &input, &slot)?;
            let size = size.unwrap_or(config.canvas.reference_size);
            let image = session
                .compositor()
                .render(session.model(), session.source(), size)?;
            fs::write(&out, encode_png(&image)?)?;
            output::print_model(session.model());
            println!("Preview ({size}px) \u{2192} {}", out.display());
        }
        Command::Export {
            input,
            platforms,
            out,
            sharpen,
            no_archive,
            no_files,
        } => {
            let mut config = config::load_config_file(&cli.config)?;
            platforms.apply(&mut config.export);
            if sharpen {
                config.export.sharpen = true;
            }
            if no_archive {
                config.export.archive = false;
            }
            config.validate()?;
            init_thread_pool(&config.processing);

            let mut session = open_session(&config, &input, &slot)?;
            let table = config.export.size_table();
            let options = ExportOptions {
                sharpen: config.export.sharpen,
            };

            fs::create_dir_all(&out)?;
            let archive_path = config
                .export
                .archive
                .then(|| out.join(&config.export.archive_name));
            let mut zip = match &archive_path {
                Some(path) => Some(ZipSink::new(fs::File::create(path)?)),
                None => None,
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_export_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = session.export(
                &table,
                &options,
                zip.as_mut().map(|z| z as &mut dyn ArchiveSink),
                Some(tx),
                Instant::now(),
            );
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let report = match result {
                Ok(report) => report,
                Err(e) => {
                    if let Some(path) = &archive_path {
                        fs::remove_file(path).ok();
                    }
                    return Err(e.into());
                }
            };

            let written = if no_files {
                Vec::new()
            } else {
                write_individual(&report, &out)?
            };
            let archive = archive_path.as_deref().filter(|_| report.archive.is_some());
            output::print_export_report(&report, &written, archive);
            if report.is_partial() {
                return Err(format!("{} icons failed", report.failures.len()).into());
            }
        }
        Command::Sizes(platforms) => {
            let mut config = config::load_config_file(&cli.config)?;
            platforms.apply(&mut config.export);
            output::print_size_table(&config.export.size_table());
        }
        Command::Handoff { action } => match action {
            HandoffAction::Set { location } => {
                slot.put(&location)?;
                println!("Stored {} \u{2192} {}", location, slot.path().display());
            }
            HandoffAction::Take => match slot.take()? {
                Some(location) => println!("{location}"),
                None => println!("Handoff slot is empty"),
            },
        },
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Build a session, load the source and apply the edits file.
///
/// Without `--source` the handoff slot is consumed; with neither the session
/// keeps the placeholder.
fn open_session(
    config: &EditorConfig,
    input: &SourceArgs,
    slot: &HandoffSlot,
) -> Result<EditorSession, Box<dyn std::error::Error>> {
    let mut session = EditorSession::from_config(config)?;

    let location = match &input.source {
        Some(location) => Some(location.clone()),
        None => slot.take()?,
    };
    if let Some(location) = location {
        debug!(%location, "loading source");
        session.load_from(&config.source.provider(), &location, Instant::now())?;
    }

    if let Some(path) = &input.edits {
        let edits = load_edits(path)?;
        let model = edits.resolve(session.defaults());
        session.apply(&Edit::Replace(Box::new(model)))?;
    }
    Ok(session)
}

/// Log to stderr. `RUST_LOG` wins; otherwise warnings, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "iconsmith=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
