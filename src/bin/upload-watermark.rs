use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use upload_watermark::{
    default_output_path, Compositor, FsObjectStore, Handler, HandlerConfig, ObjectCreatedEvent,
    ObjectStore, Outcome, WATERMARK_FILE,
};

#[derive(Parser)]
#[command(
    name = "upload-watermark",
    about = "Overlay a translucent, centered watermark on uploaded images",
    version,
    after_help = "Object events:  upload-watermark handle --store-root ./buckets --bucket uploads --name photo.jpg\n\
                  Local files:    upload-watermark apply photo.jpg -o marked.jpg"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one object-created event: download, watermark, upload
    Handle(HandleArgs),
    /// Watermark a local image file
    Apply(ApplyArgs),
}

#[derive(Args)]
struct HandleArgs {
    /// JSON event payload file with `bucket` and `name` ("-" reads stdin)
    #[arg(long, conflicts_with_all = ["bucket", "name"])]
    event: Option<String>,

    /// Container the object was created in
    #[arg(long, requires = "name")]
    bucket: Option<String>,

    /// Key of the created object
    #[arg(long, requires = "bucket")]
    name: Option<String>,

    /// Serve containers from subdirectories of this directory
    #[arg(long, value_name = "DIR")]
    store_root: Option<PathBuf>,

    /// Use an S3-compatible object store (credentials from the environment)
    #[cfg(feature = "s3")]
    #[arg(long, conflicts_with = "store_root")]
    s3: bool,

    /// Custom S3 endpoint URL
    #[cfg(feature = "s3")]
    #[arg(long, requires = "s3")]
    endpoint_url: Option<String>,

    /// S3 region override
    #[cfg(feature = "s3")]
    #[arg(long, requires = "s3")]
    region: Option<String>,

    /// Watermark image
    #[arg(long, default_value = WATERMARK_FILE)]
    watermark: PathBuf,

    /// Scratch directory for staged files (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    scratch_dir: Option<PathBuf>,
}

#[derive(Args)]
struct ApplyArgs {
    /// Input image file
    input: PathBuf,

    /// Output file (default: watermarked-{name} next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Watermark image
    #[arg(long, default_value = WATERMARK_FILE)]
    watermark: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let code = match cli.command {
        Command::Handle(args) => handle(args, cli.quiet),
        Command::Apply(args) => apply(&args, cli.quiet),
    };
    process::exit(code);
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle(args: HandleArgs, quiet: bool) -> i32 {
    let event = match read_event(&args) {
        Ok(event) => event,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return 1;
        }
    };

    let store = match open_store(&args) {
        Ok(store) => store,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return 1;
        }
    };

    let mut config = HandlerConfig {
        watermark_path: args.watermark,
        ..HandlerConfig::default()
    };
    if let Some(dir) = args.scratch_dir {
        config.scratch_dir = dir;
    }

    let handler = Handler::new(store, config);
    match handler.on_object_created(&event) {
        Ok(Outcome::Uploaded { key }) => {
            if !quiet {
                eprintln!("[OK] {}/{key}", event.bucket);
            }
            0
        }
        Ok(Outcome::Skipped) => {
            if !quiet {
                eprintln!("[SKIP] {}: not an image", event.name);
            }
            0
        }
        Ok(Outcome::AssetMissing) => {
            if !quiet {
                eprintln!("[SKIP] {}: watermark asset missing", event.name);
            }
            0
        }
        Err(e) => {
            eprintln!("[FAIL] {}/{}: {e}", event.bucket, event.name);
            1
        }
    }
}

fn read_event(args: &HandleArgs) -> Result<ObjectCreatedEvent, String> {
    match (&args.event, &args.bucket, &args.name) {
        (Some(source), _, _) => {
            let payload = if source == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| format!("failed to read event from stdin: {e}"))?;
                buf
            } else {
                std::fs::read_to_string(source)
                    .map_err(|e| format!("failed to read event file {source}: {e}"))?
            };
            ObjectCreatedEvent::from_json(&payload).map_err(|e| e.to_string())
        }
        (None, Some(bucket), Some(name)) => Ok(ObjectCreatedEvent::new(bucket, name)),
        _ => Err("either --event or both --bucket and --name are required".to_string()),
    }
}

fn open_store(args: &HandleArgs) -> Result<Box<dyn ObjectStore>, String> {
    if let Some(store) = open_remote_store(args)? {
        return Ok(store);
    }

    match &args.store_root {
        Some(root) if root.is_dir() => Ok(Box::new(FsObjectStore::new(root))),
        Some(root) => Err(format!("store root is not a directory: {}", root.display())),
        None => Err("no object store selected (use --store-root)".to_string()),
    }
}

#[cfg(feature = "s3")]
fn open_remote_store(args: &HandleArgs) -> Result<Option<Box<dyn ObjectStore>>, String> {
    if !args.s3 {
        return Ok(None);
    }
    let options = upload_watermark::store::S3Options {
        endpoint_url: args.endpoint_url.clone(),
        region: args.region.clone(),
    };
    let store: Box<dyn ObjectStore> = Box::new(
        upload_watermark::store::S3ObjectStore::connect(&options)
            .map_err(|e| format!("failed to initialize S3 client: {e}"))?,
    );
    Ok(Some(store))
}

#[cfg(not(feature = "s3"))]
#[allow(clippy::unnecessary_wraps)]
fn open_remote_store(_args: &HandleArgs) -> Result<Option<Box<dyn ObjectStore>>, String> {
    Ok(None)
}

fn apply(args: &ApplyArgs, quiet: bool) -> i32 {
    if !args.input.exists() {
        eprintln!("Error: Input path does not exist: {}", args.input.display());
        return 1;
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    let compositor = Compositor::new(args.watermark.clone());
    match compositor.apply(&args.input, &output) {
        Ok(()) => {
            if !quiet {
                eprintln!("[OK] {}", display_name(&output));
            }
            0
        }
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", display_name(&args.input));
            1
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}
