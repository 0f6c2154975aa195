//! designtree - convert web pages into design-tool documents

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use futures::executor::block_on;
use tracing::info;
use tracing_subscriber::EnvFilter;

use designtree::resources::{LocalFetcher, collect_resource_plan, prefetch};
use designtree::{
    CaptureBundle, ConversionContext, ConversionInput, ConverterConfig, DesignDocument, Result,
    Viewport, convert, decode_text,
};

#[derive(Parser)]
#[command(name = "designtree")]
#[command(version, about = "Convert rendered HTML and CSS into a design-tree document", long_about = None)]
#[command(after_help = "EXAMPLES:
    designtree capture page.capture.json -o page.json
    designtree html index.html --css site.css --width 1440 --height 900")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to ./designtree.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a capture bundle and convert it
    Capture {
        /// Capture bundle (JSON)
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Convert an HTML file and stylesheets directly
    Html {
        /// Page markup
        #[arg(value_name = "PAGE")]
        page: PathBuf,

        /// Stylesheet files, applied in order
        #[arg(long = "css", value_name = "FILE")]
        css: Vec<PathBuf>,

        /// Viewport width in CSS pixels
        #[arg(long, default_value_t = 1440)]
        width: u32,

        /// Viewport height in CSS pixels
        #[arg(long, default_value_t = 900)]
        height: u32,

        /// Output file (stdout when omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConverterConfig::load_from_file(path)?,
        None => ConverterConfig::load_or_default(),
    };

    match &cli.command {
        Command::Capture { bundle, output } => {
            let bundle = CaptureBundle::load(bundle)?;
            info!(url = %bundle.metadata.url, version = %bundle.version, "loaded capture");
            let ctx = ConversionContext::for_capture(&bundle, config);
            write_document(&convert(&ctx), output.as_deref(), cli.pretty)
        }
        Command::Html {
            page,
            css,
            width,
            height,
            output,
        } => {
            let markup = read_text(page)?;
            let mut stylesheet = String::new();
            for path in css {
                stylesheet.push_str(&read_text(path)?);
                stylesheet.push('\n');
            }

            let input = ConversionInput::new(markup, stylesheet, Viewport::new(*width, *height));
            let base_dir = page.parent().map(Path::to_path_buf);
            let plan = collect_resource_plan(&input, &config);
            let resources = block_on(prefetch(&LocalFetcher::new(base_dir), &plan));

            let ctx = ConversionContext::new(input, resources, config);
            write_document(&convert(&ctx), output.as_deref(), cli.pretty)
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(decode_text(&bytes, None).into_owned())
}

fn write_document(doc: &DesignDocument, output: Option<&Path>, pretty: bool) -> Result<()> {
    let json = doc.to_json(pretty)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!(path = %path.display(), "wrote document");
        }
        None => println!("{json}"),
    }
    Ok(())
}
