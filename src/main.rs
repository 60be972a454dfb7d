use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use iati_json::{convert_source, ConvertOptions, ParserConfig, Source, WalkConfig};

#[derive(Debug, Parser)]
#[command(
    name = "iati-json",
    version,
    about = "Convert IATI XML files or directories to JSON"
)]
struct Args {
    /// XML file, directory of XML files, or `-` for stdin (defaults to stdin)
    #[arg(value_name = "SOURCE")]
    source: Option<String>,
    /// Indent the output
    #[arg(short, long)]
    pretty: bool,
    /// Write the JSON to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Spaces per indentation level with --pretty
    #[arg(long, value_name = "N", default_value_t = iati_json::formatter::DEFAULT_INDENT_SPACES)]
    indent: usize,
    /// Map directory files one at a time instead of in parallel
    #[arg(long)]
    sequential: bool,
    /// Include organisation files (`*-org.xml`) when reading a directory
    #[arg(long)]
    include_org: bool,
    /// Do not retry malformed input with bracketed URLs removed
    #[arg(long)]
    strict: bool,
}

impl Args {
    fn options(&self) -> ConvertOptions {
        let mut walk = WalkConfig {
            parallel: !self.sequential,
            ..WalkConfig::default()
        };
        if self.include_org {
            walk.excluded_suffixes.clear();
        }

        ConvertOptions {
            pretty: self.pretty,
            output: self.output.clone(),
            indent_spaces: self.indent,
            parser: ParserConfig {
                strip_bracketed_urls: !self.strict,
                ..ParserConfig::default()
            },
            walk,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let options = args.options();

    let source = match args.source.as_deref() {
        None | Some("-") => Source::Text(read_stdin()?),
        Some(path) => Source::from_path(path)
            .with_context(|| format!("failed to open source {path}"))?,
    };
    debug!(source = %source.describe(), "converting");

    let output = convert_source(&source, &options)
        .with_context(|| format!("failed to convert {}", source.describe()))?;

    if options.output.is_none() {
        println!("{output}");
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_span_events(FmtSpan::CLOSE)
        .init();
}

fn read_stdin() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("no source given; pass a file or directory, or pipe XML on stdin");
    }
    let mut bytes = Vec::new();
    stdin
        .lock()
        .read_to_end(&mut bytes)
        .context("failed to read stdin")?;
    let text = iati_json::utils::decode_source(bytes).context("stdin is not valid UTF-8 or UTF-16")?;
    if text.trim().is_empty() {
        bail!("no input provided on stdin");
    }
    Ok(text)
}
