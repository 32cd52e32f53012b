use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use readmark_core::{
    CodeBlockStyle, Converter, Document, HeadingStyle, LinkReferenceStyle, LinkStyle, MarkdownOptions, Origin,
    ReadabilityConfig, TextConfig, fetch_file, fetch_stdin,
};
use tracing_subscriber::EnvFilter;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Markdown,
    Html,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("Invalid format: {s}. Valid options: markdown, html, text")),
        }
    }
}

fn parse_heading_style(s: &str) -> Result<HeadingStyle, String> {
    match s.to_lowercase().as_str() {
        "atx" => Ok(HeadingStyle::Atx),
        "setext" => Ok(HeadingStyle::Setext),
        _ => Err(format!("Invalid heading style: {s}. Valid options: atx, setext")),
    }
}

fn parse_code_style(s: &str) -> Result<CodeBlockStyle, String> {
    match s.to_lowercase().as_str() {
        "fenced" => Ok(CodeBlockStyle::Fenced),
        "indented" => Ok(CodeBlockStyle::Indented),
        _ => Err(format!("Invalid code style: {s}. Valid options: fenced, indented")),
    }
}

/// `inlined` or one of the reference styles.
fn parse_link_style(s: &str) -> Result<(LinkStyle, LinkReferenceStyle), String> {
    match s.to_lowercase().as_str() {
        "inlined" => Ok((LinkStyle::Inlined, LinkReferenceStyle::Full)),
        "full" => Ok((LinkStyle::Referenced, LinkReferenceStyle::Full)),
        "collapsed" => Ok((LinkStyle::Referenced, LinkReferenceStyle::Collapsed)),
        "shortcut" => Ok((LinkStyle::Referenced, LinkReferenceStyle::Shortcut)),
        _ => Err(format!("Invalid link style: {s}. Valid options: inlined, full, collapsed, shortcut")),
    }
}

/// Extract the readable part of a web page as Markdown
#[derive(Parser, Debug)]
#[command(name = "readmark")]
#[command(version = VERSION)]
#[command(about = "Extract the readable part of a web page as Markdown", long_about = None)]
struct Args {
    /// Local HTML file, "-" for stdin, or an http(s) URL
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (markdown, html, text)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    format: OutputFormat,

    /// Omit the front matter (Markdown) or header (text)
    #[arg(long)]
    no_frontmatter: bool,

    /// Add byline, published date, site and excerpt to the front matter
    #[arg(long)]
    metadata: bool,

    /// Minimum characters of extracted text before the pipeline gives up
    #[arg(long, default_value = "500", value_name = "NUM")]
    char_threshold: usize,

    /// Number of top candidates to track
    #[arg(long, default_value = "5", value_name = "NUM")]
    top_candidates: usize,

    /// Refuse documents with more elements than this (0 = unlimited)
    #[arg(long, default_value = "0", value_name = "NUM")]
    max_elements: usize,

    /// Keep class attributes in the extracted content
    #[arg(long)]
    keep_classes: bool,

    /// Heading style (atx, setext)
    #[arg(long, default_value = "atx", value_name = "STYLE", value_parser = parse_heading_style)]
    heading_style: HeadingStyle,

    /// Code block style (fenced, indented)
    #[arg(long, default_value = "fenced", value_name = "STYLE", value_parser = parse_code_style)]
    code_style: CodeBlockStyle,

    /// Link style (inlined, full, collapsed, shortcut)
    #[arg(long, default_value = "inlined", value_name = "STYLE", value_parser = parse_link_style)]
    link_style: (LinkStyle, LinkReferenceStyle),

    /// Skip readability and use the fallback extractor
    #[arg(long)]
    fallback_only: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Print progress and enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn is_url(&self) -> bool {
        self.input.starts_with("http://") || self.input.starts_with("https://")
    }

    fn source(&self) -> &str {
        if self.input == "-" { "stdin" } else { &self.input }
    }

    fn converter(&self) -> Converter {
        let readability = ReadabilityConfig::builder()
            .char_threshold(self.char_threshold)
            .nb_top_candidates(self.top_candidates)
            .max_elems_to_parse(self.max_elements)
            .keep_classes(self.keep_classes)
            .build();
        let (link_style, link_reference_style) = self.link_style;
        let options = MarkdownOptions::builder()
            .heading_style(self.heading_style)
            .code_block_style(self.code_style)
            .link_style(link_style)
            .link_reference_style(link_reference_style)
            .build();

        Converter::builder()
            .readability(readability)
            .options(options)
            .include_metadata(self.metadata)
            .fallback_only(self.fallback_only)
            .build()
    }
}

/// `RUST_LOG` wins; otherwise debug for the library in verbose mode, warnings only without it.
fn init_tracing(verbose: bool) {
    let default = if verbose { "readmark_core=debug,readmark=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

#[cfg(feature = "fetch")]
async fn fetch_page(args: &Args) -> anyhow::Result<String> {
    let mut config = readmark_core::FetchConfig { timeout: args.timeout, ..Default::default() };
    if let Some(user_agent) = &args.user_agent {
        config.user_agent = user_agent.clone();
    }
    readmark_core::fetch_url(&args.input, &config).await.context("Failed to fetch URL")
}

#[cfg(not(feature = "fetch"))]
async fn fetch_page(args: &Args) -> anyhow::Result<String> {
    anyhow::bail!("Cannot fetch {}: readmark was built without the fetch feature", args.input)
}

async fn read_input(args: &Args) -> anyhow::Result<String> {
    if args.input == "-" {
        fetch_stdin().context("Failed to read from stdin")
    } else if args.is_url() {
        fetch_page(args).await
    } else {
        fetch_file(&args.input).with_context(|| format!("Failed to read file: {}", args.input))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let started = Instant::now();
    let mut timings: Vec<(String, Duration)> = Vec::new();

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    if args.verbose {
        let what = if args.input == "-" {
            "Reading from stdin".to_string()
        } else if args.is_url() {
            format!("Fetching from {}", args.input.bright_white().underline())
        } else {
            format!("Reading from file {}", args.input.bright_white())
        };
        echo::print_step(1, 4, &what);
    }

    let step = Instant::now();
    let html = read_input(&args).await?;
    timings.push(("Read".to_string(), step.elapsed()));

    if args.verbose {
        eprintln!("  {} {}", "Size:".dimmed(), echo::format_size(html.len()).bright_white());
        eprintln!();
        echo::print_step(2, 4, "Parsing HTML document");
    }

    let step = Instant::now();
    let doc = if args.is_url() {
        Document::parse_with_url(&html, &args.input).context("Failed to parse HTML")?
    } else {
        Document::parse(&html).context("Failed to parse HTML")?
    };
    timings.push(("Parse".to_string(), step.elapsed()));

    if args.verbose {
        if let Some(title) = doc.title() {
            eprintln!("  {} {}", "Title:".dimmed(), title.bright_white());
        }
        eprintln!();
        echo::print_step(3, 4, "Extracting main content");
    }

    let converter = args.converter();
    let step = Instant::now();
    let (output, origin) = match args.format {
        OutputFormat::Markdown => {
            let converted = converter.convert(&doc, args.source()).context("Failed to convert to Markdown")?;
            let output = if args.no_frontmatter {
                format!("{}\n", converted.document.body())
            } else {
                converted.document.render()
            };
            (output, converted.origin)
        }
        OutputFormat::Html => {
            let (article, origin) = converter.extract(&doc).context("Failed to extract content")?;
            (format!("{}\n", article.content_html()), origin)
        }
        OutputFormat::Text => {
            let (article, origin) = converter.extract(&doc).context("Failed to extract content")?;
            let config = TextConfig { line_width: 0, include_header: !args.no_frontmatter };
            (format!("{}\n", article.to_text(&config)), origin)
        }
    };
    timings.push(("Extract".to_string(), step.elapsed()));
    tracing::debug!(?origin, bytes = output.len(), "conversion finished");

    if args.verbose {
        eprintln!("  {} {}", "Origin:".dimmed(), format!("{origin:?}").bright_white());
        if origin == Origin::Empty {
            echo::print_warning("No readable content found");
        }
        eprintln!();
        echo::print_step(4, 4, "Writing output");
        eprintln!("  {} {}", "Format:".dimmed(), format!("{:?}", args.format).bright_white());
        eprintln!();
    }

    match &args.output {
        Some(path) => {
            fs::write(path, &output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => print!("{output}"),
    }

    if args.verbose {
        echo::print_timing_summary(started.elapsed(), &timings);
    }

    Ok(())
}
