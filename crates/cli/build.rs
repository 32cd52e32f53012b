use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("readmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract the readable part of a web page as Markdown")
        .arg(clap::arg!(<INPUT> "Local HTML file, '-' for stdin, or an http(s) URL"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (markdown, html, text)")
                .value_name("FORMAT")
                .default_value("markdown")
                .value_parser(["markdown", "html", "text"]),
        )
        .arg(clap::arg!(--"no-frontmatter" "Omit the front matter (Markdown) or header (text)"))
        .arg(clap::arg!(--metadata "Add byline, published date, site and excerpt to the front matter"))
        .arg(
            clap::arg!(--"char-threshold" <NUM> "Minimum characters of extracted text before the pipeline gives up")
                .default_value("500"),
        )
        .arg(clap::arg!(--"top-candidates" <NUM> "Number of top candidates to track").default_value("5"))
        .arg(
            clap::arg!(--"max-elements" <NUM> "Refuse documents with more elements than this (0 = unlimited)")
                .default_value("0"),
        )
        .arg(clap::arg!(--"keep-classes" "Keep class attributes in the extracted content"))
        .arg(
            clap::arg!(--"heading-style" <STYLE> "Heading style")
                .default_value("atx")
                .value_parser(["atx", "setext"]),
        )
        .arg(
            clap::arg!(--"code-style" <STYLE> "Code block style")
                .default_value("fenced")
                .value_parser(["fenced", "indented"]),
        )
        .arg(
            clap::arg!(--"link-style" <STYLE> "Link style")
                .default_value("inlined")
                .value_parser(["inlined", "full", "collapsed", "shortcut"]),
        )
        .arg(clap::arg!(--"fallback-only" "Skip readability and use the fallback extractor"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(clap::arg!(-v --verbose "Print progress and enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "readmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "readmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "readmark", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "readmark", &completions_dir).unwrap();
}
