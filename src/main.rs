use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod clock;
mod config;
mod error;
mod git;
mod record;
mod template;
mod writer;

use config::{Config, Layer};
use git::RepoSource;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("DOCSTAMP_GIT_HASH"),
    ", ",
    env!("DOCSTAMP_GIT_DIRTY"),
    ")"
);

#[derive(Parser)]
#[command(name = "docstamp")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Write a 'last updated' stamp with the latest git commit into a docs footer file")]
struct Cli {
    /// Output file, replaced on every run [default: overrides/timestamp.txt]
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Built-in template: plain, footer or html [default: plain]
    #[arg(short, long)]
    preset: Option<String>,
    /// Custom template with {now}, {hash}, {subject}, {commit_time} fields
    #[arg(short, long, conflicts_with = "preset")]
    template: Option<String>,
    /// Escaping applied to substituted values: none or html
    #[arg(short, long)]
    escape: Option<String>,
    /// Directory to discover the git repository from [default: .]
    #[arg(short = 'C', long)]
    repo: Option<PathBuf>,
    /// Config file [default: ./docstamp.toml when present]
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Include seconds in timestamps
    #[arg(long)]
    seconds: bool,
    /// Fail when no commit can be read instead of leaving the fields empty
    #[arg(long)]
    strict: bool,
    /// Also print the rendered stamp to stdout
    #[arg(long)]
    print: bool,
    /// Also print the stamp fields as JSON to stdout
    #[arg(long, conflicts_with = "print")]
    json: bool,
    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn layer(&self) -> anyhow::Result<Layer> {
        Ok(Layer {
            output: self.output.clone(),
            preset: self.preset.as_deref().map(str::parse).transpose()?,
            template: self.template.clone(),
            escape: self.escape.as_deref().map(str::parse).transpose()?,
            // flags can only switch these on
            seconds: self.seconds.then_some(true),
            strict: self.strict.then_some(true),
            repo: self.repo.clone(),
            timezone: None,
        })
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "docstamp=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let file = Layer::load(cli.config.as_deref()).context("loading configuration")?;
    let config = Config::resolve(cli.layer()?, file).context("invalid configuration")?;
    tracing::debug!(?config, "resolved configuration");

    let source = RepoSource::new(&config.repo);
    let now = chrono::Utc::now();
    let stamp = writer::run(&config, &source, &now)
        .with_context(|| format!("stamping {}", config.output.display()))?;

    if cli.print {
        println!("{}", stamp.text);
    } else if cli.json {
        println!("{}", serde_json::to_string_pretty(&stamp.record)?);
    }

    Ok(())
}
