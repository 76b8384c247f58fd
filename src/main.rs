use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use wikicat::config::{self, ImageMode};
use wikicat::images::HttpFetcher;
use wikicat::{assemble, links, output, scan};

/// Flags of the `build` command that override config values.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Output markdown file
    #[arg(long, default_value = "wiki.md")]
    out: PathBuf,

    /// GitHub repository as owner/name (without .wiki)
    #[arg(long)]
    repo: Option<String>,

    /// How to handle images
    #[arg(long, value_enum)]
    images: Option<ImageMode>,

    /// Generation timestamp shown in a Version section
    #[arg(long)]
    timestamp: Option<String>,

    /// Heading of the assembled document
    #[arg(long)]
    title: Option<String>,
}

impl BuildArgs {
    /// Config overlay holding only the flags that were given.
    fn overrides(&self) -> Option<toml::Value> {
        let mut root = toml::Table::new();
        if let Some(repo) = &self.repo {
            root.insert("repo".into(), toml::Value::String(repo.clone()));
        }
        if let Some(timestamp) = &self.timestamp {
            root.insert("timestamp".into(), toml::Value::String(timestamp.clone()));
        }
        if let Some(title) = &self.title {
            let mut document = toml::Table::new();
            document.insert("title".into(), toml::Value::String(title.clone()));
            root.insert("document".into(), toml::Value::Table(document));
        }
        if let Some(mode) = self.images {
            let mode = match mode {
                ImageMode::Skip => "skip",
                ImageMode::Embed => "embed",
                ImageMode::Local => "local",
            };
            let mut images = toml::Table::new();
            images.insert("mode".into(), toml::Value::String(mode.into()));
            root.insert("images".into(), toml::Value::Table(images));
        }
        (!root.is_empty()).then_some(toml::Value::Table(root))
    }
}

#[derive(Parser)]
#[command(name = "wikicat")]
#[command(about = "Compile GitHub wiki pages into a single markdown document")]
#[command(long_about = "\
Compile GitHub wiki pages into a single markdown document

Point it at a checked-out <repo>.wiki directory. Pages are ordered by their
two-digit filename prefix, cross-page links become in-document anchors, and
every page becomes one section under a generated table of contents.

Wiki structure:

  wiki/
  ├── wikicat.toml               # Optional config
  ├── Home.md                    # Excluded by default
  ├── _Sidebar.md                # Excluded by default
  ├── 01-Introduction.md         # First section
  ├── 02-Setup.md
  ├── 02a-Advanced-Setup.md      # Letter suffix sorts after 02
  └── FAQ.md                     # No prefix: after all numbered pages

Titles come from the first top-level heading, else from the filename
(02-Setup.md → \"Setup\").

Run 'wikicat gen-config' to generate a documented wikicat.toml.")]
#[command(version)]
struct Cli {
    /// Wiki source directory
    #[arg(long, default_value = "wiki", global = true)]
    source: PathBuf,

    /// Config file (default: <source>/wikicat.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the wiki into one markdown file
    Build(BuildArgs),
    /// List pages in document order with their titles and anchors
    Scan {
        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report internal links that do not resolve to any page
    Check,
    /// Print a stock wikicat.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => {
            let config = config::load_config(&cli.source, cli.config.as_deref(), args.overrides())?;
            let fetcher = HttpFetcher::from_config(&config.images);
            let report = assemble::build(&cli.source, &args.out, &config, Box::new(fetcher))?;
            output::print_build_output(&report);
        }
        Command::Scan { json } => {
            let config = config::load_config(&cli.source, cli.config.as_deref(), None)?;
            let wiki = scan::scan(&cli.source, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&wiki.pages)?);
            } else {
                output::print_scan_output(&wiki, has_config_file(&cli.source, cli.config.is_some()));
            }
        }
        Command::Check => {
            let config = config::load_config(&cli.source, cli.config.as_deref(), None)?;
            let wiki = scan::scan(&cli.source, &config)?;
            let report = links::check_links(&wiki);
            output::print_check_output(&report, wiki.pages.len());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn has_config_file(source: &Path, explicit: bool) -> bool {
    explicit || source.join(config::CONFIG_FILENAME).exists()
}
