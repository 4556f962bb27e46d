use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{builder::ArgAction, Parser, Subcommand};
use console::{style, Emoji};
use errors::PapermashCliError;
use papermash::{ArxivClient, Paper, RetryPolicy, SemanticScholarClient, SnapshotStore};
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

pub mod errors;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");
static ERROR: Emoji<'_, '_> = Emoji("✖ ", "");

/// Environment variable holding an optional Semantic Scholar API key.
const S2_API_KEY_VAR: &str = "SEMANTIC_SCHOLAR_API_KEY";

#[derive(Parser)]
#[command(author, version, about = "Resolve papers across arXiv, Semantic Scholar and conference snapshots")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Directory holding the conference snapshot files
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Attempts per network call, including the first
  #[arg(long, global = true)]
  max_attempts: Option<u32>,

  /// Timeout for a single network attempt, in seconds
  #[arg(long, global = true)]
  timeout_secs: Option<u64>,

  /// Print records as JSON instead of formatted text
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Find the earliest arXiv submission matching a title and authors
  Arxiv {
    /// Exact paper title
    title:   String,
    /// Author name; repeat for several authors
    #[arg(long = "author", short)]
    authors: Vec<String>,
  },
  /// Find the best Semantic Scholar match for a title
  Search {
    /// Paper title
    title: String,
  },
  /// List the papers a Semantic Scholar paper cites
  References {
    /// Semantic Scholar paper id
    paper_id: String,
  },
  /// List accepted papers from a conference snapshot
  Accepted {
    /// Conference name (icml or iclr)
    conference: String,
    /// Maximum number of papers
    #[arg(long, short, default_value_t = 100)]
    limit:      usize,
  },
  /// Count papers per status in a conference snapshot
  Stats {
    /// Conference name (icml or iclr)
    conference: String,
  },
  /// List accepted papers from every conference snapshot
  All {
    /// Maximum number of papers per conference
    #[arg(long, short, default_value_t = 50)]
    limit: usize,
  },
}

/// Setup logging with the specified verbosity level
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_target(true)
    .init();
}

/// Applies the command line overrides to a source's default policy.
fn policy(cli: &Cli, base: RetryPolicy) -> RetryPolicy {
  let mut policy = base;
  if let Some(max_attempts) = cli.max_attempts {
    policy = policy.with_max_attempts(max_attempts);
  }
  if let Some(timeout) = cli.timeout_secs {
    policy = policy.with_timeout(Duration::from_secs(timeout));
  }
  policy
}

/// The snapshot store for `--data-dir`, or the default location.
fn snapshot_store(cli: &Cli) -> SnapshotStore {
  let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
    let default_path = SnapshotStore::default_path();
    if !cli.json {
      println!(
        "{} Using default data directory: {}",
        style(BOOKS).cyan(),
        style(default_path.display()).yellow()
      );
    }
    default_path
  });
  let store = SnapshotStore::new(data_dir);
  trace!("Using snapshot directory: {}", store.data_dir().display());
  store
}

/// Prints one record in the styled text format.
fn print_paper(index: Option<usize>, paper: &Paper) {
  match index {
    Some(i) => println!("\n{}. {}", style(i + 1).yellow(), style(&paper.title).white().bold()),
    None => println!("\n{} {}", style(PAPER).green(), style(&paper.title).white().bold()),
  }

  println!(
    "   {} {} {}",
    style("Source:").green(),
    style(&paper.source).cyan(),
    style(&paper.id).yellow()
  );

  let author_display = if paper.authors.is_empty() {
    style("No authors listed").red().italic().to_string()
  } else {
    style(paper.author_list()).white().to_string()
  };
  println!("   {} {}", style("Authors:").green(), author_display);

  if let Some(date) = &paper.published_date {
    println!("   {} {}", style("Published:").green(), style(date.format("%Y-%m-%d")).white());
  }
  if let Some(year) = paper.year {
    println!("   {} {}", style("Year:").green(), style(year).white());
  }
  if let Some(venue) = &paper.venue {
    println!("   {} {}", style("Venue:").green(), style(venue).white());
  }
  if let Some(accept_type) = &paper.accept_type {
    println!("   {} {}", style("Accepted as:").green(), style(accept_type).white());
  }
  if let Some(doi) = &paper.doi {
    println!("   {} {}", style("DOI:").green(), style(doi).blue().underlined());
  }
  if let Some(url) = &paper.pdf_url {
    println!("   {} {}", style("PDF URL:").green(), style(url).blue().underlined());
  }
  if let Some(summary) = &paper.summary {
    let preview = summary.chars().take(100).collect::<String>();
    let preview = if summary.chars().count() > 100 { format!("{}...", preview) } else { preview };
    println!("   {} {}", style("Abstract:").green(), style(preview).white().italic());
  }
}

/// Prints a possibly absent single record.
fn print_single(cli: &Cli, paper: Option<Paper>, what: &str) -> Result<(), PapermashCliError> {
  if cli.json {
    println!("{}", serde_json::to_string_pretty(&paper)?);
    return Ok(());
  }
  match paper {
    Some(paper) => {
      debug!("Paper details: {:?}", paper);
      println!("\n{} Found paper:", style(SUCCESS).green());
      print_paper(None, &paper);
    },
    None => println!("{} No paper found for: {}", style(WARNING).yellow(), style(what).yellow()),
  }
  Ok(())
}

/// Prints a list of records.
fn print_list(cli: &Cli, papers: &[Paper], what: &str) -> Result<(), PapermashCliError> {
  if cli.json {
    println!("{}", serde_json::to_string_pretty(papers)?);
    return Ok(());
  }
  if papers.is_empty() {
    println!("{} No papers found for: {}", style(WARNING).yellow(), style(what).yellow());
    return Ok(());
  }
  println!("\n{} Found {} papers:", style(SUCCESS).green(), style(papers.len()).yellow());
  for (i, paper) in papers.iter().enumerate() {
    print_paper(Some(i), paper);
  }
  Ok(())
}

async fn run(cli: &Cli) -> Result<(), PapermashCliError> {
  match &cli.command {
    Commands::Arxiv { title, authors } => {
      if !cli.json {
        println!("{} Searching arXiv for: {}", style(LOOKING_GLASS).cyan(), style(title).yellow());
      }
      let client = ArxivClient::new()?.with_policy(policy(cli, RetryPolicy::arxiv()));
      let paper = client.resolve(title, authors.as_slice()).await;
      print_single(cli, paper, title)
    },

    Commands::Search { title } => {
      if !cli.json {
        println!(
          "{} Searching Semantic Scholar for: {}",
          style(LOOKING_GLASS).cyan(),
          style(title).yellow()
        );
      }
      let mut client =
        SemanticScholarClient::new()?.with_policy(policy(cli, RetryPolicy::semantic_scholar()));
      if let Ok(api_key) = std::env::var(S2_API_KEY_VAR) {
        client = client.with_api_key(&api_key)?;
      }
      let paper = client.search_by_title(title).await;
      print_single(cli, paper, title)
    },

    Commands::References { paper_id } => {
      if !cli.json {
        println!(
          "{} Fetching references of: {}",
          style(LOOKING_GLASS).cyan(),
          style(paper_id).yellow()
        );
      }
      let mut client =
        SemanticScholarClient::new()?.with_policy(policy(cli, RetryPolicy::semantic_scholar()));
      if let Ok(api_key) = std::env::var(S2_API_KEY_VAR) {
        client = client.with_api_key(&api_key)?;
      }
      let references = client.get_references(paper_id).await;
      print_list(cli, &references, paper_id)
    },

    Commands::Accepted { conference, limit } => {
      let store = snapshot_store(cli);
      let papers = store.get_accepted_papers(conference, *limit).await?;
      print_list(cli, &papers, conference)
    },

    Commands::Stats { conference } => {
      let store = snapshot_store(cli);
      let stats = store.get_paper_stats(conference).await?;
      if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
      }
      println!(
        "\n{} {} paper statistics:",
        style(BOOKS).cyan(),
        style(conference.to_uppercase()).white().bold()
      );
      for (status, count) in &stats {
        println!("   {} {}", style(format!("{status}:")).green(), style(count).yellow());
      }
      Ok(())
    },

    Commands::All { limit } => {
      let store = snapshot_store(cli);
      let papers = store.get_all_accepted_papers(*limit).await;
      print_list(cli, &papers, "all conferences")
    },
  }
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  match run(&cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("{} {}", style(ERROR).red(), style(e).red());
      ExitCode::FAILURE
    },
  }
}
