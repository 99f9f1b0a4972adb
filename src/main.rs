//! ontology-search CLI: ingest ontologies and search their terms.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ontology_search::config::OntologySearchConfig;
use ontology_search::fetch::HttpFetcher;
use ontology_search::graph::DocumentFormat;
use ontology_search::hierarchy::ancestors;
use ontology_search::ingest::{IngestReport, cancel_flag, ingest_file, ingest_url};
use ontology_search::model::RankingPatch;
use ontology_search::paths::AppPaths;
use ontology_search::remote::{IngestRequest, ServerClient};
use ontology_search::search::{SearchQuery, render, search};
use ontology_search::store::{Repository, UpsertPolicy, open_repository};

#[derive(Parser)]
#[command(name = "ontology-search", version, about = "Ontology ingestion and term search")]
struct Cli {
    /// Data directory for the durable store.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: $XDG_CONFIG_HOME/ontology-search/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a throwaway in-memory store instead of the data directory.
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an ontology document and ingest its ontologies and terms.
    Ingest {
        /// URL of the ontology document.
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        url: Option<String>,

        /// Ingest a local file instead of a URL.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Document format: media type or short name (xml, turtle, nt, n3, nquads, trig).
        #[arg(long)]
        format: Option<String>,

        /// Conflict policy for existing entities (insert-only, replace-on-conflict, merge-fields).
        #[arg(long)]
        policy: Option<UpsertPolicy>,

        /// Hand the run to a running ontology-search-server
        /// (e.g. http://127.0.0.1:8300), which holds the store open.
        #[arg(long, conflicts_with = "file")]
        server: Option<String>,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search terms by uri, label and definition.
    Search {
        query: String,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show entity counts and storage location.
    Info,

    /// Walk the subClassOf ancestors of a term.
    Lineage {
        uri: String,

        /// Maximum number of levels to walk.
        #[arg(long, default_value = "32")]
        depth: usize,
    },

    /// Set the ranking inputs of a term.
    Rank {
        uri: String,

        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        favorite: Option<bool>,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let paths = AppPaths::resolve()?;
    let config = OntologySearchConfig::discover(cli.config.as_deref(), &paths)?;
    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(|| paths.data_dir.clone());

    let store_dir = (!cli.in_memory).then_some(data_dir.as_path());

    match cli.command {
        Commands::Ingest {
            url,
            file,
            format,
            policy,
            server,
            json,
        } => {
            let mut ingest_config = config.ingest_config()?;
            if let Some(name) = &format {
                ingest_config.format = Some(DocumentFormat::resolve(name)?);
            }
            if let Some(policy) = policy {
                ingest_config.policy = policy;
            }

            let report = match (url, file, server) {
                (Some(url), None, Some(server)) => {
                    let client = ServerClient::new(&server, &config.fetch_options())?;
                    client.ingest(&IngestRequest {
                        url,
                        format,
                        policy,
                    })?
                }
                (_, Some(path), _) => {
                    let cancel = cancel_flag();
                    register_signals(&cancel)?;
                    let repo = open_repository(store_dir)?;
                    ingest_file(&path, repo.as_ref(), &ingest_config, &cancel)?
                }
                (Some(url), None, None) => {
                    let cancel = cancel_flag();
                    register_signals(&cancel)?;
                    let repo = open_repository(store_dir)?;
                    let fetcher = HttpFetcher::new(config.fetch_options());
                    ingest_url(&fetcher, &url, repo.as_ref(), &ingest_config, &cancel)?
                }
                (None, None, _) => miette::bail!("either a URL or --file is required"),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                print_report(&report);
            }
        }

        Commands::Search { query, limit, json } => {
            let repo = open_repository(store_dir)?;
            let query = SearchQuery::parse(Some(&query))?.with_limit(limit);
            let hits = search(repo.as_ref(), &query)?;
            if json {
                let views = render(repo.as_ref(), hits)?;
                println!("{}", serde_json::to_string_pretty(&views).into_diagnostic()?);
            } else if hits.is_empty() {
                println!("No terms match \"{}\".", query.as_str());
            } else {
                for hit in &hits {
                    let term = &hit.term;
                    let star = if term.is_favorite { "*" } else { " " };
                    println!(
                        "{star} {:<40} {} (weight {}, score {})",
                        term.display_name(),
                        term.uri,
                        term.weight,
                        hit.score
                    );
                }
                println!("{} result(s)", hits.len());
            }
        }

        Commands::Info => {
            let repo = open_repository(store_dir)?;
            let counts = repo.counts()?;
            if cli.in_memory {
                println!("Store:      in-memory");
            } else {
                println!("Store:      {}", data_dir.display());
            }
            println!("Ontologies: {}", counts.ontologies);
            println!("Terms:      {}", counts.terms);
            for ontology in repo.ontologies()? {
                println!("  {} ({})", ontology.display_name(), ontology.uri);
            }
        }

        Commands::Lineage { uri, depth } => {
            let repo = open_repository(store_dir)?;
            let Some(term) = repo.term(&uri)? else {
                miette::bail!("no term with uri \"{}\"", uri);
            };
            println!("{} ({})", term.display_name(), term.uri);
            for ancestor in ancestors(repo.as_ref(), &uri, depth)? {
                let indent = "  ".repeat(ancestor.depth);
                if ancestor.known {
                    println!("{indent}{}", ancestor.uri);
                } else {
                    println!("{indent}{} (not ingested)", ancestor.uri);
                }
            }
        }

        Commands::Rank {
            uri,
            weight,
            favorite,
        } => {
            let repo = open_repository(store_dir)?;
            let patch = RankingPatch {
                weight,
                is_favorite: favorite,
            };
            let term = if patch.is_empty() {
                repo.term(&uri)?
            } else {
                repo.update_ranking(&uri, patch)?
            };
            let Some(term) = term else {
                miette::bail!("no term with uri \"{}\"", uri);
            };
            println!(
                "{}: weight {}, favorite {}",
                term.uri, term.weight, term.is_favorite
            );
        }

        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

/// Turn SIGINT/SIGTERM into a cancellation request.
fn register_signals(flag: &Arc<AtomicBool>) -> Result<()> {
    for signal in signal_hook::consts::TERM_SIGNALS {
        signal_hook::flag::register(*signal, Arc::clone(flag)).into_diagnostic()?;
    }
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!("Ingested {}", report.source);
    println!("  statements:         {}", report.statements);
    println!(
        "  ontologies:         {} created, {} existing",
        report.ontologies_created, report.ontologies_existing
    );
    println!(
        "  terms:              {} created, {} existing",
        report.terms_created, report.terms_existing
    );
    if report.skipped > 0 {
        println!("  skipped:            {}", report.skipped);
    }
    println!(
        "  subclasses:         {} edges on {} terms",
        report.hierarchy.edges, report.hierarchy.updated
    );
}
