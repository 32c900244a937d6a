//! sqlrag CLI - question-aware schema retrieval for text-to-SQL agents

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sqlrag::agent::{prompt, AgentContextBuilder};
use sqlrag::catalog::{self, SchemaCatalog};
use sqlrag::config::{self, SqlragConfig};
use sqlrag::output::{emit_success, is_quiet, OutputMode};
use sqlrag::retrieval::embedding::DEFAULT_HASHING_DIMENSIONS;
use sqlrag::retrieval::{provider_from_config, GraphRagRetriever, HashingEmbeddings};
use sqlrag::ui::table::{render, DatabaseRow, ScoreRow, TableBuilder};
use sqlrag::ui::{self, Icons, Spinner};
use sqlrag::SchemaGraph;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_CATALOG: &str = "tables.json";

#[derive(Parser)]
#[command(name = "sqlrag")]
#[command(version)]
#[command(about = "Question-aware schema retrieval for text-to-SQL agents")]
#[command(long_about = r#"
sqlrag builds a graph over each database schema (tables, columns, foreign keys)
and picks the tables relevant to a natural-language question:
  • Keyword + embedding hybrid ranking
  • One-hop foreign-key propagation and subgraph expansion
  • Full-schema fallback for agent prompts

Example usage:
  sqlrag databases --catalog tables.json
  sqlrag retrieve --db concert_singer --question "How many singers are there?"
  sqlrag prompt --db concert_singer --question "Which stadium hosted the most concerts?"
"#)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Schema catalog (overrides the config file)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default sqlrag.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// List the databases in the schema catalog
    Databases,

    /// Print the full schema of a database
    Schema {
        /// Database id
        #[arg(short, long)]
        db: String,

        /// Append foreign-key hints
        #[arg(long)]
        hints: bool,
    },

    /// Show schema graph statistics
    Stats {
        /// Database id
        #[arg(short, long)]
        db: String,
    },

    /// Retrieve the schema relevant to a question
    Retrieve {
        /// Database id
        #[arg(short, long)]
        db: String,

        /// Natural-language question
        #[arg(short, long)]
        question: String,

        /// Return the full schema without ranking
        #[arg(long)]
        full: bool,

        /// Maximum number of seed tables
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        #[arg(long)]
        keyword_weight: Option<f64>,

        #[arg(long)]
        embedding_weight: Option<f64>,

        /// Drop tables scoring at or below this
        #[arg(long)]
        min_score: Option<f64>,

        /// Show the per-table score breakdown
        #[arg(long)]
        explain: bool,
    },

    /// Render the agent system prompt for a question
    Prompt {
        /// Database id
        #[arg(short, long)]
        db: String,

        /// Natural-language question
        #[arg(short, long)]
        question: String,

        /// Use the static full schema instead of retrieval
        #[arg(long)]
        no_graphrag: bool,

        /// SQL dialect named in the prompt
        #[arg(long)]
        dialect: Option<String>,
    },

    /// Build a catalog entry from a SQLite database file
    Introspect {
        /// SQLite database file
        #[arg(long)]
        sqlite: PathBuf,

        /// Database id for the catalog entry
        #[arg(long)]
        db_id: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

struct Settings {
    config: SqlragConfig,
    catalog_path: PathBuf,
    mode: OutputMode,
}

impl Settings {
    fn human(&self) -> bool {
        self.mode.is_human() && !is_quiet()
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(Some(&config_path))?.unwrap_or_default();
    let catalog_path = cli
        .catalog
        .clone()
        .or_else(|| config.catalog.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG));
    let settings = Settings {
        config,
        catalog_path,
        mode: OutputMode::from_json_flag(cli.json),
    };

    match cli.command {
        Commands::Init { force } => run_init(&settings, &config_path, force),
        Commands::Databases => run_databases(&settings),
        Commands::Schema { db, hints } => run_schema(&settings, &db, hints),
        Commands::Stats { db } => run_stats(&settings, &db),
        Commands::Retrieve {
            db,
            question,
            full,
            top_k,
            keyword_weight,
            embedding_weight,
            min_score,
            explain,
        } => {
            let mut request = settings.config.retrieval.to_request();
            request.use_full_schema |= full;
            if let Some(k) = top_k {
                request.top_k = k;
            }
            if let Some(w) = keyword_weight {
                request.keyword_weight = w;
            }
            if let Some(w) = embedding_weight {
                request.embedding_weight = w;
            }
            if min_score.is_some() {
                request.min_score = min_score;
            }
            run_retrieve(&settings, &db, &question, request, explain)
        }
        Commands::Prompt {
            db,
            question,
            no_graphrag,
            dialect,
        } => run_prompt(&settings, &db, &question, no_graphrag, dialect.as_deref()),
        Commands::Introspect { sqlite, db_id, out } => run_introspect(&settings, &sqlite, &db_id, out.as_deref()),
    }
}

fn load_catalog(settings: &Settings) -> anyhow::Result<SchemaCatalog> {
    SchemaCatalog::from_path(&settings.catalog_path)
        .with_context(|| format!("failed to load schema catalog {}", settings.catalog_path.display()))
}

/// Graph with offline hashing embeddings, for commands that never rank
fn offline_graph(catalog: &SchemaCatalog, db: &str) -> anyhow::Result<SchemaGraph> {
    let descriptor = catalog.descriptor(db)?;
    Ok(SchemaGraph::build(&descriptor, &HashingEmbeddings::new(DEFAULT_HASHING_DIMENSIONS))?)
}

/// Retriever over the one requested database, honouring the config allow-list
fn build_retriever(settings: &Settings, catalog: &SchemaCatalog, db: &str) -> anyhow::Result<GraphRagRetriever> {
    let allow: Vec<String> = match &settings.config.databases {
        Some(ids) if !ids.iter().any(|id| id == db) => {
            tracing::warn!("Database {} is not in the configured allow-list", db);
            Vec::new()
        }
        _ => vec![db.to_string()],
    };

    let embedding = settings.config.embedding.clone().with_env_api_key();
    let provider = provider_from_config(&embedding)?;

    let spinner = if settings.human() {
        Spinner::new(&format!("Building schema graph for {} ({})", db, provider.name()))
    } else {
        Spinner::hidden()
    };
    let retriever = GraphRagRetriever::new(catalog, Some(&allow), provider);
    match &retriever {
        Ok(_) => spinner.finish_with_message("Schema graph ready"),
        Err(_) => spinner.clear(),
    }
    Ok(retriever?)
}

fn run_init(settings: &Settings, path: &Path, force: bool) -> anyhow::Result<()> {
    let config = SqlragConfig {
        catalog: Some(DEFAULT_CATALOG.to_string()),
        ..SqlragConfig::default()
    };
    config::write_config(path, &config, force)?;

    if settings.human() {
        ui::success(&format!("Wrote {}", path.display()));
    }
    emit_success(settings.mode, "init", serde_json::json!({ "path": path.display().to_string() }))
}

fn run_databases(settings: &Settings) -> anyhow::Result<()> {
    let catalog = load_catalog(settings)?;
    let mut rows = Vec::new();
    let mut entries = Vec::new();

    for (db_id, descriptor) in catalog.descriptors(settings.config.databases.as_deref()) {
        match descriptor {
            Ok(d) => {
                entries.push(serde_json::json!({
                    "db_id": db_id,
                    "tables": d.table_count(),
                    "columns": d.column_count(),
                    "foreign_keys": d.foreign_keys.len(),
                }));
                rows.push(DatabaseRow {
                    db_id,
                    tables: d.table_count().to_string(),
                    columns: d.column_count().to_string(),
                    foreign_keys: d.foreign_keys.len().to_string(),
                });
            }
            Err(e) => {
                entries.push(serde_json::json!({ "db_id": db_id, "error": e.to_string() }));
                rows.push(DatabaseRow {
                    db_id,
                    tables: "-".to_string(),
                    columns: "-".to_string(),
                    foreign_keys: ui::muted("invalid"),
                });
            }
        }
    }

    if settings.human() {
        ui::header(&format!("Schema catalog {}", settings.catalog_path.display()));
        if rows.is_empty() {
            ui::warn("No databases found");
        } else {
            println!("{}", render(&rows));
        }
    }
    emit_success(settings.mode, "databases", entries)
}

fn run_schema(settings: &Settings, db: &str, hints: bool) -> anyhow::Result<()> {
    let catalog = load_catalog(settings)?;
    let graph = offline_graph(&catalog, db)?;
    let schema_text = graph.full_schema();
    let foreign_key_hints = if hints { graph.foreign_key_hints() } else { String::new() };

    if settings.human() {
        ui::schema_block(&schema_text);
        if !foreign_key_hints.is_empty() {
            println!();
            ui::foreign_key_block(&foreign_key_hints);
        }
    }
    emit_success(
        settings.mode,
        "schema",
        serde_json::json!({
            "db_id": db,
            "schema_text": schema_text,
            "foreign_key_hints": foreign_key_hints,
        }),
    )
}

fn run_stats(settings: &Settings, db: &str) -> anyhow::Result<()> {
    let catalog = load_catalog(settings)?;
    let stats = offline_graph(&catalog, db)?.stats();

    if settings.human() {
        ui::status(Icons::STATS, "Schema graph", db);
        let mut table = TableBuilder::new();
        table.add_row("Tables", &stats.tables.to_string());
        table.add_row("Columns", &stats.columns.to_string());
        table.add_row("has_column edges", &stats.has_column_edges.to_string());
        table.add_row("foreign_key edges", &stats.foreign_key_edges.to_string());
        println!("{}", table.build());
    }
    emit_success(settings.mode, "stats", &stats)
}

fn run_retrieve(
    settings: &Settings,
    db: &str,
    question: &str,
    request: sqlrag::RetrievalRequest,
    explain: bool,
) -> anyhow::Result<()> {
    let catalog = load_catalog(settings)?;
    let retriever = build_retriever(settings, &catalog, db)?;
    let result = retriever.retrieve_relevant_schema(db, question, &request)?;

    let breakdown = if explain { result.ranking.as_ref() } else { None };

    if settings.human() {
        ui::retrieval_summary(db, &result.metadata);
        if let Some(ranked) = breakdown {
            let rows: Vec<ScoreRow> = ranked
                .scores
                .iter()
                .map(|s| ScoreRow::new(s, ranked.tables.contains(&s.table)))
                .collect();
            ui::section("Scores");
            println!("{}", render(&rows));
        }
        if !result.schema_text.is_empty() {
            ui::section("Schema");
            ui::schema_block(&result.schema_text);
        }
    }

    emit_success(
        settings.mode,
        "retrieve",
        serde_json::json!({
            "db_id": db,
            "question": question,
            "schema_text": result.schema_text,
            "metadata": result.metadata,
            "scores": breakdown.map(|r| &r.scores),
        }),
    )
}

fn run_prompt(
    settings: &Settings,
    db: &str,
    question: &str,
    no_graphrag: bool,
    dialect: Option<&str>,
) -> anyhow::Result<()> {
    let catalog = load_catalog(settings)?;
    let use_graphrag = settings.config.retrieval.enabled && !no_graphrag;

    let retriever = if use_graphrag {
        match build_retriever(settings, &catalog, db) {
            Ok(retriever) => Some(retriever),
            Err(e) => {
                tracing::warn!("Schema retrieval unavailable, using the full schema: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let mut builder = AgentContextBuilder::new()
        .schema_source(&catalog)
        .use_graphrag(use_graphrag)
        .request(settings.config.retrieval.to_request())
        .foreign_key_hints(settings.config.retrieval.foreign_key_hints);
    if let Some(retriever) = &retriever {
        builder = builder.retriever(retriever);
    }
    if let Some(dialect) = dialect {
        builder = builder.dialect(dialect);
    }
    let context = builder.build(db, question);

    if settings.human() {
        match &context.metadata {
            Some(metadata) => ui::retrieval_summary(db, metadata),
            None => ui::info("Mode", "static schema"),
        }
        ui::section("System");
        print!("{}", context.system_prompt);
        ui::section("User");
        println!("{}", prompt::question_block(&context.schema_text, question));
    }
    emit_success(settings.mode, "prompt", &context)
}

fn run_introspect(settings: &Settings, sqlite: &Path, db_id: &str, out: Option<&Path>) -> anyhow::Result<()> {
    let descriptor = catalog::sqlite::introspect_path(sqlite, db_id)
        .with_context(|| format!("failed to introspect {}", sqlite.display()))?;
    let tables = descriptor.table_count();
    let json = SchemaCatalog::from_descriptors(vec![descriptor])?.to_json_string()?;

    match out {
        Some(path) => {
            std::fs::write(path, &json)?;
            if settings.human() {
                ui::success(&format!("Wrote {} ({} tables) to {}", db_id, tables, path.display()));
            }
            emit_success(
                settings.mode,
                "introspect",
                serde_json::json!({ "db_id": db_id, "tables": tables, "path": path.display().to_string() }),
            )
        }
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}
