//! # Markdown RAG CLI (`mdrag`)
//!
//! The `mdrag` binary is the primary interface for the markdown
//! knowledge base. It provides commands for ingesting documents,
//! deleting them, running semantic searches, and starting the HTTP +
//! MCP server.
//!
//! ## Usage
//!
//! ```bash
//! mdrag --config ./config/mdrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mdrag add <file>` | Chunk, embed, and store a markdown file |
//! | `mdrag delete <filename>` | Remove all records for a filename |
//! | `mdrag search "<query>"` | Semantic search over the knowledge base |
//! | `mdrag serve` | Start the HTTP + MCP server |
//!
//! ## Examples
//!
//! ```bash
//! # Ingest a document into a repository namespace
//! mdrag add docs/setup.md --repo platform
//!
//! # Re-ingest, replacing earlier records for the same file
//! mdrag add docs/setup.md --repo platform --replace
//!
//! # Search, scoped to one repository
//! mdrag search "database migrations" --repo platform --limit 3
//!
//! # Start the server for Cursor integration
//! mdrag serve --config ./config/mdrag.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use markdown_rag::{config, ingest, search, server};

/// Markdown RAG CLI — a retrieval-augmented knowledge base for markdown
/// documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/mdrag.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "mdrag",
    about = "Markdown RAG — a retrieval-augmented knowledge base for markdown documents",
    version,
    long_about = "Markdown RAG chunks markdown along heading boundaries, embeds each chunk \
    with a configurable provider (Ollama or OpenAI), stores the vectors in Qdrant or ChromaDB, \
    and exposes semantic search via a CLI, a JSON HTTP API, and an MCP endpoint."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/mdrag.toml`. All store, embedding, chunking,
    /// and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/mdrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest a markdown file into the knowledge base.
    ///
    /// Reads the file, splits it into heading-aware chunks, embeds each
    /// chunk, and stores the vectors in the configured backend.
    Add {
        /// Path to the markdown file.
        file: PathBuf,

        /// Repository namespace to tag the records with.
        #[arg(long)]
        repo: Option<String>,

        /// Delete existing records for the same filename first.
        #[arg(long)]
        replace: bool,
    },

    /// Delete all records for a filename.
    ///
    /// Zero matches is not an error; the command reports the count.
    Delete {
        /// Filename the records were ingested under.
        filename: String,

        /// Restrict the delete to one repository namespace.
        #[arg(long)]
        repo: Option<String>,
    },

    /// Search the knowledge base.
    ///
    /// Embeds the query and returns the closest chunks, best first,
    /// with scores and source labels.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Restrict results to one repository namespace.
        #[arg(long)]
        repo: Option<String>,
    },

    /// Start the HTTP + MCP server.
    ///
    /// Binds to the address configured in `[server].bind` and exposes
    /// the knowledge tools via a JSON API and an MCP Streamable HTTP
    /// endpoint at `/mcp`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Add {
            file,
            repo,
            replace,
        } => {
            ingest::run_add(&cfg, &file, repo, replace).await?;
        }
        Commands::Delete { filename, repo } => {
            ingest::run_delete(&cfg, &filename, repo).await?;
        }
        Commands::Search { query, limit, repo } => {
            search::run_search(&cfg, &query, limit, repo).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
