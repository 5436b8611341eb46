//! # Markdown RAG
//!
//! A retrieval-augmented knowledge base for markdown documents.
//!
//! Markdown RAG chunks markdown along heading boundaries, embeds each
//! chunk with a configurable provider (Ollama or OpenAI), and stores the
//! vectors in Qdrant, ChromaDB, or an in-memory backend. Retrieval is
//! exposed three ways: a CLI, a JSON HTTP API, and an MCP Streamable
//! HTTP endpoint for Cursor, Claude, and other AI tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────┐
//! │ Markdown │──▶│   Pipeline    │──▶│ Vector store   │
//! │  files   │   │ Chunk+Embed  │   │ Qdrant/Chroma │
//! └──────────┘   └──────────────┘   └──────┬────────┘
//!                                          │
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │ (mdrag)  │       │  (MCP)   │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mdrag add README.md --repo myproject    # ingest a document
//! mdrag search "how do I configure auth"  # semantic search
//! mdrag serve                             # start HTTP + MCP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Heading-aware markdown chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store abstraction and adapters |
//! | [`service`] | Chunk → embed → store orchestration |
//! | [`tools`] | Agent-callable tools |
//! | [`server`] | HTTP + MCP server |
//! | [`mcp`] | MCP JSON-RPC bridge |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod ingest;
pub mod mcp;
pub mod models;
pub mod search;
pub mod server;
pub mod service;
pub mod store;
pub mod tools;
