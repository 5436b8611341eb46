//! Tool abstraction and built-in knowledge tools.
//!
//! Tools are the callable surface exposed to AI agents, both over the
//! plain HTTP API (`GET /tools/list`, `POST /tools/{name}`) and through
//! the MCP bridge. Each tool declares an OpenAI function-calling JSON
//! Schema for its parameters and executes against a [`ToolContext`]
//! holding the shared [`KnowledgeService`].
//!
//! Built-ins:
//! - `search_knowledge` — semantic search over ingested documents.
//! - `find_similar_content` — pre-insert duplicate detection.
//! - `update_knowledge` — ingest or replace a document.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::service::KnowledgeService;

/// Context bridge for tool execution.
///
/// Created once at server startup and shared across invocations; every
/// tool call goes through the same [`KnowledgeService`].
#[derive(Clone)]
pub struct ToolContext {
    pub service: Arc<KnowledgeService>,
    /// Result limit applied when the caller omits one.
    pub default_limit: usize,
}

impl ToolContext {
    pub fn new(service: Arc<KnowledgeService>, default_limit: usize) -> Self {
        Self {
            service,
            default_limit,
        }
    }
}

/// A callable tool that agents can discover and invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name: a lowercase identifier with underscores, used as the
    /// route path and the MCP tool name.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// OpenAI function-calling JSON Schema for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool. Errors become tool-level error payloads in the
    /// transport layer, never transport faults.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

fn limit_from(params: &Value, ctx: &ToolContext) -> usize {
    params
        .get("limit")
        .and_then(|l| l.as_u64())
        .map(|l| l as usize)
        .unwrap_or(ctx.default_limit)
        .max(1)
}

fn round_score(score: f32) -> f64 {
    (score as f64 * 10_000.0).round() / 10_000.0
}

// ============ search_knowledge ============

/// Semantic search over the knowledge base.
pub struct SearchKnowledgeTool;

#[async_trait]
impl Tool for SearchKnowledgeTool {
    fn name(&self) -> &str {
        "search_knowledge"
    }

    fn description(&self) -> &str {
        "Search the markdown knowledge base for relevant information"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The question or search query" },
                "limit": { "type": "integer", "description": "Number of results", "default": 5 },
                "repository": { "type": "string", "description": "Restrict results to one repository" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or("");
        if query.trim().is_empty() {
            anyhow::bail!("query must not be empty");
        }
        let limit = limit_from(&params, ctx);
        let repository = params.get("repository").and_then(|r| r.as_str());

        let results = ctx.service.search(query, limit, repository).await?;

        let formatted: Vec<Value> = results
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                let mut item = json!({
                    "rank": idx + 1,
                    "score": round_score(r.score),
                    "source": r.source(),
                    "content": r.content,
                });
                if let Some(ref repo) = r.repo_name {
                    item["repository"] = json!(repo);
                }
                item
            })
            .collect();

        Ok(json!({ "query": query, "results": formatted }))
    }
}

// ============ find_similar_content ============

/// Pre-insert duplicate detection with truncated content previews.
pub struct FindSimilarContentTool;

#[async_trait]
impl Tool for FindSimilarContentTool {
    fn name(&self) -> &str {
        "find_similar_content"
    }

    fn description(&self) -> &str {
        "Check for similar content already in the knowledge base before adding new content"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "Content to check for near-duplicates" },
                "repoName": { "type": "string", "description": "Restrict the check to one repository" },
                "limit": { "type": "integer", "description": "Number of candidates", "default": 5 }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let content = params["content"].as_str().unwrap_or("");
        if content.trim().is_empty() {
            anyhow::bail!("content must not be empty");
        }
        let limit = limit_from(&params, ctx);
        let repo = params.get("repoName").and_then(|r| r.as_str());

        let matches = ctx.service.find_similar(content, repo, limit).await?;

        Ok(json!({
            "similarContentFound": matches.len(),
            "results": matches,
        }))
    }
}

// ============ update_knowledge ============

/// Ingest a document, optionally replacing all existing chunks for the
/// same filename first.
pub struct UpdateKnowledgeTool;

#[async_trait]
impl Tool for UpdateKnowledgeTool {
    fn name(&self) -> &str {
        "update_knowledge"
    }

    fn description(&self) -> &str {
        "Add or replace a markdown document in the knowledge base"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "Markdown content to ingest" },
                "filename": { "type": "string", "description": "Source filename, used as the replace key" },
                "repoName": { "type": "string", "description": "Repository the document belongs to" },
                "replaceFile": { "type": "boolean", "description": "Delete existing chunks for the filename first", "default": false }
            },
            "required": ["content", "filename", "repoName"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let content = params["content"].as_str().unwrap_or("");
        if content.trim().is_empty() {
            anyhow::bail!("content must not be empty");
        }
        let filename = params["filename"].as_str().unwrap_or("");
        if filename.trim().is_empty() {
            anyhow::bail!("filename must not be empty");
        }
        let repo = params["repoName"].as_str().unwrap_or("");
        if repo.trim().is_empty() {
            anyhow::bail!("repoName must not be empty");
        }
        let replace = params
            .get("replaceFile")
            .and_then(|r| r.as_bool())
            .unwrap_or(false);

        let outcome = ctx.service.ingest(content, filename, Some(repo), replace).await?;

        Ok(json!({
            "status": "success",
            "action": if outcome.replaced { "replaced" } else { "added" },
            "chunks": outcome.chunks,
            "file": format!("{}/{}", repo, filename),
        }))
    }
}

// ============ Registry ============

/// Registry of callable tools.
///
/// Use [`ToolRegistry::with_builtins`] for the standard knowledge tools,
/// then [`register`](ToolRegistry::register) to add custom ones.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with the built-in knowledge tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchKnowledgeTool));
        registry.register(Box::new(FindSimilarContentTool));
        registry.register(Box::new(UpdateKnowledgeTool));
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// All registered tools.
    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
