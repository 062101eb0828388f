/// MCP server implementation for the prompt finder.
///
/// Exposes four tools:
/// - `generate_prompt`: Recommend a prompt for a free-text request
/// - `search_prompts`: Raw similarity search over stored prompts
/// - `prompt_stats`: Summary of the stored collection
/// - `ingest_prompts`: Load prompts from a CSV file into the store
use std::path::Path;
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::ingest;
use crate::model::AudienceFilter;
use crate::pipeline::PromptPipeline;
use crate::store::{PromptSearch, PromptStore};
use prompt_common::mcp_api::{
    GeneratePromptParams, IngestPromptsParams, IngestPromptsResponse, PromptResult,
    PromptStatsResponse, SearchPromptsParams, SearchPromptsResponse,
};

const DEFAULT_SEARCH_LIMIT: u32 = 3;
const MAX_SEARCH_LIMIT: u32 = 20;

#[derive(Clone)]
pub struct PromptFinderServer {
    pipeline: Arc<PromptPipeline>,
    store: Arc<PromptStore>,
    tool_router: ToolRouter<PromptFinderServer>,
}

impl PromptFinderServer {
    pub fn new(pipeline: Arc<PromptPipeline>, store: Arc<PromptStore>) -> Self {
        Self {
            pipeline,
            store,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl PromptFinderServer {
    #[tool(description = "Recommend a ready-made instruction prompt for a request. Returns the closest stored prompt, or a generated one when nothing matches.")]
    async fn generate_prompt(
        &self,
        Parameters(params): Parameters<GeneratePromptParams>,
    ) -> Result<Json<PromptResult>, String> {
        let result = self
            .pipeline
            .generate_prompt_for_query(&params.query)
            .await;
        Ok(Json(result.into()))
    }

    #[tool(description = "Search stored prompts by semantic similarity, optionally restricted to prompts for developers (for_devs=true) or not (for_devs=false).")]
    async fn search_prompts(
        &self,
        Parameters(params): Parameters<SearchPromptsParams>,
    ) -> Result<Json<SearchPromptsResponse>, String> {
        let query = params.query.trim().to_string();
        if query.is_empty() {
            return Err("query must not be empty".to_string());
        }

        let limit = params
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT) as usize;
        let filter = params.for_devs.map(|for_devs| AudienceFilter { for_devs });

        let results = self.store.search(&query, filter, limit).await;

        Ok(Json(SearchPromptsResponse {
            results: results.into_iter().map(PromptResult::from).collect(),
        }))
    }

    #[tool(description = "Show how many prompts are stored, how many target developers, and which categories exist.")]
    async fn prompt_stats(&self) -> Result<Json<PromptStatsResponse>, String> {
        Ok(Json(self.store.stats().await.into()))
    }

    #[tool(description = "Load prompts from a CSV file with 'act' and 'prompt' columns (and optionally 'for_devs') into the store. A malformed file adds nothing.")]
    async fn ingest_prompts(
        &self,
        Parameters(params): Parameters<IngestPromptsParams>,
    ) -> Result<Json<IngestPromptsResponse>, String> {
        info!(csv_path = %params.csv_path, "ingest_prompts tool invoked");

        let records = ingest::load_prompts_csv(Path::new(&params.csv_path))
            .map_err(|e| format!("ingest failed: {e}"))?;
        let added = self
            .store
            .add(&records)
            .await
            .map_err(|e| format!("ingest failed: {e}"))?;
        let stats = self.store.stats().await;

        Ok(Json(IngestPromptsResponse {
            added,
            total_count: stats.total_count,
        }))
    }
}

#[tool_handler]
impl ServerHandler for PromptFinderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "prompt-finder".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Prompt finder MCP server. Use generate_prompt to get a ready-made \
                 instruction prompt for a request, search_prompts to browse similar \
                 stored prompts, prompt_stats to inspect the collection and \
                 ingest_prompts to load more prompts from CSV."
                    .to_string(),
            ),
        }
    }
}
