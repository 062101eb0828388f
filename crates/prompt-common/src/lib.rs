pub mod embedding;
pub mod error;
pub mod mcp_api;
pub mod redis;
pub mod tokenizer;
pub mod vectordb;
