// src/llm/mod.rs
// Completion provider layer: uniform generate-text contract plus per-model
// routing between the primary endpoint and the OpenRouter-style alternate.

pub mod client;
pub mod provider;

pub use client::HttpCompletionProvider;
pub use provider::{
    ChatMessage, CompletionProvider, Generated, GenerateOptions, GenerateRequest, ProviderError,
    ProviderKind, ProviderResolver, ResolvedProvider,
};
