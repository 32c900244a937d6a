pub mod keyword;
pub mod ranking;
pub mod embedding;
pub mod retriever;

pub use embedding::{EmbeddingProvider, HashingEmbeddings, LocalEmbeddings, OpenAiEmbeddings, provider_from_config};
pub use ranking::{RankedTables, RankingOptions, TableScore};
pub use retriever::{
    GraphRagRetriever, LoadFailure, RetrievalMetadata, RetrievalMode, RetrievalRequest, RetrievedSchema, Weights,
};
