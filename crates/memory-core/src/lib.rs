//! ============================================================================
//! MEMORY-CORE: Per-user semantic memory
//! ============================================================================
//! Backend logic behind the mem0 server:
//! - Text embeddings via an OpenAI-compatible API
//! - Vector storage and filtered similarity search via Qdrant
//! - A manager composing the two into add/search/list/delete operations
//! ============================================================================

pub mod error;
pub mod memory;
pub mod testing;

// Re-export main types for convenience
pub use error::{MemoryError, Result};
pub use memory::{
    Embedder, EmbeddingService, MemoryManager, MemoryRecord, Metadata, QdrantConfig, QdrantStore,
    ScoredMemory, VectorStore, DEFAULT_EMBEDDING_MODEL, EMBEDDING_DIM,
};
