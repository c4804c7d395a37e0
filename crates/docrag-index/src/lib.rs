//! TF-IDF index over the chunk corpus: vocabulary and IDF, sparse vectors,
//! the persisted artifact, cosine search and the build pipeline.

pub mod pipeline;
pub mod search;
pub mod store;
pub mod vectorizer;
pub mod vocabulary;

pub use pipeline::{run_pipeline, PipelineOptions, PipelineResult, Stage};
pub use search::SemanticIndex;
pub use store::{build_index, IndexArtifact, IndexOptions, IndexSummary, IndexedChunk};
