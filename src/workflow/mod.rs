pub mod chunk_ctx;
pub mod chunk_flow;

pub use chunk_ctx::ChunkCtx;
pub use chunk_flow::ChunkFlow;
