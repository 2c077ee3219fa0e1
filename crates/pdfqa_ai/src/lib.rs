pub mod answer;
pub mod embeddings;
pub mod http;
pub mod llm;
pub mod pipeline;
pub mod retrieve;
pub mod sheets;

pub use pipeline::{Event, Notice, NoticeLevel, Pipeline, PipelineSettings, View};
