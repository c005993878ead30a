//! Question answering core
//!
//! The pipeline behind every answer:
//! - Retrieval of ranked book passages
//! - Context budgeting
//! - Grounded generation with provider failover
//! - Translation into the reader's language

mod budgeter;
mod generator;
mod pipeline;
mod retriever;
mod translator;

pub use budgeter::{
    assemble, ContextBudgeter, ContextBundle, ContextFragment, FragmentKind, MIN_CONTEXT_LENGTH,
    NO_CONTEXT_SENTINEL, RETRIEVED_HEADER, SELECTED_HEADER,
};
pub use generator::{AnswerGenerator, GenerationResult, DIRECT_EXTRACT_NOTICE, NO_INFORMATION_MESSAGE};
pub use pipeline::{IndexRequest, IndexSummary, RagService, DEFAULT_SECTION};
pub use retriever::ContextRetriever;
pub use translator::{unavailable_translation, TranslationResult, Translator};
