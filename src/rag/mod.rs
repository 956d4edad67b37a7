//! Retrieval-augmented prompt handling

pub mod assembler;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod token_estimator;
pub mod validator;

pub use assembler::ResponseAssembler;
pub use models::{
    Availability, Profile, PromptRequest, PromptResponse, RcaEntry, ResolvedPrompt,
    TempestReportRequest,
};
pub use pipeline::RcaPipeline;
pub use prompt::PromptBuilder;
pub use retriever::Retriever;
pub use token_estimator::TokenEstimator;
pub use validator::RequestValidator;
