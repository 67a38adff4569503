//! Contract Service - Recommendation and generation pipelines
//!
//! Wires the corpus, analysis and template engines into two pipelines:
//! - **recommend**: needs analysis, keyword extraction, retrieval, scoring
//! - **generate**: placeholder extraction, template filling, saving
//!
//! Both run synchronously on the caller's thread, or on a worker thread via
//! [`spawn_recommendation`] and [`spawn_generation`].

pub mod config;
pub mod context;
pub mod error;
pub mod generate;
pub mod progress;
pub mod recommend;
pub mod worker;

pub use config::{LlmSettings, ServiceConfig};
pub use context::ContractService;
pub use error::ServiceError;
pub use generate::GeneratedContract;
pub use progress::{ignore_progress, Progress, ProgressFn};
pub use recommend::RecommendationOutcome;
pub use worker::{spawn_generation, spawn_recommendation, WorkerHandle};
