//! Processing: extraction seams, aggregation and the orchestrator

pub mod adapters;
pub mod aggregate;
pub mod orchestrator;

pub use adapters::{
    AudioFeatureProvider, ColorExtractionAdapter, NeutralFeatures, PartialFeatures,
    StaticExtractor,
};
pub use aggregate::{aggregate, RankedResult};
pub use orchestrator::{
    CycleOutcome, OrchestratorConfig, OrchestratorPhase, OrchestratorStats,
    ProcessingOrchestrator,
};
