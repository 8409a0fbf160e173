//! Pipeline composition and execution for variant summaries.

mod runner;

pub use runner::{
    run_summary_counts, Pipeline, PipelineConfig, PipelineInputs, PipelineOutput, PipelineStep,
};
