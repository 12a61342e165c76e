pub mod chunk_plan;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod report;
pub mod util;
