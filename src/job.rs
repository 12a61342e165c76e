use crate::{config::Config, error::RelayError};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Summarize,
    Translate,
}

impl Task {
    pub fn name(self) -> &'static str {
        match self {
            Task::Summarize => "summarize",
            Task::Translate => "translate",
        }
    }

    pub fn instruction_prefix(self) -> &'static str {
        match self {
            Task::Summarize => "summarize: ",
            Task::Translate => "translate English to Nepali: ",
        }
    }
}

/// Raw request shape as it arrives on the wire. Unknown fields are ignored;
/// `text` is accepted as any JSON value and stringified during validation.
#[derive(Debug, Default, Deserialize)]
pub struct RawJob {
    pub task: Option<String>,
    pub text: Option<Value>,
    pub max_new_tokens: Option<u32>,
    pub max_input_tokens: Option<u32>,
    pub num_beams: Option<u32>,
    pub do_sample: Option<bool>,
    pub chunking: Option<bool>,
    pub chunk_chars: Option<usize>,
    pub max_chunks: Option<usize>,
}

/// A validated job with every generation parameter resolved. Immutable after
/// validation; consumed once by the pipeline.
#[derive(Debug, Clone)]
pub struct Job {
    pub task: Task,
    pub text: String,
    pub max_new_tokens: u32,
    pub max_input_tokens: u32,
    pub num_beams: u32,
    pub do_sample: bool,
    /// Explicit chunking override; None means decide from text length.
    pub chunking: Option<bool>,
    pub chunk_chars: usize,
    pub max_chunks: usize,
}

/// Validate a raw job and merge in config defaults. Pure; the first failing
/// rule wins. Out-of-range values are passed through untouched, the worker
/// is the one to reject them.
pub fn validate(raw: RawJob, cfg: &Config) -> Result<Job, RelayError> {
    let task = raw.task.as_deref().unwrap_or("").trim().to_string();
    let task = match task.as_str() {
        "summarize" => Task::Summarize,
        // translate_en_to_ne is the legacy identifier from the original
        // Node-facing service.
        "translate" | "translate_en_to_ne" => Task::Translate,
        _ => return Err(RelayError::UnsupportedTask(task)),
    };

    let text = match raw.text {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(RelayError::EmptyText);
    }

    let d = &cfg.defaults;
    let max_new_tokens = raw.max_new_tokens.unwrap_or(match task {
        Task::Summarize => d.summarize_max_new_tokens,
        Task::Translate => d.translate_max_new_tokens,
    });

    Ok(Job {
        task,
        text,
        max_new_tokens,
        max_input_tokens: raw.max_input_tokens.unwrap_or(d.max_input_tokens),
        num_beams: raw.num_beams.unwrap_or(d.num_beams),
        do_sample: raw.do_sample.unwrap_or(d.do_sample),
        chunking: raw.chunking,
        chunk_chars: raw.chunk_chars.unwrap_or(cfg.chunking.chunk_chars),
        max_chunks: raw.max_chunks.unwrap_or(cfg.chunking.max_chunks),
    })
}
