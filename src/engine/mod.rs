pub mod python;
pub mod types;

use anyhow::Result;

pub use types::{GenerationOptions, ModelDiag};

/// The opaque model capability: a tokenizer plus a seq2seq generator.
/// Methods take `&mut self` because the capability is a single exclusively
/// held resource; calls are never issued concurrently within a job.
pub trait Engine {
    fn doctor(&mut self) -> Result<ModelDiag>;
    /// Encode text to input ids, silently truncating at `max_length` tokens.
    fn encode(&mut self, text: &str, max_length: u32) -> Result<Vec<i64>>;
    fn generate(&mut self, tokens: &[i64], opts: &GenerationOptions) -> Result<Vec<i64>>;
    fn decode(&mut self, tokens: &[i64], skip_special: bool) -> Result<String>;
}
