use crate::{
    chunk_plan::ChunkPlan,
    engine::{Engine, GenerationOptions},
    error::RelayError,
    job::{Job, Task},
};
use tracing::{debug, info};

/// Translation jobs longer than this auto-enable chunking unless the job
/// says otherwise.
pub const AUTO_CHUNK_THRESHOLD_CHARS: usize = 600;

pub struct Pipeline<E: Engine> {
    engine: E,
}

impl<E: Engine> Pipeline<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Drive a validated job to its final text. Any generation failure
    /// aborts the whole job; results from earlier segments are discarded.
    pub fn run_job(&mut self, job: &Job) -> Result<String, RelayError> {
        match job.task {
            Task::Summarize => {
                let prompt = format!("{}{}", job.task.instruction_prefix(), job.text);
                self.generate_one(&prompt, job)
            }
            Task::Translate => self.run_translation(job),
        }
    }

    fn run_translation(&mut self, job: &Job) -> Result<String, RelayError> {
        let chunking = job
            .chunking
            .unwrap_or_else(|| job.text.chars().count() > AUTO_CHUNK_THRESHOLD_CHARS);

        if !chunking {
            let prompt = format!("{}{}", job.task.instruction_prefix(), job.text);
            return self.generate_one(&prompt, job);
        }

        let plan = ChunkPlan::build(&job.text, job.chunk_chars, job.max_chunks);
        debug!(strategy = %plan.strategy, segments = plan.len(), "chunk plan");

        // Segments run strictly in order; the blank-line join below depends
        // on it, and the worker is a single exclusively held resource.
        let mut outputs = Vec::with_capacity(plan.len());
        for (i, segment) in plan.segments.iter().enumerate() {
            info!("segment {}/{} chars={}", i + 1, plan.len(), segment.chars().count());
            let prompt = format!("{}{}", job.task.instruction_prefix(), segment);
            // Each segment gets the full token budget, not a share of it.
            let out = self.generate_one(&prompt, job)?;
            if !out.is_empty() {
                outputs.push(out);
            }
        }
        Ok(outputs.join("\n\n"))
    }

    /// One encode → generate → decode round trip. Input-token truncation in
    /// encode is silent and accepted; everything else is a hard failure.
    fn generate_one(&mut self, prompt: &str, job: &Job) -> Result<String, RelayError> {
        let input_ids = self
            .engine
            .encode(prompt, job.max_input_tokens)
            .map_err(generation_failure)?;
        let opts = GenerationOptions {
            num_beams: job.num_beams,
            early_stopping: false,
            max_new_tokens: job.max_new_tokens,
            do_sample: job.do_sample,
        };
        let output_ids = self
            .engine
            .generate(&input_ids, &opts)
            .map_err(generation_failure)?;
        let text = self
            .engine
            .decode(&output_ids, true)
            .map_err(generation_failure)?;
        Ok(text.trim().to_string())
    }
}

fn generation_failure(err: anyhow::Error) -> RelayError {
    RelayError::GenerationFailure(format!("{err:#}"))
}
