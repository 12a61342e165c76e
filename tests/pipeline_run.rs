use anyhow::{anyhow, Result};
use mbart_relay::{
    engine::{Engine, GenerationOptions, ModelDiag},
    error::RelayError,
    job::{Job, Task},
    pipeline::Pipeline,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct Recorder {
    prompts: Vec<String>,
    opts: Vec<GenerationOptions>,
}

/// Fake model capability: encode remembers the prompt and hands back its
/// index as the token stream, decode maps it through `reply`.
struct FakeEngine {
    rec: Rc<RefCell<Recorder>>,
    fail_on_generate: Option<usize>,
    reply: fn(&str) -> String,
}

impl FakeEngine {
    fn new(reply: fn(&str) -> String) -> (Self, Rc<RefCell<Recorder>>) {
        let rec = Rc::new(RefCell::new(Recorder::default()));
        (
            Self {
                rec: rec.clone(),
                fail_on_generate: None,
                reply,
            },
            rec,
        )
    }
}

impl Engine for FakeEngine {
    fn doctor(&mut self) -> Result<ModelDiag> {
        Err(anyhow!("not used in tests"))
    }

    fn encode(&mut self, text: &str, _max_length: u32) -> Result<Vec<i64>> {
        let mut rec = self.rec.borrow_mut();
        rec.prompts.push(text.to_string());
        Ok(vec![(rec.prompts.len() - 1) as i64])
    }

    fn generate(&mut self, tokens: &[i64], opts: &GenerationOptions) -> Result<Vec<i64>> {
        let call_index = self.rec.borrow().opts.len();
        self.rec.borrow_mut().opts.push(opts.clone());
        if self.fail_on_generate == Some(call_index) {
            return Err(anyhow!("CUDA out of memory"));
        }
        Ok(tokens.to_vec())
    }

    fn decode(&mut self, tokens: &[i64], _skip_special: bool) -> Result<String> {
        let prompt = self.rec.borrow().prompts[tokens[0] as usize].clone();
        Ok((self.reply)(&prompt))
    }
}

fn echo(prompt: &str) -> String {
    format!("NE[{prompt}]")
}

fn job(task: Task, text: &str) -> Job {
    Job {
        task,
        text: text.to_string(),
        max_new_tokens: match task {
            Task::Summarize => 160,
            Task::Translate => 256,
        },
        max_input_tokens: 1024,
        num_beams: 4,
        do_sample: false,
        chunking: None,
        chunk_chars: 700,
        max_chunks: 12,
    }
}

#[test]
fn summarize_is_always_a_single_call() {
    let (engine, rec) = FakeEngine::new(echo);
    let mut pipeline = Pipeline::new(engine);

    let text = "word ".repeat(300);
    let out = pipeline.run_job(&job(Task::Summarize, text.trim())).unwrap();

    let rec = rec.borrow();
    assert_eq!(rec.prompts.len(), 1);
    assert!(rec.prompts[0].starts_with("summarize: word"));
    assert_eq!(rec.opts[0].max_new_tokens, 160);
    assert!(out.starts_with("NE[summarize: "));
}

#[test]
fn short_translation_is_not_chunked() {
    let (engine, rec) = FakeEngine::new(echo);
    let mut pipeline = Pipeline::new(engine);

    let out = pipeline
        .run_job(&job(Task::Translate, "Good morning."))
        .unwrap();

    let rec = rec.borrow();
    assert_eq!(rec.prompts.len(), 1);
    assert_eq!(rec.prompts[0], "translate English to Nepali: Good morning.");
    assert_eq!(out, "NE[translate English to Nepali: Good morning.]");
}

#[test]
fn long_translation_auto_chunks_and_joins_in_order() {
    let (engine, rec) = FakeEngine::new(echo);
    let mut pipeline = Pipeline::new(engine);

    let a = "a".repeat(350);
    let b = "b".repeat(350);
    let text = format!("{a}\n\n{b}");
    let out = pipeline.run_job(&job(Task::Translate, &text)).unwrap();

    let rec = rec.borrow();
    assert_eq!(rec.prompts.len(), 2);
    assert_eq!(rec.prompts[0], format!("translate English to Nepali: {a}"));
    assert_eq!(rec.prompts[1], format!("translate English to Nepali: {b}"));
    assert_eq!(
        out,
        format!(
            "NE[translate English to Nepali: {a}]\n\nNE[translate English to Nepali: {b}]"
        )
    );
}

#[test]
fn auto_chunk_threshold_is_strictly_over_600_chars() {
    let (engine, rec) = FakeEngine::new(echo);
    let mut pipeline = Pipeline::new(engine);
    // A single 600-char line: below the threshold, one unchunked call.
    let mut j = job(Task::Translate, &"x".repeat(600));
    j.chunk_chars = 200;
    pipeline.run_job(&j).unwrap();
    assert_eq!(rec.borrow().prompts.len(), 1);

    // 601 chars: chunking kicks in, and with a 200-char cap the unbroken
    // line hard-splits into four slices.
    let (engine, rec) = FakeEngine::new(echo);
    let mut pipeline = Pipeline::new(engine);
    let mut j = job(Task::Translate, &"x".repeat(601));
    j.chunk_chars = 200;
    pipeline.run_job(&j).unwrap();
    assert_eq!(rec.borrow().prompts.len(), 4);
}

#[test]
fn explicit_chunking_flag_wins_over_the_heuristic() {
    let (engine, rec) = FakeEngine::new(echo);
    let mut pipeline = Pipeline::new(engine);
    let mut j = job(Task::Translate, &"x".repeat(2000));
    j.chunking = Some(false);
    pipeline.run_job(&j).unwrap();
    assert_eq!(rec.borrow().prompts.len(), 1);

    let (engine, rec) = FakeEngine::new(echo);
    let mut pipeline = Pipeline::new(engine);
    let a = "a".repeat(80);
    let b = "b".repeat(80);
    let mut j = job(Task::Translate, &format!("{a}\n\n{b}"));
    j.chunking = Some(true);
    j.chunk_chars = 100;
    pipeline.run_job(&j).unwrap();
    assert_eq!(rec.borrow().prompts.len(), 2);
}

#[test]
fn every_segment_gets_the_full_token_budget() {
    let (engine, rec) = FakeEngine::new(echo);
    let mut pipeline = Pipeline::new(engine);

    let text = format!("{}\n\n{}\n\n{}", "a".repeat(350), "b".repeat(350), "c".repeat(350));
    pipeline.run_job(&job(Task::Translate, &text)).unwrap();

    let rec = rec.borrow();
    assert_eq!(rec.opts.len(), 3);
    for opts in rec.opts.iter() {
        assert_eq!(opts.max_new_tokens, 256);
        assert_eq!(opts.num_beams, 4);
        assert!(!opts.early_stopping);
        assert!(!opts.do_sample);
    }
}

#[test]
fn generation_failure_aborts_the_whole_job() {
    let (mut engine, rec) = FakeEngine::new(echo);
    engine.fail_on_generate = Some(1);
    let mut pipeline = Pipeline::new(engine);

    let text = format!("{}\n\n{}\n\n{}", "a".repeat(350), "b".repeat(350), "c".repeat(350));
    let err = pipeline.run_job(&job(Task::Translate, &text)).unwrap_err();

    assert!(matches!(err, RelayError::GenerationFailure(_)));
    assert!(err.to_string().contains("CUDA out of memory"));
    // Segment 1 succeeded but its output is discarded with the job; segment
    // 3 is never attempted.
    assert_eq!(rec.borrow().opts.len(), 2);
}

#[test]
fn empty_segment_outputs_are_dropped_from_the_join() {
    fn skip_b(prompt: &str) -> String {
        if prompt.contains('b') {
            String::new()
        } else {
            format!("NE[{prompt}]")
        }
    }

    let (engine, _rec) = FakeEngine::new(skip_b);
    let mut pipeline = Pipeline::new(engine);

    let text = format!("{}\n\n{}\n\n{}", "a".repeat(350), "b".repeat(350), "c".repeat(350));
    let out = pipeline.run_job(&job(Task::Translate, &text)).unwrap();

    assert!(!out.contains("\n\n\n"));
    assert_eq!(out.matches("NE[").count(), 2);
}

#[test]
fn decoded_output_is_trimmed() {
    fn padded(_prompt: &str) -> String {
        "  नमस्ते  ".to_string()
    }

    let (engine, _rec) = FakeEngine::new(padded);
    let mut pipeline = Pipeline::new(engine);
    let out = pipeline.run_job(&job(Task::Translate, "Hello.")).unwrap();
    assert_eq!(out, "नमस्ते");
}
