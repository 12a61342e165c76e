use super::{types::*, Engine};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

const WORKER_SCRIPT: &str = "mbart_worker.py";

/// A persistent Python worker holding the tokenizer and model for the
/// lifetime of one invocation. Requests and replies are line-delimited JSON
/// on its stdin/stdout; the model loads exactly once, at spawn.
///
/// There is deliberately no timeout on any call: a hanging generation blocks
/// the job until the surrounding process gives up on us.
pub struct PythonEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl PythonEngine {
    pub fn spawn(cfg: &Config) -> Result<Self> {
        let script = PathBuf::from(&cfg.engine.scripts_dir).join(WORKER_SCRIPT);
        if !script.exists() {
            return Err(anyhow!("missing worker script: {}", script.display()));
        }
        let python_exe = resolve_python_exe(&cfg.engine.python_exe);

        debug!("spawning worker {} {}", python_exe.display(), script.display());
        let mut cmd = Command::new(&python_exe);
        cmd.arg(&script);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(if cfg.debug.keep_worker_stderr {
            Stdio::inherit()
        } else {
            Stdio::null()
        });

        for (k, v) in &cfg.engine.env {
            cmd.env(k, v);
        }
        // The worker reads MBART_MODEL itself; an env var set by the caller
        // outranks the config file.
        if std::env::var_os("MBART_MODEL").is_none() {
            cmd.env("MBART_MODEL", &cfg.model.id);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning python worker: {}", python_exe.display()))?;

        let stdin = child.stdin.take().ok_or_else(|| anyhow!("no worker stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("no worker stdout"))?;

        let mut engine = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        // The first line arrives once the model is loaded. This blocks for
        // as long as the download/load takes.
        let ready: ReadyOut = engine
            .read_reply()
            .with_context(|| "waiting for worker ready")?;
        if !ready.ok {
            let msg = ready.error.unwrap_or_else(|| "worker not ready".into());
            return Err(anyhow!("worker failed to load model: {msg}"));
        }
        debug!(
            "worker ready model={:?} device={:?}",
            ready.model, ready.device
        );

        Ok(engine)
    }

    fn call<O: for<'de> serde::Deserialize<'de>>(
        &mut self,
        req: &serde_json::Value,
    ) -> Result<O> {
        let mut line = serde_json::to_string(req)?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .with_context(|| "writing to worker")?;
        self.stdin.flush().with_context(|| "flushing worker stdin")?;
        self.read_reply()
    }

    fn read_reply<O: for<'de> serde::Deserialize<'de>>(&mut self) -> Result<O> {
        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .with_context(|| "reading from worker")?;
        if n == 0 {
            return Err(anyhow!("worker exited unexpectedly"));
        }
        serde_json::from_str(line.trim_end())
            .with_context(|| format!("parsing worker reply: {}", line.trim_end()))
    }
}

impl Drop for PythonEngine {
    fn drop(&mut self) {
        // Closing stdin is the shutdown signal; kill is the backstop.
        if self.child.try_wait().ok().flatten().is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl Engine for PythonEngine {
    fn doctor(&mut self) -> Result<ModelDiag> {
        self.call(&serde_json::json!({"cmd": "info"}))
    }

    fn encode(&mut self, text: &str, max_length: u32) -> Result<Vec<i64>> {
        let out: EncodeOut = self.call(&serde_json::json!({
            "cmd": "encode",
            "text": text,
            "max_length": max_length,
        }))?;
        if !out.ok {
            return Err(anyhow!(out.error.unwrap_or_else(|| "encode failed".into())));
        }
        Ok(out.tokens)
    }

    fn generate(&mut self, tokens: &[i64], opts: &GenerationOptions) -> Result<Vec<i64>> {
        let out: GenerateOut = self.call(&serde_json::json!({
            "cmd": "generate",
            "tokens": tokens,
            "num_beams": opts.num_beams,
            "early_stopping": opts.early_stopping,
            "max_new_tokens": opts.max_new_tokens,
            "do_sample": opts.do_sample,
        }))?;
        if !out.ok {
            let msg = out.error.unwrap_or_else(|| "generate failed".into());
            warn!("worker generate failed: {msg}");
            return Err(anyhow!(msg));
        }
        Ok(out.tokens)
    }

    fn decode(&mut self, tokens: &[i64], skip_special: bool) -> Result<String> {
        let out: DecodeOut = self.call(&serde_json::json!({
            "cmd": "decode",
            "tokens": tokens,
            "skip_special": skip_special,
        }))?;
        if !out.ok {
            return Err(anyhow!(out.error.unwrap_or_else(|| "decode failed".into())));
        }
        Ok(out.text)
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("MBART_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
