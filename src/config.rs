use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: Model,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub chunking: Chunking,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Default::default(),
            defaults: Default::default(),
            chunking: Default::default(),
            engine: Default::default(),
            logging: Default::default(),
            debug: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Hugging Face checkpoint id. The MBART_MODEL env var takes precedence.
    pub id: String,
}
impl Default for Model {
    fn default() -> Self {
        Self {
            id: "sagunrai/mbart-large-50-nepali-finetuned-1".into(),
        }
    }
}

/// Generation defaults applied to jobs that leave the fields unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    pub summarize_max_new_tokens: u32,
    pub translate_max_new_tokens: u32,
    pub max_input_tokens: u32,
    pub num_beams: u32,
    pub do_sample: bool,
}
impl Default for Defaults {
    fn default() -> Self {
        Self {
            summarize_max_new_tokens: 160,
            translate_max_new_tokens: 256,
            max_input_tokens: 1024,
            num_beams: 4,
            do_sample: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunking {
    pub chunk_chars: usize,
    pub max_chunks: usize,
}
impl Default for Chunking {
    fn default() -> Self {
        Self {
            chunk_chars: 700,
            max_chunks: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    /// Python executable, or "auto" to consult MBART_PYTHON and fall back
    /// to python3.
    pub python_exe: String,
    pub scripts_dir: String,
    /// Extra environment passed to the worker (HF_HOME and friends).
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
}
impl Default for Engine {
    fn default() -> Self {
        Self {
            python_exe: "auto".into(),
            scripts_dir: "scripts".into(),
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    /// Let the worker's stderr pass through to ours. Model downloads and
    /// load progress are only visible with this on.
    pub keep_worker_stderr: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_worker_stderr: true,
        }
    }
}
