use serde::{Deserialize, Serialize};

/// Decoding controls for one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub num_beams: u32,
    /// Always false in this tool; the target model family halts too early
    /// on chunked and long-form inputs when it is on.
    pub early_stopping: bool,
    pub max_new_tokens: u32,
    pub do_sample: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDiag {
    pub python_exe: String,
    pub python_version: String,
    pub transformers_version: Option<String>,
    pub torch_version: Option<String>,
    pub model: String,
    pub device: String,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// First line the worker prints after loading the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyOut {
    pub ok: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeOut {
    pub ok: bool,
    #[serde(default)]
    pub tokens: Vec<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOut {
    pub ok: bool,
    #[serde(default)]
    pub tokens: Vec<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeOut {
    pub ok: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub error: Option<String>,
}
