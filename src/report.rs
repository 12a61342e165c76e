use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The terminal artifact of a job. Exactly one is produced per invocation
/// and printed to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    pub fn success(text: String) -> Self {
        Self {
            ok: true,
            text: Some(text),
            error: None,
        }
    }

    pub fn failure(err: impl Display) -> Self {
        Self {
            ok: false,
            text: None,
            error: Some(err.to_string()),
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.ok {
            0
        } else {
            1
        }
    }
}
