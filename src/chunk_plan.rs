use serde::{Deserialize, Serialize};

/// Bounded segmentation of a long input text. Paragraph boundaries are
/// preferred; a single unbroken line that blows past the size cap falls
/// back to fixed-width slicing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub segments: Vec<String>,
    pub strategy: String,
}

/// All limits are in Unicode scalar counts, not bytes.
fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl ChunkPlan {
    pub fn build(text: &str, max_chars: usize, max_chunks: usize) -> ChunkPlan {
        let raw = text.replace("\r\n", "\n");
        let mut parts: Vec<&str> = raw
            .split('\n')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            parts = vec![raw.trim()];
        }

        let mut segments: Vec<String> = Vec::new();
        let mut cur = String::new();
        for p in parts {
            if p.is_empty() {
                continue;
            }
            if !cur.is_empty() && char_len(&cur) + char_len(p) + 1 > max_chars {
                segments.push(std::mem::take(&mut cur));
                cur = p.to_string();
            } else if cur.is_empty() {
                cur = p.to_string();
            } else {
                cur.push(' ');
                cur.push_str(p);
            }
            // Hard ceiling on generation cost: text beyond max_chunks
            // segments is dropped, documented lossy boundary.
            if segments.len() >= max_chunks {
                break;
            }
        }
        if !cur.is_empty() && segments.len() < max_chunks {
            segments.push(cur);
        }

        // Paragraph splitting found no usable boundary (one giant line):
        // slice the oversized first segment instead.
        if let Some(first) = segments.first() {
            if char_len(first) > max_chars * 2 {
                let segments = hard_split(first, max_chars, max_chunks);
                return ChunkPlan {
                    segments,
                    strategy: "hard_split".into(),
                };
            }
        }

        segments.retain(|s| !s.is_empty());
        ChunkPlan {
            segments,
            strategy: "paragraph".into(),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn hard_split(text: &str, max_chars: usize, max_chunks: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .take(max_chunks)
        .map(|w| w.iter().collect::<String>())
        .filter(|s| !s.is_empty())
        .collect()
}
