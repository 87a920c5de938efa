// src/transform/sourcemap.rs

//! Minimal source map (v3) generation for concatenated bundles.
//!
//! Bundles are built by joining sources with `\n`, so every generated line
//! maps to exactly one source line at column 0. That is all the map records.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// One file that went into a bundle.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Name as it should appear in the map's `sources` list.
    pub name: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    version: u8,
    file: String,
    sources: Vec<String>,
    sources_content: Vec<String>,
    names: Vec<String>,
    mappings: String,
}

impl SourceMap {
    /// Map for `sources` joined with `\n` into `file`.
    pub fn for_concatenation(file: impl Into<String>, sources: &[SourceFile]) -> Self {
        let mut mappings = String::new();
        let mut prev_source: i64 = 0;
        let mut prev_line: i64 = 0;
        let mut first = true;

        for (idx, source) in sources.iter().enumerate() {
            for line in 0..source.content.split('\n').count() {
                if !first {
                    mappings.push(';');
                }
                first = false;

                let idx = idx as i64;
                let line = line as i64;
                encode_vlq(0, &mut mappings);
                encode_vlq(idx - prev_source, &mut mappings);
                encode_vlq(line - prev_line, &mut mappings);
                encode_vlq(0, &mut mappings);
                prev_source = idx;
                prev_line = line;
            }
        }

        Self {
            version: 3,
            file: file.into(),
            sources: sources.iter().map(|s| s.name.clone()).collect(),
            sources_content: sources.iter().map(|s| s.content.clone()).collect(),
            names: Vec::new(),
            mappings,
        }
    }

    pub fn mappings(&self) -> &str {
        &self.mappings
    }

    /// `//# sourceMappingURL=` comment with the map inlined as base64.
    pub fn inline_comment(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(format!(
            "//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}",
            STANDARD.encode(json)
        ))
    }
}

/// Append the base64 VLQ encoding of `value`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64_DIGITS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}
