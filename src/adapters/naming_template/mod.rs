// Template naming adapter - Output file names from metadata tokens

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::rules::resolve_conflict;
use crate::error::{ClipError, ClipResult};
use crate::ports::*;

/// Characters that are illegal in file names on at least one platform
const INVALID_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest stem we hand to the filesystem, in characters
const MAX_STEM_CHARS: usize = 200;

const FALLBACK_STEM: &str = "clip";

/// Renders `{token}` templates into safe file stems
#[derive(Debug, Clone, Default)]
pub struct TemplateNamer;

impl TemplateNamer {
    pub fn new() -> Self {
        Self
    }

    fn token_value(token: &str, context: &NamingContext) -> Option<String> {
        let metadata = context.metadata.as_ref();
        match token {
            "title" => Some(
                metadata
                    .and_then(|m| m.title.clone())
                    .unwrap_or_else(|| FALLBACK_STEM.to_string()),
            ),
            "id" => Some(metadata.and_then(|m| m.id.clone()).unwrap_or_default()),
            "uploader" => Some(metadata.and_then(|m| m.uploader.clone()).unwrap_or_default()),
            "start" => context.window.map(|w| w.start.format_compact()),
            "end" => context.window.map(|w| w.end.format_compact()),
            "quality" => context.quality.map(|q| q.to_string()),
            "date" => Some(Local::now().format("%Y-%m-%d").to_string()),
            _ => None,
        }
    }

    /// Replace characters the filesystem rejects and trim what Windows strips
    pub fn sanitize(raw: &str) -> String {
        let cleaned: String = raw
            .chars()
            .map(|c| {
                if INVALID_CHARS.contains(&c) || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .take(MAX_STEM_CHARS)
            .collect();
        let trimmed = cleaned.trim().trim_end_matches('.').trim();

        if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
            FALLBACK_STEM.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl NamingPort for TemplateNamer {
    fn render(&self, template: &str, context: &NamingContext) -> String {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let token = &after[..close];
                    match Self::token_value(token, context) {
                        Some(value) => rendered.push_str(&value),
                        // Unknown tokens stay verbatim
                        None => {
                            rendered.push('{');
                            rendered.push_str(token);
                            rendered.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    rendered.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);

        Self::sanitize(&rendered)
    }

    fn resolve_available(&self, folder: &Path, file_name: &str, limit: usize) -> ClipResult<PathBuf> {
        let wanted = folder.join(file_name);
        resolve_conflict(&wanted, limit, |p| p.exists()).ok_or(ClipError::NameExhausted {
            path: wanted,
            attempts: limit,
        })
    }
}
