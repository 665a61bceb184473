use serde::{Deserialize, Serialize};

pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TextStats {
    pub words: usize,
    pub chars: usize,
    pub reading_minutes: usize,
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes at 200 words per minute, rounded up.
pub fn reading_minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE)
}

pub fn text_stats(text: &str) -> TextStats {
    let words = word_count(text);
    TextStats {
        words,
        chars: text.chars().count(),
        reading_minutes: reading_minutes(words),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// Level 2 and 3 ATX headings, numbered in document order. Fenced code is skipped.
pub fn table_of_contents(markdown: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_fence = false;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if !(2..=3).contains(&level) {
            continue;
        }
        let rest = &trimmed[level..];
        if !rest.starts_with(' ') {
            continue;
        }
        let text = rest.trim().trim_end_matches('#').trim_end();
        if text.is_empty() {
            continue;
        }

        headings.push(Heading {
            id: format!("heading-{}", headings.len()),
            text: text.to_string(),
            level: level as u8,
        });
    }

    headings
}
