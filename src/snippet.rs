use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

static SNIPPET_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/snippets");

/// Spaces a tab in target text expands to.
pub const TAB_WIDTH: usize = 4;

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    Javascript,
    Python,
    Java,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// The text a session is typed against. Indexed by `char`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetText {
    id: String,
    language: Language,
    text: String,
    chars: Vec<char>,
}

impl TargetText {
    /// Normalises CRLF to LF and expands tabs to [`TAB_WIDTH`] spaces; Tab is
    /// the skip key.
    pub fn new(id: impl Into<String>, language: Language, content: &str) -> Self {
        let text = content
            .replace("\r\n", "\n")
            .replace('\t', &" ".repeat(TAB_WIDTH));
        let chars = text.chars().collect();
        Self {
            id: id.into(),
            language,
            text,
            chars,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_at(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }
}

/// Supplies target texts to the host between sessions.
pub trait SnippetSource {
    fn next_snippet(&mut self, language: Language) -> Result<TargetText>;
}

#[derive(Deserialize, Clone, Debug)]
pub struct SnippetEntry {
    pub id: String,
    pub difficulty: Difficulty,
    pub content: String,
}

#[derive(Deserialize, Clone, Debug)]
struct CorpusFile {
    language: Language,
    snippets: Vec<SnippetEntry>,
}

/// Static snippet corpus compiled into the binary.
#[derive(Clone, Debug)]
pub struct Corpus {
    files: Vec<CorpusFile>,
    difficulty: Option<Difficulty>,
    last_id: Option<String>,
}

impl Corpus {
    pub fn embedded() -> Result<Self> {
        let mut files = Vec::new();
        for language in Language::value_variants() {
            files.push(read_corpus_file(*language)?);
        }
        Ok(Self {
            files,
            difficulty: None,
            last_id: None,
        })
    }

    pub fn with_difficulty(mut self, difficulty: Option<Difficulty>) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn snippets(&self, language: Language) -> Vec<&SnippetEntry> {
        self.files
            .iter()
            .filter(|f| f.language == language)
            .flat_map(|f| f.snippets.iter())
            .filter(|s| self.difficulty.map_or(true, |d| s.difficulty == d))
            .collect()
    }
}

impl SnippetSource for Corpus {
    fn next_snippet(&mut self, language: Language) -> Result<TargetText> {
        let pool = self.snippets(language);
        let fresh: Vec<&SnippetEntry> = if pool.len() > 1 {
            pool.iter()
                .copied()
                .filter(|s| self.last_id.as_deref() != Some(s.id.as_str()))
                .collect()
        } else {
            pool
        };

        let picked = fresh
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| Error::NoSnippets {
                language: language.to_string(),
            })?;

        if picked.content.is_empty() {
            return Err(Error::EmptySnippet {
                id: picked.id.clone(),
            });
        }

        let id = picked.id.clone();
        let target = TargetText::new(id.clone(), language, &picked.content);
        self.last_id = Some(id);
        Ok(target)
    }
}

fn read_corpus_file(language: Language) -> Result<CorpusFile> {
    let name = format!("{language}.json");
    let file = SNIPPET_DIR.get_file(&name).ok_or_else(|| Error::MissingCorpus {
        path: PathBuf::from(&name),
    })?;
    let corpus = serde_json::from_slice(file.contents())?;
    Ok(corpus)
}

/// A user-supplied prompt, used for every session.
#[derive(Clone, Debug)]
pub struct FixedPrompt {
    content: String,
}

impl FixedPrompt {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl SnippetSource for FixedPrompt {
    fn next_snippet(&mut self, language: Language) -> Result<TargetText> {
        if self.content.is_empty() {
            return Err(Error::EmptySnippet {
                id: "custom".into(),
            });
        }
        Ok(TargetText::new("custom", language, &self.content))
    }
}
