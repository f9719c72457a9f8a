//! Flashcard is the content payload of a review item: a front/back pair plus
//! a few descriptive fields. The scheduler never looks inside it.
use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of the front and back text, in characters.
pub const MAX_SIDE_CHARS: usize = 5000;

pub const DEFAULT_LANGUAGE: &str = "javascript";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    #[default]
    Basic,
    Cloze,
    Code,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Basic => "basic",
            CardKind::Cloze => "cloze",
            CardKind::Code => "code",
        }
    }
}

impl FromStr for CardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(CardKind::Basic),
            "cloze" => Ok(CardKind::Cloze),
            "code" => Ok(CardKind::Code),
            other => Err(format!("unknown card kind '{other}'")),
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a card came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Manual,
    Chat,
    Dojo,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Manual => "manual",
            SourceType::Chat => "chat",
            SourceType::Dojo => "dojo",
        }
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(SourceType::Manual),
            "chat" => Ok(SourceType::Chat),
            "dojo" => Ok(SourceType::Dojo),
            other => Err(format!("unknown source type '{other}'")),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub kind: CardKind,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: SourceType,
}

impl Flashcard {
    /// A basic, manually written card with no tags.
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            kind: CardKind::default(),
            language: default_language(),
            tags: Vec::new(),
            source: SourceType::default(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Trims every text field and checks the required sides.
    ///
    /// Front and back must be non-empty after trimming and at most
    /// [`MAX_SIDE_CHARS`] characters. Blank tags are dropped and a blank
    /// language falls back to the default.
    pub fn normalized(self) -> StoreResult<Self> {
        let front = check_side("front", &self.front)?;
        let back = check_side("back", &self.back)?;

        let language = match self.language.trim() {
            "" => default_language(),
            lang => lang.to_string(),
        };

        let tags = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            front,
            back,
            kind: self.kind,
            language,
            tags,
            source: self.source,
        })
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

fn check_side(side: &str, text: &str) -> StoreResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(format!("{side} content is required")));
    }
    if trimmed.chars().count() > MAX_SIDE_CHARS {
        return Err(StoreError::Validation(format!(
            "{side} content cannot exceed {MAX_SIDE_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}
