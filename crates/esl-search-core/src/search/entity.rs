//! Searchable content kinds, filter families and CEFR levels.

use crate::error::{EslError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A searchable content type.
///
/// Declaration order is the merge priority: when results from several kinds
/// are combined, tests come first and speakings last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Test,
    Course,
    Blog,
    Video,
    Audio,
    Story,
    Writing,
    Speaking,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Test,
        EntityKind::Course,
        EntityKind::Blog,
        EntityKind::Video,
        EntityKind::Audio,
        EntityKind::Story,
        EntityKind::Writing,
        EntityKind::Speaking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Test => "test",
            EntityKind::Course => "course",
            EntityKind::Blog => "blog",
            EntityKind::Video => "video",
            EntityKind::Audio => "audio",
            EntityKind::Story => "story",
            EntityKind::Writing => "writing",
            EntityKind::Speaking => "speaking",
        }
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Test => "tests",
            EntityKind::Course => "courses",
            EntityKind::Blog => "blogs",
            EntityKind::Video => "videos",
            EntityKind::Audio => "audios",
            EntityKind::Story => "stories",
            EntityKind::Writing => "writings",
            EntityKind::Speaking => "speakings",
        }
    }

    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.table() == table)
    }

    /// Position in the merge order, lowest first.
    pub fn priority(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `filter` request parameter: a named group of entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityFamily {
    #[serde(rename = "tests")]
    Tests,
    Courses,
    Blogs,
    Skills,
    #[serde(rename = "Esl Resources")]
    EslResources,
}

impl EntityFamily {
    pub fn kinds(&self) -> &'static [EntityKind] {
        match self {
            EntityFamily::Tests => &[EntityKind::Test],
            EntityFamily::Courses => &[EntityKind::Course],
            EntityFamily::Blogs => &[EntityKind::Blog],
            EntityFamily::Skills => &[EntityKind::Writing, EntityKind::Speaking],
            EntityFamily::EslResources => &[
                EntityKind::Video,
                EntityKind::Audio,
                EntityKind::Story,
                EntityKind::Writing,
                EntityKind::Speaking,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityFamily::Tests => "tests",
            EntityFamily::Courses => "Courses",
            EntityFamily::Blogs => "Blogs",
            EntityFamily::Skills => "Skills",
            EntityFamily::EslResources => "Esl Resources",
        }
    }
}

impl FromStr for EntityFamily {
    type Err = EslError;

    /// Case-insensitive; spaces, hyphens and underscores are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "tests" | "test" => Ok(EntityFamily::Tests),
            "courses" | "course" => Ok(EntityFamily::Courses),
            "blogs" | "blog" => Ok(EntityFamily::Blogs),
            "skills" | "skill" => Ok(EntityFamily::Skills),
            "eslresources" | "resources" => Ok(EntityFamily::EslResources),
            _ => Err(EslError::validation(
                "filter",
                format!("unknown filter '{}'", s),
            )),
        }
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CEFR difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::A1 => "a1",
            Level::A2 => "a2",
            Level::B1 => "b1",
            Level::B2 => "b2",
            Level::C1 => "c1",
            Level::C2 => "c2",
        }
    }

    /// Parse a comma-separated level list such as `a1,B1`.
    ///
    /// Blank entries are skipped and duplicates collapsed. An input with no
    /// levels at all returns an empty list, meaning no level constraint.
    pub fn parse_list(raw: &str) -> Result<Vec<Level>> {
        let mut levels = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let level: Level = part.parse()?;
            if !levels.contains(&level) {
                levels.push(level);
            }
        }
        Ok(levels)
    }
}

impl FromStr for Level {
    type Err = EslError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a1" => Ok(Level::A1),
            "a2" => Ok(Level::A2),
            "b1" => Ok(Level::B1),
            "b2" => Ok(Level::B2),
            "c1" => Ok(Level::C1),
            "c2" => Ok(Level::C2),
            _ => Err(EslError::validation(
                "level",
                format!("'{}' is not a CEFR level (a1..c2)", s),
            )),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
