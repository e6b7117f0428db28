use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// The three kinds of work item, top of the hierarchy first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Epic,
    Issue,
    Task,
}

impl Kind {
    /// Storage token used in the `items.kind` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Issue => "issue",
            Self::Task => "task",
        }
    }

    /// Wire label (`"Epic"`, `"Issue"`, `"Task"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Epic => "Epic",
            Self::Issue => "Issue",
            Self::Task => "Task",
        }
    }

    /// Depth of this kind in the type hierarchy (Epic = 0).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Epic => 0,
            Self::Issue => 1,
            Self::Task => 2,
        }
    }

    /// Whether an item of this kind may sit under a parent of kind `parent`.
    ///
    /// Epics are always top-level; any other kind may hang under a kind
    /// strictly above it.
    #[must_use]
    pub const fn accepts_parent(self, parent: Self) -> bool {
        !matches!(self, Self::Epic) && parent.level() < self.level()
    }

    /// How many descendant levels a backlog rooted at this kind shows.
    #[must_use]
    pub const fn backlog_depth(self) -> usize {
        match self {
            Self::Epic => 2,
            Self::Issue => 1,
            Self::Task => 0,
        }
    }
}

/// The three lifecycle states, in board column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum State {
    ToDo,
    Doing,
    Done,
}

impl State {
    /// Storage token used in the `items.state` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }

    /// Wire label (`"To Do"`, `"Doing"`, `"Done"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::Doing => "Doing",
            Self::Done => "Done",
        }
    }

    pub const ALL: [Self; 3] = [Self::ToDo, Self::Doing, Self::Done];
}

/// How a multi-tag filter combines its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagOperator {
    /// The item's tags intersect the requested set.
    #[default]
    Or,
    /// The item's tags are a superset of the requested set.
    And,
}

/// Resolved assignee attached to a work item or tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: String,
    pub name: String,
}

/// All persisted fields for a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: String,
    pub project: String,
    pub repo: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub state: State,
    pub parent_id: Option<String>,
    pub stack_rank: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at_us: Option<i64>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl WorkItem {
    /// `true` when the parent reference is missing, null, or empty.
    #[must_use]
    pub fn is_parentless(&self) -> bool {
        self.parent_id.as_deref().is_none_or(str::is_empty)
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .to_ascii_lowercase()
}

impl FromStr for Kind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "epic" => Ok(Self::Epic),
            "issue" => Ok(Self::Issue),
            "task" => Ok(Self::Task),
            _ => Err(ParseEnumError {
                expected: "type",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for State {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "todo" => Ok(Self::ToDo),
            "doing" => Ok(Self::Doing),
            "done" => Ok(Self::Done),
            _ => Err(ParseEnumError {
                expected: "state",
                got: s.to_string(),
            }),
        }
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
