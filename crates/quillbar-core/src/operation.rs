//! The closed set of text transformations offered in the menu

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A text transformation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Proofread,
    Rewrite,
    Friendly,
    Professional,
    Concise,
    Summary,
    KeyPoints,
    Table,
    List,
}

impl Operation {
    /// All operations in menu order
    pub const ALL: [Operation; 9] = [
        Operation::Proofread,
        Operation::Rewrite,
        Operation::Friendly,
        Operation::Professional,
        Operation::Concise,
        Operation::Summary,
        Operation::KeyPoints,
        Operation::Table,
        Operation::List,
    ];

    /// Text of the menu entry that triggers this operation
    pub fn menu_label(&self) -> &'static str {
        match self {
            Operation::Proofread => "Proofread",
            Operation::Rewrite => "Rewrite",
            Operation::Friendly => "Make Friendly",
            Operation::Professional => "Make Professional",
            Operation::Concise => "Make Concise",
            Operation::Summary => "Summarize",
            Operation::KeyPoints => "Extract Key Points",
            Operation::Table => "Convert to Table",
            Operation::List => "Convert to List",
        }
    }

    /// Kebab-case slug used on the command line and in serialized form
    pub fn slug(&self) -> &'static str {
        match self {
            Operation::Proofread => "proofread",
            Operation::Rewrite => "rewrite",
            Operation::Friendly => "friendly",
            Operation::Professional => "professional",
            Operation::Concise => "concise",
            Operation::Summary => "summary",
            Operation::KeyPoints => "key-points",
            Operation::Table => "table",
            Operation::List => "list",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Proofread => "Proofread",
            Operation::Rewrite => "Rewrite",
            Operation::Friendly => "Friendly",
            Operation::Professional => "Professional",
            Operation::Concise => "Concise",
            Operation::Summary => "Summary",
            Operation::KeyPoints => "Key Points",
            Operation::Table => "Table",
            Operation::List => "List",
        };
        f.write_str(name)
    }
}

impl FromStr for Operation {
    type Err = Error;

    /// Accepts the short name, the slug, or the menu label, ignoring case,
    /// whitespace, dashes and underscores
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "proofread" => Ok(Operation::Proofread),
            "rewrite" => Ok(Operation::Rewrite),
            "friendly" | "makefriendly" => Ok(Operation::Friendly),
            "professional" | "makeprofessional" => Ok(Operation::Professional),
            "concise" | "makeconcise" => Ok(Operation::Concise),
            "summary" | "summarize" => Ok(Operation::Summary),
            "keypoints" | "extractkeypoints" => Ok(Operation::KeyPoints),
            "table" | "converttotable" => Ok(Operation::Table),
            "list" | "converttolist" => Ok(Operation::List),
            _ => Err(Error::UnknownOperation(s.to_string())),
        }
    }
}
