//! Logview: decoder and lazy object model for compact test-execution reports
//!
//! Execution results are embedded in report pages as a deduplicated,
//! optionally compressed array-of-arrays encoding. This library turns that
//! encoding into a navigable suite/test/keyword/message tree that is decoded
//! on demand, addressable by stable ids, searchable by tag queries, and
//! summarized by pass/fail statistics.

pub mod config;
pub mod decode;
pub mod error;
pub mod format;
pub mod lazy;
pub mod loader;
pub mod model;
pub mod query;
pub mod raw;
pub mod registry;
pub mod report;
pub mod reporter;
pub mod stats;
pub mod strings;
pub mod watcher;

pub use error::{Error, Result};
pub use format::FormatVersion;
pub use loader::{SplitFileLoader, SplitPayload, SplitSource};
pub use model::{Keyword, Message, Node, Suite, Test, Times};
pub use registry::PathRegistry;
pub use report::{OutputData, ReportData};
pub use stats::{StatisticRow, Statistics};
pub use strings::{StringStore, Text};

use serde::{Deserialize, Serialize};

/// Execution outcome of a suite, test or keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pass,
    Fail,
    NotRun,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pass => write!(f, "PASS"),
            Status::Fail => write!(f, "FAIL"),
            Status::NotRun => write!(f, "NOT RUN"),
        }
    }
}

/// Role of a keyword in its parent's body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeywordType {
    Keyword,
    Setup,
    Teardown,
    /// A for loop
    For,
    /// One iteration of a for loop
    Var,
}

impl std::fmt::Display for KeywordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeywordType::Keyword => write!(f, "KEYWORD"),
            KeywordType::Setup => write!(f, "SETUP"),
            KeywordType::Teardown => write!(f, "TEARDOWN"),
            KeywordType::For => write!(f, "FOR"),
            KeywordType::Var => write!(f, "VAR"),
        }
    }
}

/// Log message level, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Fail,
    Error,
}

impl std::fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageLevel::Trace => write!(f, "TRACE"),
            MessageLevel::Debug => write!(f, "DEBUG"),
            MessageLevel::Info => write!(f, "INFO"),
            MessageLevel::Warn => write!(f, "WARN"),
            MessageLevel::Fail => write!(f, "FAIL"),
            MessageLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Discriminant of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Suite,
    Test,
    Keyword,
    Message,
}

impl NodeKind {
    /// Letter used in segmented node ids (`s1-t2-k3`)
    pub fn id_letter(self) -> Option<char> {
        match self {
            NodeKind::Suite => Some('s'),
            NodeKind::Test => Some('t'),
            NodeKind::Keyword => Some('k'),
            NodeKind::Message => None,
        }
    }

    pub fn from_id_letter(letter: char) -> Option<Self> {
        match letter {
            's' => Some(NodeKind::Suite),
            't' => Some(NodeKind::Test),
            'k' => Some(NodeKind::Keyword),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Suite => write!(f, "suite"),
            NodeKind::Test => write!(f, "test"),
            NodeKind::Keyword => write!(f, "keyword"),
            NodeKind::Message => write!(f, "message"),
        }
    }
}
