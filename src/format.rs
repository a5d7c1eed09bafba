//! Positional layouts and code tables of the supported payload versions
//!
//! Each version is a distinct decoder variant selected by the payload's
//! `version` field. Layouts are never guessed from the shape of the data.

use crate::error::{Error, Result};
use crate::raw::Raw;
use crate::{KeywordType, MessageLevel, Status};
use serde::{Deserialize, Serialize};

/// Encoding version of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FormatVersion {
    /// Single-letter status and type codes, no split files
    Lettered,
    /// Enumerated integer codes, keyword children may live in split files
    Indexed,
}

impl TryFrom<u32> for FormatVersion {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(FormatVersion::Lettered),
            2 => Ok(FormatVersion::Indexed),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

impl From<FormatVersion> for u32 {
    fn from(version: FormatVersion) -> u32 {
        match version {
            FormatVersion::Lettered => 1,
            FormatVersion::Indexed => 2,
        }
    }
}

/// Slot positions of a suite record
#[derive(Debug)]
pub struct SuiteSlots {
    pub name: usize,
    pub source: usize,
    pub relative_source: Option<usize>,
    pub doc: usize,
    pub metadata: usize,
    pub status: usize,
    pub suites: usize,
    pub tests: usize,
    pub keywords: usize,
    pub stats: usize,
}

const LETTERED_SUITE: SuiteSlots = SuiteSlots {
    source: 0,
    name: 1,
    relative_source: None,
    doc: 2,
    metadata: 3,
    status: 4,
    suites: 5,
    tests: 6,
    keywords: 7,
    stats: 8,
};

const INDEXED_SUITE: SuiteSlots = SuiteSlots {
    name: 0,
    source: 1,
    relative_source: Some(2),
    doc: 3,
    metadata: 4,
    status: 5,
    suites: 6,
    tests: 7,
    keywords: 8,
    stats: 9,
};

// Test, keyword, message and status records share one layout across versions.
pub const TEST_NAME: usize = 0;
pub const TEST_TIMEOUT: usize = 1;
pub const TEST_CRITICAL: usize = 2;
pub const TEST_DOC: usize = 3;
pub const TEST_TAGS: usize = 4;
pub const TEST_STATUS: usize = 5;
pub const TEST_KEYWORDS: usize = 6;

pub const KEYWORD_TYPE: usize = 0;
pub const KEYWORD_NAME: usize = 1;
pub const KEYWORD_TIMEOUT: usize = 2;
pub const KEYWORD_DOC: usize = 3;
pub const KEYWORD_ARGS: usize = 4;
pub const KEYWORD_STATUS: usize = 5;
pub const KEYWORD_KEYWORDS: usize = 6;
pub const KEYWORD_MESSAGES: usize = 7;

pub const MESSAGE_TIME: usize = 0;
pub const MESSAGE_LEVEL: usize = 1;
pub const MESSAGE_TEXT: usize = 2;
pub const MESSAGE_LINK: usize = 3;

pub const STATUS_CODE: usize = 0;
pub const STATUS_START: usize = 1;
pub const STATUS_ELAPSED: usize = 2;
pub const STATUS_MESSAGE: usize = 3;

impl FormatVersion {
    pub fn suite_slots(self) -> &'static SuiteSlots {
        match self {
            FormatVersion::Lettered => &LETTERED_SUITE,
            FormatVersion::Indexed => &INDEXED_SUITE,
        }
    }

    pub fn supports_split_files(self) -> bool {
        matches!(self, FormatVersion::Indexed)
    }

    pub fn status(self, code: &Raw) -> Result<Status> {
        match self {
            FormatVersion::Lettered => match code.as_str("status")? {
                "P" => Ok(Status::Pass),
                "F" => Ok(Status::Fail),
                "N" => Ok(Status::NotRun),
                other => Err(Error::unknown_code("status", other)),
            },
            FormatVersion::Indexed => match code.as_int("status")? {
                0 => Ok(Status::Fail),
                1 => Ok(Status::Pass),
                2 => Ok(Status::NotRun),
                other => Err(Error::unknown_code("status", other)),
            },
        }
    }

    pub fn keyword_type(self, code: &Raw) -> Result<KeywordType> {
        match self {
            FormatVersion::Lettered => match code.as_str("keyword type")? {
                "kw" => Ok(KeywordType::Keyword),
                "setup" => Ok(KeywordType::Setup),
                "teardown" => Ok(KeywordType::Teardown),
                "forloop" => Ok(KeywordType::For),
                "foritem" => Ok(KeywordType::Var),
                other => Err(Error::unknown_code("keyword type", other)),
            },
            FormatVersion::Indexed => match code.as_int("keyword type")? {
                0 => Ok(KeywordType::Keyword),
                1 => Ok(KeywordType::Setup),
                2 => Ok(KeywordType::Teardown),
                3 => Ok(KeywordType::For),
                4 => Ok(KeywordType::Var),
                other => Err(Error::unknown_code("keyword type", other)),
            },
        }
    }

    pub fn level(self, code: &Raw) -> Result<MessageLevel> {
        match self {
            FormatVersion::Lettered => match code.as_str("message level")? {
                "T" => Ok(MessageLevel::Trace),
                "D" => Ok(MessageLevel::Debug),
                "I" | "H" => Ok(MessageLevel::Info),
                "W" => Ok(MessageLevel::Warn),
                "E" => Ok(MessageLevel::Error),
                "F" => Ok(MessageLevel::Fail),
                other => Err(Error::unknown_code("message level", other)),
            },
            FormatVersion::Indexed => match code.as_int("message level")? {
                0 => Ok(MessageLevel::Trace),
                1 => Ok(MessageLevel::Debug),
                2 => Ok(MessageLevel::Info),
                3 => Ok(MessageLevel::Warn),
                4 => Ok(MessageLevel::Error),
                5 => Ok(MessageLevel::Fail),
                other => Err(Error::unknown_code("message level", other)),
            },
        }
    }

    pub fn critical(self, code: &Raw) -> Result<bool> {
        match self {
            FormatVersion::Lettered => match code.as_str("criticality")? {
                "Y" => Ok(true),
                "N" => Ok(false),
                other => Err(Error::unknown_code("criticality", other)),
            },
            FormatVersion::Indexed => Ok(code.as_int("criticality")? != 0),
        }
    }
}
