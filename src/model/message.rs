use super::{format_date_time, Keyword};
use crate::MessageLevel;
use chrono::{DateTime, Utc};
use std::fmt;
use std::rc::{Rc, Weak};

/// A log message; leaf of the tree
pub struct Message {
    pub(crate) id: String,
    pub(crate) level: MessageLevel,
    pub(crate) time: Option<DateTime<Utc>>,
    pub(crate) text: String,
    pub(crate) link: Option<String>,
    pub(crate) parent: Weak<Keyword>,
}

impl Message {
    /// Synthesized `element-id-N` id, unique within a report
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn level(&self) -> MessageLevel {
        self.level
    }

    pub fn time(&self) -> Option<&DateTime<Utc>> {
        self.time.as_ref()
    }

    pub fn date_time(&self) -> String {
        format_date_time(self.time.as_ref())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Id of the keyword an error message refers to
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// Owning keyword; execution errors have none
    pub fn parent(&self) -> Option<Rc<Keyword>> {
        self.parent.upgrade()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}
