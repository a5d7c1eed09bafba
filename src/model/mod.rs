//! The decoded result tree
//!
//! Nodes are reference counted and created on demand. Children are owned by
//! their parent's [`LazyList`](crate::lazy::LazyList); every child points
//! back to its parent weakly, so the tree is dropped as a whole once its root
//! and the registry are gone.

mod keyword;
mod message;
mod suite;
mod times;

pub use keyword::Keyword;
pub use message::Message;
pub use suite::{Suite, SuiteStatistics};
pub use test::Test;
pub use times::{format_date, format_date_time, format_elapsed, format_time, offsets_in_range, timestamp, Times};

pub(crate) use keyword::KeywordChildren;

use crate::error::Result;
use crate::raw::Raw;
use crate::strings::StringStore;
use crate::{NodeKind, Status};
use std::cell::OnceCell;
use std::fmt;
use std::rc::{Rc, Weak};

const PARENT_TEARDOWN_FAILED: &str = "Teardown of the parent suite failed.";
const ALSO_PARENT_TEARDOWN_FAILED: &str = "Also teardown of the parent suite failed.";

/// Any node of the tree
#[derive(Clone)]
pub enum Node {
    Suite(Rc<Suite>),
    Test(Rc<Test>),
    Keyword(Rc<Keyword>),
    Message(Rc<Message>),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Suite(_) => NodeKind::Suite,
            Node::Test(_) => NodeKind::Test,
            Node::Keyword(_) => NodeKind::Keyword,
            Node::Message(_) => NodeKind::Message,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Node::Suite(s) => s.id(),
            Node::Test(t) => t.id(),
            Node::Keyword(k) => k.id(),
            Node::Message(m) => m.id(),
        }
    }

    /// Name of a suite, test or keyword; the text of a message
    pub fn name(&self) -> &str {
        match self {
            Node::Suite(s) => s.name(),
            Node::Test(t) => t.name(),
            Node::Keyword(k) => k.name(),
            Node::Message(m) => m.text(),
        }
    }

    /// Messages carry no status
    pub fn status(&self) -> Option<Status> {
        match self {
            Node::Suite(s) => Some(s.status()),
            Node::Test(t) => Some(t.status()),
            Node::Keyword(k) => Some(k.status()),
            Node::Message(_) => None,
        }
    }

    pub fn times(&self) -> Option<&Times> {
        match self {
            Node::Suite(s) => Some(s.times()),
            Node::Test(t) => Some(t.times()),
            Node::Keyword(k) => Some(k.times()),
            Node::Message(_) => None,
        }
    }

    pub fn parent(&self) -> Option<Node> {
        match self {
            Node::Suite(s) => s.parent().map(Node::Suite),
            Node::Test(t) => t.parent().map(Node::Suite),
            Node::Keyword(k) => k.parent(),
            Node::Message(m) => m.parent().map(Node::Keyword),
        }
    }

    /// Children in display order, or `None` while they live in an unloaded split file
    pub fn children(&self) -> Result<Option<Vec<Node>>> {
        match self {
            Node::Suite(s) => s.children().map(Some),
            Node::Test(t) => t.children(),
            Node::Keyword(k) => k.children(),
            Node::Message(_) => Ok(Some(Vec::new())),
        }
    }

    pub fn is_children_loaded(&self) -> bool {
        match self {
            Node::Test(t) => t.is_children_loaded(),
            Node::Keyword(k) => k.is_children_loaded(),
            Node::Suite(_) | Node::Message(_) => true,
        }
    }

    /// Run `callback` once this node's children can be read synchronously
    pub fn call_when_children_ready(&self, callback: impl FnOnce() + 'static) {
        match self {
            Node::Test(t) => t.call_when_children_ready(callback),
            Node::Keyword(k) => k.call_when_children_ready(callback),
            Node::Suite(_) | Node::Message(_) => callback(),
        }
    }

    /// Child of the given kind at a 0-based position among its siblings of that kind
    pub fn child(&self, kind: NodeKind, index: usize) -> Result<Option<Node>> {
        match (self, kind) {
            (Node::Suite(s), NodeKind::Suite) => Ok(s.suite(index)?.map(Node::Suite)),
            (Node::Suite(s), NodeKind::Test) => Ok(s.test(index)?.map(Node::Test)),
            (Node::Suite(s), NodeKind::Keyword) => Ok(s.keyword(index)?.map(Node::Keyword)),
            (Node::Test(t), NodeKind::Keyword) => Ok(t.keyword(index)?.map(Node::Keyword)),
            (Node::Keyword(k), NodeKind::Keyword) => Ok(k.keyword(index)?.map(Node::Keyword)),
            _ => Ok(None),
        }
    }

    /// Same underlying node, not just equal content
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Suite(a), Node::Suite(b)) => Rc::ptr_eq(a, b),
            (Node::Test(a), Node::Test(b)) => Rc::ptr_eq(a, b),
            (Node::Keyword(a), Node::Keyword(b)) => Rc::ptr_eq(a, b),
            (Node::Message(a), Node::Message(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_suite(&self) -> Option<&Rc<Suite>> {
        match self {
            Node::Suite(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_test(&self) -> Option<&Rc<Test>> {
        match self {
            Node::Test(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_keyword(&self) -> Option<&Rc<Keyword>> {
        match self {
            Node::Keyword(k) => Some(k),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Suite(s) => fmt::Debug::fmt(s, f),
            Node::Test(t) => fmt::Debug::fmt(t, f),
            Node::Keyword(k) => fmt::Debug::fmt(k, f),
            Node::Message(m) => fmt::Debug::fmt(m, f),
        }
    }
}

/// Weak link from a keyword to whatever owns it
#[derive(Debug, Clone)]
pub enum ParentRef {
    Suite(Weak<Suite>),
    Test(Weak<Test>),
    Keyword(Weak<Keyword>),
}

impl ParentRef {
    pub fn upgrade(&self) -> Option<Node> {
        match self {
            ParentRef::Suite(s) => s.upgrade().map(Node::Suite),
            ParentRef::Test(t) => t.upgrade().map(Node::Test),
            ParentRef::Keyword(k) => k.upgrade().map(Node::Keyword),
        }
    }
}

/// String reference resolved on first access
pub(crate) struct LazyText {
    slot: Option<Raw>,
    strings: Rc<StringStore>,
    value: OnceCell<Rc<str>>,
}

impl LazyText {
    pub(crate) fn new(slot: Option<&Raw>, strings: &Rc<StringStore>) -> Self {
        Self {
            slot: slot.cloned(),
            strings: Rc::clone(strings),
            value: OnceCell::new(),
        }
    }

    pub(crate) fn get(&self) -> Result<&str> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let text = self.strings.get(self.slot.as_ref())?;
        let value: Rc<str> = text.as_deref().map(Rc::from).unwrap_or_else(|| Rc::from(""));
        Ok(self.value.get_or_init(|| value))
    }
}

impl fmt::Debug for LazyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(v) => write!(f, "{:?}", v),
            None => write!(f, "<unresolved>"),
        }
    }
}

/// Status message of a test or suite, with the parent teardown note appended
pub(crate) struct StatusMessage {
    own: LazyText,
    parent_teardown_failed: bool,
    value: OnceCell<String>,
}

impl StatusMessage {
    pub(crate) fn new(own: LazyText, parent_teardown_failed: bool) -> Self {
        Self {
            own,
            parent_teardown_failed,
            value: OnceCell::new(),
        }
    }

    pub(crate) fn get(&self) -> Result<&str> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let own = self.own.get()?;
        let message = if !self.parent_teardown_failed {
            own.to_string()
        } else if own.is_empty() {
            PARENT_TEARDOWN_FAILED.to_string()
        } else {
            format!("{}\n\n{}", own, ALSO_PARENT_TEARDOWN_FAILED)
        };
        Ok(self.value.get_or_init(|| message))
    }
}

impl fmt::Debug for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.own, f)
    }
}

/// Status of a test or suite under a possibly failed parent teardown
pub(crate) fn effective_status(coded: Status, parent_teardown_failed: bool) -> Status {
    if parent_teardown_failed {
        Status::Fail
    } else {
        coded
    }
}
