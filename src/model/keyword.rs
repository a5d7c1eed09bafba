use super::{LazyText, Message, Node, ParentRef, Times};
use crate::decode::Decoder;
use crate::error::Result;
use crate::lazy::LazyList;
use crate::{KeywordType, Status};
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

pub struct Keyword {
    pub(crate) id: String,
    pub(crate) kw_type: KeywordType,
    pub(crate) name: String,
    pub(crate) path: String,
    pub(crate) timeout: Option<String>,
    pub(crate) doc: LazyText,
    pub(crate) arguments: String,
    pub(crate) status: Status,
    pub(crate) times: Times,
    pub(crate) parent: ParentRef,
    pub(crate) keywords: KeywordChildren,
    pub(crate) messages: LazyList<Rc<Message>>,
    pub(crate) decoder: Rc<Decoder>,
}

impl Keyword {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kw_type(&self) -> KeywordType {
        self.kw_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owner's path (or full name) plus this keyword's 0-based position, dot separated
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn timeout(&self) -> Option<&str> {
        self.timeout.as_deref()
    }

    pub fn doc(&self) -> Result<&str> {
        self.doc.get()
    }

    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn times(&self) -> &Times {
        &self.times
    }

    /// The suite, test or keyword this keyword belongs to
    pub fn parent(&self) -> Option<Node> {
        self.parent.upgrade()
    }

    pub fn is_children_loaded(&self) -> bool {
        self.keywords.is_loaded()
    }

    /// Split file holding the child keywords, if they were stored apart
    pub fn split_file(&self) -> Option<&str> {
        self.keywords.split_file()
    }

    pub fn keywords(&self) -> Result<Option<&[Rc<Keyword>]>> {
        self.keywords.items()
    }

    pub fn keyword(&self, index: usize) -> Result<Option<Rc<Keyword>>> {
        self.keywords.get(index)
    }

    pub fn messages(&self) -> Result<&[Rc<Message>]> {
        self.messages.items()
    }

    pub fn message(&self, index: usize) -> Result<Option<Rc<Message>>> {
        self.messages.get(index)
    }

    /// Keywords then messages; `None` while the keywords are not loaded
    pub fn children(&self) -> Result<Option<Vec<Node>>> {
        let Some(keywords) = self.keywords()? else {
            return Ok(None);
        };
        let messages = self.messages()?;
        let mut children = Vec::with_capacity(keywords.len() + messages.len());
        children.extend(keywords.iter().cloned().map(Node::Keyword));
        children.extend(messages.iter().cloned().map(Node::Message));
        Ok(Some(children))
    }

    pub fn call_when_children_ready(self: &Rc<Self>, callback: impl FnOnce() + 'static) {
        self.keywords.when_ready(
            &self.decoder,
            ParentRef::Keyword(Rc::downgrade(self)),
            Box::new(callback),
        );
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyword")
            .field("id", &self.id)
            .field("type", &self.kw_type)
            .field("name", &self.name)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Keyword children of a test or keyword, either inline or in a split file
pub(crate) struct KeywordChildren {
    split_file: Option<String>,
    list: OnceCell<LazyList<Rc<Keyword>>>,
}

impl KeywordChildren {
    pub(crate) fn inline(list: LazyList<Rc<Keyword>>) -> Self {
        Self {
            split_file: None,
            list: OnceCell::from(list),
        }
    }

    pub(crate) fn deferred(split_file: String) -> Self {
        Self {
            split_file: Some(split_file),
            list: OnceCell::new(),
        }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.list.get().is_some()
    }

    pub(crate) fn split_file(&self) -> Option<&str> {
        self.split_file.as_deref()
    }

    pub(crate) fn items(&self) -> Result<Option<&[Rc<Keyword>]>> {
        self.list.get().map(LazyList::items).transpose()
    }

    pub(crate) fn get(&self, index: usize) -> Result<Option<Rc<Keyword>>> {
        match self.list.get() {
            Some(list) => list.get(index),
            None => Ok(None),
        }
    }

    fn install(&self, build: impl FnOnce() -> LazyList<Rc<Keyword>>) {
        self.list.get_or_init(build);
    }

    pub(crate) fn when_ready(
        &self,
        decoder: &Rc<Decoder>,
        parent: ParentRef,
        callback: Box<dyn FnOnce()>,
    ) {
        let file = match (&self.split_file, self.list.get()) {
            (Some(file), None) => file.clone(),
            _ => return callback(),
        };
        let owner = Rc::clone(decoder);
        decoder.loader().ensure_loaded(&file, move |payload| {
            if let Some(node) = parent.upgrade() {
                let children = match &node {
                    Node::Test(t) => Some(&t.keywords),
                    Node::Keyword(k) => Some(&k.keywords),
                    Node::Suite(_) | Node::Message(_) => None,
                };
                if let Some(children) = children {
                    children.install(|| owner.split_keywords(parent.clone(), payload));
                }
            }
            callback();
        });
    }
}

impl fmt::Debug for KeywordChildren {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordChildren")
            .field("split_file", &self.split_file)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
