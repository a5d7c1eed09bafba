//! Compact records to model nodes
//!
//! A [`Decoder`] is shared by every node of one report. It turns one raw
//! record into one node, wiring the node's child lists to decode their items
//! on first access, and registers each node under its id as it is created.

use crate::error::{Error, Result};
use crate::format::*;
use crate::lazy::LazyList;
use crate::loader::{SplitFileLoader, SplitPayload};
use crate::model::{
    offsets_in_range, timestamp, Keyword, KeywordChildren, LazyText, Message, Node, ParentRef,
    StatusMessage, Suite, SuiteStatistics, Test, Times,
};
use crate::raw::{Element, Raw};
use crate::registry::{PathRegistry, ROOT_ID};
use crate::strings::StringStore;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

const DEFAULT_SPLIT_LOG_BASE: &str = "log";

/// Where a node's keyword children live before any of them is decoded
enum ChildrenSlot {
    Inline(Rc<[Raw]>),
    Split(String),
}

pub struct Decoder {
    version: FormatVersion,
    base_millis: i64,
    split_log_base: Option<String>,
    registry: Weak<PathRegistry>,
    loader: Rc<SplitFileLoader>,
}

impl Decoder {
    pub fn new(
        version: FormatVersion,
        base_millis: i64,
        split_log_base: Option<String>,
        registry: &Rc<PathRegistry>,
        loader: Rc<SplitFileLoader>,
    ) -> Rc<Self> {
        Rc::new(Self {
            version,
            base_millis,
            split_log_base,
            registry: Rc::downgrade(registry),
            loader,
        })
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn loader(&self) -> &Rc<SplitFileLoader> {
        &self.loader
    }

    fn registry(&self) -> Result<Rc<PathRegistry>> {
        self.registry.upgrade().ok_or(Error::SessionClosed)
    }

    /// File name holding the keywords deferred under 1-based `index`
    pub fn split_file_name(&self, index: i64) -> String {
        let base = self.split_log_base.as_deref().unwrap_or(DEFAULT_SPLIT_LOG_BASE);
        format!("{}-{}.json", base, index)
    }

    /// Decode a suite record; `index` is its 0-based position among its siblings
    pub fn decode_suite(
        self: &Rc<Self>,
        parent: Option<&Rc<Suite>>,
        raw: &Raw,
        strings: &Rc<StringStore>,
        index: usize,
    ) -> Result<Rc<Suite>> {
        let id = match parent {
            Some(p) => format!("{}-s{}", p.id(), index + 1),
            None => ROOT_ID.to_string(),
        };
        let registry = self.registry()?;
        if let Some(Node::Suite(existing)) = registry.find(&id) {
            return Ok(existing);
        }

        let slots = self.version.suite_slots();
        let el = raw.element("suite")?;
        let name = strings.get(Some(el.get(slots.name)?))?.into_string();
        let source = strings.get(el.opt(slots.source))?.into_string();
        let relative_source = match slots.relative_source {
            Some(slot) => strings.get(el.opt(slot))?.into_string(),
            None => String::new(),
        };
        let metadata = self.metadata(el.get(slots.metadata)?, strings)?;
        let status_el = el.element(slots.status)?;
        let status = self.version.status(status_el.get(STATUS_CODE)?)?;
        let times = self.times(&status_el)?;
        let statistics = suite_statistics(&el.element(slots.stats)?)?;
        let suites = el.get(slots.suites)?.list_rc("suite children")?;
        let tests = el.get(slots.tests)?.list_rc("suite tests")?;
        let keywords = el.get(slots.keywords)?.list_rc("suite keywords")?;
        let parent_teardown_failed = match parent {
            Some(p) => p.has_teardown_failure()?,
            None => false,
        };
        let full_name = match parent {
            Some(p) => format!("{}.{}", p.full_name(), name),
            None => name.clone(),
        };

        let suite = Rc::new_cyclic(|me: &Weak<Suite>| Suite {
            id,
            name,
            full_name,
            source,
            relative_source,
            doc: LazyText::new(el.opt(slots.doc), strings),
            metadata,
            status,
            message: StatusMessage::new(
                LazyText::new(status_el.opt(STATUS_MESSAGE), strings),
                parent_teardown_failed,
            ),
            times,
            statistics,
            parent: parent.map(Rc::downgrade).unwrap_or_default(),
            parent_teardown_failed,
            keywords: self.keyword_list(ParentRef::Suite(me.clone()), keywords, strings),
            tests: self.test_list(me.clone(), tests, strings),
            suites: self.suite_list(me.clone(), suites, strings),
        });
        debug!(id = suite.id(), name = suite.name(), "decoded suite");
        registry.register(Node::Suite(Rc::clone(&suite)));
        Ok(suite)
    }

    pub fn decode_test(
        self: &Rc<Self>,
        parent: &Rc<Suite>,
        raw: &Raw,
        strings: &Rc<StringStore>,
        index: usize,
    ) -> Result<Rc<Test>> {
        let id = format!("{}-t{}", parent.id(), index + 1);
        let registry = self.registry()?;
        if let Some(Node::Test(existing)) = registry.find(&id) {
            return Ok(existing);
        }

        let el = raw.element("test")?;
        let name = strings.get(Some(el.get(TEST_NAME)?))?.into_string();
        let timeout = strings.get(el.opt(TEST_TIMEOUT))?.into_option();
        let critical = self.version.critical(el.get(TEST_CRITICAL)?)?;
        let tags = el
            .list(TEST_TAGS)?
            .iter()
            .map(|tag| strings.get(Some(tag)).map(|t| t.into_string()))
            .collect::<Result<Vec<_>>>()?;
        let status_el = el.element(TEST_STATUS)?;
        let status = self.version.status(status_el.get(STATUS_CODE)?)?;
        let times = self.times(&status_el)?;
        let children = self.children_slot(el.get(TEST_KEYWORDS)?)?;
        let parent_teardown_failed = parent.has_teardown_failure()?;

        let test = Rc::new_cyclic(|me: &Weak<Test>| Test {
            full_name: format!("{}.{}", parent.full_name(), name),
            id,
            name,
            timeout,
            critical,
            doc: LazyText::new(el.opt(TEST_DOC), strings),
            tags,
            status,
            message: StatusMessage::new(
                LazyText::new(status_el.opt(STATUS_MESSAGE), strings),
                parent_teardown_failed,
            ),
            times,
            parent: Rc::downgrade(parent),
            parent_teardown_failed,
            keywords: self.keyword_children(ParentRef::Test(me.clone()), children, strings),
            decoder: Rc::clone(self),
        });
        registry.register(Node::Test(Rc::clone(&test)));
        Ok(test)
    }

    pub fn decode_keyword(
        self: &Rc<Self>,
        parent: &ParentRef,
        raw: &Raw,
        strings: &Rc<StringStore>,
        index: usize,
    ) -> Result<Rc<Keyword>> {
        let owner = parent.upgrade().ok_or(Error::SessionClosed)?;
        let id = format!("{}-k{}", owner.id(), index + 1);
        let registry = self.registry()?;
        if let Some(Node::Keyword(existing)) = registry.find(&id) {
            return Ok(existing);
        }

        let el = raw.element("keyword")?;
        let kw_type = self.version.keyword_type(el.get(KEYWORD_TYPE)?)?;
        let name = strings.get(Some(el.get(KEYWORD_NAME)?))?.into_string();
        let timeout = strings.get(el.opt(KEYWORD_TIMEOUT))?.into_option();
        let arguments = strings.get(el.opt(KEYWORD_ARGS))?.into_string();
        let status_el = el.element(KEYWORD_STATUS)?;
        let status = self.version.status(status_el.get(STATUS_CODE)?)?;
        let times = self.times(&status_el)?;
        let children = self.children_slot(el.get(KEYWORD_KEYWORDS)?)?;
        let messages = match el.opt(KEYWORD_MESSAGES) {
            Some(slot) => slot.list_rc("keyword messages")?,
            None => Rc::from(Vec::new()),
        };
        let path = match &owner {
            Node::Keyword(k) => format!("{}.{}", k.path(), index),
            Node::Test(t) => format!("{}.{}", t.full_name(), index),
            Node::Suite(s) => format!("{}.{}", s.full_name(), index),
            Node::Message(_) => return Err(Error::shape("keyword", "owned by a message")),
        };

        let keyword = Rc::new_cyclic(|me: &Weak<Keyword>| Keyword {
            id,
            kw_type,
            name,
            path,
            timeout,
            doc: LazyText::new(el.opt(KEYWORD_DOC), strings),
            arguments,
            status,
            times,
            parent: parent.clone(),
            keywords: self.keyword_children(ParentRef::Keyword(me.clone()), children, strings),
            messages: self.message_list(me.clone(), messages, strings),
            decoder: Rc::clone(self),
        });
        registry.register(Node::Keyword(Rc::clone(&keyword)));
        Ok(keyword)
    }

    /// Decode a message; execution errors pass no parent
    pub fn decode_message(
        &self,
        parent: Option<&Weak<Keyword>>,
        raw: &Raw,
        strings: &StringStore,
    ) -> Result<Rc<Message>> {
        let el = raw.element("message")?;
        let offset = el.int(MESSAGE_TIME)?;
        let level = self.version.level(el.get(MESSAGE_LEVEL)?)?;
        let text = strings.get(el.opt(MESSAGE_TEXT))?.into_string();
        let link = strings.get(el.opt(MESSAGE_LINK))?.into_option();
        let registry = self.registry()?;
        let message = Rc::new(Message {
            id: registry.next_message_id(),
            level,
            time: timestamp(self.base_millis, offset),
            text,
            link,
            parent: parent.cloned().unwrap_or_default(),
        });
        registry.register(Node::Message(Rc::clone(&message)));
        Ok(message)
    }

    /// Keyword list of a node whose children arrived in a split file
    pub(crate) fn split_keywords(
        self: &Rc<Self>,
        parent: ParentRef,
        payload: &Rc<SplitPayload>,
    ) -> LazyList<Rc<Keyword>> {
        trace!(keywords = payload.keywords.len(), "installing split keywords");
        self.keyword_list(parent, Rc::clone(&payload.keywords), &payload.strings)
    }

    /// Error messages of the report
    pub(crate) fn error_list(
        self: &Rc<Self>,
        errors: Rc<[Raw]>,
        strings: &Rc<StringStore>,
    ) -> LazyList<Rc<Message>> {
        let decoder = Rc::clone(self);
        let strings = Rc::clone(strings);
        LazyList::with_len(errors.len(), move |i| {
            decoder.decode_message(None, &errors[i], &strings)
        })
    }

    fn suite_list(
        self: &Rc<Self>,
        parent: Weak<Suite>,
        items: Rc<[Raw]>,
        strings: &Rc<StringStore>,
    ) -> LazyList<Rc<Suite>> {
        let decoder = Rc::clone(self);
        let strings = Rc::clone(strings);
        LazyList::with_len(items.len(), move |i| {
            let parent = parent.upgrade().ok_or(Error::SessionClosed)?;
            decoder.decode_suite(Some(&parent), &items[i], &strings, i)
        })
    }

    fn test_list(
        self: &Rc<Self>,
        parent: Weak<Suite>,
        items: Rc<[Raw]>,
        strings: &Rc<StringStore>,
    ) -> LazyList<Rc<Test>> {
        let decoder = Rc::clone(self);
        let strings = Rc::clone(strings);
        LazyList::with_len(items.len(), move |i| {
            let parent = parent.upgrade().ok_or(Error::SessionClosed)?;
            decoder.decode_test(&parent, &items[i], &strings, i)
        })
    }

    fn keyword_list(
        self: &Rc<Self>,
        parent: ParentRef,
        items: Rc<[Raw]>,
        strings: &Rc<StringStore>,
    ) -> LazyList<Rc<Keyword>> {
        let decoder = Rc::clone(self);
        let strings = Rc::clone(strings);
        LazyList::with_len(items.len(), move |i| {
            decoder.decode_keyword(&parent, &items[i], &strings, i)
        })
    }

    fn message_list(
        self: &Rc<Self>,
        parent: Weak<Keyword>,
        items: Rc<[Raw]>,
        strings: &Rc<StringStore>,
    ) -> LazyList<Rc<Message>> {
        let decoder = Rc::clone(self);
        let strings = Rc::clone(strings);
        LazyList::with_len(items.len(), move |i| {
            decoder.decode_message(Some(&parent), &items[i], &strings)
        })
    }

    fn keyword_children(
        self: &Rc<Self>,
        parent: ParentRef,
        slot: ChildrenSlot,
        strings: &Rc<StringStore>,
    ) -> KeywordChildren {
        match slot {
            ChildrenSlot::Inline(items) => {
                KeywordChildren::inline(self.keyword_list(parent, items, strings))
            }
            ChildrenSlot::Split(file) => KeywordChildren::deferred(file),
        }
    }

    /// A keyword children slot: an inline list or a split file index
    fn children_slot(&self, slot: &Raw) -> Result<ChildrenSlot> {
        match slot {
            Raw::List(items) => Ok(ChildrenSlot::Inline(Rc::clone(items))),
            Raw::Int(_) | Raw::Float(_) => {
                let index = slot.as_int("split index")?;
                if !self.version.supports_split_files() {
                    return Err(Error::DeferredUnsupported {
                        version: self.version.into(),
                        index,
                    });
                }
                let file = self.split_file_name(index);
                trace!(file = %file, "keyword children deferred");
                Ok(ChildrenSlot::Split(file))
            }
            Raw::Null => Ok(ChildrenSlot::Inline(Rc::from(Vec::new()))),
            other => Err(Error::shape(
                "keyword children",
                format!("expected list or split index, found {:?}", other),
            )),
        }
    }

    fn times(&self, status: &Element<'_>) -> Result<Times> {
        let start = status.get(STATUS_START)?.as_opt_int("status start")?;
        let elapsed = status.int(STATUS_ELAPSED)?;
        if !offsets_in_range(self.base_millis, start, elapsed) {
            return Err(Error::shape(
                "status",
                format!("time offsets out of range ({:?}, {})", start, elapsed),
            ));
        }
        Ok(Times::from_offsets(self.base_millis, start, elapsed))
    }

    /// Flat `[key, value, key, value, ...]` string references
    fn metadata(&self, raw: &Raw, strings: &StringStore) -> Result<Vec<(String, String)>> {
        let items = raw.as_list("suite metadata")?;
        if items.len() % 2 != 0 {
            return Err(Error::shape(
                "suite metadata",
                format!("odd number of entries ({})", items.len()),
            ));
        }
        items
            .chunks(2)
            .map(|pair| {
                Ok((
                    strings.get(Some(&pair[0]))?.into_string(),
                    strings.get(Some(&pair[1]))?.into_string(),
                ))
            })
            .collect()
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("version", &self.version)
            .field("base_millis", &self.base_millis)
            .field("split_log_base", &self.split_log_base)
            .finish_non_exhaustive()
    }
}

/// `[total, passed, criticalTotal, criticalPassed]`
fn suite_statistics(stats: &Element<'_>) -> Result<SuiteStatistics> {
    let count = |slot: usize| -> Result<u64> {
        let value = stats.int(slot)?;
        u64::try_from(value)
            .map_err(|_| Error::shape("suite statistics", format!("negative count {}", value)))
    };
    Ok(SuiteStatistics::new(count(0)?, count(1)?, count(2)?, count(3)?))
}
