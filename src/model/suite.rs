use super::{effective_status, Keyword, LazyText, Node, StatusMessage, Test, Times};
use crate::error::Result;
use crate::lazy::LazyList;
use crate::query::Matcher;
use crate::stats::TagStat;
use crate::{KeywordType, Status};
use serde::Serialize;
use std::fmt;
use std::rc::{Rc, Weak};

/// Test counts recorded for a suite and everything below it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteStatistics {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub critical: u64,
    pub critical_passed: u64,
    pub critical_failed: u64,
}

impl SuiteStatistics {
    pub fn new(total: u64, passed: u64, critical: u64, critical_passed: u64) -> Self {
        Self {
            total,
            passed,
            failed: total.saturating_sub(passed),
            critical,
            critical_passed,
            critical_failed: critical.saturating_sub(critical_passed),
        }
    }
}

pub struct Suite {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) source: String,
    pub(crate) relative_source: String,
    pub(crate) doc: LazyText,
    pub(crate) metadata: Vec<(String, String)>,
    pub(crate) status: Status,
    pub(crate) message: StatusMessage,
    pub(crate) times: Times,
    pub(crate) statistics: SuiteStatistics,
    pub(crate) parent: Weak<Suite>,
    pub(crate) parent_teardown_failed: bool,
    pub(crate) keywords: LazyList<Rc<Keyword>>,
    pub(crate) tests: LazyList<Rc<Test>>,
    pub(crate) suites: LazyList<Rc<Suite>>,
}

impl Suite {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted names of all ancestors and this suite
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn relative_source(&self) -> &str {
        &self.relative_source
    }

    pub fn doc(&self) -> Result<&str> {
        self.doc.get()
    }

    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    pub fn status(&self) -> Status {
        effective_status(self.status, self.parent_teardown_failed)
    }

    pub fn message(&self) -> Result<&str> {
        self.message.get()
    }

    pub fn times(&self) -> &Times {
        &self.times
    }

    pub fn statistics(&self) -> &SuiteStatistics {
        &self.statistics
    }

    pub fn parent(&self) -> Option<Rc<Suite>> {
        self.parent.upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    pub fn keywords(&self) -> Result<&[Rc<Keyword>]> {
        self.keywords.items()
    }

    pub fn keyword(&self, index: usize) -> Result<Option<Rc<Keyword>>> {
        self.keywords.get(index)
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn tests(&self) -> Result<&[Rc<Test>]> {
        self.tests.items()
    }

    pub fn test(&self, index: usize) -> Result<Option<Rc<Test>>> {
        self.tests.get(index)
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    pub fn suites(&self) -> Result<&[Rc<Suite>]> {
        self.suites.items()
    }

    pub fn suite(&self, index: usize) -> Result<Option<Rc<Suite>>> {
        self.suites.get(index)
    }

    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    /// Keywords, then tests, then sub-suites
    pub fn children(&self) -> Result<Vec<Node>> {
        let mut children = Vec::with_capacity(
            self.keywords.len() + self.tests.len() + self.suites.len(),
        );
        children.extend(self.keywords()?.iter().cloned().map(Node::Keyword));
        children.extend(self.tests()?.iter().cloned().map(Node::Test));
        children.extend(self.suites()?.iter().cloned().map(Node::Suite));
        Ok(children)
    }

    /// True when this suite's own teardown failed or any ancestor's did
    pub fn has_teardown_failure(&self) -> Result<bool> {
        if self.parent_teardown_failed {
            return Ok(true);
        }
        Ok(match self.keywords.last()? {
            Some(last) => last.kw_type() == KeywordType::Teardown && last.status() == Status::Fail,
            None => false,
        })
    }

    /// Tests matching `predicate`, depth first: sub-suites before own tests
    pub fn search_tests(&self, predicate: &dyn Fn(&Test) -> bool) -> Result<Vec<Rc<Test>>> {
        let mut found = Vec::new();
        for suite in self.suites()? {
            found.extend(suite.search_tests(predicate)?);
        }
        found.extend(self.tests()?.iter().filter(|t| predicate(t.as_ref())).cloned());
        Ok(found)
    }

    pub fn all_tests(&self) -> Result<Vec<Rc<Test>>> {
        self.search_tests(&|_: &Test| true)
    }

    pub fn critical_tests(&self) -> Result<Vec<Rc<Test>>> {
        self.search_tests(&|t: &Test| t.is_critical())
    }

    /// Tests counted by a tag statistics row
    pub fn search_tests_by_tag(&self, tag: &TagStat) -> Result<Vec<Rc<Test>>> {
        match tag.combined.as_deref() {
            Some(pattern) => self.search_tests(&|t: &Test| t.matches_tag_pattern(pattern)),
            None => self.search_tests(&|t: &Test| t.contains_tag(&tag.row.label)),
        }
    }

    /// All tests of every suite whose name or full name matches `pattern`
    pub fn search_tests_in_suite(&self, pattern: &str) -> Result<Vec<Rc<Test>>> {
        self.tests_in_matching_suites(&Matcher::new(pattern))
    }

    fn tests_in_matching_suites(&self, matcher: &Matcher) -> Result<Vec<Rc<Test>>> {
        if matcher.matches_any([self.full_name(), self.name()]) {
            return self.all_tests();
        }
        let mut found = Vec::new();
        for suite in self.suites()? {
            found.extend(suite.tests_in_matching_suites(matcher)?);
        }
        Ok(found)
    }

    /// This suite or the first descendant with the given full name
    pub fn find_suite_by_name(self: &Rc<Self>, full_name: &str) -> Result<Option<Rc<Suite>>> {
        if self.full_name == full_name {
            return Ok(Some(Rc::clone(self)));
        }
        for suite in self.suites()? {
            if let Some(found) = suite.find_suite_by_name(full_name)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
