//! One report-loading session
//!
//! [`ReportData`] owns everything decoded from one root payload: its string
//! table, the path registry, the split-file loader and the lazily decoded
//! root suite, error list and statistics.

use crate::decode::Decoder;
use crate::error::Result;
use crate::format::FormatVersion;
use crate::lazy::LazyList;
use crate::loader::{SplitFileLoader, SplitPayload, SplitSource};
use crate::model::{timestamp, Message, Node, Suite, Test};
use crate::query::contains_tag_pattern;
use crate::raw::Raw;
use crate::registry::PathRegistry;
use crate::stats::{Statistics, StatisticRow, TagStat};
use crate::strings::StringStore;
use crate::Status;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::cell::OnceCell;
use std::future::Future;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// Root payload as embedded in a report
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputData {
    pub version: FormatVersion,
    /// Generation time as an offset from `base_millis`
    pub generated_millis: i64,
    pub base_millis: i64,
    pub strings: Vec<String>,
    pub suite: Raw,
    pub stats: Raw,
    #[serde(default = "Raw::empty_list")]
    pub errors: Raw,
    #[serde(default)]
    pub split_log_base: Option<String>,
}

impl OutputData {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

pub struct ReportData {
    version: FormatVersion,
    generated_millis: i64,
    base_millis: i64,
    suite_raw: Raw,
    stats_raw: Raw,
    strings: Rc<StringStore>,
    registry: Rc<PathRegistry>,
    loader: Rc<SplitFileLoader>,
    decoder: Rc<Decoder>,
    root: OnceCell<Rc<Suite>>,
    errors: LazyList<Rc<Message>>,
    statistics: OnceCell<Statistics>,
}

impl ReportData {
    pub fn new(data: OutputData, source: impl SplitSource + 'static) -> Result<Self> {
        let registry = Rc::new(PathRegistry::new());
        let loader = Rc::new(SplitFileLoader::new(source));
        let decoder = Decoder::new(
            data.version,
            data.base_millis,
            data.split_log_base,
            &registry,
            Rc::clone(&loader),
        );
        let strings = Rc::new(StringStore::new(data.strings));
        let errors = decoder.error_list(data.errors.list_rc("errors")?, &strings);
        debug!(
            version = ?data.version,
            strings = strings.len(),
            "report payload loaded"
        );
        Ok(Self {
            version: data.version,
            generated_millis: data.generated_millis,
            base_millis: data.base_millis,
            suite_raw: data.suite,
            stats_raw: data.stats,
            strings,
            registry,
            loader,
            decoder,
            root: OnceCell::new(),
            errors,
            statistics: OnceCell::new(),
        })
    }

    pub fn from_json(json: &str, source: impl SplitSource + 'static) -> Result<Self> {
        Self::new(OutputData::from_json(json)?, source)
    }

    pub fn from_path(path: &Path, source: impl SplitSource + 'static) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?, source)
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// The root suite, decoded on first access
    pub fn suite(&self) -> Result<Rc<Suite>> {
        if let Some(root) = self.root.get() {
            return Ok(Rc::clone(root));
        }
        let root = self
            .decoder
            .decode_suite(None, &self.suite_raw, &self.strings, 0)?;
        Ok(Rc::clone(self.root.get_or_init(|| root)))
    }

    /// Execution errors, each decoded once
    pub fn errors(&self) -> Result<&[Rc<Message>]> {
        self.errors.items()
    }

    pub fn statistics(&self) -> Result<&Statistics> {
        if let Some(stats) = self.statistics.get() {
            return Ok(stats);
        }
        let stats = Statistics::from_raw(&self.stats_raw)?;
        Ok(self.statistics.get_or_init(|| stats))
    }

    pub fn generated(&self) -> Option<DateTime<Utc>> {
        timestamp(self.base_millis, self.generated_millis)
    }

    /// A node that has already been decoded
    pub fn find_loaded(&self, id: &str) -> Option<Node> {
        self.registry.find(id)
    }

    pub fn registry(&self) -> &Rc<PathRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &Rc<SplitFileLoader> {
        &self.loader
    }

    pub fn strings(&self) -> &StringStore {
        &self.strings
    }

    /// Deliver a split file requested through this report's source
    pub fn announce(&self, file_name: &str, payload: SplitPayload) {
        self.loader.announce(file_name, payload);
    }

    /// Decode every node on the path to `id` and pass the id chain to `callback`.
    ///
    /// The chain stops at the deepest node that exists.
    pub fn ensure_loaded(
        &self,
        id: &str,
        callback: impl FnOnce(Result<Vec<String>>) + 'static,
    ) -> Result<()> {
        self.suite()?;
        self.registry.resolve_path(id, callback);
        Ok(())
    }

    /// Future form of [`ensure_loaded`](Self::ensure_loaded)
    pub fn resolve(&self, id: &str) -> Result<impl Future<Output = Result<Vec<String>>>> {
        self.suite()?;
        Ok(self.registry.resolve(id))
    }

    /// Id chain to the suite with the given full name; empty when not found
    pub fn path_to_suite(&self, full_name: &str) -> Result<Vec<String>> {
        let root = self.suite()?;
        if !is_name_prefix(root.full_name(), full_name) {
            return Ok(Vec::new());
        }
        let mut chain = vec![root.id().to_string()];
        let mut current = root;
        while current.full_name() != full_name {
            let next = current
                .suites()?
                .iter()
                .find(|child| is_name_prefix(child.full_name(), full_name))
                .cloned();
            match next {
                Some(child) => {
                    chain.push(child.id().to_string());
                    current = child;
                }
                None => break,
            }
        }
        Ok(chain)
    }

    /// Id chain to the test with the given full name
    pub fn path_to_test(&self, full_name: &str) -> Result<Vec<String>> {
        let Some((suite_name, _)) = full_name.rsplit_once('.') else {
            return Ok(Vec::new());
        };
        let mut chain = self.path_to_suite(suite_name)?;
        let Some(suite_id) = chain.last() else {
            return Ok(chain);
        };
        if let Some(Node::Suite(suite)) = self.registry.find(suite_id) {
            if suite.full_name() == suite_name {
                if let Some(test) = suite.tests()?.iter().find(|t| t.full_name() == full_name) {
                    chain.push(test.id().to_string());
                }
            }
        }
        Ok(chain)
    }

    /// Resolve a keyword path (`Owner.Full.Name.0.2`) and pass the id chain to `callback`.
    ///
    /// The owner is the deepest suite or test whose full name prefixes the
    /// path; the remaining components are 0-based keyword positions.
    pub fn path_to_keyword(
        &self,
        path: &str,
        callback: impl FnOnce(Result<Vec<String>>) + 'static,
    ) -> Result<()> {
        let root = self.suite()?;
        let Some((mut id, owner_name)) = deepest_owner(&root, path)? else {
            callback(Ok(Vec::new()));
            return Ok(());
        };
        let rest = path
            .strip_prefix(owner_name.as_str())
            .unwrap_or("")
            .trim_start_matches('.');
        for component in rest.split('.').filter(|c| !c.is_empty()) {
            match component.parse::<usize>() {
                Ok(index) => id.push_str(&format!("-k{}", index + 1)),
                Err(_) => break,
            }
        }
        self.registry.resolve_path(&id, callback);
        Ok(())
    }

    /// Statistics row for a tag query, counted over every test of the report
    pub fn combined_tag_stat(&self, pattern: &str, name: Option<&str>) -> Result<TagStat> {
        let tests = self.suite()?.search_tests(&|t: &Test| t.matches_tag_pattern(pattern))?;
        let count = |status: Status| tests.iter().filter(|t| t.status() == status).count() as u64;
        Ok(TagStat {
            row: StatisticRow::new(
                name.unwrap_or(pattern),
                count(Status::Pass),
                count(Status::Fail),
                count(Status::NotRun),
            ),
            doc: String::new(),
            links: Vec::new(),
            combined: Some(pattern.to_string()),
            info: Some("combined".to_string()),
        })
    }

    /// Tests whose tags satisfy a tag query
    pub fn search_by_tag(&self, query: &str) -> Result<Vec<Rc<Test>>> {
        self.suite()?
            .search_tests(&|t: &Test| contains_tag_pattern(t.tags(), query))
    }
}

impl Drop for ReportData {
    fn drop(&mut self) {
        self.loader.abandon_pending();
        self.registry.clear();
    }
}

impl std::fmt::Debug for ReportData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportData")
            .field("version", &self.version)
            .field("registry", &self.registry)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

fn is_name_prefix(candidate: &str, full_name: &str) -> bool {
    full_name == candidate
        || full_name
            .strip_prefix(candidate)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Id and full name of the deepest suite or test whose full name prefixes `path`
fn deepest_owner(root: &Rc<Suite>, path: &str) -> Result<Option<(String, String)>> {
    if !is_name_prefix(root.full_name(), path) {
        return Ok(None);
    }
    let mut current = Rc::clone(root);
    loop {
        if let Some(test) = current
            .tests()?
            .iter()
            .find(|t| is_name_prefix(t.full_name(), path))
        {
            return Ok(Some((test.id().to_string(), test.full_name().to_string())));
        }
        let next = current
            .suites()?
            .iter()
            .find(|child| is_name_prefix(child.full_name(), path))
            .cloned();
        match next {
            Some(child) => current = child,
            None => return Ok(Some((current.id().to_string(), current.full_name().to_string()))),
        }
    }
}
