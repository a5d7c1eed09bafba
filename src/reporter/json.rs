//! JSON reporter for machine-readable output

use crate::error::Result;
use crate::model::{Message, Node, Suite, SuiteStatistics, Test, Times};
use crate::report::ReportData;
use crate::stats::{Statistics, TagStat};
use crate::{MessageLevel, NodeKind, Status};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::rc::Rc;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Whole report: suite outline, statistics, combined tag rows and errors
    pub fn report(&self, report: &ReportData, combined: &[TagStat]) -> Result<String> {
        let errors = report
            .errors()?
            .iter()
            .map(|m| MessageSummary::from(m.as_ref()))
            .collect();
        let root = report.suite()?;
        let output = JsonOutput {
            version: report.version().into(),
            generated: report.generated(),
            suite: SuiteSummary::build(&root)?,
            statistics: report.statistics()?,
            combined,
            errors,
        };
        self.encode(&output)
    }

    /// Tests found by a search
    pub fn report_tests(&self, tests: &[Rc<Test>]) -> Result<String> {
        let summaries = tests
            .iter()
            .map(|t| TestSummary::build(t))
            .collect::<Result<Vec<_>>>()?;
        self.encode(&summaries)
    }

    /// Execution errors
    pub fn report_errors(&self, errors: &[Rc<Message>]) -> Result<String> {
        let summaries: Vec<MessageSummary> =
            errors.iter().map(|m| MessageSummary::from(m.as_ref())).collect();
        self.encode(&summaries)
    }

    /// One node with its already loaded descendants
    pub fn report_node(&self, node: &Node, chain: &[String]) -> Result<String> {
        let output = NodeOutput {
            chain,
            node: NodeSummary::build(node)?,
        };
        self.encode(&output)
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    version: u32,
    generated: Option<DateTime<Utc>>,
    suite: SuiteSummary,
    statistics: &'a Statistics,
    combined: &'a [TagStat],
    errors: Vec<MessageSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuiteSummary {
    id: String,
    name: String,
    full_name: String,
    source: String,
    status: Status,
    message: String,
    times: Times,
    statistics: SuiteStatistics,
    suites: Vec<SuiteSummary>,
    tests: Vec<TestSummary>,
}

impl SuiteSummary {
    fn build(suite: &Suite) -> Result<Self> {
        Ok(Self {
            id: suite.id().to_string(),
            name: suite.name().to_string(),
            full_name: suite.full_name().to_string(),
            source: suite.source().to_string(),
            status: suite.status(),
            message: suite.message()?.to_string(),
            times: suite.times().clone(),
            statistics: *suite.statistics(),
            suites: suite
                .suites()?
                .iter()
                .map(|s| SuiteSummary::build(s))
                .collect::<Result<_>>()?,
            tests: suite
                .tests()?
                .iter()
                .map(|t| TestSummary::build(t))
                .collect::<Result<_>>()?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TestSummary {
    id: String,
    name: String,
    full_name: String,
    critical: bool,
    tags: Vec<String>,
    status: Status,
    message: String,
    times: Times,
}

impl TestSummary {
    fn build(test: &Test) -> Result<Self> {
        Ok(Self {
            id: test.id().to_string(),
            name: test.name().to_string(),
            full_name: test.full_name().to_string(),
            critical: test.is_critical(),
            tags: test.tags().to_vec(),
            status: test.status(),
            message: test.message()?.to_string(),
            times: test.times().clone(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageSummary {
    id: String,
    level: MessageLevel,
    time: Option<DateTime<Utc>>,
    text: String,
    link: Option<String>,
}

impl From<&Message> for MessageSummary {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id().to_string(),
            level: message.level(),
            time: message.time().copied(),
            text: message.text().to_string(),
            link: message.link().map(str::to_string),
        }
    }
}

#[derive(Serialize)]
struct NodeOutput<'a> {
    chain: &'a [String],
    node: NodeSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeSummary {
    id: String,
    kind: NodeKind,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    times: Option<Times>,
    /// Absent while the children sit in an unloaded split file
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<Vec<NodeSummary>>,
}

impl NodeSummary {
    fn build(node: &Node) -> Result<Self> {
        let children = match node.children()? {
            Some(children) => Some(
                children
                    .iter()
                    .map(NodeSummary::build)
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };
        Ok(Self {
            id: node.id().to_string(),
            kind: node.kind(),
            name: node.name().to_string(),
            status: node.status(),
            times: node.times().cloned(),
            children,
        })
    }
}
