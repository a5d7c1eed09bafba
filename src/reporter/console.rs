//! Console reporter with colored output

use crate::error::Result;
use crate::model::{format_date_time, format_time, Keyword, Message, Node, Suite, Test};
use crate::report::ReportData;
use crate::stats::{StatisticRow, TagStat};
use crate::{MessageLevel, Status};
use colored::{ColoredString, Colorize};
use std::fmt::Write;
use std::rc::Rc;

const BAR_WIDTH: usize = 20;
const INDENT: &str = "  ";

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show documentation and metadata
    verbose: bool,
    /// Messages below this level are hidden
    min_level: MessageLevel,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
            min_level: MessageLevel::Info,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn min_level(mut self, level: MessageLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Print the summary, suite outline and statistics of a report
    pub fn report(&self, report: &ReportData, combined: &[TagStat]) -> Result<()> {
        print!("{}", self.render_report(report, combined)?);
        Ok(())
    }

    /// Print tests found by a search
    pub fn report_tests(&self, title: &str, tests: &[Rc<Test>]) -> Result<()> {
        print!("{}", self.render_tests(title, tests)?);
        Ok(())
    }

    /// Print execution errors
    pub fn report_errors(&self, errors: &[Rc<Message>]) {
        print!("{}", self.render_errors(errors));
    }

    /// Print a node with its loaded descendants
    pub fn report_node(&self, node: &Node, chain: &[String]) -> Result<()> {
        print!("{}", self.render_node(node, chain)?);
        Ok(())
    }

    pub fn render_report(&self, report: &ReportData, combined: &[TagStat]) -> Result<String> {
        let mut out = String::new();
        let root = report.suite()?;
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.bold(&format!("Test Report: {}", root.name())));
        let _ = writeln!(
            out,
            "{}Generated: {} | Source: {}",
            INDENT,
            format_date_time(report.generated().as_ref()),
            if root.source().is_empty() { "N/A" } else { root.source() }
        );
        let stats = root.statistics();
        let _ = writeln!(
            out,
            "{}Status: {} | Tests: {} total, {} passed, {} failed | Elapsed: {}",
            INDENT,
            self.status(root.status()),
            stats.total,
            stats.passed,
            stats.failed,
            root.times().elapsed_time()
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "{}", self.bold("Suites:"));
        self.write_suite(&mut out, &root, 1)?;
        let _ = writeln!(out);

        let statistics = report.statistics()?;
        let total: Vec<&StatisticRow> = statistics.total.iter().map(|s| &s.row).collect();
        self.write_table(&mut out, "Total Statistics", &total);
        let mut tags: Vec<(&StatisticRow, String)> = statistics
            .tag
            .iter()
            .chain(combined)
            .map(|s| (&s.row, s.shown_info()))
            .collect();
        if !tags.is_empty() {
            tags.sort_by_key(|(_, info)| !info.is_empty());
            let rows: Vec<&StatisticRow> = tags.iter().map(|(row, _)| *row).collect();
            self.write_table(&mut out, "Statistics by Tag", &rows);
        }
        let suites: Vec<&StatisticRow> = statistics.suite.iter().map(|s| &s.row).collect();
        self.write_table(&mut out, "Statistics by Suite", &suites);

        let errors = report.errors()?;
        if !errors.is_empty() {
            let _ = writeln!(
                out,
                "{}{} {} execution error(s) (use --errors to show)",
                INDENT,
                self.paint_level("!", MessageLevel::Error),
                errors.len()
            );
        }
        Ok(out)
    }

    pub fn render_tests(&self, title: &str, tests: &[Rc<Test>]) -> Result<String> {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", self.bold(title), tests.len());
        for test in tests {
            let _ = writeln!(
                out,
                "{}{} {} {}",
                INDENT,
                self.status(test.status()),
                test.full_name(),
                self.dimmed(&format!("[{}]", test.id()))
            );
            if !test.tags().is_empty() {
                let _ = writeln!(out, "{}{}tags: {}", INDENT, INDENT, test.tags().join(", "));
            }
            let message = test.message()?;
            if !message.is_empty() {
                let _ = writeln!(out, "{}{}{}", INDENT, INDENT, message);
            }
        }
        Ok(out)
    }

    pub fn render_errors(&self, errors: &[Rc<Message>]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({})", self.bold("Execution Errors"), errors.len());
        for message in errors {
            let _ = write!(
                out,
                "{}{} {} {}",
                INDENT,
                self.dimmed(&message.date_time()),
                self.paint_level(&message.level().to_string(), message.level()),
                message.text()
            );
            match message.link() {
                Some(link) => {
                    let _ = writeln!(out, " {}", self.dimmed(&format!("-> {}", link)));
                }
                None => {
                    let _ = writeln!(out);
                }
            }
        }
        out
    }

    pub fn render_node(&self, node: &Node, chain: &[String]) -> Result<String> {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", self.bold("Path:"), chain.join(" > "));
        match node {
            Node::Suite(suite) => {
                let _ = writeln!(
                    out,
                    "{} SUITE {} {}",
                    self.status(suite.status()),
                    suite.full_name(),
                    self.dimmed(&suite.times().elapsed_time())
                );
                self.write_doc(&mut out, suite.doc()?, 1);
                for (key, value) in suite.metadata() {
                    let _ = writeln!(out, "{}{}: {}", INDENT, key, value);
                }
                self.write_status_message(&mut out, suite.message()?, 1);
                for keyword in suite.keywords()? {
                    self.write_keyword(&mut out, keyword, 1)?;
                }
                self.write_suite(&mut out, suite, 1)?;
            }
            Node::Test(test) => self.write_test_detail(&mut out, test)?,
            Node::Keyword(keyword) => self.write_keyword(&mut out, keyword, 0)?,
            Node::Message(message) => self.write_message(&mut out, message, 0),
        }
        Ok(out)
    }

    fn write_suite(&self, out: &mut String, suite: &Suite, depth: usize) -> Result<()> {
        let indent = INDENT.repeat(depth);
        let stats = suite.statistics();
        let _ = writeln!(
            out,
            "{}{} {} {}",
            indent,
            self.status(suite.status()),
            self.bold(suite.name()),
            self.dimmed(&format!("({}/{} passed)", stats.passed, stats.total))
        );
        if self.verbose {
            self.write_doc(out, suite.doc()?, depth + 1);
        }
        for child in suite.suites()? {
            self.write_suite(out, child, depth + 1)?;
        }
        for test in suite.tests()? {
            let _ = writeln!(
                out,
                "{}{}{} {} {}",
                indent,
                INDENT,
                self.status(test.status()),
                test.name(),
                self.dimmed(&test.times().elapsed_time())
            );
            if test.status() == Status::Fail {
                self.write_status_message(out, test.message()?, depth + 2);
            }
        }
        Ok(())
    }

    fn write_test_detail(&self, out: &mut String, test: &Rc<Test>) -> Result<()> {
        let _ = writeln!(
            out,
            "{} TEST {} {}",
            self.status(test.status()),
            test.full_name(),
            self.dimmed(&test.times().elapsed_time())
        );
        self.write_doc(out, test.doc()?, 1);
        if !test.tags().is_empty() {
            let _ = writeln!(out, "{}tags: {}", INDENT, test.tags().join(", "));
        }
        if let Some(timeout) = test.timeout().filter(|t| !t.is_empty()) {
            let _ = writeln!(out, "{}timeout: {}", INDENT, timeout);
        }
        let _ = writeln!(
            out,
            "{}critical: {}",
            INDENT,
            if test.is_critical() { "yes" } else { "no" }
        );
        self.write_status_message(out, test.message()?, 1);
        match test.keywords()? {
            Some(keywords) => {
                for keyword in keywords {
                    self.write_keyword(out, keyword, 1)?;
                }
            }
            None => self.write_unloaded(out, test.split_file(), 1),
        }
        Ok(())
    }

    fn write_keyword(&self, out: &mut String, keyword: &Keyword, depth: usize) -> Result<()> {
        let indent = INDENT.repeat(depth);
        let _ = writeln!(
            out,
            "{}{} {} {} {} {}",
            indent,
            self.status(keyword.status()),
            self.dimmed(&keyword.kw_type().to_string()),
            keyword.name(),
            keyword.arguments(),
            self.dimmed(&keyword.times().elapsed_time())
        );
        if self.verbose {
            self.write_doc(out, keyword.doc()?, depth + 1);
        }
        match keyword.keywords()? {
            Some(children) => {
                for child in children {
                    self.write_keyword(out, child, depth + 1)?;
                }
            }
            None => self.write_unloaded(out, keyword.split_file(), depth + 1),
        }
        for message in keyword.messages()? {
            self.write_message(out, message, depth + 1);
        }
        Ok(())
    }

    fn write_message(&self, out: &mut String, message: &Message, depth: usize) {
        if message.level() < self.min_level {
            return;
        }
        let _ = writeln!(
            out,
            "{}{} {} {}",
            INDENT.repeat(depth),
            self.dimmed(&format_time(message.time())),
            self.paint_level(&message.level().to_string(), message.level()),
            message.text()
        );
    }

    fn write_unloaded(&self, out: &mut String, split_file: Option<&str>, depth: usize) {
        let _ = writeln!(
            out,
            "{}{}",
            INDENT.repeat(depth),
            self.dimmed(&format!(
                "keywords not loaded ({})",
                split_file.unwrap_or("unknown file")
            ))
        );
    }

    fn write_doc(&self, out: &mut String, doc: &str, depth: usize) {
        if !doc.is_empty() {
            let _ = writeln!(out, "{}{}", INDENT.repeat(depth), self.italic(doc));
        }
    }

    fn write_status_message(&self, out: &mut String, message: &str, depth: usize) {
        let indent = INDENT.repeat(depth);
        for line in message.lines().filter(|l| !l.is_empty()) {
            let _ = writeln!(out, "{}{} {}", indent, self.dimmed("→"), line);
        }
    }

    fn write_table(&self, out: &mut String, title: &str, rows: &[&StatisticRow]) {
        let _ = writeln!(out, "{}", self.bold(&format!("{}:", title)));
        let width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);
        for row in rows {
            let _ = writeln!(
                out,
                "{}{:<width$}  {:>5} {:>5} {:>5}  {} {:>5.1}%",
                INDENT,
                row.label,
                row.pass,
                row.fail,
                row.skip,
                self.bar(row),
                row.pass_percent,
                width = width
            );
        }
        let _ = writeln!(out);
    }

    fn bar(&self, row: &StatisticRow) -> String {
        let cells = |width: f64| (width * BAR_WIDTH as f64 / 100.0).round() as usize;
        let pass = cells(row.pass_width);
        let fail = cells(row.fail_width).min(BAR_WIDTH - pass);
        let skip = cells(row.skip_width).min(BAR_WIDTH - pass - fail);
        let empty = BAR_WIDTH - pass - fail - skip;
        format!(
            "[{}{}{}{}]",
            self.paint("█".repeat(pass), |s| s.green()),
            self.paint("█".repeat(fail), |s| s.red()),
            self.paint("█".repeat(skip), |s| s.yellow()),
            "░".repeat(empty)
        )
    }

    fn status(&self, status: Status) -> String {
        let label = format!("{:<7}", status.to_string());
        match status {
            Status::Pass => self.paint(label, |s| s.green()),
            Status::Fail => self.paint(label, |s| s.red().bold()),
            Status::NotRun => self.paint(label, |s| s.yellow()),
        }
    }

    fn paint_level(&self, text: &str, level: MessageLevel) -> String {
        match level {
            MessageLevel::Error | MessageLevel::Fail => self.paint(text.to_string(), |s| s.red()),
            MessageLevel::Warn => self.paint(text.to_string(), |s| s.yellow()),
            MessageLevel::Info => self.paint(text.to_string(), |s| s.blue()),
            MessageLevel::Debug | MessageLevel::Trace => {
                self.paint(text.to_string(), |s| s.dimmed())
            }
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(text.to_string(), |s| s.bold())
    }

    fn dimmed(&self, text: &str) -> String {
        self.paint(text.to_string(), |s| s.dimmed())
    }

    fn italic(&self, text: &str) -> String {
        self.paint(text.to_string(), |s| s.italic())
    }

    fn paint(&self, text: String, style: impl FnOnce(String) -> ColoredString) -> String {
        if self.use_colors {
            style(text).to_string()
        } else {
            text
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RequestQueue;

    const REPORT: &str = r#"{
        "version": 2,
        "generatedMillis": 0,
        "baseMillis": 1700000000000,
        "strings": ["*", "*Root", "*Pass Me", "*Fail Me", "*smoke", "*hello", "*Log", "*it broke", "*chatter", "*s1-t2-k1"],
        "suite": [1, 0, 0, 0, [], [0, 0, 40], [],
                  [[2, 0, 1, 0, [4], [1, 0, 10], []],
                   [3, 0, 1, 0, [], [0, 10, 10, 7],
                    [[0, 6, 0, 0, 5, [0, 10, 5], [], [[10, 2, 5], [11, 1, 8]]]]]],
                  [], [2, 1, 2, 1]],
        "stats": [[["Critical Tests", 1, 1], ["All Tests", 1, 1]], [["smoke", 1, 0]], [["Root", 1, 1, 0, "s1", "Root"]]],
        "errors": [[0, 4, 7, 9]]
    }"#;

    fn load() -> ReportData {
        ReportData::from_json(REPORT, RequestQueue::new()).unwrap()
    }

    fn reporter() -> ConsoleReporter {
        ConsoleReporter::new().without_colors()
    }

    #[test]
    fn test_report_outline_and_tables() {
        let report = load();
        let out = reporter().render_report(&report, &[]).unwrap();
        assert!(out.contains("Test Report: Root"));
        assert!(out.contains("2 total, 1 passed, 1 failed"));
        assert!(out.contains("PASS    Pass Me"));
        assert!(out.contains("FAIL    Fail Me"));
        assert!(out.contains("→ it broke"));
        assert!(out.contains("Statistics by Tag:"));
        assert!(out.contains("[██████████"));
        assert!(out.contains("1 execution error(s)"));
    }

    #[test]
    fn test_combined_rows_follow_plain_tags() {
        let report = load();
        let combined = report.combined_tag_stat("smoke OR nothing", Some("Any")).unwrap();
        let out = reporter().render_report(&report, &[combined]).unwrap();
        let smoke = out.find("smoke ").unwrap();
        let any = out.find("Any").unwrap();
        assert!(smoke < any);
    }

    #[test]
    fn test_node_detail_filters_messages() {
        let report = load();
        let test = report.suite().unwrap().test(1).unwrap().unwrap();
        let chain = vec!["s1".to_string(), "s1-t2".to_string()];
        let out = reporter().render_node(&Node::Test(test), &chain).unwrap();
        assert!(out.starts_with("Path: s1 > s1-t2"));
        assert!(out.contains("KEYWORD Log hello"));
        assert!(out.contains("INFO hello"));
        assert!(!out.contains("chatter"));

        let test = report.suite().unwrap().test(1).unwrap().unwrap();
        let out = reporter()
            .min_level(MessageLevel::Debug)
            .render_node(&Node::Test(test), &chain)
            .unwrap();
        assert!(out.contains("DEBUG chatter"));
    }

    #[test]
    fn test_errors_and_search_results() {
        let report = load();
        let out = reporter().render_errors(report.errors().unwrap());
        assert!(out.contains("ERROR it broke"));
        assert!(out.contains("-> s1-t2-k1"));

        let tests = report.search_by_tag("smoke").unwrap();
        let out = reporter().render_tests("Tag: smoke", &tests).unwrap();
        assert!(out.contains("Tag: smoke (1)"));
        assert!(out.contains("Root.Pass Me"));
        assert!(out.contains("tags: smoke"));
    }
}
