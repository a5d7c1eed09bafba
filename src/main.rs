//! Logview: compact test report viewer CLI

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use logview::config::{load_config, Config};
use logview::loader::RequestQueue;
use logview::reporter::{ConsoleReporter, HtmlReporter, JsonReporter};
use logview::stats::TagStat;
use logview::watcher::ReportWatcher;
use logview::{Node, ReportData, SplitFileLoader, Test};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Logview: browse compact test-execution reports
#[derive(Parser, Debug)]
#[command(name = "logview")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Report payload (JSON) to read
    report: PathBuf,

    /// Output as JSON
    #[arg(long, short)]
    json: bool,

    /// Also write a self-contained HTML report to FILE
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    /// List tests matching a tag query (e.g. "smoke AND NOT slow")
    #[arg(long, value_name = "QUERY")]
    tag: Option<String>,

    /// List tests whose name or full name matches a wildcard pattern
    #[arg(long, value_name = "PATTERN")]
    name: Option<String>,

    /// Show one node by id (e.g. s1-s2-t1-k3), loading split files as needed
    #[arg(long, value_name = "ID")]
    path: Option<String>,

    /// Show execution errors
    #[arg(long)]
    errors: bool,

    /// Watch the report and its split files and re-render on change
    #[arg(long)]
    watch: bool,

    /// Path to config file (default: search .logviewrc.json next to the report and in parents)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output (documentation in the outline, debug logging)
    #[arg(long, short)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "logview=debug" } else { "logview=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<ExitCode> {
    let report_dir = report_dir(&args.report);
    let config = load_config(report_dir, args.config.as_deref())?
        .merge_with_cli(args.no_color, None);
    if !config.colors() {
        colored::control::set_override(false);
    }

    if args.watch {
        return run_watch(args, &config);
    }

    render(args, &config)?;
    Ok(ExitCode::SUCCESS)
}

fn report_dir(report: &Path) -> &Path {
    match report.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// A loaded report together with the pump that feeds it split files
struct Session {
    report: ReportData,
    queue: RequestQueue,
    split_dir: PathBuf,
}

impl Session {
    fn open(path: &Path, config: &Config) -> Result<Self> {
        let queue = RequestQueue::new();
        let report = ReportData::from_path(path, queue.clone())
            .with_context(|| format!("Failed to load report: {}", path.display()))?;
        let split_dir = config.split_dir(report_dir(path));
        debug!(split_dir = %split_dir.display(), "report opened");
        Ok(Self {
            report,
            queue,
            split_dir,
        })
    }

    fn loader(&self) -> &SplitFileLoader {
        self.report.loader()
    }

    /// Serve every queued split-file request from the split directory
    fn pump(&self) -> Result<usize> {
        self.queue
            .serve_from_dir(self.loader(), &self.split_dir)
            .with_context(|| format!("Failed to load split file from {}", self.split_dir.display()))
    }

    /// Id chain to `id`, loading split files on the way
    fn resolve(&self, id: &str) -> Result<Vec<String>> {
        let outcome = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&outcome);
        self.report
            .ensure_loaded(id, move |result| *slot.borrow_mut() = Some(result))?;
        self.pump()?;
        let result = outcome
            .borrow_mut()
            .take()
            .ok_or_else(|| anyhow!("Split files needed for {} never arrived", id))?;
        Ok(result?)
    }

    /// Load the keywords below `node`, including those stored in split files
    fn load_keywords(&self, node: &Node) -> Result<()> {
        let mut pending = vec![node.clone()];
        while let Some(node) = pending.pop() {
            node.call_when_children_ready(|| {});
            self.pump()?;
            if let Some(children) = node.children()? {
                pending.extend(
                    children
                        .into_iter()
                        .filter(|c| matches!(c, Node::Keyword(_))),
                );
            }
        }
        Ok(())
    }

    fn combined_tags(&self, config: &Config) -> Result<Vec<TagStat>> {
        config
            .combined_tags
            .iter()
            .map(|tag| {
                self.report
                    .combined_tag_stat(&tag.pattern, tag.name.as_deref())
                    .with_context(|| format!("Failed to compute combined tag {}", tag.pattern))
            })
            .collect()
    }
}

fn render(args: &Args, config: &Config) -> Result<()> {
    let session = Session::open(&args.report, config)?;
    let report = &session.report;
    let combined = session.combined_tags(config)?;

    let mut console = ConsoleReporter::new().min_level(config.min_level());
    if !config.colors() {
        console = console.without_colors();
    }
    if args.verbose {
        console = console.verbose();
    }
    let json = JsonReporter::new().pretty();

    if let Some(id) = &args.path {
        let chain = session.resolve(id)?;
        let node = chain
            .last()
            .and_then(|last| report.find_loaded(last))
            .ok_or_else(|| anyhow!("No node found at {}", id))?;
        if node.id() != id {
            eprintln!(
                "{}: {} not found, showing {}",
                "Warning".yellow(),
                id,
                node.id()
            );
        }
        session.load_keywords(&node)?;
        if args.json {
            println!("{}", json.report_node(&node, &chain)?);
        } else {
            console.report_node(&node, &chain)?;
        }
    } else if args.tag.is_some() || args.name.is_some() {
        let tag = args.tag.as_deref();
        let name = args.name.as_deref();
        let tests = report.suite()?.search_tests(&|t: &Test| {
            tag.map_or(true, |q| t.matches_tag_pattern(q))
                && name.map_or(true, |p| t.matches_name_pattern(p))
        })?;
        if args.json {
            println!("{}", json.report_tests(&tests)?);
        } else {
            console.report_tests(&search_title(tag, name), &tests)?;
        }
    } else if args.errors {
        let errors = report.errors()?;
        if args.json {
            println!("{}", json.report_errors(errors)?);
        } else {
            console.report_errors(errors);
        }
    } else if args.json {
        println!("{}", json.report(report, &combined)?);
    } else {
        console.report(report, &combined)?;
    }

    if let Some(html_path) = &args.html {
        let html = HtmlReporter::new().report(report, &combined)?;
        std::fs::write(html_path, html)
            .with_context(|| format!("Failed to write HTML report to {}", html_path.display()))?;
        eprintln!("{}: HTML report written to {}", "Info".blue(), html_path.display());
    }
    Ok(())
}

fn search_title(tag: Option<&str>, name: Option<&str>) -> String {
    match (tag, name) {
        (Some(tag), Some(name)) => format!("Tests tagged {} named {}", tag, name),
        (Some(tag), None) => format!("Tests tagged {}", tag),
        (None, Some(name)) => format!("Tests named {}", name),
        (None, None) => "Tests".to_string(),
    }
}

fn run_watch(args: &Args, config: &Config) -> Result<ExitCode> {
    let split_dir = config.split_dir(report_dir(&args.report));
    let watcher =
        ReportWatcher::watch(&args.report, &split_dir).context("Failed to create file watcher")?;

    if let Err(e) = render(args, config) {
        eprintln!("{}: {:#}", "Error".red(), e);
    }
    eprintln!("{}: Watching for changes... (Ctrl+C to stop)", "Info".blue());

    loop {
        let paths = watcher.next_changes();
        if paths.is_empty() {
            continue;
        }
        debug!(?paths, "re-rendering");
        println!("{}", "─".repeat(60));
        if let Err(e) = render(args, config) {
            eprintln!("{}: {:#}", "Error".red(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_title() {
        assert_eq!(search_title(Some("smoke"), None), "Tests tagged smoke");
        assert_eq!(search_title(None, Some("Log*")), "Tests named Log*");
        assert_eq!(
            search_title(Some("a"), Some("b")),
            "Tests tagged a named b"
        );
    }

    #[test]
    fn test_report_dir_of_bare_file_name() {
        assert_eq!(report_dir(Path::new("output.json")), Path::new("."));
        assert_eq!(report_dir(Path::new("out/output.json")), Path::new("out"));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "logview",
            "output.json",
            "--tag",
            "smoke",
            "--no-color",
            "--html",
            "r.html",
        ])
        .unwrap();
        assert_eq!(args.tag.as_deref(), Some("smoke"));
        assert!(args.no_color);
        assert_eq!(args.html, Some(PathBuf::from("r.html")));
    }
}
