//! HTML reporter: a self-contained page with statistics tables and the suite outline
//!
//! Statistics are also embedded as JSON so the page can be scraped without
//! parsing the markup.

use crate::error::Result;
use crate::model::{format_date_time, Suite};
use crate::report::ReportData;
use crate::stats::{StatisticRow, TagStat};
use crate::Status;
use std::fmt::Write;

/// Escapes text for HTML element content and attribute values
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes serialized JSON for embedding inside a script block
fn escape_json_for_script(s: &str) -> String {
    s.replace("</script>", "<\\/script>")
}

fn status_class(status: Status) -> &'static str {
    match status {
        Status::Pass => "pass",
        Status::Fail => "fail",
        Status::NotRun => "skip",
    }
}

/// Reporter that generates a self-contained HTML page
pub struct HtmlReporter;

impl HtmlReporter {
    pub fn new() -> Self {
        Self
    }

    /// Generate the full HTML report
    pub fn report(&self, report: &ReportData, combined: &[TagStat]) -> Result<String> {
        let root = report.suite()?;
        let statistics = report.statistics()?;

        let mut html = String::with_capacity(16_384);
        html.push_str(Self::template_head());
        let _ = writeln!(
            html,
            "<header><h1>{}</h1><span class=\"meta\">Generated {}</span></header>",
            escape_html(root.name()),
            escape_html(&format_date_time(report.generated().as_ref()))
        );

        html.push_str("<main>\n");
        let total: Vec<&StatisticRow> = statistics.total.iter().map(|s| &s.row).collect();
        Self::push_table(&mut html, "Total Statistics", &total, &[]);
        let tags: Vec<&TagStat> = statistics.tag.iter().chain(combined).collect();
        let rows: Vec<&StatisticRow> = tags.iter().map(|t| &t.row).collect();
        let infos: Vec<String> = tags.iter().map(|t| t.shown_info()).collect();
        Self::push_table(&mut html, "Statistics by Tag", &rows, &infos);
        let suites: Vec<&StatisticRow> = statistics.suite.iter().map(|s| &s.row).collect();
        Self::push_table(&mut html, "Statistics by Suite", &suites, &[]);

        html.push_str("<section><h2>Suites</h2>\n<ul class=\"outline\">\n");
        Self::push_suite(&mut html, &root)?;
        html.push_str("</ul></section>\n</main>\n");

        let data_json = serde_json::to_string(statistics)?;
        html.push_str("<script type=\"application/json\" id=\"statistics\">");
        html.push_str(&escape_json_for_script(&data_json));
        html.push_str("</script>\n</body>\n</html>");
        Ok(html)
    }

    fn push_table(html: &mut String, title: &str, rows: &[&StatisticRow], infos: &[String]) {
        let _ = writeln!(html, "<section><h2>{}</h2>", escape_html(title));
        if rows.is_empty() {
            html.push_str("<p class=\"empty\">No statistics</p></section>\n");
            return;
        }
        html.push_str(
            "<table><thead><tr><th>Name</th><th>Total</th><th>Pass</th><th>Fail</th><th>Skip</th><th>Graph</th></tr></thead><tbody>\n",
        );
        for (i, row) in rows.iter().enumerate() {
            let info = infos.get(i).map(String::as_str).unwrap_or("");
            let _ = writeln!(
                html,
                "<tr><td>{} <span class=\"info\">{}</span></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
                 <td><div class=\"graph\" title=\"{:.1}% / {:.1}% / {:.1}%\">\
                 <b class=\"pass\" style=\"width:{:.1}%\"></b>\
                 <b class=\"fail\" style=\"width:{:.1}%\"></b>\
                 <b class=\"skip\" style=\"width:{:.1}%\"></b></div></td></tr>",
                escape_html(&row.label),
                escape_html(info),
                row.total,
                row.pass,
                row.fail,
                row.skip,
                row.pass_percent,
                row.fail_percent,
                row.skip_percent,
                row.pass_width,
                row.fail_width,
                row.skip_width
            );
        }
        html.push_str("</tbody></table></section>\n");
    }

    fn push_suite(html: &mut String, suite: &Suite) -> Result<()> {
        let _ = write!(
            html,
            "<li id=\"{}\"><span class=\"badge {}\">{}</span> {} <span class=\"elapsed\">{}</span>",
            escape_html(suite.id()),
            status_class(suite.status()),
            suite.status(),
            escape_html(suite.name()),
            suite.times().elapsed_time()
        );
        let children = suite.suites()?;
        let tests = suite.tests()?;
        if !children.is_empty() || !tests.is_empty() {
            html.push_str("\n<ul>\n");
            for child in children {
                Self::push_suite(html, child)?;
            }
            for test in tests {
                let _ = writeln!(
                    html,
                    "<li id=\"{}\" class=\"test\"><span class=\"badge {}\">{}</span> {} <span class=\"elapsed\">{}</span></li>",
                    escape_html(test.id()),
                    status_class(test.status()),
                    test.status(),
                    escape_html(test.name()),
                    test.times().elapsed_time()
                );
            }
            html.push_str("</ul>\n");
        }
        html.push_str("</li>\n");
        Ok(())
    }

    fn template_head() -> &'static str {
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Logview Test Report</title>
<style>
:root{--bg:#0d0d11;--surface:#16161b;--border:#2a2a32;--text:#e4e4e7;--muted:#71717a;--green:#22c55e;--yellow:#eab308;--red:#ef4444}
*{box-sizing:border-box;margin:0;padding:0}
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;background:var(--bg);color:var(--text);line-height:1.5}
header{padding:1.25rem 1.5rem;border-bottom:1px solid var(--border);display:flex;gap:1.5rem;align-items:baseline}
header h1{font-size:1.125rem}
.meta,.info,.elapsed,.empty{color:var(--muted);font-size:.8125rem}
main{padding:1rem 1.5rem;max-width:1100px}
section{margin-bottom:1.5rem}
h2{font-size:.9375rem;margin-bottom:.5rem}
table{width:100%;border-collapse:collapse;background:var(--surface);font-size:.8125rem}
th,td{padding:.35rem .6rem;border-bottom:1px solid var(--border);text-align:left}
.graph{display:flex;width:200px;height:10px;background:var(--border)}
.graph b{display:block;height:100%}
.graph .pass,.badge.pass{background:var(--green)}
.graph .fail,.badge.fail{background:var(--red)}
.graph .skip,.badge.skip{background:var(--yellow)}
.badge{display:inline-block;min-width:4.5em;text-align:center;border-radius:4px;font-size:.6875rem;font-weight:700;color:#000}
.outline,.outline ul{list-style:none;padding-left:1.25rem}
.outline li{margin:.15rem 0}
</style>
</head>
<body>
"##
    }
}

impl Default for HtmlReporter {
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
        "strings": ["*", "*Root & Co", "*Child", "*<T1>", "*T2"],
        "suite": [1, 0, 0, 0, [], [0, 0, 40],
                  [[2, 0, 0, 0, [], [1, 0, 5], [], [[3, 0, 1, 0, [], [1, 0, 5], []]], [], [1, 1, 1, 1]]],
                  [[4, 0, 1, 0, [], [0, 5, 5], []]],
                  [], [2, 1, 2, 1]],
        "stats": [[["Critical Tests", 1, 1], ["All Tests", 1, 1]], [], [["Root & Co", 1, 1]]]
    }"#;

    fn load() -> ReportData {
        ReportData::from_json(REPORT, RequestQueue::new()).unwrap()
    }

    #[test]
    fn test_report_contains_structure() {
        let report = load();
        let html = HtmlReporter::new().report(&report, &[]).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Root &amp; Co</h1>"));
        assert!(html.contains("id=\"s1-s1\""));
        assert!(html.contains("id=\"s1-s1-t1\""));
        assert!(html.contains("&lt;T1&gt;"));
        assert!(html.contains("id=\"s1-t1\""));
        assert!(html.contains("width:50.0%"));
        assert!(html.contains("No statistics"));
        assert!(html.ends_with("</html>"));
    }

    #[test]
    fn test_combined_tag_rows() {
        let report = load();
        let combined = report.combined_tag_stat("*", Some("Everything")).unwrap();
        let html = HtmlReporter::new().report(&report, &[combined]).unwrap();
        assert!(html.contains("Everything <span class=\"info\">(combined)</span>"));
        assert!(!html.contains("No statistics"));
    }

    #[test]
    fn test_escape_json_for_script() {
        assert_eq!(
            escape_json_for_script("</script>alert(1)"),
            "<\\/script>alert(1)"
        );
        assert_eq!(escape_json_for_script("normal"), "normal");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }
}
