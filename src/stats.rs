//! Pass/fail/skip statistics with display percentages and bar widths
//!
//! Percentages and widths are computed in integer tenths so that clamping and
//! shaving are exact; they are exposed as `f64` with one decimal.

use crate::error::{Error, Result};
use crate::raw::Raw;
use serde::Serialize;

const TENTHS: i64 = 1000;
const CRITICAL_LABEL: &str = "Critical Tests";

const PASS: usize = 0;
const FAIL: usize = 1;
const SKIP: usize = 2;
/// Order in which tied categories give up width
const SHAVE_ORDER: [usize; 3] = [PASS, SKIP, FAIL];

/// One statistics row with its derived display values
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticRow {
    pub label: String,
    pub pass: u64,
    pub fail: u64,
    pub skip: u64,
    pub total: u64,
    pub pass_percent: f64,
    pub fail_percent: f64,
    pub skip_percent: f64,
    pub pass_width: f64,
    pub fail_width: f64,
    pub skip_width: f64,
}

impl StatisticRow {
    pub fn new(label: impl Into<String>, pass: u64, fail: u64, skip: u64) -> Self {
        let counts = [pass, fail, skip];
        let percents = percents(counts);
        let widths = widths(percents);
        Self {
            label: label.into(),
            pass,
            fail,
            skip,
            total: row_total(counts),
            pass_percent: tenths(percents[PASS]),
            fail_percent: tenths(percents[FAIL]),
            skip_percent: tenths(percents[SKIP]),
            pass_width: tenths(widths[PASS]),
            fail_width: tenths(widths[FAIL]),
            skip_width: tenths(widths[SKIP]),
        }
    }
}

/// Row for the given counts; shorthand for [`StatisticRow::new`]
pub fn compute_row(label: impl Into<String>, pass: u64, fail: u64, skip: u64) -> StatisticRow {
    StatisticRow::new(label, pass, fail, skip)
}

fn tenths(value: i64) -> f64 {
    value as f64 / 10.0
}

/// Sum of the counts, saturating at `u64::MAX`
fn row_total(counts: [u64; 3]) -> u64 {
    counts.iter().fold(0u64, |acc, &c| acc.saturating_add(c))
}

fn percents(counts: [u64; 3]) -> [i64; 3] {
    let total = row_total(counts);
    if total == 0 {
        return [0; 3];
    }
    counts.map(|count| percent_tenths(count, total))
}

fn percent_tenths(count: u64, total: u64) -> i64 {
    if count == 0 {
        return 0;
    }
    let exact = 100.0 * count as f64 / total as f64;
    let rounded = (exact * 10.0).round() as i64;
    if rounded < 1 {
        1
    } else if rounded >= TENTHS && count < total {
        TENTHS - 1
    } else {
        rounded
    }
}

fn widths(percents: [i64; 3]) -> [i64; 3] {
    let mut widths = percents.map(|p| if p > 0 && p < 10 { 10 } else { p });
    while widths.iter().sum::<i64>() > TENTHS {
        let largest = widths.iter().copied().max().unwrap_or(0);
        if let Some(&index) = SHAVE_ORDER.iter().find(|&&i| widths[i] == largest) {
            widths[index] -= 1;
        }
    }
    widths
}

/// Kind of a total statistics row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalKind {
    Critical,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStat {
    pub kind: TotalKind,
    #[serde(flatten)]
    pub row: StatisticRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagStat {
    #[serde(flatten)]
    pub row: StatisticRow,
    pub doc: String,
    pub links: Vec<Link>,
    /// Tag query of a combined statistic
    pub combined: Option<String>,
    pub info: Option<String>,
}

impl TagStat {
    /// `(info)` or nothing
    pub fn shown_info(&self) -> String {
        match self.info.as_deref() {
            Some(info) if !info.is_empty() => format!("({})", info),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteStat {
    #[serde(flatten)]
    pub row: StatisticRow,
    pub id: Option<String>,
    pub name: String,
}

impl SuiteStat {
    pub fn full_name(&self) -> &str {
        &self.row.label
    }

    /// Ancestor part of the full name with spaced separators, e.g. `Root . `
    pub fn parent_name(&self) -> String {
        let label = &self.row.label;
        let parent = label.strip_suffix(self.name.as_str()).unwrap_or("");
        parent.replace('.', " . ")
    }
}

/// Total, per-tag and per-suite statistics of a report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total: Vec<TotalStat>,
    pub tag: Vec<TagStat>,
    pub suite: Vec<SuiteStat>,
}

impl Statistics {
    /// Parse `[totalRows, tagRows, suiteRows]`
    pub fn from_raw(raw: &Raw) -> Result<Self> {
        let tables = raw.element("statistics")?;
        Ok(Self {
            total: rows(tables.get(0)?, total_stat)?,
            tag: rows(tables.get(1)?, tag_stat)?,
            suite: rows(tables.get(2)?, suite_stat)?,
        })
    }
}

fn rows<T>(table: &Raw, parse: fn(&[Raw]) -> Result<T>) -> Result<Vec<T>> {
    table
        .as_list("statistics table")?
        .iter()
        .map(|row| parse(row.as_list("statistics row")?))
        .collect()
}

fn base_row(items: &[Raw]) -> Result<StatisticRow> {
    let label = match items.first() {
        Some(raw) => raw.as_str("statistics label")?.to_string(),
        None => return Err(Error::shape("statistics row", "empty row")),
    };
    let pass = count(items, 1)?;
    let fail = count(items, 2)?;
    let skip = match items.get(3) {
        None | Some(Raw::Null) | Some(Raw::Str(_)) => 0,
        Some(_) => count(items, 3)?,
    };
    Ok(StatisticRow::new(label, pass, fail, skip))
}

fn count(items: &[Raw], slot: usize) -> Result<u64> {
    let value = items
        .get(slot)
        .ok_or_else(|| Error::shape("statistics row", format!("missing count in slot {}", slot)))?
        .as_int("statistics count")?;
    u64::try_from(value)
        .map_err(|_| Error::shape("statistics row", format!("negative count {}", value)))
}

fn text(items: &[Raw], slot: usize) -> Result<Option<String>> {
    match items.get(slot) {
        None | Some(Raw::Null) => Ok(None),
        Some(raw) => {
            let value = raw.as_str("statistics text")?;
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
    }
}

fn total_stat(items: &[Raw]) -> Result<TotalStat> {
    let row = base_row(items)?;
    let kind = if row.label == CRITICAL_LABEL {
        TotalKind::Critical
    } else {
        TotalKind::All
    };
    Ok(TotalStat { kind, row })
}

fn tag_stat(items: &[Raw]) -> Result<TagStat> {
    Ok(TagStat {
        row: base_row(items)?,
        doc: text(items, 4)?.unwrap_or_default(),
        links: parse_links(text(items, 5)?.as_deref()),
        combined: text(items, 6)?,
        info: text(items, 7)?,
    })
}

fn suite_stat(items: &[Raw]) -> Result<SuiteStat> {
    let row = base_row(items)?;
    let name = match text(items, 5)? {
        Some(name) => name,
        None => row.label.rsplit('.').next().unwrap_or_default().to_string(),
    };
    Ok(SuiteStat {
        id: text(items, 4)?,
        name,
        row,
    })
}

/// `title:url:::title2:url2`; the url keeps any further colons
pub fn parse_links(links: Option<&str>) -> Vec<Link> {
    let Some(links) = links.filter(|l| !l.is_empty()) else {
        return Vec::new();
    };
    links
        .split(":::")
        .map(|link| match link.split_once(':') {
            Some((title, url)) => Link {
                title: title.to_string(),
                url: url.to_string(),
            },
            None => Link {
                title: link.to_string(),
                url: String::new(),
            },
        })
        .collect()
}
