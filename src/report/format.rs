//! Positional projection of provider rows into named records

use std::cmp::Ordering;

use serde::Serialize;
use tracing::warn;

use super::models::{
    CampaignPerformance, ConversionCardRow, FormattedRow, Metric, PageViewRow, RawReportRow,
    ReportKind, TrafficSourceRow,
};
use super::query::schema_for;

/// Ads cost fields are reported in millionths of the account currency
pub const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Half of a raw row a count mismatch was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSection {
    Dimensions,
    Metrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowIssueKind {
    /// Fewer values than the schema declares; missing fields are `None`
    ShortRow {
        section: RowSection,
        expected: usize,
        found: usize,
    },
    /// More values than the schema declares; extras are ignored
    LongRow {
        section: RowSection,
        expected: usize,
        found: usize,
    },
    /// Metric text that did not parse; the field holds NaN
    NonNumeric { field: &'static str, raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row: usize,
    #[serde(flatten)]
    pub kind: RowIssueKind,
}

/// Formatter output: one record per input row plus any flagged problems
#[derive(Debug, Clone, Default, Serialize)]
pub struct Formatted<T> {
    pub rows: Vec<T>,
    pub issues: Vec<RowIssue>,
}

impl<T> Formatted<T> {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Formatted<U> {
        Formatted {
            rows: self.rows.into_iter().map(f).collect(),
            issues: self.issues,
        }
    }
}

/// Cursor over one raw row that records issues as fields are read
struct RowReader<'a> {
    index: usize,
    row: &'a RawReportRow,
    metric_names: &'static [&'static str],
    issues: &'a mut Vec<RowIssue>,
}

impl RowReader<'_> {
    fn dimension(&self, position: usize) -> Option<String> {
        self.row.dimension_values.get(position).cloned()
    }

    fn metric(&mut self, position: usize) -> Option<Metric> {
        let raw = self.row.metric_values.get(position)?;
        let metric = Metric::parse(raw);
        if !metric.is_valid() {
            self.issues.push(RowIssue {
                row: self.index,
                kind: RowIssueKind::NonNumeric {
                    field: self.metric_names.get(position).copied().unwrap_or("unknown"),
                    raw: raw.clone(),
                },
            });
        }
        Some(metric)
    }
}

/// Project `rows` through the fixed schema of `kind`.
///
/// Never fails: short rows leave trailing fields `None`, unparseable
/// metrics become NaN, and both are reported in `issues`.
pub fn format_rows(rows: &[RawReportRow], kind: ReportKind) -> Formatted<FormattedRow> {
    match kind {
        ReportKind::PageViews => format_page_views(rows).map(FormattedRow::PageView),
        ReportKind::TrafficSource => format_traffic_sources(rows).map(FormattedRow::TrafficSource),
        ReportKind::ConversionCard => {
            format_conversion_card(rows).map(FormattedRow::ConversionCard)
        }
        ReportKind::CampaignPerformance => format_campaigns(rows).map(FormattedRow::Campaign),
    }
}

pub fn format_page_views(rows: &[RawReportRow]) -> Formatted<PageViewRow> {
    project(rows, ReportKind::PageViews, |r| PageViewRow {
        date: r.dimension(0),
        page_path: r.dimension(1),
        page_views: r.metric(0),
        active_users: r.metric(1),
    })
}

pub fn format_traffic_sources(rows: &[RawReportRow]) -> Formatted<TrafficSourceRow> {
    project(rows, ReportKind::TrafficSource, |r| TrafficSourceRow {
        source: r.dimension(0),
        medium: r.dimension(1),
        sessions: r.metric(0),
        total_users: r.metric(1),
        new_users: r.metric(2),
    })
}

pub fn format_conversion_card(rows: &[RawReportRow]) -> Formatted<ConversionCardRow> {
    project(rows, ReportKind::ConversionCard, |r| ConversionCardRow {
        date: r.dimension(0),
        source: r.dimension(1),
        medium: r.dimension(2),
        device_category: r.dimension(3),
        event_name: r.dimension(4),
        campaign_name: r.dimension(5),
        manual_term: r.dimension(6),
        event_count: r.metric(0),
        sessions: r.metric(1),
        users: r.metric(2),
    })
}

pub fn format_campaigns(rows: &[RawReportRow]) -> Formatted<CampaignPerformance> {
    project(rows, ReportKind::CampaignPerformance, |r| CampaignPerformance {
        campaign_id: r.dimension(0),
        campaign_name: r.dimension(1),
        impressions: r.metric(0),
        clicks: r.metric(1),
        cost: r.metric(2).map(|micros| micros.scaled_down(MICROS_PER_UNIT)),
        conversions: r.metric(3),
    })
}

fn project<T, F>(rows: &[RawReportRow], kind: ReportKind, mut build: F) -> Formatted<T>
where
    F: FnMut(&mut RowReader<'_>) -> T,
{
    let schema = schema_for(kind);
    let mut issues = Vec::new();

    let rows = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let sections = [
                (RowSection::Dimensions, schema.dimensions.len(), row.dimension_values.len()),
                (RowSection::Metrics, schema.metrics.len(), row.metric_values.len()),
            ];
            for (section, expected, found) in sections {
                let issue = match found.cmp(&expected) {
                    Ordering::Less => RowIssueKind::ShortRow {
                        section,
                        expected,
                        found,
                    },
                    Ordering::Greater => RowIssueKind::LongRow {
                        section,
                        expected,
                        found,
                    },
                    Ordering::Equal => continue,
                };
                issues.push(RowIssue {
                    row: index,
                    kind: issue,
                });
            }

            let mut reader = RowReader {
                index,
                row,
                metric_names: schema.metrics,
                issues: &mut issues,
            };
            build(&mut reader)
        })
        .collect();

    if !issues.is_empty() {
        warn!(
            report = kind.name(),
            issue_count = issues.len(),
            first = ?issues.first(),
            "provider rows did not match the expected schema"
        );
    }

    Formatted { rows, issues }
}
