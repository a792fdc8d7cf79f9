//! Delimited-text export of formatted rows

use chrono::NaiveDate;
use thiserror::Error;

use super::models::{
    display_date, CampaignPerformance, ConversionCardRow, Metric, PageViewRow, TrafficSourceRow,
};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export column '{0}'")]
    UnknownColumn(String),

    #[error("{columns} columns but {headers} header labels")]
    HeaderMismatch { columns: usize, headers: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output was not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Column lookup by field name for exportable rows
pub trait ExportRecord {
    /// Field value as text, `None` when the column does not exist.
    /// Absent values render as an empty string.
    fn field(&self, column: &str) -> Option<String>;
}

pub const CONVERSION_CARD_COLUMNS: &[&str] = &[
    "date",
    "source",
    "medium",
    "deviceCategory",
    "eventName",
    "campaignName",
    "manualTerm",
    "eventCount",
    "sessions",
    "users",
];

pub const CONVERSION_CARD_HEADERS: &[&str] = &[
    "Date",
    "Source",
    "Medium",
    "Device Category",
    "Event",
    "Campaign",
    "Manual Term",
    "Event Count",
    "Sessions",
    "Users",
];

/// Serialize `rows` as comma-separated text with one header line.
///
/// Rows keep their input order. Lines are separated by `\n` with no
/// trailing newline. Values containing a comma, quote or line break are
/// quoted.
pub fn to_delimited_text<T: ExportRecord>(
    rows: &[T],
    columns: &[&str],
    headers: &[&str],
) -> Result<String, ExportError> {
    if columns.len() != headers.len() {
        return Err(ExportError::HeaderMismatch {
            columns: columns.len(),
            headers: headers.len(),
        });
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        let record = columns
            .iter()
            .map(|column| {
                row.field(column)
                    .ok_or_else(|| ExportError::UnknownColumn((*column).to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(std::io::Error::other(e.to_string())))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// `<report>_<YYYY-MM-DD>.csv`
pub fn export_file_name(report: &str, date: NaiveDate) -> String {
    format!("{report}_{}.csv", date.format("%Y-%m-%d"))
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number(value: &Option<Metric>) -> String {
    value.map(|m| m.value().to_string()).unwrap_or_default()
}

impl ExportRecord for ConversionCardRow {
    fn field(&self, column: &str) -> Option<String> {
        let value = match column {
            "date" => self.date.as_deref().map(display_date).unwrap_or_default(),
            "source" => text(&self.source),
            "medium" => text(&self.medium),
            "deviceCategory" => text(&self.device_category),
            "eventName" => text(&self.event_name),
            "campaignName" => text(&self.campaign_name),
            "manualTerm" => text(&self.manual_term),
            "eventCount" => number(&self.event_count),
            "sessions" => number(&self.sessions),
            "users" => number(&self.users),
            _ => return None,
        };
        Some(value)
    }
}

impl ExportRecord for PageViewRow {
    fn field(&self, column: &str) -> Option<String> {
        let value = match column {
            "date" => self.date.as_deref().map(display_date).unwrap_or_default(),
            "pagePath" => text(&self.page_path),
            "pageViews" => number(&self.page_views),
            "activeUsers" => number(&self.active_users),
            _ => return None,
        };
        Some(value)
    }
}

impl ExportRecord for TrafficSourceRow {
    fn field(&self, column: &str) -> Option<String> {
        let value = match column {
            "source" => text(&self.source),
            "medium" => text(&self.medium),
            "sessions" => number(&self.sessions),
            "totalUsers" => number(&self.total_users),
            "newUsers" => number(&self.new_users),
            _ => return None,
        };
        Some(value)
    }
}

impl ExportRecord for CampaignPerformance {
    fn field(&self, column: &str) -> Option<String> {
        let value = match column {
            "campaignId" => text(&self.campaign_id),
            "campaignName" => text(&self.campaign_name),
            "impressions" => number(&self.impressions),
            "clicks" => number(&self.clicks),
            "cost" => number(&self.cost),
            "conversions" => number(&self.conversions),
            _ => return None,
        };
        Some(value)
    }
}
