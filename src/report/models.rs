//! Data models for report requests, provider rows and formatted records

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

use super::error::{ReportError, ReportResult};

/// Days covered by the default report range (today inclusive).
pub const DEFAULT_RANGE_DAYS: u64 = 7;

/// One of the fixed reports exposed by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    PageViews,
    TrafficSource,
    ConversionCard,
    CampaignPerformance,
}

impl ReportKind {
    /// Stable name used in logs and export file names
    pub const fn name(self) -> &'static str {
        match self {
            Self::PageViews => "page-views",
            Self::TrafficSource => "traffic-sources",
            Self::ConversionCard => "conversion-card",
            Self::CampaignPerformance => "campaign-performance",
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ReportResult<Self> {
        if start > end {
            return Err(ReportError::InvalidRequest(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `days` days before `today` through `today`
    pub fn last_days(today: NaiveDate, days: u64) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Resolve optional textual bounds, defaulting each side to the last
    /// seven days.
    pub fn resolve(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> ReportResult<Self> {
        let default = Self::last_days(today, DEFAULT_RANGE_DAYS);
        let start = match start.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_report_date(raw, today)?,
            None => default.start,
        };
        let end = match end.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => parse_report_date(raw, today)?,
            None => default.end,
        };
        Self::new(start, end)
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

/// Parse `YYYY-MM-DD`, `today`, `yesterday` or `NdaysAgo` into a date.
pub fn parse_report_date(raw: &str, today: NaiveDate) -> ReportResult<NaiveDate> {
    let invalid = || ReportError::InvalidRequest(format!("unrecognized date '{raw}'"));

    match raw {
        "today" => return Ok(today),
        "yesterday" => return today.checked_sub_days(Days::new(1)).ok_or_else(invalid),
        _ => {}
    }

    if let Some(days) = raw.strip_suffix("daysAgo") {
        let days: u64 = days.parse().map_err(|_| invalid())?;
        return today.checked_sub_days(Days::new(days)).ok_or_else(invalid);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())
}

/// Logical report request coming from the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub kind: ReportKind,
    /// Defaults to the last seven days when unset
    pub date_range: Option<DateRange>,
    pub limit: Option<u32>,
    pub text_filter: Option<String>,
}

impl ReportRequest {
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            date_range: None,
            limit: None,
            text_filter: None,
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_text_filter(mut self, filter: impl Into<String>) -> Self {
        self.text_filter = Some(filter.into());
        self
    }

    pub fn validate(&self) -> ReportResult<()> {
        if let Some(range) = &self.date_range {
            if range.start > range.end {
                return Err(ReportError::InvalidRequest(format!(
                    "start date {} is after end date {}",
                    range.start, range.end
                )));
            }
        }
        if self.limit == Some(0) {
            return Err(ReportError::InvalidRequest(
                "limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Provider row; meaning is positional per report kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReportRow {
    #[serde(rename = "dimensions")]
    pub dimension_values: Vec<String>,
    #[serde(rename = "metrics")]
    pub metric_values: Vec<String>,
}

impl RawReportRow {
    pub fn new<D, M>(dimensions: D, metrics: M) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            dimension_values: dimensions.into_iter().map(Into::into).collect(),
            metric_values: metrics.into_iter().map(Into::into).collect(),
        }
    }
}

/// Tabular provider result with header names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReport {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub rows: Vec<RawReportRow>,
}

/// Numeric metric parsed from provider text.
///
/// Unparseable or non-finite text is kept as NaN with `valid == false` so
/// callers can detect it instead of having it vanish inside a sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    value: f64,
    valid: bool,
}

impl Metric {
    pub const fn new(value: f64) -> Self {
        Self { value, valid: true }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Self::new(value),
            _ => Self {
                value: f64::NAN,
                valid: false,
            },
        }
    }

    pub const fn value(self) -> f64 {
        self.value
    }

    pub const fn is_valid(self) -> bool {
        self.valid
    }

    pub fn scaled_down(self, divisor: f64) -> Self {
        Self {
            value: self.value / divisor,
            valid: self.valid,
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value)
    }
}

/// Value of an optional metric for arithmetic; absent counts as zero
pub fn metric_value(metric: Option<Metric>) -> f64 {
    metric.map_or(0.0, Metric::value)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_views: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_users: Option<Metric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSourceRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_users: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_users: Option<Metric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionCardRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_count: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Metric>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignPerformance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impressions: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicks: Option<Metric>,
    /// Currency units (provider micros / 1,000,000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversions: Option<Metric>,
}

impl CampaignPerformance {
    /// Cost per click, or 0 when clicks are zero or either side is unusable
    pub fn cost_per_click(&self) -> f64 {
        let cpc = metric_value(self.cost) / metric_value(self.clicks);
        if cpc.is_finite() {
            cpc
        } else {
            0.0
        }
    }
}

/// A raw row projected through the fixed schema of its report kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormattedRow {
    PageView(PageViewRow),
    TrafficSource(TrafficSourceRow),
    ConversionCard(ConversionCardRow),
    Campaign(CampaignPerformance),
}

/// Rows that carry a report date
pub trait DatedRow {
    fn date(&self) -> Option<&str>;
}

impl DatedRow for PageViewRow {
    fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

impl DatedRow for ConversionCardRow {
    fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

/// Render a provider `YYYYMMDD` date as `YYYY-MM-DD`; anything else is
/// returned unchanged.
pub fn display_date(raw: &str) -> String {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn default_range_is_last_seven_days() {
        let range = DateRange::resolve(None, None, date("2024-03-10")).unwrap();
        assert_eq!(range.start_str(), "2024-03-03");
        assert_eq!(range.end_str(), "2024-03-10");
    }

    #[test]
    fn relative_dates_resolve_against_today() {
        let today = date("2024-03-10");
        assert_eq!(parse_report_date("today", today).unwrap(), today);
        assert_eq!(parse_report_date("yesterday", today).unwrap(), date("2024-03-09"));
        assert_eq!(parse_report_date("30daysAgo", today).unwrap(), date("2024-02-09"));
        assert!(parse_report_date("manydaysAgo", today).is_err());
        assert!(parse_report_date("2024/03/01", today).is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let result = DateRange::resolve(Some("2024-03-10"), Some("2024-03-01"), date("2024-03-10"));
        assert!(matches!(result, Err(ReportError::InvalidRequest(_))));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let request = ReportRequest::new(ReportKind::ConversionCard).with_limit(0);
        assert!(request.validate().is_err());
        assert!(ReportRequest::new(ReportKind::ConversionCard)
            .with_limit(5)
            .validate()
            .is_ok());
    }

    #[test]
    fn metric_parse_flags_garbage() {
        let ok = Metric::parse("42");
        assert!(ok.is_valid());
        assert_eq!(ok.value(), 42.0);

        let bad = Metric::parse("n/a");
        assert!(!bad.is_valid());
        assert!(bad.value().is_nan());
    }

    #[test]
    fn non_finite_text_is_not_a_valid_metric() {
        for raw in ["NaN", "inf", "-infinity", "Infinity"] {
            let metric = Metric::parse(raw);
            assert!(!metric.is_valid(), "{raw} should be invalid");
            assert!(metric.value().is_nan());
        }
        assert!(Metric::parse("1e3").is_valid());
    }

    #[test]
    fn nan_metric_serializes_as_null() {
        let json = serde_json::to_string(&Metric::parse("oops")).unwrap();
        assert_eq!(json, "null");
    }

    #[test]
    fn cost_per_click_guards_zero_clicks() {
        let campaign = CampaignPerformance {
            cost: Some(Metric::new(10.0)),
            clicks: Some(Metric::new(4.0)),
            ..Default::default()
        };
        assert_eq!(campaign.cost_per_click(), 2.5);

        let no_clicks = CampaignPerformance {
            cost: Some(Metric::new(10.0)),
            clicks: Some(Metric::new(0.0)),
            ..Default::default()
        };
        assert_eq!(no_clicks.cost_per_click(), 0.0);
    }

    #[test]
    fn display_date_formats_compact_dates_only() {
        assert_eq!(display_date("20240115"), "2024-01-15");
        assert_eq!(display_date("2024-01-15"), "2024-01-15");
        assert_eq!(display_date("(not set)"), "(not set)");
    }
}
