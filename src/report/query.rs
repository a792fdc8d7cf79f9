//! Report query construction
//!
//! Each report kind maps to a fixed set of dimensions, metrics and
//! orderings. The tables here are the contract with the providers: the
//! row formatter reads provider rows back positionally in the same
//! order.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::{ReportError, ReportResult};
use super::models::{DateRange, ReportKind, ReportRequest, DEFAULT_RANGE_DAYS};
use crate::config::{AdsConfig, AnalyticsConfig};

const PROPERTY_PREFIX: &str = "properties/";

/// Conversion-card row limit when the caller does not pass one
pub const DEFAULT_CONVERSION_LIMIT: u32 = 10;

/// Fixed campaign query: enabled campaigns, last seven days, top ten by
/// impressions.
pub const CAMPAIGN_PERFORMANCE_QUERY: &str = "SELECT campaign.id, campaign.name, \
metrics.impressions, metrics.clicks, metrics.cost_micros, metrics.conversions \
FROM campaign \
WHERE campaign.status = 'ENABLED' AND segments.date DURING LAST_7_DAYS \
ORDER BY metrics.impressions DESC \
LIMIT 10";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Dimension(&'static str),
    Metric(&'static str),
}

/// Fixed dimension/metric layout for one report kind
#[derive(Debug, Clone, Copy)]
pub struct ReportSchema {
    pub dimensions: &'static [&'static str],
    pub metrics: &'static [&'static str],
    /// (key, descending)
    pub order_by: &'static [(SortKey, bool)],
    /// Dimension matched by the optional text filter
    pub filter_dimension: Option<&'static str>,
}

static PAGE_VIEWS_SCHEMA: ReportSchema = ReportSchema {
    dimensions: &["date", "pagePath"],
    metrics: &["screenPageViews", "activeUsers"],
    order_by: &[
        (SortKey::Dimension("date"), false),
        (SortKey::Metric("screenPageViews"), true),
    ],
    filter_dimension: None,
};

static TRAFFIC_SOURCE_SCHEMA: ReportSchema = ReportSchema {
    dimensions: &["sessionSource", "sessionMedium"],
    metrics: &["sessions", "totalUsers", "newUsers"],
    order_by: &[(SortKey::Metric("sessions"), true)],
    filter_dimension: None,
};

static CONVERSION_CARD_SCHEMA: ReportSchema = ReportSchema {
    dimensions: &[
        "date",
        "sessionSource",
        "sessionMedium",
        "deviceCategory",
        "eventName",
        "sessionCampaignName",
        "sessionManualTerm",
    ],
    metrics: &["eventCount", "sessions", "totalUsers"],
    order_by: &[
        (SortKey::Dimension("date"), true),
        (SortKey::Metric("eventCount"), true),
    ],
    filter_dimension: Some("eventName"),
};

// Positional projection of the ads search result, see `google::project_ads_row`.
static CAMPAIGN_SCHEMA: ReportSchema = ReportSchema {
    dimensions: &["campaign.id", "campaign.name"],
    metrics: &[
        "metrics.impressions",
        "metrics.clicks",
        "metrics.cost_micros",
        "metrics.conversions",
    ],
    order_by: &[(SortKey::Metric("metrics.impressions"), true)],
    filter_dimension: None,
};

pub fn schema_for(kind: ReportKind) -> &'static ReportSchema {
    match kind {
        ReportKind::PageViews => &PAGE_VIEWS_SCHEMA,
        ReportKind::TrafficSource => &TRAFFIC_SOURCE_SCHEMA,
        ReportKind::ConversionCard => &CONVERSION_CARD_SCHEMA,
        ReportKind::CampaignPerformance => &CAMPAIGN_SCHEMA,
    }
}

// ---- Analytics runReport body ----

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    /// Normalized `properties/<id>`; part of the URL, not the body
    #[serde(skip)]
    pub property: String,
    pub date_ranges: Vec<ApiDateRange>,
    pub dimensions: Vec<NamedField>,
    pub metrics: Vec<NamedField>,
    pub order_bys: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<FilterExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedField {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<DimensionOrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<MetricOrderBy>,
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionOrderBy {
    pub dimension_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOrderBy {
    pub metric_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterExpression {
    pub filter: Filter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field_name: String,
    pub string_filter: StringFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringFilter {
    pub match_type: &'static str,
    pub value: String,
    pub case_sensitive: bool,
}

// ---- Ads search body ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdsSearchRequest {
    #[serde(skip)]
    pub customer_id: String,
    #[serde(skip)]
    pub login_customer_id: Option<String>,
    pub query: String,
}

/// Provider-specific query produced for a report request
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderQuery {
    Analytics(RunReportRequest),
    Ads(AdsSearchRequest),
}

/// Builds provider queries from logical report requests
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    property: String,
    customer_id: String,
    login_customer_id: Option<String>,
}

impl QueryBuilder {
    pub fn new(analytics: &AnalyticsConfig, ads: &AdsConfig) -> ReportResult<Self> {
        let property = normalize_property_id(&analytics.property_id)?;
        let customer_id = normalize_customer_id(&ads.customer_id)
            .ok_or_else(|| ReportError::Configuration("ads customer id is not set".to_string()))?;
        let login_customer_id = ads
            .login_customer_id
            .as_deref()
            .and_then(normalize_customer_id)
            .filter(|login| *login != customer_id);

        Ok(Self {
            property,
            customer_id,
            login_customer_id,
        })
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn build(&self, request: &ReportRequest, today: NaiveDate) -> ReportResult<ProviderQuery> {
        request.validate()?;

        if request.kind == ReportKind::CampaignPerformance {
            return Ok(ProviderQuery::Ads(AdsSearchRequest {
                customer_id: self.customer_id.clone(),
                login_customer_id: self.login_customer_id.clone(),
                query: CAMPAIGN_PERFORMANCE_QUERY.to_string(),
            }));
        }

        let schema = schema_for(request.kind);
        let range = request
            .date_range
            .unwrap_or_else(|| DateRange::last_days(today, DEFAULT_RANGE_DAYS));

        let dimension_filter = match (schema.filter_dimension, request.text_filter.as_deref()) {
            (Some(field), Some(value)) if !value.is_empty() => Some(FilterExpression {
                filter: Filter {
                    field_name: field.to_string(),
                    string_filter: StringFilter {
                        match_type: "CONTAINS",
                        value: value.to_string(),
                        case_sensitive: false,
                    },
                },
            }),
            _ => None,
        };

        let limit = match request.kind {
            ReportKind::ConversionCard => Some(request.limit.unwrap_or(DEFAULT_CONVERSION_LIMIT)),
            _ => request.limit,
        };

        Ok(ProviderQuery::Analytics(RunReportRequest {
            property: self.property.clone(),
            date_ranges: vec![ApiDateRange {
                start_date: range.start_str(),
                end_date: range.end_str(),
            }],
            dimensions: named(schema.dimensions),
            metrics: named(schema.metrics),
            order_bys: schema
                .order_by
                .iter()
                .map(|(key, desc)| order_by(*key, *desc))
                .collect(),
            dimension_filter,
            limit,
        }))
    }
}

fn named(fields: &[&str]) -> Vec<NamedField> {
    fields
        .iter()
        .map(|name| NamedField {
            name: (*name).to_string(),
        })
        .collect()
}

fn order_by(key: SortKey, desc: bool) -> OrderBy {
    match key {
        SortKey::Dimension(name) => OrderBy {
            dimension: Some(DimensionOrderBy {
                dimension_name: name.to_string(),
            }),
            metric: None,
            desc,
        },
        SortKey::Metric(name) => OrderBy {
            dimension: None,
            metric: Some(MetricOrderBy {
                metric_name: name.to_string(),
            }),
            desc,
        },
    }
}

/// Prefix a bare property id with `properties/`.
pub fn normalize_property_id(raw: &str) -> ReportResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == PROPERTY_PREFIX {
        return Err(ReportError::Configuration(
            "analytics property id is not set".to_string(),
        ));
    }
    if trimmed.starts_with(PROPERTY_PREFIX) {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{PROPERTY_PREFIX}{trimmed}"))
    }
}

/// Strip the dashes from `123-456-7890` style customer ids.
pub fn normalize_customer_id(raw: &str) -> Option<String> {
    let id: String = raw.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect();
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analytics(property_id: &str) -> AnalyticsConfig {
        AnalyticsConfig {
            property_id: property_id.to_string(),
            credentials_json: "{}".to_string(),
            base_url: "http://localhost".to_string(),
        }
    }

    fn ads(customer: &str, login: Option<&str>) -> AdsConfig {
        AdsConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            developer_token: "dev".to_string(),
            refresh_token: "refresh".to_string(),
            customer_id: customer.to_string(),
            login_customer_id: login.map(str::to_string),
            base_url: "http://localhost".to_string(),
            api_version: "v19".to_string(),
        }
    }

    fn builder() -> QueryBuilder {
        QueryBuilder::new(&analytics("123456"), &ads("111-222-3333", None)).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn analytics_query(query: ProviderQuery) -> RunReportRequest {
        match query {
            ProviderQuery::Analytics(q) => q,
            other => panic!("expected analytics query, got {other:?}"),
        }
    }

    #[test]
    fn property_prefix_is_added_once() {
        assert_eq!(normalize_property_id("123").unwrap(), "properties/123");
        assert_eq!(normalize_property_id("properties/123").unwrap(), "properties/123");
        assert!(matches!(
            normalize_property_id("  "),
            Err(ReportError::Configuration(_))
        ));
    }

    #[test]
    fn unset_customer_id_is_a_configuration_error() {
        let result = QueryBuilder::new(&analytics("1"), &ads("", None));
        assert!(matches!(result, Err(ReportError::Configuration(_))));
    }

    #[test]
    fn request_range_is_rendered_verbatim() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        let request = ReportRequest::new(ReportKind::TrafficSource).with_range(range);

        let query = analytics_query(builder().build(&request, today()).unwrap());
        assert_eq!(
            query.date_ranges,
            vec![ApiDateRange {
                start_date: "2024-01-01".to_string(),
                end_date: "2024-01-31".to_string(),
            }]
        );
    }

    #[test]
    fn missing_range_defaults_to_last_seven_days() {
        let request = ReportRequest::new(ReportKind::PageViews);
        let query = analytics_query(builder().build(&request, today()).unwrap());

        assert_eq!(query.date_ranges[0].start_date, "2024-03-03");
        assert_eq!(query.date_ranges[0].end_date, "2024-03-10");
        assert_eq!(query.property, "properties/123456");
        assert_eq!(query.limit, None);
    }

    #[test]
    fn page_views_sort_date_ascending_then_views_descending() {
        let query = analytics_query(
            builder()
                .build(&ReportRequest::new(ReportKind::PageViews), today())
                .unwrap(),
        );
        let json = serde_json::to_value(&query).unwrap();

        assert_eq!(json["orderBys"][0]["dimension"]["dimensionName"], "date");
        assert_eq!(json["orderBys"][0]["desc"], false);
        assert_eq!(json["orderBys"][1]["metric"]["metricName"], "screenPageViews");
        assert_eq!(json["orderBys"][1]["desc"], true);
        assert!(json.get("property").is_none());
    }

    #[test]
    fn conversion_card_sorts_date_descending_and_applies_filter() {
        let request = ReportRequest::new(ReportKind::ConversionCard)
            .with_limit(50)
            .with_text_filter("contact");
        let query = analytics_query(builder().build(&request, today()).unwrap());
        let json = serde_json::to_value(&query).unwrap();

        assert_eq!(json["orderBys"][0]["desc"], true);
        assert_eq!(json["orderBys"][1]["metric"]["metricName"], "eventCount");
        assert_eq!(json["limit"], 50);
        assert_eq!(json["dimensionFilter"]["filter"]["fieldName"], "eventName");
        let string_filter = &json["dimensionFilter"]["filter"]["stringFilter"];
        assert_eq!(string_filter["matchType"], "CONTAINS");
        assert_eq!(string_filter["value"], "contact");
        assert_eq!(string_filter["caseSensitive"], false);
        assert_eq!(json["dimensions"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn absent_or_empty_filter_emits_no_clause() {
        let plain = analytics_query(
            builder()
                .build(&ReportRequest::new(ReportKind::ConversionCard), today())
                .unwrap(),
        );
        assert!(plain.dimension_filter.is_none());
        assert_eq!(plain.limit, Some(DEFAULT_CONVERSION_LIMIT));

        let empty = analytics_query(
            builder()
                .build(
                    &ReportRequest::new(ReportKind::ConversionCard).with_text_filter(""),
                    today(),
                )
                .unwrap(),
        );
        assert!(empty.dimension_filter.is_none());
    }

    #[test]
    fn filter_is_ignored_for_kinds_without_filter_dimension() {
        let request = ReportRequest::new(ReportKind::PageViews).with_text_filter("x");
        let query = analytics_query(builder().build(&request, today()).unwrap());
        assert!(query.dimension_filter.is_none());
    }

    #[test]
    fn campaign_query_is_fixed_ads_search() {
        let request = ReportRequest::new(ReportKind::CampaignPerformance).with_limit(3);
        match builder().build(&request, today()).unwrap() {
            ProviderQuery::Ads(search) => {
                assert_eq!(search.customer_id, "1112223333");
                assert!(search.login_customer_id.is_none());
                assert_eq!(search.query, CAMPAIGN_PERFORMANCE_QUERY);
                assert!(search.query.contains("LIMIT 10"));
            }
            other => panic!("expected ads query, got {other:?}"),
        }
    }

    #[test]
    fn login_customer_id_only_when_distinct() {
        let same = QueryBuilder::new(&analytics("1"), &ads("111-222-3333", Some("1112223333"))).unwrap();
        assert!(same.login_customer_id.is_none());

        let manager = QueryBuilder::new(&analytics("1"), &ads("1112223333", Some("999-888-7777"))).unwrap();
        assert_eq!(manager.login_customer_id.as_deref(), Some("9998887777"));
    }

    #[test]
    fn invalid_request_is_rejected_before_building() {
        let request = ReportRequest::new(ReportKind::ConversionCard).with_limit(0);
        assert!(matches!(
            builder().build(&request, today()),
            Err(ReportError::InvalidRequest(_))
        ));
    }
}
