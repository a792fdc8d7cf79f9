pub mod aggregate;
pub mod client;
pub mod error;
pub mod export;
pub mod format;
pub mod google;
pub mod models;
pub mod query;
pub mod service;

pub use client::{AdsProvider, AnalyticsProvider, ReportClient};
pub use error::{ProviderErrorKind, ReportError, ReportResult};
pub use models::{DateRange, RawReport, RawReportRow, ReportKind, ReportRequest};
pub use query::QueryBuilder;
pub use service::{DashboardSummary, ReportService, ReportTable};
