pub mod google;

use async_trait::async_trait;

use crate::report::ReportError;

pub use google::{RefreshTokenSource, ServiceAccountKey, ServiceAccountTokenSource};

/// Supplies bearer tokens for outbound provider calls
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, ReportError>;
}

/// Fixed token, for pre-issued credentials and tests
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, ReportError> {
        Ok(self.0.clone())
    }
}
