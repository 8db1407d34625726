//! ARCore management API: list anchors, patch an anchor's expiration.

use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use log::info;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::error::ApiError;
use crate::token::BearerToken;

pub const DEFAULT_API_BASE_URL: &str = "https://arcore.googleapis.com";
const ANCHORS_PATH: &str = "v1beta2/management/anchors";

/// Sort order requested for the anchor listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListOrder {
    /// Latest expiration first
    #[default]
    Descending,
    /// Earliest expiration first
    Ascending,
}

impl ListOrder {
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Descending => "expire_time desc",
            Self::Ascending => "expire_time",
        }
    }
}

/// Operations the refresher needs from the anchor service.
#[async_trait]
pub trait AnchorApi {
    /// First page of anchors, at most `page_size` of them.
    async fn list_anchors(&self, page_size: u32, order: ListOrder)
        -> Result<Vec<Anchor>, ApiError>;

    /// Sets `expireTime` of anchor `id`. Any HTTP response, successful or
    /// not, is returned as its status code.
    async fn patch_expire_time(&self, id: &str, expire_time: &str)
        -> Result<StatusCode, ApiError>;
}

#[derive(Deserialize, Debug)]
struct ListAnchorsResponse {
    #[serde(default)]
    anchors: Vec<Anchor>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ExpireTimePatch<'a> {
    expire_time: &'a str,
}

/// Authenticated HTTP client for the management endpoints.
pub struct ArcoreClient {
    http: Client,
    base_url: String,
    token: BearerToken,
}

impl ArcoreClient {
    pub fn new(base_url: &str, token: BearerToken, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn anchors_url(&self) -> String {
        format!("{}/{}", self.base_url, ANCHORS_PATH)
    }

    fn anchor_url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, ANCHORS_PATH, id)
    }
}

#[async_trait]
impl AnchorApi for ArcoreClient {
    async fn list_anchors(
        &self,
        page_size: u32,
        order: ListOrder,
    ) -> Result<Vec<Anchor>, ApiError> {
        let response = self
            .http
            .get(self.anchors_url())
            .bearer_auth(self.token.secret())
            .header("Accept", "application/json")
            .query(&[
                ("page_size", page_size.to_string()),
                ("order_by", order.as_query().to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }

        info!("{}", body);
        parse_anchor_page(&body)
    }

    async fn patch_expire_time(
        &self,
        id: &str,
        expire_time: &str,
    ) -> Result<StatusCode, ApiError> {
        let response = self
            .http
            .patch(self.anchor_url(id))
            .bearer_auth(self.token.secret())
            .query(&[("updateMask", "expire_time")])
            .json(&ExpireTimePatch { expire_time })
            .send()
            .await?;

        Ok(response.status())
    }
}

fn parse_anchor_page(body: &str) -> Result<Vec<Anchor>, ApiError> {
    let page: ListAnchorsResponse = serde_json::from_str(body)?;
    Ok(page.anchors)
}
