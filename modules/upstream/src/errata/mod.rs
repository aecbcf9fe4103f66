//! Client for the upstream errata portal.
//!
//! Advisory listings come from the portal's search endpoint as JSON. The
//! per-advisory pages carry the package tables and only exist as HTML, so
//! those are scraped.

mod html;
mod mock;

pub use mock::Mock;

use crate::Error;
use async_trait::async_trait;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339};
use url::form_urlencoded;

const DEFAULT_API_URL: &str = "https://access.redhat.com/hydra/rest/search/kcs";
const DEFAULT_ERRATA_URL: &str = "https://access.redhat.com/errata";
const USER_AGENT: &str = "apollo/errata/0.2";

/// A single advisory from the search listing.
#[derive(Clone, Debug, Deserialize)]
pub struct CompactErrata {
    #[serde(rename = "id")]
    pub name: String,
    #[serde(rename = "portal_description", default)]
    pub description: String,
    #[serde(rename = "portal_synopsis", default)]
    pub synopsis: String,
    #[serde(rename = "portal_severity", default)]
    pub severity: String,
    #[serde(rename = "portal_advisory_type", default)]
    pub kind: String,
    #[serde(rename = "portal_package", default)]
    pub affected_packages: Vec<String>,
    #[serde(rename = "portal_CVE", default)]
    pub cves: Vec<String>,
    #[serde(rename = "portal_BZ", default)]
    pub fixes: Vec<String>,
    #[serde(rename = "portal_publication_date", default)]
    pub publication_date: Option<String>,
}

impl CompactErrata {
    pub fn published_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(self.publication_date.as_deref()?, &Rfc3339).ok()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Kind {
    Security,
    #[default]
    BugFix,
    Enhancement,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Severity {
    #[default]
    None,
    Low,
    Moderate,
    Important,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fix {
    pub bugzilla_id: String,
    pub description: String,
}

/// The package lists for one product section of an advisory page.
#[derive(Clone, Debug, Default)]
pub struct UpdatedPackages {
    pub srpms: Vec<String>,
    /// Binary packages keyed by architecture.
    pub packages: HashMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct Errata {
    pub synopsis: String,
    pub kind: Kind,
    pub severity: Severity,
    pub topic: Vec<String>,
    pub description: Vec<String>,
    pub solution: Vec<String>,
    /// Keyed by the upstream product label, such as
    /// `"Red Hat Enterprise Linux for x86_64 8"`.
    pub affected_products: HashMap<String, UpdatedPackages>,
    pub fixes: Vec<Fix>,
    pub cves: Vec<String>,
    pub references: Vec<String>,
    pub issued_at: Option<Date>,
}

#[async_trait]
pub trait ErrataScraper: Send + Sync {
    /// List advisories for a product version, newest first, optionally
    /// restricted to advisories published after the given point in time.
    async fn get_advisories(
        &self,
        version: &str,
        after: Option<OffsetDateTime>,
    ) -> Result<Vec<CompactErrata>, Error>;

    /// Scrape the full advisory page.
    async fn get_errata(&self, name: &str) -> Result<Errata, Error>;
}

#[derive(Deserialize)]
struct AdvisoriesInnerResponse {
    docs: Vec<CompactErrata>,
}

#[derive(Deserialize)]
struct AdvisoriesResponse {
    response: AdvisoriesInnerResponse,
}

pub struct Client {
    http: reqwest::Client,
    api_url: String,
    errata_url: String,
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_urls(DEFAULT_API_URL, DEFAULT_ERRATA_URL)
    }

    pub fn with_base_urls(api_url: impl Into<String>, errata_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_url: api_url.into(),
            errata_url: errata_url.into(),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[async_trait]
impl ErrataScraper for Client {
    async fn get_advisories(
        &self,
        version: &str,
        after: Option<OffsetDateTime>,
    ) -> Result<Vec<CompactErrata>, Error> {
        // The search endpoint takes Solr filter queries, which need their
        // spaces and dots escaped inside the filter value.
        let product_filter = format!(
            "portal_product_filter:Red%5C+Hat%5C+Enterprise%5C+Linux%7C*%7C{}%7C*",
            version.replace('.', "%5C.")
        );

        let mut query = format!("fq=documentKind:(%22Errata%22)&fq={product_filter}");
        if let Some(after) = after {
            let after = after
                .format(&Rfc3339)
                .map_err(|err| Error::Payload(err.to_string()))?;
            query.push_str(&format!(
                "&fq={}",
                escape(&format!("portal_publication_date:[{after} TO NOW]"))
            ));
        }
        query.push_str("&q=*:*&rows=10000&sort=portal_publication_date+desc&start=0");

        let response: AdvisoriesResponse = self
            .http
            .get(format!("{}?{}", self.api_url, query))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.response.docs)
    }

    async fn get_errata(&self, name: &str) -> Result<Errata, Error> {
        let response = self
            .http
            .get(format!("{}/{}", self.errata_url, name))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }

        let body = response.error_for_status()?.text().await?;
        html::parse_errata(&body)
    }
}
