//! Client for the upstream security data REST API.

mod mock;

pub use mock::Mock;

use crate::Error;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

const DEFAULT_BASE_URL: &str = "https://access.redhat.com/hydra/rest/securitydata";
const USER_AGENT: &str = "apollo/security/0.2";
const PAGE_SIZE: u32 = 1000;

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// A single entry from the CVE listing. Only a compact view, the full detail
/// requires a second call.
#[derive(Clone, Debug, Deserialize)]
pub struct Cve {
    #[serde(rename = "CVE")]
    pub cve: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub public_date: Option<String>,
    pub resource_url: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CveDetail {
    #[serde(default)]
    pub affected_release: Option<Vec<AffectedRelease>>,
    #[serde(default)]
    pub package_state: Option<Vec<PackageState>>,
}

/// A fix published upstream for a concrete product release.
#[derive(Clone, Debug, Deserialize)]
pub struct AffectedRelease {
    pub product_name: String,
    pub advisory: String,
    #[serde(default)]
    pub package: Option<String>,
}

/// Upstream's assessment of a product/package combination.
#[derive(Clone, Debug, Deserialize)]
pub struct PackageState {
    pub product_name: String,
    pub fix_state: String,
    #[serde(default)]
    pub package_name: String,
}

#[async_trait]
pub trait SecurityApi: Send + Sync {
    /// List CVEs affecting `product`, optionally restricted to entries
    /// published after the given date.
    async fn list_cves(&self, product: &str, after: Option<Date>) -> Result<Vec<Cve>, Error>;

    /// Fetch the full detail for one CVE.
    async fn get_cve(&self, id: &str) -> Result<CveDetail, Error>;
}

pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecurityApi for Client {
    async fn list_cves(&self, product: &str, after: Option<Date>) -> Result<Vec<Cve>, Error> {
        let mut result = Vec::new();

        // The listing endpoint caps the page size, keep fetching until a
        // page comes back empty.
        for page in 1u32.. {
            let mut request = self
                .http
                .get(format!("{}/cve.json", self.base_url))
                .query(&[("product", product)])
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);

            if let Some(after) = after {
                let after = after
                    .format(DATE_FORMAT)
                    .map_err(|err| Error::Payload(err.to_string()))?;
                request = request.query(&[("after", after)]);
            }

            let page: Vec<Cve> = request
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if page.is_empty() {
                break;
            }
            result.extend(page);
        }

        Ok(result)
    }

    async fn get_cve(&self, id: &str) -> Result<CveDetail, Error> {
        let response = self
            .http
            .get(format!("{}/cve/{}.json", self.base_url, id))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }

        Ok(response.error_for_status()?.json().await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn detail_deserializes_with_missing_sections() {
        let detail: CveDetail = serde_json::from_str("{}").unwrap();
        assert!(detail.affected_release.is_none());
        assert!(detail.package_state.is_none());
    }

    #[test]
    fn detail_deserializes_release_and_state() {
        let detail: CveDetail = serde_json::from_str(
            r#"{
                "affected_release": [
                    {
                        "product_name": "Red Hat Enterprise Linux 8",
                        "advisory": "RHSA-2021:3016",
                        "package": "container-tools:2.0-8030020210302231609.830d479e"
                    }
                ],
                "package_state": [
                    {
                        "product_name": "Red Hat Enterprise Linux 8",
                        "fix_state": "Will not fix",
                        "package_name": "podman"
                    }
                ]
            }"#,
        )
        .unwrap();

        let release = &detail.affected_release.unwrap()[0];
        assert_eq!(release.advisory, "RHSA-2021:3016");
        assert!(release.package.as_deref().unwrap().starts_with("container-tools"));

        let state = &detail.package_state.unwrap()[0];
        assert_eq!(state.fix_state, "Will not fix");
        assert_eq!(state.package_name, "podman");
    }

    #[test]
    fn listing_entry_deserializes() {
        let cve: Cve = serde_json::from_str(
            r#"{
                "CVE": "CVE-2021-3602",
                "severity": "moderate",
                "public_date": "2021-07-15T14:00:00Z",
                "resource_url": "https://access.redhat.com/hydra/rest/securitydata/cve/CVE-2021-3602.json"
            }"#,
        )
        .unwrap();
        assert_eq!(cve.cve, "CVE-2021-3602");
    }
}
