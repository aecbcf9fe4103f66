//! Transactional state access shared by all mirroring workers.
//!
//! The [`Store`] trait hands out [`Transaction`] handles whose operations run
//! inside the transaction until committed or rolled back. Workers wrap each
//! CVE they process in exactly one transaction so that per-product mutations
//! for a CVE either all commit or none do.

use apollo_entity::{
    advisory, affected_product, build_reference, cve, fix, mirror_state, product, short_code,
};
use async_trait::async_trait;
use time::OffsetDateTime;

mod error;
pub mod memory;
pub mod pg;

pub use error::Error;
pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Clone, Debug)]
pub struct NewCve {
    pub id: String,
    pub state: cve::State,
    pub short_code: String,
    pub source_by: Option<String>,
    pub source_link: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewAffectedProduct {
    pub product_id: i64,
    pub cve_id: String,
    pub state: affected_product::State,
    pub version: String,
    pub package: String,
    pub advisory: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewBuildReference {
    pub affected_product_id: i64,
    pub rpm: String,
    pub src_rpm: String,
    pub cve_id: String,
    pub build_id: String,
}

#[derive(Clone, Debug)]
pub struct NewAdvisory {
    pub short_code: String,
    pub year: i32,
    pub num: i32,
    pub kind: advisory::Kind,
    pub severity: i32,
    pub synopsis: String,
    pub topic: String,
    pub description: String,
    pub solution: Option<String>,
    pub upstream_issued_at: Option<OffsetDateTime>,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug)]
pub struct NewFix {
    pub ticket: String,
    pub source_by: Option<String>,
    pub source_link: Option<String>,
    pub description: Option<String>,
}

/// Row-level operations. Implemented both for plain store handles and for
/// in-flight transactions.
#[async_trait]
pub trait Access: Send + Sync {
    async fn get_all_short_codes(&self) -> Result<Vec<short_code::Model>, Error>;
    async fn get_short_code(&self, code: &str) -> Result<short_code::Model, Error>;

    async fn get_products_by_short_code(&self, code: &str)
        -> Result<Vec<product::Model>, Error>;
    async fn get_product_by_name_and_short_code(
        &self,
        name: &str,
        code: &str,
    ) -> Result<product::Model, Error>;
    async fn get_product_by_id(&self, id: i64) -> Result<product::Model, Error>;

    async fn get_all_cves(&self) -> Result<Vec<cve::Model>, Error>;
    /// CVEs still awaiting upstream resolution.
    async fn get_all_unresolved_cves(&self) -> Result<Vec<cve::Model>, Error>;
    /// Unterminated CVEs whose affected products all reached a post-upstream
    /// state. These are the candidates for downstream build checks.
    async fn get_cves_with_all_products_fixed(&self) -> Result<Vec<cve::Model>, Error>;
    async fn get_cve_by_id(&self, id: &str) -> Result<cve::Model, Error>;
    async fn create_cve(&self, cve: NewCve) -> Result<cve::Model, Error>;
    async fn update_cve_state(&self, id: &str, state: cve::State) -> Result<(), Error>;

    async fn get_all_affected_products_by_cve(
        &self,
        cve_id: &str,
    ) -> Result<Vec<affected_product::Model>, Error>;
    async fn get_affected_product_by_cve_and_package(
        &self,
        cve_id: &str,
        package: &str,
    ) -> Result<affected_product::Model, Error>;
    async fn get_affected_product_by_advisory(
        &self,
        advisory: &str,
    ) -> Result<affected_product::Model, Error>;
    async fn create_affected_product(
        &self,
        affected_product: NewAffectedProduct,
    ) -> Result<affected_product::Model, Error>;
    async fn update_affected_product(
        &self,
        id: i64,
        state: affected_product::State,
        package: &str,
        advisory: Option<String>,
    ) -> Result<(), Error>;
    async fn delete_affected_product(&self, id: i64) -> Result<(), Error>;

    async fn create_build_reference(
        &self,
        build_reference: NewBuildReference,
    ) -> Result<build_reference::Model, Error>;

    async fn get_advisory_by_code_and_year_and_num(
        &self,
        code: &str,
        year: i32,
        num: i32,
    ) -> Result<advisory::Model, Error>;
    async fn create_advisory(&self, advisory: NewAdvisory) -> Result<advisory::Model, Error>;
    async fn update_advisory(&self, id: i64, advisory: NewAdvisory)
        -> Result<advisory::Model, Error>;
    async fn create_fix(&self, fix: NewFix) -> Result<fix::Model, Error>;
    async fn create_advisory_reference(&self, advisory_id: i64, url: &str) -> Result<(), Error>;
    async fn add_advisory_cve(&self, advisory_id: i64, cve_id: &str) -> Result<(), Error>;
    async fn add_advisory_fix(&self, advisory_id: i64, fix_id: i64) -> Result<(), Error>;
    async fn add_advisory_rpm(
        &self,
        advisory_id: i64,
        name: &str,
        product_id: i64,
    ) -> Result<(), Error>;

    async fn get_mirror_state(&self, code: &str) -> Result<Option<mirror_state::Model>, Error>;
    async fn update_mirror_state(
        &self,
        code: &str,
        last_sync: Option<OffsetDateTime>,
    ) -> Result<(), Error>;
    async fn update_mirror_state_errata(
        &self,
        code: &str,
        errata_after: Option<OffsetDateTime>,
    ) -> Result<(), Error>;

    async fn get_ignored_packages_by_short_code(&self, code: &str) -> Result<Vec<String>, Error>;
}

#[async_trait]
pub trait Transaction: Access {
    async fn commit(self: Box<Self>) -> Result<(), Error>;
    async fn rollback(self: Box<Self>) -> Result<(), Error>;
}

#[async_trait]
pub trait Store: Access {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error>;
}
