//! In-memory store used by tests and local development.
//!
//! Transactions are modeled as a snapshot of the shared state. Mutations run
//! against the snapshot and replace the shared state on commit, so the last
//! commit wins. That is close enough to the single-writer access pattern of
//! the workers, which never run two transactions over the same CVE at once.

use crate::{
    Access, Error, NewAdvisory, NewAffectedProduct, NewBuildReference, NewCve, NewFix, Store,
    Transaction,
};
use apollo_entity::{
    advisory, advisory_cve, advisory_fix, advisory_reference, advisory_rpm, affected_product,
    build_reference, cve, fix, ignored_upstream_package, mirror_state, product, short_code,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;

#[derive(Clone, Default)]
struct State {
    short_codes: Vec<short_code::Model>,
    products: Vec<product::Model>,
    cves: Vec<cve::Model>,
    affected_products: Vec<affected_product::Model>,
    build_references: Vec<build_reference::Model>,
    advisories: Vec<advisory::Model>,
    fixes: Vec<fix::Model>,
    advisory_cves: Vec<advisory_cve::Model>,
    advisory_fixes: Vec<advisory_fix::Model>,
    advisory_rpms: Vec<advisory_rpm::Model>,
    advisory_references: Vec<advisory_reference::Model>,
    mirror_states: Vec<mirror_state::Model>,
    ignored_packages: Vec<ignored_upstream_package::Model>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn get_short_code(&self, code: &str) -> Result<short_code::Model, Error> {
        self.short_codes
            .iter()
            .find(|sc| sc.code == code)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn get_products_by_short_code(&self, code: &str) -> Vec<product::Model> {
        self.products
            .iter()
            .filter(|p| p.short_code == code)
            .cloned()
            .collect()
    }

    fn get_product_by_name_and_short_code(
        &self,
        name: &str,
        code: &str,
    ) -> Result<product::Model, Error> {
        self.products
            .iter()
            .find(|p| p.name == name && p.short_code == code)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn get_product_by_id(&self, id: i64) -> Result<product::Model, Error> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn get_all_unresolved_cves(&self) -> Vec<cve::Model> {
        self.cves
            .iter()
            .filter(|c| matches!(c.state, cve::State::NewFromUpstream | cve::State::NewOriginal))
            .cloned()
            .collect()
    }

    fn get_cves_with_all_products_fixed(&self) -> Vec<cve::Model> {
        self.cves
            .iter()
            .filter(|c| {
                !matches!(
                    c.state,
                    cve::State::ResolvedDownstream | cve::State::ResolvedNoAdvisory
                )
            })
            .filter(|c| {
                let products: Vec<_> = self
                    .affected_products
                    .iter()
                    .filter(|ap| ap.cve_id == c.id)
                    .collect();
                !products.is_empty() && products.iter().all(|ap| ap.state.is_post_upstream())
            })
            .cloned()
            .collect()
    }

    fn get_cve_by_id(&self, id: &str) -> Result<cve::Model, Error> {
        self.cves
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn create_cve(&mut self, new: NewCve) -> Result<cve::Model, Error> {
        if self.cves.iter().any(|c| c.id == new.id) {
            return Err(Error::UniqueViolation);
        }

        let model = cve::Model {
            id: new.id,
            created_at: OffsetDateTime::now_utc(),
            state: new.state,
            short_code: new.short_code,
            source_by: new.source_by,
            source_link: new.source_link,
            advisory_id: None,
        };
        self.cves.push(model.clone());
        Ok(model)
    }

    fn update_cve_state(&mut self, id: &str, state: cve::State) -> Result<(), Error> {
        let cve = self
            .cves
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(Error::NotFound)?;
        cve.state = state;
        Ok(())
    }

    fn get_all_affected_products_by_cve(&self, cve_id: &str) -> Vec<affected_product::Model> {
        self.affected_products
            .iter()
            .filter(|ap| ap.cve_id == cve_id)
            .cloned()
            .collect()
    }

    fn get_affected_product_by_cve_and_package(
        &self,
        cve_id: &str,
        package: &str,
    ) -> Result<affected_product::Model, Error> {
        self.affected_products
            .iter()
            .find(|ap| ap.cve_id == cve_id && ap.package == package)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn get_affected_product_by_advisory(
        &self,
        advisory: &str,
    ) -> Result<affected_product::Model, Error> {
        self.affected_products
            .iter()
            .find(|ap| ap.advisory.as_deref() == Some(advisory))
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn create_affected_product(
        &mut self,
        new: NewAffectedProduct,
    ) -> Result<affected_product::Model, Error> {
        if self
            .affected_products
            .iter()
            .any(|ap| ap.cve_id == new.cve_id && ap.package == new.package)
        {
            return Err(Error::UniqueViolation);
        }

        let model = affected_product::Model {
            id: self.next_id(),
            product_id: new.product_id,
            cve_id: new.cve_id,
            state: new.state,
            version: new.version,
            package: new.package,
            advisory: new.advisory,
        };
        self.affected_products.push(model.clone());
        Ok(model)
    }

    fn update_affected_product(
        &mut self,
        id: i64,
        state: affected_product::State,
        package: &str,
        advisory: Option<String>,
    ) -> Result<(), Error> {
        let ap = self
            .affected_products
            .iter_mut()
            .find(|ap| ap.id == id)
            .ok_or(Error::NotFound)?;
        ap.state = state;
        ap.package = package.to_string();
        ap.advisory = advisory;
        Ok(())
    }

    fn delete_affected_product(&mut self, id: i64) -> Result<(), Error> {
        let before = self.affected_products.len();
        self.affected_products.retain(|ap| ap.id != id);
        if self.affected_products.len() == before {
            return Err(Error::NotFound);
        }
        self.build_references.retain(|br| br.affected_product_id != id);
        Ok(())
    }

    fn create_build_reference(
        &mut self,
        new: NewBuildReference,
    ) -> Result<build_reference::Model, Error> {
        let model = build_reference::Model {
            id: self.next_id(),
            affected_product_id: new.affected_product_id,
            rpm: new.rpm,
            src_rpm: new.src_rpm,
            cve_id: new.cve_id,
            build_id: new.build_id,
        };
        self.build_references.push(model.clone());
        Ok(model)
    }

    fn get_advisory_by_code_and_year_and_num(
        &self,
        code: &str,
        year: i32,
        num: i32,
    ) -> Result<advisory::Model, Error> {
        self.advisories
            .iter()
            .find(|a| a.short_code == code && a.year == year && a.num == num)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn create_advisory(&mut self, new: NewAdvisory) -> Result<advisory::Model, Error> {
        if self
            .advisories
            .iter()
            .any(|a| a.short_code == new.short_code && a.year == new.year && a.num == new.num)
        {
            return Err(Error::UniqueViolation);
        }

        let model = advisory::Model {
            id: self.next_id(),
            created_at: OffsetDateTime::now_utc(),
            short_code: new.short_code,
            year: new.year,
            num: new.num,
            kind: new.kind,
            severity: new.severity,
            synopsis: new.synopsis,
            topic: new.topic,
            description: new.description,
            solution: new.solution,
            upstream_issued_at: new.upstream_issued_at,
            published_at: new.published_at,
        };
        self.advisories.push(model.clone());
        Ok(model)
    }

    fn update_advisory(&mut self, id: i64, new: NewAdvisory) -> Result<advisory::Model, Error> {
        let advisory = self
            .advisories
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(Error::NotFound)?;
        advisory.short_code = new.short_code;
        advisory.year = new.year;
        advisory.num = new.num;
        advisory.kind = new.kind;
        advisory.severity = new.severity;
        advisory.synopsis = new.synopsis;
        advisory.topic = new.topic;
        advisory.description = new.description;
        advisory.solution = new.solution;
        advisory.upstream_issued_at = new.upstream_issued_at;
        advisory.published_at = new.published_at;
        Ok(advisory.clone())
    }

    fn create_fix(&mut self, new: NewFix) -> Result<fix::Model, Error> {
        let model = fix::Model {
            id: self.next_id(),
            ticket: new.ticket,
            source_by: new.source_by,
            source_link: new.source_link,
            description: new.description,
        };
        self.fixes.push(model.clone());
        Ok(model)
    }

    fn create_advisory_reference(&mut self, advisory_id: i64, url: &str) -> Result<(), Error> {
        let id = self.next_id();
        self.advisory_references.push(advisory_reference::Model {
            id,
            advisory_id,
            url: url.to_string(),
        });
        Ok(())
    }

    fn add_advisory_cve(&mut self, advisory_id: i64, cve_id: &str) {
        if self
            .advisory_cves
            .iter()
            .any(|ac| ac.advisory_id == advisory_id && ac.cve_id == cve_id)
        {
            return;
        }
        self.advisory_cves.push(advisory_cve::Model {
            advisory_id,
            cve_id: cve_id.to_string(),
        });
    }

    fn add_advisory_fix(&mut self, advisory_id: i64, fix_id: i64) {
        if self
            .advisory_fixes
            .iter()
            .any(|af| af.advisory_id == advisory_id && af.fix_id == fix_id)
        {
            return;
        }
        self.advisory_fixes
            .push(advisory_fix::Model { advisory_id, fix_id });
    }

    fn add_advisory_rpm(&mut self, advisory_id: i64, name: &str, product_id: i64) {
        if self
            .advisory_rpms
            .iter()
            .any(|ar| ar.advisory_id == advisory_id && ar.name == name)
        {
            return;
        }
        self.advisory_rpms.push(advisory_rpm::Model {
            advisory_id,
            name: name.to_string(),
            product_id,
        });
    }

    fn get_mirror_state(&self, code: &str) -> Option<mirror_state::Model> {
        self.mirror_states
            .iter()
            .find(|ms| ms.short_code == code)
            .cloned()
    }

    fn update_mirror_state(&mut self, code: &str, last_sync: Option<OffsetDateTime>) {
        match self.mirror_states.iter_mut().find(|ms| ms.short_code == code) {
            Some(ms) => ms.last_sync = last_sync,
            None => self.mirror_states.push(mirror_state::Model {
                short_code: code.to_string(),
                last_sync,
                errata_after: None,
            }),
        }
    }

    fn update_mirror_state_errata(&mut self, code: &str, errata_after: Option<OffsetDateTime>) {
        match self.mirror_states.iter_mut().find(|ms| ms.short_code == code) {
            Some(ms) => ms.errata_after = errata_after,
            None => self.mirror_states.push(mirror_state::Model {
                short_code: code.to_string(),
                last_sync: None,
                errata_after,
            }),
        }
    }

    fn get_ignored_packages_by_short_code(&self, code: &str) -> Vec<String> {
        self.ignored_packages
            .iter()
            .filter(|ip| ip.short_code == code)
            .map(|ip| ip.package.clone())
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    failing_begins: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a short code. There is no worker-facing operation for this.
    pub fn add_short_code(&self, short_code: short_code::Model) {
        self.lock().short_codes.push(short_code);
    }

    /// Seed a product. There is no worker-facing operation for this.
    pub fn add_product(&self, product: product::Model) {
        self.lock().products.push(product);
    }

    /// Seed an ignore glob for a short code.
    pub fn add_ignored_package(&self, code: &str, package: &str) {
        let mut state = self.lock();
        let id = state.next_id();
        state.ignored_packages.push(ignored_upstream_package::Model {
            id,
            short_code: code.to_string(),
            package: package.to_string(),
        });
    }

    /// All build references currently stored, for assertions.
    pub fn build_references(&self) -> Vec<build_reference::Model> {
        self.lock().build_references.clone()
    }

    /// Make the next `count` calls to `begin` fail, for error path tests.
    pub fn fail_begins(&self, count: usize) {
        *self
            .failing_begins
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = count;
    }
}

pub struct MemoryTransaction {
    shared: Arc<Mutex<State>>,
    staged: Mutex<State>,
}

impl MemoryTransaction {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

macro_rules! delegate_access {
    ($ty:ty) => {
        #[async_trait]
        impl Access for $ty {
            async fn get_all_short_codes(&self) -> Result<Vec<short_code::Model>, Error> {
                Ok(self.lock().short_codes.clone())
            }

            async fn get_short_code(&self, code: &str) -> Result<short_code::Model, Error> {
                self.lock().get_short_code(code)
            }

            async fn get_products_by_short_code(
                &self,
                code: &str,
            ) -> Result<Vec<product::Model>, Error> {
                Ok(self.lock().get_products_by_short_code(code))
            }

            async fn get_product_by_name_and_short_code(
                &self,
                name: &str,
                code: &str,
            ) -> Result<product::Model, Error> {
                self.lock().get_product_by_name_and_short_code(name, code)
            }

            async fn get_product_by_id(&self, id: i64) -> Result<product::Model, Error> {
                self.lock().get_product_by_id(id)
            }

            async fn get_all_cves(&self) -> Result<Vec<cve::Model>, Error> {
                Ok(self.lock().cves.clone())
            }

            async fn get_all_unresolved_cves(&self) -> Result<Vec<cve::Model>, Error> {
                Ok(self.lock().get_all_unresolved_cves())
            }

            async fn get_cves_with_all_products_fixed(&self) -> Result<Vec<cve::Model>, Error> {
                Ok(self.lock().get_cves_with_all_products_fixed())
            }

            async fn get_cve_by_id(&self, id: &str) -> Result<cve::Model, Error> {
                self.lock().get_cve_by_id(id)
            }

            async fn create_cve(&self, new: NewCve) -> Result<cve::Model, Error> {
                self.lock().create_cve(new)
            }

            async fn update_cve_state(&self, id: &str, state: cve::State) -> Result<(), Error> {
                self.lock().update_cve_state(id, state)
            }

            async fn get_all_affected_products_by_cve(
                &self,
                cve_id: &str,
            ) -> Result<Vec<affected_product::Model>, Error> {
                Ok(self.lock().get_all_affected_products_by_cve(cve_id))
            }

            async fn get_affected_product_by_cve_and_package(
                &self,
                cve_id: &str,
                package: &str,
            ) -> Result<affected_product::Model, Error> {
                self.lock()
                    .get_affected_product_by_cve_and_package(cve_id, package)
            }

            async fn get_affected_product_by_advisory(
                &self,
                advisory: &str,
            ) -> Result<affected_product::Model, Error> {
                self.lock().get_affected_product_by_advisory(advisory)
            }

            async fn create_affected_product(
                &self,
                new: NewAffectedProduct,
            ) -> Result<affected_product::Model, Error> {
                self.lock().create_affected_product(new)
            }

            async fn update_affected_product(
                &self,
                id: i64,
                state: affected_product::State,
                package: &str,
                advisory: Option<String>,
            ) -> Result<(), Error> {
                self.lock().update_affected_product(id, state, package, advisory)
            }

            async fn delete_affected_product(&self, id: i64) -> Result<(), Error> {
                self.lock().delete_affected_product(id)
            }

            async fn create_build_reference(
                &self,
                new: NewBuildReference,
            ) -> Result<build_reference::Model, Error> {
                self.lock().create_build_reference(new)
            }

            async fn get_advisory_by_code_and_year_and_num(
                &self,
                code: &str,
                year: i32,
                num: i32,
            ) -> Result<advisory::Model, Error> {
                self.lock().get_advisory_by_code_and_year_and_num(code, year, num)
            }

            async fn create_advisory(&self, new: NewAdvisory) -> Result<advisory::Model, Error> {
                self.lock().create_advisory(new)
            }

            async fn update_advisory(
                &self,
                id: i64,
                new: NewAdvisory,
            ) -> Result<advisory::Model, Error> {
                self.lock().update_advisory(id, new)
            }

            async fn create_fix(&self, new: NewFix) -> Result<fix::Model, Error> {
                self.lock().create_fix(new)
            }

            async fn create_advisory_reference(
                &self,
                advisory_id: i64,
                url: &str,
            ) -> Result<(), Error> {
                self.lock().create_advisory_reference(advisory_id, url)
            }

            async fn add_advisory_cve(&self, advisory_id: i64, cve_id: &str) -> Result<(), Error> {
                self.lock().add_advisory_cve(advisory_id, cve_id);
                Ok(())
            }

            async fn add_advisory_fix(&self, advisory_id: i64, fix_id: i64) -> Result<(), Error> {
                self.lock().add_advisory_fix(advisory_id, fix_id);
                Ok(())
            }

            async fn add_advisory_rpm(
                &self,
                advisory_id: i64,
                name: &str,
                product_id: i64,
            ) -> Result<(), Error> {
                self.lock().add_advisory_rpm(advisory_id, name, product_id);
                Ok(())
            }

            async fn get_mirror_state(
                &self,
                code: &str,
            ) -> Result<Option<mirror_state::Model>, Error> {
                Ok(self.lock().get_mirror_state(code))
            }

            async fn update_mirror_state(
                &self,
                code: &str,
                last_sync: Option<OffsetDateTime>,
            ) -> Result<(), Error> {
                self.lock().update_mirror_state(code, last_sync);
                Ok(())
            }

            async fn update_mirror_state_errata(
                &self,
                code: &str,
                errata_after: Option<OffsetDateTime>,
            ) -> Result<(), Error> {
                self.lock().update_mirror_state_errata(code, errata_after);
                Ok(())
            }

            async fn get_ignored_packages_by_short_code(
                &self,
                code: &str,
            ) -> Result<Vec<String>, Error> {
                Ok(self.lock().get_ignored_packages_by_short_code(code))
            }
        }
    };
}

delegate_access!(MemoryStore);
delegate_access!(MemoryTransaction);

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, Error> {
        {
            let mut failing = self
                .failing_begins
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *failing > 0 {
                *failing -= 1;
                return Err(Error::Conflict);
            }
        }

        let snapshot = self.lock().clone();
        Ok(Box::new(MemoryTransaction {
            shared: self.state.clone(),
            staged: Mutex::new(snapshot),
        }))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), Error> {
        let staged = self.staged.into_inner().unwrap_or_else(PoisonError::into_inner);
        *self.shared.lock().unwrap_or_else(PoisonError::into_inner) = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_cve(id: &str, state: cve::State) -> NewCve {
        NewCve {
            id: id.to_string(),
            state,
            short_code: "RL".to_string(),
            source_by: Some("Red Hat".to_string()),
            source_link: None,
        }
    }

    fn new_affected_product(cve_id: &str, package: &str, state: affected_product::State) -> NewAffectedProduct {
        NewAffectedProduct {
            product_id: 1,
            cve_id: cve_id.to_string(),
            state,
            version: "8.4".to_string(),
            package: package.to_string(),
            advisory: None,
        }
    }

    #[test_log::test(tokio::test)]
    async fn create_and_get_cve() {
        let store = MemoryStore::new();
        store
            .create_cve(new_cve("CVE-2021-3602", cve::State::NewFromUpstream))
            .await
            .unwrap();

        let cve = store.get_cve_by_id("CVE-2021-3602").await.unwrap();
        assert_eq!(cve.state, cve::State::NewFromUpstream);

        assert!(matches!(
            store.get_cve_by_id("CVE-2021-9999").await,
            Err(Error::NotFound)
        ));
    }

    #[test_log::test(tokio::test)]
    async fn duplicate_cve_is_rejected() {
        let store = MemoryStore::new();
        store
            .create_cve(new_cve("CVE-2021-3602", cve::State::NewFromUpstream))
            .await
            .unwrap();

        assert!(matches!(
            store
                .create_cve(new_cve("CVE-2021-3602", cve::State::NewFromUpstream))
                .await,
            Err(Error::UniqueViolation)
        ));
    }

    #[test_log::test(tokio::test)]
    async fn duplicate_affected_product_is_rejected() {
        let store = MemoryStore::new();
        store
            .create_cve(new_cve("CVE-2021-3602", cve::State::NewFromUpstream))
            .await
            .unwrap();
        store
            .create_affected_product(new_affected_product(
                "CVE-2021-3602",
                "container-tools",
                affected_product::State::AffectedUpstream,
            ))
            .await
            .unwrap();

        assert!(matches!(
            store
                .create_affected_product(new_affected_product(
                    "CVE-2021-3602",
                    "container-tools",
                    affected_product::State::AffectedUpstream,
                ))
                .await,
            Err(Error::UniqueViolation)
        ));
    }

    #[test_log::test(tokio::test)]
    async fn all_products_fixed_selection() {
        let store = MemoryStore::new();
        store
            .create_cve(new_cve("CVE-2021-0001", cve::State::NewFromUpstream))
            .await
            .unwrap();
        store
            .create_cve(new_cve("CVE-2021-0002", cve::State::NewFromUpstream))
            .await
            .unwrap();
        store
            .create_cve(new_cve("CVE-2021-0003", cve::State::NewFromUpstream))
            .await
            .unwrap();

        store
            .create_affected_product(new_affected_product(
                "CVE-2021-0001",
                "cmake",
                affected_product::State::FixedUpstream,
            ))
            .await
            .unwrap();
        store
            .create_affected_product(new_affected_product(
                "CVE-2021-0002",
                "openssl",
                affected_product::State::AffectedUpstream,
            ))
            .await
            .unwrap();

        let candidates = store.get_cves_with_all_products_fixed().await.unwrap();
        let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();

        // only the CVE whose rows are all post-upstream, and only with at least one row
        assert_eq!(ids, vec!["CVE-2021-0001"]);
    }

    #[test_log::test(tokio::test)]
    async fn terminal_cves_are_not_candidates() {
        let store = MemoryStore::new();
        store
            .create_cve(new_cve("CVE-2021-0001", cve::State::ResolvedDownstream))
            .await
            .unwrap();
        store
            .create_affected_product(new_affected_product(
                "CVE-2021-0001",
                "cmake",
                affected_product::State::FixedDownstream,
            ))
            .await
            .unwrap();

        assert!(store
            .get_cves_with_all_products_fixed()
            .await
            .unwrap()
            .is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn mirror_state_upsert() {
        let store = MemoryStore::new();
        assert!(store.get_mirror_state("RL").await.unwrap().is_none());

        let now = OffsetDateTime::now_utc();
        store.update_mirror_state("RL", Some(now)).await.unwrap();
        let state = store.get_mirror_state("RL").await.unwrap().unwrap();
        assert_eq!(state.last_sync, Some(now));
        assert_eq!(state.errata_after, None);

        store
            .update_mirror_state_errata("RL", Some(now))
            .await
            .unwrap();
        let state = store.get_mirror_state("RL").await.unwrap().unwrap();
        assert_eq!(state.last_sync, Some(now));
        assert_eq!(state.errata_after, Some(now));
    }

    #[test_log::test(tokio::test)]
    async fn transaction_rollback_discards_changes() {
        let store = MemoryStore::new();

        let tx = store.begin().await.unwrap();
        tx.create_cve(new_cve("CVE-2021-3602", cve::State::NewFromUpstream))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(matches!(
            store.get_cve_by_id("CVE-2021-3602").await,
            Err(Error::NotFound)
        ));
    }

    #[test_log::test(tokio::test)]
    async fn transaction_commit_publishes_changes() {
        let store = MemoryStore::new();

        let tx = store.begin().await.unwrap();
        tx.create_cve(new_cve("CVE-2021-3602", cve::State::NewFromUpstream))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(store.get_cve_by_id("CVE-2021-3602").await.is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn delete_affected_product_drops_build_references() {
        let store = MemoryStore::new();
        store
            .create_cve(new_cve("CVE-2021-3602", cve::State::NewFromUpstream))
            .await
            .unwrap();
        let ap = store
            .create_affected_product(new_affected_product(
                "CVE-2021-3602",
                "cmake",
                affected_product::State::FixedUpstream,
            ))
            .await
            .unwrap();
        store
            .create_build_reference(NewBuildReference {
                affected_product_id: ap.id,
                rpm: "cmake-0:3.18.2-11.el8_4.x86_64.rpm".to_string(),
                src_rpm: "cmake-0:3.18.2-11.el8_4.src.rpm".to_string(),
                cve_id: "CVE-2021-3602".to_string(),
                build_id: "10".to_string(),
            })
            .await
            .unwrap();

        store.delete_affected_product(ap.id).await.unwrap();
        assert!(store.build_references().is_empty());
    }
}
