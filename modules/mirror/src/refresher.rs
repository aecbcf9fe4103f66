use crate::{matches_ignored, product_state, upstream_product_name, Mirror};
use apollo_common::rpm::{strip_epoch, Nvr};
use apollo_entity::{affected_product, cve, product, short_code};
use apollo_store::{Access, Error, NewAffectedProduct};
use std::collections::HashMap;
use tracing::instrument;

impl Mirror {
    /// Refresh per-product state for unresolved CVEs from upstream detail.
    ///
    /// One transaction covers everything derived for a (CVE, product) pair.
    /// Any store failure rolls the transaction back and moves on to the next
    /// CVE; the next pass retries from upstream data.
    #[instrument(skip_all)]
    pub async fn refresh_cve_state(&self) {
        let cves = match self.store.get_all_unresolved_cves().await {
            Ok(cves) => cves,
            Err(err) => {
                log::error!("could not get unresolved cves: {err}");
                return;
            }
        };

        let mut short_code_buffer: HashMap<String, short_code::Model> = HashMap::new();
        let mut product_buffer: HashMap<String, Vec<product::Model>> = HashMap::new();
        let mut ignored_buffer: HashMap<String, Vec<String>> = HashMap::new();

        'cves: for cve in cves {
            // Pseudo-CVEs carry advisory names and have no upstream detail.
            if !cve.id.starts_with("CVE") {
                continue;
            }

            if !short_code_buffer.contains_key(&cve.short_code) {
                match self.store.get_short_code(&cve.short_code).await {
                    Ok(short_code) => {
                        short_code_buffer.insert(cve.short_code.clone(), short_code);
                    }
                    Err(err) => {
                        log::error!("could not get short code: {err}");
                        continue;
                    }
                }
            }
            if !product_buffer.contains_key(&cve.short_code) {
                match self.store.get_products_by_short_code(&cve.short_code).await {
                    Ok(products) => {
                        product_buffer.insert(cve.short_code.clone(), products);
                    }
                    Err(err) => {
                        log::error!(
                            "could not get products for code {}: {err}",
                            cve.short_code
                        );
                        continue;
                    }
                }
            }
            if !ignored_buffer.contains_key(&cve.short_code) {
                match self
                    .store
                    .get_ignored_packages_by_short_code(&cve.short_code)
                    .await
                {
                    Ok(ignored) => {
                        ignored_buffer.insert(cve.short_code.clone(), ignored);
                    }
                    Err(err) => {
                        log::error!("could not get ignored packages: {err}");
                        continue;
                    }
                }
            }
            let short_code = &short_code_buffer[&cve.short_code];
            let products = &product_buffer[&cve.short_code];
            let ignored = &ignored_buffer[&cve.short_code];

            let detail = match self.security.get_cve(&cve.id).await {
                Ok(detail) => detail,
                Err(err) => {
                    log::error!(
                        "could not retrieve new state for {} from upstream: {err}",
                        cve.id
                    );
                    continue;
                }
            };

            for product in products {
                let Some(major) = product.upstream_major_version else {
                    continue;
                };
                let upstream_name = upstream_product_name(major);

                let tx = match self.store.begin().await {
                    Ok(tx) => tx,
                    Err(err) => {
                        log::error!("could not begin transaction: {err}");
                        continue;
                    }
                };

                let mut skip_cve = false;

                if let Some(releases) = &detail.affected_release {
                    for release in releases
                        .iter()
                        .filter(|release| release.product_name == upstream_name)
                    {
                        let mut state = affected_product::State::FixedUpstream;
                        let mut package = "TBD".to_string();
                        match &release.package {
                            Some(name) => {
                                package = name.clone();
                                if matches_ignored(ignored, name) {
                                    state = affected_product::State::UnknownProductState;
                                }
                            }
                            // No package named means nothing to track.
                            None => state = affected_product::State::UnknownProductState,
                        }

                        skip_cve = self
                            .check_product(
                                tx.as_ref(),
                                &cve,
                                short_code,
                                product,
                                state,
                                &package,
                                Some(release.advisory.clone()),
                            )
                            .await;
                        if skip_cve {
                            break;
                        }
                    }
                }

                if !skip_cve {
                    if let Some(states) = &detail.package_state {
                        for entry in states
                            .iter()
                            .filter(|entry| entry.product_name == upstream_name)
                        {
                            let mut state = product_state(&entry.fix_state);
                            let mut package = "TBD".to_string();
                            if !entry.package_name.is_empty() {
                                package = entry.package_name.clone();
                                if matches_ignored(ignored, &entry.package_name) {
                                    state = affected_product::State::UnknownProductState;
                                }
                            }

                            skip_cve = self
                                .check_product(
                                    tx.as_ref(),
                                    &cve,
                                    short_code,
                                    product,
                                    state,
                                    &package,
                                    None,
                                )
                                .await;
                            if skip_cve {
                                break;
                            }
                        }
                    }
                }

                if skip_cve {
                    let _ = tx.rollback().await;
                    continue 'cves;
                }
                if let Err(err) = tx.commit().await {
                    log::error!("could not commit transaction: {err}");
                }
            }
        }
    }

    /// Upsert one affected-product row derived from upstream data.
    ///
    /// Returns true when the CVE should be skipped, which only store errors
    /// cause. An unsupported product or an already-correct row is a no-op.
    #[allow(clippy::too_many_arguments)]
    async fn check_product(
        &self,
        tx: &dyn Access,
        cve: &cve::Model,
        short_code: &short_code::Model,
        product: &product::Model,
        state: affected_product::State,
        package_name: &str,
        advisory: Option<String>,
    ) -> bool {
        let Some(major) = product.upstream_major_version else {
            return false;
        };
        let prefix = short_code.upstream_product_prefix.as_deref().unwrap_or_default();
        // The downstream counterpart of the upstream product, e.g.
        // "Red Hat Enterprise Linux 8" maps to "Rocky Linux 8" for "RL".
        let mirror_name = format!("{prefix} {major}");

        let existing = match tx
            .get_affected_product_by_cve_and_package(&cve.id, package_name)
            .await
        {
            Ok(row) => Some(row),
            Err(Error::NotFound) => {
                // Upstream may first report a bare package name and later a
                // full NVR. Adopt the bare-name row instead of creating a
                // second one.
                let epochless = strip_epoch(package_name);
                let adopted = match Nvr::parse(&epochless) {
                    Some(nvr) => {
                        match tx
                            .get_affected_product_by_cve_and_package(&cve.id, &nvr.name)
                            .await
                        {
                            Ok(row) => Some(row),
                            Err(Error::NotFound) => None,
                            Err(err) => {
                                log::error!("could not get affected product: {err}");
                                return true;
                            }
                        }
                    }
                    None => None,
                };

                if adopted.is_none() {
                    let mirror_product = match tx
                        .get_product_by_name_and_short_code(&mirror_name, &short_code.code)
                        .await
                    {
                        Ok(product) => product,
                        Err(Error::NotFound) => {
                            log::info!("product {mirror_name} not supported");
                            return false;
                        }
                        Err(err) => {
                            log::error!("could not get product: {err}");
                            return true;
                        }
                    };

                    if state != affected_product::State::UnknownProductState {
                        match tx
                            .create_affected_product(NewAffectedProduct {
                                product_id: mirror_product.id,
                                cve_id: cve.id.clone(),
                                state,
                                version: mirror_product.current_full_version.clone(),
                                package: package_name.to_string(),
                                advisory,
                            })
                            .await
                        {
                            Ok(_) => log::info!(
                                "added product {mirror_name} ({package_name}) to {} with state {state:?}",
                                cve.id
                            ),
                            Err(Error::UniqueViolation) => {}
                            Err(err) => {
                                log::error!("could not create affected product: {err}");
                                return true;
                            }
                        }
                    }
                    return false;
                }
                adopted
            }
            Err(err) => {
                log::error!("could not get affected product: {err}");
                return true;
            }
        };

        let Some(existing) = existing else {
            return false;
        };

        if state == affected_product::State::UnknownProductState {
            // Upstream says not affected: drop the row.
            match tx.delete_affected_product(existing.id).await {
                Ok(()) => log::info!(
                    "product {mirror_name} ({package_name}) not affected by {}",
                    cve.id
                ),
                Err(err) => {
                    log::error!("could not delete unaffected product: {err}");
                    return true;
                }
            }
            return false;
        }

        if existing.state == state {
            return false;
        }
        // A downstream fix already landed; never walk it back to upstream.
        if existing.state == affected_product::State::FixedDownstream
            && state == affected_product::State::FixedUpstream
        {
            return false;
        }

        match tx
            .update_affected_product(existing.id, state, package_name, advisory)
            .await
        {
            Ok(()) => log::info!(
                "updated product {mirror_name} ({package_name}) on {} with state {state:?}",
                cve.id
            ),
            Err(err) => {
                log::error!("could not update affected product state: {err}");
                return true;
            }
        }
        false
    }
}
