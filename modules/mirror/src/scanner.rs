use crate::Mirror;
use apollo_common::rpm::{AdvisoryName, Nvr};
use apollo_entity::{affected_product, cve, product, short_code};
use apollo_store::{Access, Error, NewAffectedProduct, NewCve};
use apollo_upstream::errata::CompactErrata;
use tracing::instrument;

impl Mirror {
    /// Import upstream advisories as CVE entries.
    ///
    /// Security advisories only seed their CVE list; the state refresher
    /// picks the affected products up from the security API later. Bug fix
    /// and enhancement advisories carry no CVE, so the advisory itself is
    /// tracked as a pseudo-CVE, born `ResolvedUpstream`, with its fixed
    /// source packages attached.
    #[instrument(skip_all)]
    pub async fn scan_upstream_errata(&self) {
        let short_codes = match self.store.get_all_short_codes().await {
            Ok(short_codes) => short_codes,
            Err(err) => {
                log::error!("could not get short codes: {err}");
                return;
            }
        };

        for short_code in short_codes {
            if short_code.mode != short_code::Mode::MirrorUpstream {
                continue;
            }
            let Some(prefix) = short_code.upstream_product_prefix.clone() else {
                continue;
            };

            let ignored = match self
                .store
                .get_ignored_packages_by_short_code(&short_code.code)
                .await
            {
                Ok(ignored) => ignored,
                Err(err) => {
                    log::error!("could not get ignored packages: {err}");
                    continue;
                }
            };

            let products = match self.store.get_products_by_short_code(&short_code.code).await {
                Ok(products) => products,
                Err(err) => {
                    log::error!(
                        "could not get products for code {}: {err}",
                        short_code.code
                    );
                    continue;
                }
            };

            for product in products {
                let Some(major) = product.upstream_major_version else {
                    continue;
                };
                if !product.name.starts_with(&prefix) {
                    continue;
                }

                let after = match self.store.get_mirror_state(&short_code.code).await {
                    Ok(state) => state.and_then(|state| state.errata_after),
                    Err(err) => {
                        log::error!(
                            "could not get mirror state for code {}: {err}",
                            short_code.code
                        );
                        continue;
                    }
                };

                let advisories = match self
                    .errata
                    .get_advisories(&product.current_full_version, after)
                    .await
                {
                    Ok(advisories) => advisories,
                    Err(err) => {
                        log::error!("could not get upstream advisories: {err}");
                        continue;
                    }
                };

                // Advisories arrive newest first. The cursor only advances
                // after a clean pass so a failed advisory stays inside the
                // next query window.
                let newest = advisories.first().and_then(CompactErrata::published_at);
                let mut completed = true;

                for advisory in &advisories {
                    let Some(name) = AdvisoryName::parse(&advisory.name) else {
                        log::error!("invalid advisory {}", advisory.name);
                        continue;
                    };

                    let tx = match self.store.begin().await {
                        Ok(tx) => tx,
                        Err(err) => {
                            log::error!("could not begin transaction: {err}");
                            completed = false;
                            continue;
                        }
                    };

                    match tx
                        .get_advisory_by_code_and_year_and_num(&name.prefix, name.year, name.num)
                        .await
                    {
                        Ok(_) => {
                            // Already imported.
                            if let Err(err) = tx.commit().await {
                                log::error!("could not commit advisory tx: {err}");
                                completed = false;
                            }
                            continue;
                        }
                        Err(Error::NotFound) => {}
                        Err(err) => {
                            log::error!("could not fetch advisory: {err}");
                            let _ = tx.rollback().await;
                            completed = false;
                            continue;
                        }
                    }

                    let imported = if advisory.name.starts_with("RHSA") {
                        self.import_security_advisory(tx.as_ref(), &short_code.code, advisory)
                            .await
                    } else if advisory.name.starts_with("RHBA")
                        || advisory.name.starts_with("RHEA")
                    {
                        self.import_bugfix_advisory(tx.as_ref(), &ignored, &product, major, advisory)
                            .await
                    } else {
                        Ok(())
                    };

                    match imported {
                        Ok(()) => {
                            if let Err(err) = tx.commit().await {
                                log::error!("could not commit new advisory tx: {err}");
                                completed = false;
                            }
                        }
                        Err(err) => {
                            log::error!("could not import advisory {}: {err}", advisory.name);
                            let _ = tx.rollback().await;
                            completed = false;
                        }
                    }
                }

                if completed && newest.is_some() {
                    if let Err(err) = self
                        .store
                        .update_mirror_state_errata(&short_code.code, newest)
                        .await
                    {
                        log::error!("could not update errata sync state: {err}");
                    }
                }
            }
        }
    }

    async fn import_security_advisory(
        &self,
        tx: &dyn Access,
        code: &str,
        advisory: &CompactErrata,
    ) -> Result<(), Error> {
        for cve_id in &advisory.cves {
            match tx.get_cve_by_id(cve_id).await {
                Ok(_) => continue,
                Err(Error::NotFound) => {}
                Err(err) => return Err(err),
            }

            let source_link = format!(
                "https://access.redhat.com/hydra/rest/securitydata/cve/{cve_id}.json"
            );
            match tx
                .create_cve(NewCve {
                    id: cve_id.clone(),
                    state: cve::State::NewFromUpstream,
                    short_code: code.to_string(),
                    source_by: Some("Red Hat".to_string()),
                    source_link: Some(source_link),
                })
                .await
            {
                Ok(_) => log::info!("added {cve_id} to {code} ({})", advisory.name),
                Err(Error::UniqueViolation) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn import_bugfix_advisory(
        &self,
        tx: &dyn Access,
        ignored: &[String],
        product: &product::Model,
        major: i32,
        advisory: &CompactErrata,
    ) -> Result<(), Error> {
        match tx.get_affected_product_by_advisory(&advisory.name).await {
            Ok(_) => return Ok(()),
            Err(Error::NotFound) => {}
            Err(err) => return Err(err),
        }
        match tx.get_cve_by_id(&advisory.name).await {
            Ok(_) => return Ok(()),
            Err(Error::NotFound) => {}
            Err(err) => return Err(err),
        }

        let source_link = format!("https://access.redhat.com/errata/{}", advisory.name);
        tx.create_cve(NewCve {
            id: advisory.name.clone(),
            state: cve::State::ResolvedUpstream,
            short_code: product.short_code.clone(),
            source_by: Some("Red Hat".to_string()),
            source_link: Some(source_link),
        })
        .await?;

        let dist = format!("el{major}");
        for srpm in &advisory.affected_packages {
            if !srpm.contains(".src.rpm") {
                continue;
            }
            let pkg = srpm.replacen(".src.rpm", "", 1);

            let package_name = match Nvr::parse(&pkg) {
                Some(nvr) => nvr.name,
                None => pkg.clone(),
            };
            if crate::matches_ignored(ignored, &package_name) {
                continue;
            }
            // Only packages built for this product's major version matter,
            // and satellite builds never ship downstream.
            if !pkg.contains(&dist) || pkg.contains(&format!("{dist}sat")) {
                continue;
            }

            match tx
                .create_affected_product(NewAffectedProduct {
                    product_id: product.id,
                    cve_id: advisory.name.clone(),
                    state: affected_product::State::FixedUpstream,
                    version: product.current_full_version.clone(),
                    package: pkg,
                    advisory: Some(advisory.name.clone()),
                })
                .await
            {
                Ok(_) => {}
                Err(Error::UniqueViolation) => {}
                Err(err) => return Err(err),
            }
        }

        log::info!("added {} to {}", advisory.name, product.short_code);
        Ok(())
    }
}
