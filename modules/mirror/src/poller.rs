use crate::Mirror;
use apollo_entity::{cve, short_code};
use apollo_store::{Error, NewCve};
use time::OffsetDateTime;
use tracing::instrument;

impl Mirror {
    /// Discover new upstream CVEs for every mirrored short code.
    ///
    /// The last successful sync time bounds the upstream query. It only
    /// advances after a product's pass completes, so a failed pass re-covers
    /// the same window on the next run.
    #[instrument(skip_all)]
    pub async fn poll_upstream_cves(&self) {
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

                let last_sync = match self.store.get_mirror_state(&short_code.code).await {
                    Ok(state) => state.and_then(|state| state.last_sync),
                    Err(err) => {
                        log::error!(
                            "could not get last sync for code {}: {err}",
                            short_code.code
                        );
                        continue;
                    }
                };
                // Without a sync point or a configured mirror-from date the
                // first poll discovers nothing historical.
                let after = last_sync
                    .or(short_code.mirror_from_date)
                    .unwrap_or_else(OffsetDateTime::now_utc);

                let found = match self
                    .security
                    .list_cves(&crate::upstream_product_name(major), Some(after.date()))
                    .await
                {
                    Ok(found) => found,
                    Err(err) => {
                        log::error!("could not get cves: {err}");
                        continue;
                    }
                };

                let mut aborted = false;
                for upstream in found {
                    match self.store.get_cve_by_id(&upstream.cve).await {
                        Ok(_) => continue,
                        Err(Error::NotFound) => {}
                        Err(err) => {
                            log::error!("could not get cve {}: {err}", upstream.cve);
                            aborted = true;
                            break;
                        }
                    }

                    match self
                        .store
                        .create_cve(NewCve {
                            id: upstream.cve.clone(),
                            state: cve::State::NewFromUpstream,
                            short_code: short_code.code.clone(),
                            source_by: Some("Red Hat".to_string()),
                            source_link: Some(upstream.resource_url.clone()),
                        })
                        .await
                    {
                        Ok(_) => log::info!(
                            "added {} to {} with state NewFromUpstream",
                            upstream.cve,
                            short_code.code
                        ),
                        Err(Error::UniqueViolation) => {}
                        Err(err) => {
                            log::error!("could not create cve: {err}");
                            aborted = true;
                            break;
                        }
                    }
                }
                if aborted {
                    continue;
                }

                if let Err(err) = self
                    .store
                    .update_mirror_state(&short_code.code, Some(OffsetDateTime::now_utc()))
                    .await
                {
                    log::error!("could not update mirroring state: {err}");
                }
            }
        }
    }
}
