use crate::{matches_ignored, upstream_product_name_for_arch, Mirror};
use apollo_common::rpm::{is_module, nvr_identical, strip_epoch, Nvr};
use apollo_entity::{affected_product, cve, product};
use apollo_store::{Access, NewBuildReference};
use apollo_upstream::koji::{BuildSystem, Rpm};
use std::collections::HashMap;
use tracing::instrument;

/// Outcome of a build-system check for one package.
enum BuildStatus {
    Fixed,
    NotFixed,
    WillNotFix,
    Skip,
}

impl Mirror {
    /// Close out CVEs whose upstream work is done by matching their fixed
    /// packages against downstream builds.
    ///
    /// Candidates are CVEs whose affected products all reached a
    /// post-upstream state. Each gets one transaction; any external or store
    /// failure rolls it back so the next pass can retry cleanly.
    #[instrument(skip_all)]
    pub async fn match_downstream_builds(&self) {
        let Some(build_system) = &self.build_system else {
            log::info!("automatic build checks are disabled, no build system endpoint configured");
            return;
        };

        let cves = match self.store.get_cves_with_all_products_fixed().await {
            Ok(cves) => cves,
            Err(err) => {
                log::error!("could not get fixed cves: {err}");
                return;
            }
        };

        let mut product_buffer: HashMap<i64, product::Model> = HashMap::new();
        let mut ignored_buffer: HashMap<String, Vec<String>> = HashMap::new();

        for cve in cves {
            let affected = match self.store.get_all_affected_products_by_cve(&cve.id).await {
                Ok(affected) => affected,
                Err(err) => {
                    log::error!("could not get all affected products by {}: {err}", cve.id);
                    continue;
                }
            };

            let tx = match self.store.begin().await {
                Ok(tx) => tx,
                Err(err) => {
                    log::error!("could not begin transaction: {err}");
                    continue;
                }
            };

            let mut did_skip = false;
            let mut will_not_fix_only = true;
            let mut all_fixed = true;

            for row in &affected {
                match row.state {
                    affected_product::State::WillNotFixUpstream
                    | affected_product::State::OutOfSupportScope
                    | affected_product::State::WillNotFixDownstream => continue,
                    affected_product::State::FixedDownstream => {
                        will_not_fix_only = false;
                        continue;
                    }
                    affected_product::State::FixedUpstream => {}
                    _ => {
                        all_fixed = false;
                        will_not_fix_only = false;
                        continue;
                    }
                }

                if !product_buffer.contains_key(&row.product_id) {
                    match self.store.get_product_by_id(row.product_id).await {
                        Ok(product) => {
                            product_buffer.insert(row.product_id, product);
                        }
                        Err(err) => {
                            log::error!(
                                "could not get product with id {}: {err}",
                                row.product_id
                            );
                            did_skip = true;
                            break;
                        }
                    }
                }
                let product = &product_buffer[&row.product_id];
                let Some(major) = product.upstream_major_version else {
                    continue;
                };

                if !ignored_buffer.contains_key(&product.short_code) {
                    match self
                        .store
                        .get_ignored_packages_by_short_code(&product.short_code)
                        .await
                    {
                        Ok(ignored) => {
                            ignored_buffer.insert(product.short_code.clone(), ignored);
                        }
                        Err(err) => {
                            log::error!("could not get ignored packages: {err}");
                            did_skip = true;
                            break;
                        }
                    }
                }
                let ignored = &ignored_buffer[&product.short_code];

                let mut skip_product = false;

                let nvr_only = row.package.replacen(':', "-", 1);
                if is_module(&nvr_only) {
                    // Module builds carry a generated dist suffix that never
                    // appears downstream verbatim, so the upstream advisory's
                    // source packages are matched instead.
                    match &row.advisory {
                        None => skip_product = true,
                        Some(advisory) => match self.errata.get_errata(advisory).await {
                            Err(err) => {
                                log::error!("could not get upstream advisory {advisory}: {err}");
                                skip_product = true;
                            }
                            Ok(errata) => {
                                for arch in &product.archs {
                                    let label = upstream_product_name_for_arch(arch, major);
                                    let Some(updated) = errata.affected_products.get(&label)
                                    else {
                                        continue;
                                    };
                                    for srpm in &updated.srpms {
                                        match self
                                            .check_build(
                                                tx.as_ref(),
                                                build_system.as_ref(),
                                                ignored,
                                                srpm,
                                                row,
                                            )
                                            .await
                                        {
                                            BuildStatus::Skip => {
                                                skip_product = true;
                                                break;
                                            }
                                            BuildStatus::Fixed => will_not_fix_only = false,
                                            BuildStatus::NotFixed => {
                                                all_fixed = false;
                                                will_not_fix_only = false;
                                            }
                                            BuildStatus::WillNotFix => {}
                                        }
                                    }
                                    break;
                                }
                            }
                        },
                    }
                } else {
                    let nvr_only = strip_epoch(&row.package);
                    match self
                        .check_build(tx.as_ref(), build_system.as_ref(), ignored, &nvr_only, row)
                        .await
                    {
                        BuildStatus::Skip => skip_product = true,
                        BuildStatus::Fixed => will_not_fix_only = false,
                        BuildStatus::NotFixed => {
                            all_fixed = false;
                            will_not_fix_only = false;
                        }
                        BuildStatus::WillNotFix => {}
                    }
                }

                if skip_product {
                    log::info!("{}: skipping package for now", row.package);
                    did_skip = true;
                    break;
                }
            }

            if did_skip {
                if let Err(err) = tx.rollback().await {
                    log::error!("could not rollback transaction: {err}");
                }
                continue;
            }

            let mut new_state = cve::State::ResolvedUpstream;
            if all_fixed {
                new_state = cve::State::ResolvedDownstream;
            }
            if will_not_fix_only {
                new_state = cve::State::ResolvedNoAdvisory;
            }

            if let Err(err) = tx.update_cve_state(&cve.id, new_state).await {
                log::error!("could not save new cve state: {err}");
                let _ = tx.rollback().await;
                continue;
            }
            match tx.commit().await {
                Ok(()) => log::info!("{} is now set to {new_state:?}", cve.id),
                Err(err) => log::error!("could not commit transaction: {err}"),
            }
        }
    }

    /// Check the build system for a downstream build matching `nvr_only`.
    ///
    /// On the first matching build the row is marked `FixedDownstream` and
    /// every RPM of the build is recorded as a build reference.
    async fn check_build(
        &self,
        tx: &dyn Access,
        build_system: &dyn BuildSystem,
        ignored: &[String],
        nvr_only: &str,
        row: &affected_product::Model,
    ) -> BuildStatus {
        let Some(nvr) = Nvr::parse(nvr_only) else {
            log::error!("invalid NVR {nvr_only}");
            return BuildStatus::Skip;
        };

        if matches_ignored(ignored, &nvr.name) {
            return BuildStatus::WillNotFix;
        }

        let tagged = if is_module(nvr_only) {
            // Module content is not tagged into the compose, so go through
            // the package's full build list.
            let package_id = match build_system.get_package_id(&nvr.name).await {
                Ok(package_id) => package_id,
                Err(err) => {
                    log::error!("could not get package information from build system: {err}");
                    return BuildStatus::Skip;
                }
            };
            match build_system.list_builds(package_id).await {
                Ok(builds) => builds,
                Err(err) => {
                    log::error!("could not get builds from build system: {err}");
                    return BuildStatus::Skip;
                }
            }
        } else {
            match build_system.list_tagged(&self.compose_tag, &nvr.name).await {
                Ok(builds) => builds,
                Err(err) => {
                    log::error!(
                        "could not get tagged builds for package {}: {err}",
                        nvr.name
                    );
                    return BuildStatus::Skip;
                }
            }
        };

        // No builds usually means we do not ship that package.
        if tagged.is_empty() {
            log::error!("no valid builds found for package {}", nvr.name);
            return BuildStatus::NotFixed;
        }

        for build in &tagged {
            // Content inserted by the module build service, not a real build.
            if build.is_module_content() {
                continue;
            }
            if !nvr_identical(&nvr, &build.package_name, &build.version, &build.release) {
                continue;
            }

            log::info!(
                "{} has been fixed downstream with build {} ({}-{}-{})",
                row.cve_id,
                build.build_id,
                build.package_name,
                build.version,
                build.release
            );

            if let Err(err) = tx
                .update_affected_product(
                    row.id,
                    affected_product::State::FixedDownstream,
                    &row.package,
                    row.advisory.clone(),
                )
                .await
            {
                log::error!("could not update affected product {}: {err}", row.id);
                return BuildStatus::Skip;
            }

            let rpms = match build_system.list_rpms(build.build_id).await {
                Ok(rpms) => rpms,
                Err(err) => {
                    log::error!("could not get rpms from build system: {err}");
                    return BuildStatus::Skip;
                }
            };

            let src_rpm = rpms
                .iter()
                .find(|rpm| rpm.arch == "src")
                .map(rpm_file_name)
                .unwrap_or_default();

            // Every RPM of the build becomes a reference, this is what the
            // "affected packages" section of a published advisory lists.
            for rpm in &rpms {
                let reference = NewBuildReference {
                    affected_product_id: row.id,
                    rpm: rpm_file_name(rpm),
                    src_rpm: src_rpm.clone(),
                    cve_id: row.cve_id.clone(),
                    build_id: build.build_id.to_string(),
                };
                if let Err(err) = tx.create_build_reference(reference).await {
                    log::error!("could not create build reference: {err}");
                    return BuildStatus::Skip;
                }
            }

            return BuildStatus::Fixed;
        }

        log::error!("{} has not been fixed for NVR {nvr_only}", row.cve_id);
        BuildStatus::NotFixed
    }
}

/// The file name a repository would carry for this RPM.
fn rpm_file_name(rpm: &Rpm) -> String {
    format!(
        "{}-{}:{}-{}.{}.rpm",
        rpm.name,
        rpm.epoch.unwrap_or(0),
        rpm.version,
        rpm.release,
        rpm.arch
    )
}
