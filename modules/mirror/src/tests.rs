use crate::{matches_ignored, Mirror};
use apollo_entity::{affected_product, cve, product, short_code};
use apollo_store::{Access, MemoryStore, NewAffectedProduct, NewCve, Store};
use apollo_upstream::{
    errata::{self, CompactErrata, Errata, ErrataScraper, UpdatedPackages},
    koji::{self, Build, BuildExtra, BuildSystem, TypeInfo},
    security::{self, AffectedRelease, Cve, CveDetail, PackageState, SecurityApi},
};
use std::{collections::HashMap, sync::Arc};
use time::macros::datetime;

struct Harness {
    store: Arc<MemoryStore>,
    security: Arc<security::Mock>,
    errata: Arc<errata::Mock>,
    koji: Arc<koji::Mock>,
    mirror: Mirror,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.add_short_code(short_code::Model {
        code: "RL".to_string(),
        mode: short_code::Mode::MirrorUpstream,
        created_at: datetime!(2021-06-01 00:00 UTC),
        archived_at: None,
        mirror_from_date: Some(datetime!(2021-06-01 00:00 UTC)),
        upstream_product_prefix: Some("Rocky Linux".to_string()),
    });
    store.add_product(product::Model {
        id: 1,
        name: "Rocky Linux 8".to_string(),
        current_full_version: "8.4".to_string(),
        upstream_major_version: Some(8),
        short_code: "RL".to_string(),
        archs: vec!["x86_64".to_string(), "aarch64".to_string()],
        eol_at: None,
    });

    let security = Arc::new(security::Mock::new());
    let errata = Arc::new(errata::Mock::new());
    let koji = Arc::new(koji::Mock::new());

    let mirror = Mirror::new(
        store.clone() as Arc<dyn Store>,
        security.clone() as Arc<dyn SecurityApi>,
        errata.clone() as Arc<dyn ErrataScraper>,
        Some(koji.clone() as Arc<dyn BuildSystem>),
        "dist-rocky8-compose",
    );

    Harness {
        store,
        security,
        errata,
        koji,
        mirror,
    }
}

async fn seed_cve(store: &MemoryStore, id: &str, state: cve::State) -> cve::Model {
    store
        .create_cve(NewCve {
            id: id.to_string(),
            state,
            short_code: "RL".to_string(),
            source_by: Some("Red Hat".to_string()),
            source_link: None,
        })
        .await
        .unwrap()
}

async fn seed_affected(
    store: &MemoryStore,
    cve_id: &str,
    package: &str,
    state: affected_product::State,
    advisory: Option<&str>,
) -> affected_product::Model {
    store
        .create_affected_product(NewAffectedProduct {
            product_id: 1,
            cve_id: cve_id.to_string(),
            state,
            version: "8.4".to_string(),
            package: package.to_string(),
            advisory: advisory.map(str::to_string),
        })
        .await
        .unwrap()
}

fn upstream_cve(id: &str) -> Cve {
    Cve {
        cve: id.to_string(),
        severity: Some("moderate".to_string()),
        public_date: Some("2021-06-22T00:00:00Z".to_string()),
        resource_url: format!("https://access.redhat.com/hydra/rest/securitydata/cve/{id}.json"),
    }
}

fn package_state_detail(fix_state: &str, package: &str) -> CveDetail {
    CveDetail {
        affected_release: None,
        package_state: Some(vec![PackageState {
            product_name: "Red Hat Enterprise Linux 8".to_string(),
            fix_state: fix_state.to_string(),
            package_name: package.to_string(),
        }]),
    }
}

fn cmake_advisory() -> CompactErrata {
    CompactErrata {
        name: "RHBA-2021:2593".to_string(),
        description: "The cmake packages provide the CMake build system.".to_string(),
        synopsis: "cmake bug fix and enhancement update".to_string(),
        severity: "None".to_string(),
        kind: "Bug Fix Advisory".to_string(),
        affected_packages: vec![
            "cmake-3.18.2-11.el8_4.src.rpm".to_string(),
            "cmake-3.18.2-11.el8_4.x86_64.rpm".to_string(),
        ],
        cves: vec![],
        fixes: vec![],
        publication_date: Some("2021-06-29T13:03:43Z".to_string()),
    }
}

fn bind_advisory() -> CompactErrata {
    CompactErrata {
        name: "RHBA-2021:2584".to_string(),
        description: "The bind packages contain the Berkeley Internet Name Domain server."
            .to_string(),
        synopsis: "bind bug fix update".to_string(),
        severity: "None".to_string(),
        kind: "Bug Fix Advisory".to_string(),
        affected_packages: vec!["bind-9.11.26-4.el8_4.src.rpm".to_string()],
        cves: vec![],
        fixes: vec![],
        publication_date: Some("2021-06-22T14:09:07Z".to_string()),
    }
}

fn cmake_rpm(name: &str, arch: &str) -> koji::Rpm {
    koji::Rpm {
        name: name.to_string(),
        arch: arch.to_string(),
        version: "3.18.2".to_string(),
        release: "11.el8_4".to_string(),
        epoch: None,
        build_id: 10,
    }
}

fn cmake_rpms() -> Vec<koji::Rpm> {
    let mut rpms = vec![cmake_rpm("cmake", "src")];
    for arch in ["x86_64", "aarch64"] {
        for name in [
            "cmake",
            "cmake-data",
            "cmake-doc",
            "cmake-filesystem",
            "cmake-gui",
            "cmake-rpm-macros",
        ] {
            rpms.push(cmake_rpm(name, arch));
        }
    }
    rpms.push(cmake_rpm("cmake-gui-debuginfo", "x86_64"));
    rpms
}

fn cmake_build() -> Build {
    Build {
        build_id: 10,
        package_name: "cmake".to_string(),
        version: "3.18.2".to_string(),
        release: "11.el8_4".to_string(),
        epoch: None,
        extra: None,
    }
}

#[test_log::test(tokio::test)]
async fn poller_adds_new_cve() {
    let h = harness();
    h.security.set_cves(vec![upstream_cve("CVE-2021-3602")]);

    h.mirror.poll_upstream_cves().await;

    let cve = h.store.get_cve_by_id("CVE-2021-3602").await.unwrap();
    assert_eq!(cve.state, cve::State::NewFromUpstream);
    assert_eq!(cve.short_code, "RL");
    assert_eq!(cve.source_by.as_deref(), Some("Red Hat"));

    let state = h.store.get_mirror_state("RL").await.unwrap().unwrap();
    assert!(state.last_sync.is_some());
}

#[test_log::test(tokio::test)]
async fn poller_is_idempotent() {
    let h = harness();
    h.security.set_cves(vec![upstream_cve("CVE-2021-3602")]);

    h.mirror.poll_upstream_cves().await;
    h.mirror.poll_upstream_cves().await;

    assert_eq!(h.store.get_all_cves().await.unwrap().len(), 1);
}

#[test_log::test(tokio::test)]
async fn first_poll_without_mirror_from_date_advances_last_sync() {
    let store = Arc::new(MemoryStore::new());
    store.add_short_code(short_code::Model {
        code: "RL".to_string(),
        mode: short_code::Mode::MirrorUpstream,
        created_at: datetime!(2021-06-01 00:00 UTC),
        archived_at: None,
        mirror_from_date: None,
        upstream_product_prefix: Some("Rocky Linux".to_string()),
    });
    store.add_product(product::Model {
        id: 1,
        name: "Rocky Linux 8".to_string(),
        current_full_version: "8.4".to_string(),
        upstream_major_version: Some(8),
        short_code: "RL".to_string(),
        archs: vec!["x86_64".to_string()],
        eol_at: None,
    });
    let mirror = Mirror::new(
        store.clone() as Arc<dyn Store>,
        Arc::new(security::Mock::new()),
        Arc::new(errata::Mock::new()),
        None,
        "dist-rocky8-compose",
    );

    mirror.poll_upstream_cves().await;

    assert!(store.get_all_cves().await.unwrap().is_empty());
    let state = store.get_mirror_state("RL").await.unwrap().unwrap();
    assert!(state.last_sync.is_some());
}

#[test_log::test(tokio::test)]
async fn refresher_affected_creates_row() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3602", cve::State::NewFromUpstream).await;
    h.security
        .set_active_cve(Some(package_state_detail("Affected", "container-tools/2.0")));

    h.mirror.refresh_cve_state().await;

    let row = h
        .store
        .get_affected_product_by_cve_and_package("CVE-2021-3602", "container-tools/2.0")
        .await
        .unwrap();
    assert_eq!(row.state, affected_product::State::AffectedUpstream);
    assert_eq!(row.version, "8.4");
    assert_eq!(row.advisory, None);
}

#[test_log::test(tokio::test)]
async fn refresher_not_affected_deletes_row() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3602", cve::State::NewFromUpstream).await;
    seed_affected(
        &h.store,
        "CVE-2021-3602",
        "container-tools/2.0",
        affected_product::State::AffectedUpstream,
        None,
    )
    .await;
    h.security.set_active_cve(Some(package_state_detail(
        "Not affected",
        "container-tools/2.0",
    )));

    h.mirror.refresh_cve_state().await;

    let rows = h
        .store
        .get_all_affected_products_by_cve("CVE-2021-3602")
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[test_log::test(tokio::test)]
async fn refresher_not_affected_creates_no_row() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3602", cve::State::NewFromUpstream).await;
    h.security.set_active_cve(Some(package_state_detail(
        "Not affected",
        "container-tools/2.0",
    )));

    h.mirror.refresh_cve_state().await;

    let rows = h
        .store
        .get_all_affected_products_by_cve("CVE-2021-3602")
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[test_log::test(tokio::test)]
async fn refresher_out_of_support_scope_creates_row() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3602", cve::State::NewFromUpstream).await;
    h.security.set_active_cve(Some(package_state_detail(
        "Out of support scope",
        "container-tools/1.0",
    )));

    h.mirror.refresh_cve_state().await;

    let row = h
        .store
        .get_affected_product_by_cve_and_package("CVE-2021-3602", "container-tools/1.0")
        .await
        .unwrap();
    assert_eq!(row.state, affected_product::State::OutOfSupportScope);
}

#[test_log::test(tokio::test)]
async fn refresher_affected_release_sets_fixed_upstream() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3600", cve::State::NewFromUpstream).await;
    h.security.set_active_cve(Some(CveDetail {
        affected_release: Some(vec![AffectedRelease {
            product_name: "Red Hat Enterprise Linux 8".to_string(),
            advisory: "RHBA-2021:2593".to_string(),
            package: Some("cmake-3.18.2-11.el8_4".to_string()),
        }]),
        package_state: None,
    }));

    h.mirror.refresh_cve_state().await;

    let row = h
        .store
        .get_affected_product_by_cve_and_package("CVE-2021-3600", "cmake-3.18.2-11.el8_4")
        .await
        .unwrap();
    assert_eq!(row.state, affected_product::State::FixedUpstream);
    assert_eq!(row.advisory.as_deref(), Some("RHBA-2021:2593"));
}

#[test_log::test(tokio::test)]
async fn refresher_release_without_package_creates_no_row() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3600", cve::State::NewFromUpstream).await;
    h.security.set_active_cve(Some(CveDetail {
        affected_release: Some(vec![AffectedRelease {
            product_name: "Red Hat Enterprise Linux 8".to_string(),
            advisory: "RHBA-2021:2593".to_string(),
            package: None,
        }]),
        package_state: None,
    }));

    h.mirror.refresh_cve_state().await;

    let rows = h
        .store
        .get_all_affected_products_by_cve("CVE-2021-3600")
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[test_log::test(tokio::test)]
async fn refresher_keeps_downstream_fix() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3600", cve::State::NewFromUpstream).await;
    let row = seed_affected(
        &h.store,
        "CVE-2021-3600",
        "cmake-3.18.2-11.el8_4",
        affected_product::State::FixedDownstream,
        Some("RHBA-2021:2593"),
    )
    .await;
    h.security.set_active_cve(Some(CveDetail {
        affected_release: Some(vec![AffectedRelease {
            product_name: "Red Hat Enterprise Linux 8".to_string(),
            advisory: "RHBA-2021:2593".to_string(),
            package: Some("cmake-3.18.2-11.el8_4".to_string()),
        }]),
        package_state: None,
    }));

    h.mirror.refresh_cve_state().await;

    let after = h
        .store
        .get_affected_product_by_cve_and_package("CVE-2021-3600", "cmake-3.18.2-11.el8_4")
        .await
        .unwrap();
    assert_eq!(after.id, row.id);
    assert_eq!(after.state, affected_product::State::FixedDownstream);
}

#[test_log::test(tokio::test)]
async fn refresher_adopts_bare_package_row() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3600", cve::State::NewFromUpstream).await;
    let bare = seed_affected(
        &h.store,
        "CVE-2021-3600",
        "cmake",
        affected_product::State::AffectedUpstream,
        None,
    )
    .await;
    h.security.set_active_cve(Some(CveDetail {
        affected_release: Some(vec![AffectedRelease {
            product_name: "Red Hat Enterprise Linux 8".to_string(),
            advisory: "RHBA-2021:2593".to_string(),
            package: Some("cmake-3.18.2-11.el8_4".to_string()),
        }]),
        package_state: None,
    }));

    h.mirror.refresh_cve_state().await;

    let rows = h
        .store
        .get_all_affected_products_by_cve("CVE-2021-3600")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, bare.id);
    assert_eq!(rows[0].package, "cmake-3.18.2-11.el8_4");
    assert_eq!(rows[0].state, affected_product::State::FixedUpstream);
}

#[test_log::test(tokio::test)]
async fn scanner_imports_bugfix_advisory() {
    let h = harness();
    h.errata.set_advisories(vec![cmake_advisory()]);

    h.mirror.scan_upstream_errata().await;

    let cve = h.store.get_cve_by_id("RHBA-2021:2593").await.unwrap();
    assert_eq!(cve.state, cve::State::ResolvedUpstream);
    assert_eq!(
        cve.source_link.as_deref(),
        Some("https://access.redhat.com/errata/RHBA-2021:2593")
    );

    let row = h
        .store
        .get_affected_product_by_advisory("RHBA-2021:2593")
        .await
        .unwrap();
    assert_eq!(row.package, "cmake-3.18.2-11.el8_4");
    assert_eq!(row.state, affected_product::State::FixedUpstream);
    assert_eq!(row.version, "8.4");

    let state = h.store.get_mirror_state("RL").await.unwrap().unwrap();
    assert_eq!(state.errata_after, Some(datetime!(2021-06-29 13:03:43 UTC)));
}

#[test_log::test(tokio::test)]
async fn scanner_is_idempotent() {
    let h = harness();
    h.errata.set_advisories(vec![cmake_advisory()]);

    h.mirror.scan_upstream_errata().await;
    h.mirror.scan_upstream_errata().await;

    assert_eq!(h.store.get_all_cves().await.unwrap().len(), 1);
    let rows = h
        .store
        .get_all_affected_products_by_cve("RHBA-2021:2593")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test_log::test(tokio::test)]
async fn scanner_failed_advisory_holds_back_errata_cursor() {
    let h = harness();
    h.errata
        .set_advisories(vec![cmake_advisory(), bind_advisory()]);

    h.store.fail_begins(1);
    h.mirror.scan_upstream_errata().await;

    assert!(h.store.get_cve_by_id("RHBA-2021:2593").await.is_err());
    assert!(h.store.get_cve_by_id("RHBA-2021:2584").await.is_ok());
    let state = h.store.get_mirror_state("RL").await.unwrap();
    assert!(state.is_none_or(|state| state.errata_after.is_none()));

    h.mirror.scan_upstream_errata().await;

    assert!(h.store.get_cve_by_id("RHBA-2021:2593").await.is_ok());
    let state = h.store.get_mirror_state("RL").await.unwrap().unwrap();
    assert_eq!(state.errata_after, Some(datetime!(2021-06-29 13:03:43 UTC)));
}

#[test_log::test(tokio::test)]
async fn scanner_security_advisory_adds_cves() {
    let h = harness();
    h.errata.set_advisories(vec![CompactErrata {
        name: "RHSA-2021:3016".to_string(),
        description: String::new(),
        synopsis: "Moderate: libuv security update".to_string(),
        severity: "Moderate".to_string(),
        kind: "Security Advisory".to_string(),
        affected_packages: vec!["libuv-1.41.1-1.el8_4.src.rpm".to_string()],
        cves: vec!["CVE-2021-22918".to_string()],
        fixes: vec![],
        publication_date: Some("2021-08-09T09:26:32Z".to_string()),
    }]);

    h.mirror.scan_upstream_errata().await;

    let cve = h.store.get_cve_by_id("CVE-2021-22918").await.unwrap();
    assert_eq!(cve.state, cve::State::NewFromUpstream);
    assert_eq!(
        cve.source_link.as_deref(),
        Some("https://access.redhat.com/hydra/rest/securitydata/cve/CVE-2021-22918.json")
    );
    // Affected products for security advisories come from the refresher.
    let rows = h
        .store
        .get_all_affected_products_by_cve("CVE-2021-22918")
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[test_log::test(tokio::test)]
async fn scanner_skips_advisory_without_source_packages() {
    let h = harness();
    let mut advisory = cmake_advisory();
    advisory.affected_packages = vec!["cmake-3.18.2-11.el8_4.x86_64.rpm".to_string()];
    h.errata.set_advisories(vec![advisory]);

    h.mirror.scan_upstream_errata().await;

    assert!(h.store.get_cve_by_id("RHBA-2021:2593").await.is_ok());
    let rows = h
        .store
        .get_all_affected_products_by_cve("RHBA-2021:2593")
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[test_log::test(tokio::test)]
async fn scanner_ignores_other_major_versions() {
    let h = harness();
    let mut advisory = cmake_advisory();
    advisory.affected_packages = vec![
        "cmake-3.20.2-9.el9.src.rpm".to_string(),
        "cmake-3.18.2-11.el8sat.src.rpm".to_string(),
    ];
    h.errata.set_advisories(vec![advisory]);

    h.mirror.scan_upstream_errata().await;

    let rows = h
        .store
        .get_all_affected_products_by_cve("RHBA-2021:2593")
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[test_log::test(tokio::test)]
async fn matcher_resolves_downstream() {
    let h = harness();
    seed_cve(&h.store, "RHBA-2021:2593", cve::State::ResolvedUpstream).await;
    seed_affected(
        &h.store,
        "RHBA-2021:2593",
        "cmake-3.18.2-11.el8_4",
        affected_product::State::FixedUpstream,
        Some("RHBA-2021:2593"),
    )
    .await;
    h.koji
        .put_tagged("dist-rocky8-compose", "cmake", vec![cmake_build()]);
    h.koji.put_rpms(10, cmake_rpms());

    h.mirror.match_downstream_builds().await;

    let row = h
        .store
        .get_affected_product_by_advisory("RHBA-2021:2593")
        .await
        .unwrap();
    assert_eq!(row.state, affected_product::State::FixedDownstream);

    let references = h.store.build_references();
    assert_eq!(references.len(), 14);
    for reference in &references {
        assert_eq!(reference.build_id, "10");
        assert_eq!(reference.src_rpm, "cmake-0:3.18.2-11.el8_4.src.rpm");
    }

    let cve = h.store.get_cve_by_id("RHBA-2021:2593").await.unwrap();
    assert_eq!(cve.state, cve::State::ResolvedDownstream);
}

#[test_log::test(tokio::test)]
async fn matcher_accepts_downstream_release_suffix() {
    let h = harness();
    seed_cve(&h.store, "RHBA-2021:2593", cve::State::ResolvedUpstream).await;
    seed_affected(
        &h.store,
        "RHBA-2021:2593",
        "cmake-3.18.2-11.el8_4",
        affected_product::State::FixedUpstream,
        Some("RHBA-2021:2593"),
    )
    .await;
    let mut build = cmake_build();
    build.release = "11.el8.rocky".to_string();
    h.koji
        .put_tagged("dist-rocky8-compose", "cmake", vec![build]);
    h.koji.put_rpms(10, cmake_rpms());

    h.mirror.match_downstream_builds().await;

    let row = h
        .store
        .get_affected_product_by_advisory("RHBA-2021:2593")
        .await
        .unwrap();
    assert_eq!(row.state, affected_product::State::FixedDownstream);
}

#[test_log::test(tokio::test)]
async fn matcher_without_build_stays_fixed_upstream() {
    let h = harness();
    seed_cve(&h.store, "RHBA-2021:2593", cve::State::ResolvedUpstream).await;
    seed_affected(
        &h.store,
        "RHBA-2021:2593",
        "cmake-3.18.2-11.el8_4",
        affected_product::State::FixedUpstream,
        Some("RHBA-2021:2593"),
    )
    .await;

    h.mirror.match_downstream_builds().await;

    let row = h
        .store
        .get_affected_product_by_advisory("RHBA-2021:2593")
        .await
        .unwrap();
    assert_eq!(row.state, affected_product::State::FixedUpstream);
    assert!(h.store.build_references().is_empty());

    let cve = h.store.get_cve_by_id("RHBA-2021:2593").await.unwrap();
    assert_eq!(cve.state, cve::State::ResolvedUpstream);
}

#[test_log::test(tokio::test)]
async fn matcher_will_not_fix_only_resolves_without_advisory() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-3602", cve::State::NewFromUpstream).await;
    seed_affected(
        &h.store,
        "CVE-2021-3602",
        "container-tools/2.0",
        affected_product::State::WillNotFixUpstream,
        None,
    )
    .await;

    h.mirror.match_downstream_builds().await;

    let cve = h.store.get_cve_by_id("CVE-2021-3602").await.unwrap();
    assert_eq!(cve.state, cve::State::ResolvedNoAdvisory);
}

#[test_log::test(tokio::test)]
async fn matcher_ignored_package_never_fixed_downstream() {
    let h = harness();
    h.store.add_ignored_package("RL", "firefox*");
    seed_cve(&h.store, "CVE-2021-29980", cve::State::NewFromUpstream).await;
    seed_affected(
        &h.store,
        "CVE-2021-29980",
        "firefox-91.0.1-1.el8_4",
        affected_product::State::FixedUpstream,
        None,
    )
    .await;

    h.mirror.match_downstream_builds().await;

    let rows = h
        .store
        .get_all_affected_products_by_cve("CVE-2021-29980")
        .await
        .unwrap();
    assert_eq!(rows[0].state, affected_product::State::FixedUpstream);
    assert!(h.store.build_references().is_empty());

    let cve = h.store.get_cve_by_id("CVE-2021-29980").await.unwrap();
    assert_eq!(cve.state, cve::State::ResolvedNoAdvisory);
}

#[test]
fn malformed_ignore_glob_matches_nothing() {
    let ignored = vec!["[".to_string(), "firefox*".to_string()];
    assert!(matches_ignored(&ignored, "firefox-91.0.1-1.el8_4"));
    assert!(!matches_ignored(&ignored, "cmake"));
}

#[test_log::test(tokio::test)]
async fn matcher_tolerates_malformed_ignore_glob() {
    let h = harness();
    h.store.add_ignored_package("RL", "[");
    seed_cve(&h.store, "RHBA-2021:2593", cve::State::ResolvedUpstream).await;
    seed_affected(
        &h.store,
        "RHBA-2021:2593",
        "cmake-3.18.2-11.el8_4",
        affected_product::State::FixedUpstream,
        Some("RHBA-2021:2593"),
    )
    .await;
    h.koji
        .put_tagged("dist-rocky8-compose", "cmake", vec![cmake_build()]);
    h.koji.put_rpms(10, cmake_rpms());

    h.mirror.match_downstream_builds().await;

    let row = h
        .store
        .get_affected_product_by_advisory("RHBA-2021:2593")
        .await
        .unwrap();
    assert_eq!(row.state, affected_product::State::FixedDownstream);

    let cve = h.store.get_cve_by_id("RHBA-2021:2593").await.unwrap();
    assert_eq!(cve.state, cve::State::ResolvedDownstream);
}

#[test_log::test(tokio::test)]
async fn matcher_skips_module_content_decoys() {
    let h = harness();
    seed_cve(&h.store, "RHBA-2021:2593", cve::State::ResolvedUpstream).await;
    seed_affected(
        &h.store,
        "RHBA-2021:2593",
        "cmake-3.18.2-11.el8_4",
        affected_product::State::FixedUpstream,
        Some("RHBA-2021:2593"),
    )
    .await;
    let mut build = cmake_build();
    build.extra = Some(BuildExtra {
        typeinfo: Some(TypeInfo),
    });
    h.koji
        .put_tagged("dist-rocky8-compose", "cmake", vec![build]);

    h.mirror.match_downstream_builds().await;

    let row = h
        .store
        .get_affected_product_by_advisory("RHBA-2021:2593")
        .await
        .unwrap();
    assert_eq!(row.state, affected_product::State::FixedUpstream);

    let cve = h.store.get_cve_by_id("RHBA-2021:2593").await.unwrap();
    assert_eq!(cve.state, cve::State::ResolvedUpstream);
}

#[test_log::test(tokio::test)]
async fn matcher_module_package_uses_advisory_source_packages() {
    let h = harness();
    seed_cve(&h.store, "CVE-2021-20188", cve::State::NewFromUpstream).await;
    seed_affected(
        &h.store,
        "CVE-2021-20188",
        "podman-1.6.4-26.module+el8.4.0+10607+f4da7515",
        affected_product::State::FixedUpstream,
        Some("RHSA-2021:2437"),
    )
    .await;

    let mut affected_products = HashMap::new();
    affected_products.insert(
        "Red Hat Enterprise Linux for x86_64 8".to_string(),
        UpdatedPackages {
            srpms: vec!["podman-1.6.4-26.module+el8.4.0+10607+f4da7515.src.rpm".to_string()],
            packages: HashMap::new(),
        },
    );
    h.errata.put_errata(
        "RHSA-2021:2437",
        Errata {
            affected_products,
            ..Default::default()
        },
    );

    h.koji.put_package("podman", 42);
    h.koji.put_builds(
        42,
        vec![Build {
            build_id: 77,
            package_name: "podman".to_string(),
            version: "1.6.4".to_string(),
            release: "26.module+el8.4.0+555+aaaaaaaa".to_string(),
            epoch: None,
            extra: None,
        }],
    );
    h.koji.put_rpms(
        77,
        vec![
            koji::Rpm {
                name: "podman".to_string(),
                arch: "src".to_string(),
                version: "1.6.4".to_string(),
                release: "26.module+el8.4.0+555+aaaaaaaa".to_string(),
                epoch: None,
                build_id: 77,
            },
            koji::Rpm {
                name: "podman".to_string(),
                arch: "x86_64".to_string(),
                version: "1.6.4".to_string(),
                release: "26.module+el8.4.0+555+aaaaaaaa".to_string(),
                epoch: None,
                build_id: 77,
            },
        ],
    );

    h.mirror.match_downstream_builds().await;

    let rows = h
        .store
        .get_all_affected_products_by_cve("CVE-2021-20188")
        .await
        .unwrap();
    assert_eq!(rows[0].state, affected_product::State::FixedDownstream);
    assert_eq!(h.store.build_references().len(), 2);

    let cve = h.store.get_cve_by_id("CVE-2021-20188").await.unwrap();
    assert_eq!(cve.state, cve::State::ResolvedDownstream);
}

#[test_log::test(tokio::test)]
async fn matcher_disabled_without_build_system() {
    let h = harness();
    let mirror = Mirror::new(
        h.store.clone() as Arc<dyn Store>,
        h.security.clone() as Arc<dyn SecurityApi>,
        h.errata.clone() as Arc<dyn ErrataScraper>,
        None,
        "dist-rocky8-compose",
    );
    seed_cve(&h.store, "CVE-2021-3602", cve::State::NewFromUpstream).await;
    seed_affected(
        &h.store,
        "CVE-2021-3602",
        "container-tools/2.0",
        affected_product::State::FixedUpstream,
        None,
    )
    .await;

    mirror.match_downstream_builds().await;

    let cve = h.store.get_cve_by_id("CVE-2021-3602").await.unwrap();
    assert_eq!(cve.state, cve::State::NewFromUpstream);
}
