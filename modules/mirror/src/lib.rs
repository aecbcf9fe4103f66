//! The four mirroring workers.
//!
//! [`Mirror`] owns the store and the upstream clients. Each worker is a
//! method that performs one full pass; [`server::run`] drives the four
//! workers on their configured intervals.

pub mod matcher;
pub mod poller;
pub mod refresher;
pub mod scanner;
pub mod server;

#[cfg(test)]
mod tests;

use apollo_entity::affected_product;
use apollo_store::Store;
use apollo_upstream::{errata::ErrataScraper, koji::BuildSystem, security::SecurityApi};
use std::sync::Arc;

pub struct Mirror {
    store: Arc<dyn Store>,
    security: Arc<dyn SecurityApi>,
    errata: Arc<dyn ErrataScraper>,
    build_system: Option<Arc<dyn BuildSystem>>,
    compose_tag: String,
}

impl Mirror {
    pub fn new(
        store: Arc<dyn Store>,
        security: Arc<dyn SecurityApi>,
        errata: Arc<dyn ErrataScraper>,
        build_system: Option<Arc<dyn BuildSystem>>,
        compose_tag: impl Into<String>,
    ) -> Self {
        Self {
            store,
            security,
            errata,
            build_system,
            compose_tag: compose_tag.into(),
        }
    }
}

/// The upstream product name tracked for a major version, e.g.
/// `"Red Hat Enterprise Linux 8"`.
fn upstream_product_name(major: i32) -> String {
    format!("Red Hat Enterprise Linux {major}")
}

/// The per-architecture product label used in upstream advisory package
/// tables. An unrecognized architecture yields a label that matches no
/// table section.
fn upstream_product_name_for_arch(arch: &str, major: i32) -> String {
    let arch = match arch {
        "x86_64" => "x86_64",
        "aarch64" => "ARM 64",
        "ppc64le" => "Power, little endian",
        "s390x" => "IBM z Systems",
        other => other,
    };
    format!("Red Hat Enterprise Linux for {arch} {major}")
}

/// Map upstream's free-form fix state onto an affected-product state.
/// Unrecognized strings are never treated as resolved.
fn product_state(fix_state: &str) -> affected_product::State {
    match fix_state {
        "Under investigation" => affected_product::State::UnderInvestigationUpstream,
        "Not affected" => affected_product::State::UnknownProductState,
        "Will not fix" => affected_product::State::WillNotFixUpstream,
        "Out of support scope" => affected_product::State::OutOfSupportScope,
        "Affected" => affected_product::State::AffectedUpstream,
        _ => affected_product::State::UnderInvestigationUpstream,
    }
}

/// Whether a package name matches any of the short code's ignore globs.
/// A malformed glob is a data error: it is logged and never matches.
fn matches_ignored(ignored: &[String], package: &str) -> bool {
    for pattern in ignored {
        match glob::Pattern::new(pattern) {
            Ok(pattern) if pattern.matches(package) => return true,
            Ok(_) => {}
            Err(err) => log::error!("invalid ignore glob {pattern}: {err}"),
        }
    }
    false
}
