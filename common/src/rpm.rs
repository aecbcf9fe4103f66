use regex::Regex;
use std::sync::LazyLock;

static NVR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)-([\w~%.+^]+)-(\w+(?:\.[\w~%+^]+)+?)(?:\.(\w+))?(?:\.rpm)?$")
        .expect("hardcoded regex")
});

static EPOCH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+):").expect("hardcoded regex"));

static DIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.el\d+(?:_\d+)?)").expect("hardcoded regex"));

static MODULE_DIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.module.+$").expect("hardcoded regex"));

static ADVISORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)([SEB]A)-([0-9]{4}):([0-9]+)$").expect("hardcoded regex"));

/// A package name split into its name, version and release components.
///
/// A trailing architecture or dist remainder, as well as an `.rpm` suffix,
/// is split off into `suffix`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Nvr {
    pub name: String,
    pub version: String,
    pub release: String,
    pub suffix: Option<String>,
}

impl Nvr {
    pub fn parse(s: &str) -> Option<Self> {
        let caps = NVR.captures(s)?;
        Some(Self {
            name: caps[1].to_string(),
            version: caps[2].to_string(),
            release: caps[3].to_string(),
            suffix: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }

    /// The release joined with the trailing suffix, as it appeared in the
    /// original string.
    pub fn joined_release(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}.{}", self.release, suffix),
            None => self.release.clone(),
        }
    }
}

/// Whether a package string looks like a valid NVR at all.
pub fn is_nvr(s: &str) -> bool {
    NVR.is_match(s)
}

/// Remove a leading `epoch:` marker from a package string.
pub fn strip_epoch(s: &str) -> String {
    EPOCH.replace_all(s, "").into_owned()
}

/// Whether a package string refers to a module stream build.
pub fn is_module(s: &str) -> bool {
    s.contains(".module")
}

/// Remove the dist tag and any module release bits from a release string.
///
/// Downstream rebuilds do not always match the upstream dist tag, and module
/// releases carry a long platform suffix that never matches downstream.
pub fn release_without_dist(release: &str) -> String {
    let release = DIST.replace_all(release, "");
    MODULE_DIST.replace_all(&release, "").into_owned()
}

/// Check whether a downstream build matches an upstream NVR.
///
/// Only the release prefix is compared since downstream builds may append
/// their own suffix, such as `.1` or `.rocky`, to modified packages.
pub fn nvr_identical(upstream: &Nvr, package_name: &str, version: &str, release: &str) -> bool {
    let joined = upstream.joined_release();
    let joined = release_without_dist(joined.trim_end_matches('.'));
    let build_release = release_without_dist(release);

    upstream.name == package_name
        && upstream.version == version
        && build_release.starts_with(&joined)
}

/// An errata advisory name such as `RHBA-2021:2593`, split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvisoryName {
    pub prefix: String,
    pub kind: AdvisoryKind,
    pub year: i32,
    pub num: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdvisoryKind {
    Security,
    BugFix,
    Enhancement,
}

impl AdvisoryName {
    pub fn parse(s: &str) -> Option<Self> {
        let caps = ADVISORY.captures(s)?;
        let kind = match &caps[2] {
            "SA" => AdvisoryKind::Security,
            "BA" => AdvisoryKind::BugFix,
            "EA" => AdvisoryKind::Enhancement,
            _ => return None,
        };
        Some(Self {
            prefix: caps[1].to_string(),
            kind,
            year: caps[3].parse().ok()?,
            num: caps[4].parse().ok()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_srpm_nvr() {
        let nvr = Nvr::parse("cmake-3.18.2-11.el8_4.src.rpm").unwrap();
        assert_eq!(nvr.name, "cmake");
        assert_eq!(nvr.version, "3.18.2");
        assert_eq!(nvr.release, "11.el8_4");
        assert_eq!(nvr.suffix.as_deref(), Some("src"));
    }

    #[test]
    fn parse_plain_nvr() {
        let nvr = Nvr::parse("kernel-4.18.0-305.el8").unwrap();
        assert_eq!(nvr.name, "kernel");
        assert_eq!(nvr.version, "4.18.0");
        assert_eq!(nvr.joined_release(), "305.el8");
    }

    #[test]
    fn parse_rejects_bare_name() {
        assert!(Nvr::parse("cmake").is_none());
        assert!(!is_nvr("cmake"));
    }

    #[test]
    fn epoch_is_stripped() {
        assert_eq!(
            strip_epoch("openssl-1:1.1.1g-15.el8_3"),
            "openssl-1.1.1g-15.el8_3"
        );
        assert_eq!(strip_epoch("cmake-3.18.2-11.el8_4"), "cmake-3.18.2-11.el8_4");
    }

    #[test]
    fn module_detection() {
        assert!(!is_module("cmake-3.18.2-11.el8_4"));
        assert!(is_module("podman-1.6.4-26.module+el8.4.0+10607+f4da7515"));
    }

    #[test]
    fn dist_tag_removed() {
        assert_eq!(release_without_dist("11.el8_4"), "11");
        assert_eq!(release_without_dist("11.el8"), "11");
        assert_eq!(
            release_without_dist("26.module+el8.4.0+10607+f4da7515"),
            "26"
        );
    }

    #[test]
    fn identical_despite_dist_tag_drift() {
        let upstream = Nvr::parse("cmake-3.18.2-11.el8_4.src.rpm").unwrap();
        assert!(nvr_identical(&upstream, "cmake", "3.18.2", "11.el8"));
        assert!(nvr_identical(&upstream, "cmake", "3.18.2", "11.el8_4"));
    }

    #[test]
    fn identical_with_downstream_suffix() {
        let upstream = Nvr::parse("openssl-1.1.1g-15.el8_3").unwrap();
        assert!(nvr_identical(&upstream, "openssl", "1.1.1g", "15.el8.rocky"));
        assert!(nvr_identical(&upstream, "openssl", "1.1.1g", "15.el8_3.1"));
    }

    #[test]
    fn different_version_is_not_identical() {
        let upstream = Nvr::parse("cmake-3.18.2-11.el8_4.src.rpm").unwrap();
        assert!(!nvr_identical(&upstream, "cmake", "3.18.3", "11.el8_4"));
        assert!(!nvr_identical(&upstream, "cmake3", "3.18.2", "11.el8_4"));
    }

    #[test]
    fn parse_advisory_name() {
        let advisory = AdvisoryName::parse("RHBA-2021:2593").unwrap();
        assert_eq!(advisory.prefix, "RH");
        assert_eq!(advisory.kind, AdvisoryKind::BugFix);
        assert_eq!(advisory.year, 2021);
        assert_eq!(advisory.num, 2593);

        let advisory = AdvisoryName::parse("RHSA-2021:3016").unwrap();
        assert_eq!(advisory.kind, AdvisoryKind::Security);

        assert!(AdvisoryName::parse("CVE-2021-3602").is_none());
    }
}
