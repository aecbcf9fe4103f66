//! Regex based extraction for advisory pages.
//!
//! The pages are server rendered with stable element ids per section, so the
//! extraction slices the document by section id and pulls out paragraphs,
//! list items and package table cells.

use super::{Errata, Fix, Kind, Severity, UpdatedPackages};
use crate::Error;
use regex::Regex;
use std::sync::LazyLock;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p[^>]*>(.*?)</p>").expect("hardcoded regex"));

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<li[^>]*>(.*?)</li>").expect("hardcoded regex"));

static DETAILS_ISSUED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<dl[^>]*class="details"[^>]*>.*?<dd[^>]*>(.*?)</dd>"#).expect("hardcoded regex"));

static PACKAGE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<h2[^>]*>(?P<product>[^<]+)</h2>|<td[^>]*class="name"[^>]*>(?P<name>.*?)</td>"#)
        .expect("hardcoded regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("hardcoded regex"));

const ISSUED_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Slice out the section with the given element id. The advisory pages put
/// each section in a sibling `div`, so the next `<div id=` marks the end.
fn section<'a>(html: &'a str, id: &str) -> Option<&'a str> {
    let marker = format!("id=\"{id}\"");
    let start = html.find(&marker)? + marker.len();
    let rest = &html[start..];
    match rest.find("<div id=\"") {
        Some(end) => Some(&rest[..end]),
        None => Some(rest),
    }
}

fn strip_tags(fragment: &str) -> String {
    let fragment = fragment.replace("<br>", "\n").replace("<br/>", "\n");
    let text = TAG.replace_all(&fragment, "");
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .trim()
        .to_string()
}

fn paragraphs(fragment: &str) -> Vec<String> {
    PARAGRAPH
        .captures_iter(fragment)
        .map(|caps| strip_tags(&caps[1]))
        .collect()
}

fn list_items(fragment: &str) -> Vec<String> {
    LIST_ITEM
        .captures_iter(fragment)
        .map(|caps| strip_tags(&caps[1]))
        .collect()
}

fn parse_type_severity(errata: &mut Errata, text: &str) -> Result<(), Error> {
    let parts: Vec<&str> = text.split(':').collect();

    if parts[0] == "Product Enhancement Advisory" {
        errata.kind = Kind::Enhancement;
        return Ok(());
    }
    if parts[0] == "Bug Fix Advisory" {
        errata.kind = Kind::BugFix;
        return Ok(());
    }

    if parts.len() != 2 {
        return Err(Error::Payload(format!("invalid type/severity: {text}")));
    }

    match parts[0].split(' ').next() {
        Some("Security") => errata.kind = Kind::Security,
        Some("BugFix") => errata.kind = Kind::BugFix,
        Some("Enhancement") => errata.kind = Kind::Enhancement,
        _ => return Err(Error::Payload(format!("invalid type: {text}"))),
    }

    errata.severity = match parts[1].trim() {
        "Low" => Severity::Low,
        "Moderate" => Severity::Moderate,
        "Important" => Severity::Important,
        "Critical" => Severity::Critical,
        _ => Severity::None,
    };

    Ok(())
}

fn arch_of(package: &str) -> Option<&'static str> {
    if package.contains(".x86_64") || package.contains(".i686") {
        Some("x86_64")
    } else if package.contains(".aarch64") {
        Some("aarch64")
    } else if package.contains(".ppc64le") {
        Some("ppc64le")
    } else if package.contains(".s390x") {
        Some("s390x")
    } else if package.contains(".noarch") {
        Some("noarch")
    } else {
        None
    }
}

fn parse_packages(errata: &mut Errata, fragment: &str) {
    let mut current: Option<String> = None;

    for caps in PACKAGE_ROW.captures_iter(fragment) {
        if let Some(product) = caps.name("product") {
            let product = product.as_str().trim().to_string();
            errata
                .affected_products
                .entry(product.clone())
                .or_default();
            current = Some(product);
            continue;
        }

        let Some(current) = &current else {
            continue;
        };
        let Some(name) = caps.name("name") else {
            continue;
        };

        let name = strip_tags(name.as_str());
        if !name.ends_with(".rpm") {
            continue;
        }

        let entry = errata
            .affected_products
            .entry(current.clone())
            .or_default();

        if name.ends_with(".src.rpm") {
            entry.srpms.push(name);
        } else if let Some(arch) = arch_of(&name) {
            entry.packages.entry(arch.to_string()).or_default().push(name);
        }
    }
}

pub(super) fn parse_errata(html: &str) -> Result<Errata, Error> {
    let mut errata = Errata::default();

    // The id typo is present on the upstream pages.
    if let Some(fragment) = section(html, "synpopsis") {
        if let Some(synopsis) = paragraphs(fragment).into_iter().next() {
            errata.synopsis = synopsis;
        }
    }

    if let Some(fragment) = section(html, "type-severity") {
        if let Some(text) = paragraphs(fragment).into_iter().next() {
            parse_type_severity(&mut errata, &text)?;
        }
    }

    if let Some(fragment) = section(html, "topic") {
        errata.topic = paragraphs(fragment);
    }

    if let Some(fragment) = section(html, "description") {
        for paragraph in paragraphs(fragment) {
            // Paragraphs carry multiple lines separated by line breaks.
            for line in paragraph.lines() {
                let line = line.trim();
                if line.is_empty()
                    || matches!(
                        line,
                        "Security Fix(es):"
                            | "Bug Fix(es) and Enhancement(s):"
                            | "Bug Fix(es):"
                            | "Enhancement(s):"
                    )
                {
                    continue;
                }
                errata.description.push(line.to_string());
            }
        }
    }

    if let Some(fragment) = section(html, "solution") {
        errata.solution = paragraphs(fragment);
    }

    if let Some(fragment) = section(html, "fixes") {
        for item in list_items(fragment) {
            let components: Vec<&str> = item.splitn(3, '-').map(str::trim).collect();
            if components.len() != 3 {
                continue;
            }
            errata.fixes.push(Fix {
                bugzilla_id: components[1].to_string(),
                description: components[2].to_string(),
            });
        }
    }

    if let Some(fragment) = section(html, "cves") {
        errata.cves = list_items(fragment);
    }

    if let Some(fragment) = section(html, "references") {
        errata.references = list_items(fragment);
    }

    if let Some(caps) = DETAILS_ISSUED.captures(html) {
        let text = strip_tags(&caps[1]);
        errata.issued_at = Date::parse(&text, ISSUED_FORMAT).ok();
    }

    if let Some(fragment) = section(html, "packages") {
        parse_packages(&mut errata, fragment);
    }

    Ok(errata)
}

#[cfg(test)]
mod test {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
    <div id="synpopsis"><h1>Synopsis</h1><p>cmake bug fix and enhancement update</p></div>
    <div id="type-severity"><p>Bug Fix Advisory</p></div>
    <div id="topic"><p>An update for cmake is now available.</p></div>
    <div id="description"><p>Bug Fix(es):</p><p>cmake now builds reproducibly</p></div>
    <div id="solution"><p>Install the updated packages.</p></div>
    <div id="fixes"><ul><li>BZ - 1957948 - cmake FTBFS</li></ul></div>
    <div id="cves"><ul><li>CVE-2021-3602</li></ul></div>
    <div id="references"><ul><li>https://access.redhat.com/security/updates/classification/</li></ul></div>
    <dl class="details"><dt>Issued:</dt><dd>2021-06-29</dd></dl>
    <div id="packages">
      <h2>Red Hat Enterprise Linux for x86_64 8</h2>
      <table class="files">
        <tr><td class="name">cmake-3.18.2-11.el8_4.src.rpm</td></tr>
        <tr><td class="name">cmake-3.18.2-11.el8_4.x86_64.rpm</td></tr>
        <tr><td class="name">cmake-doc-3.18.2-11.el8_4.noarch.rpm</td></tr>
      </table>
      <h2>Red Hat Enterprise Linux for ARM 64 8</h2>
      <table class="files">
        <tr><td class="name">cmake-3.18.2-11.el8_4.src.rpm</td></tr>
        <tr><td class="name">cmake-3.18.2-11.el8_4.aarch64.rpm</td></tr>
      </table>
    </div>
    </body></html>
    "#;

    #[test]
    fn parses_sections() {
        let errata = parse_errata(PAGE).unwrap();

        assert_eq!(errata.synopsis, "cmake bug fix and enhancement update");
        assert_eq!(errata.kind, Kind::BugFix);
        assert_eq!(errata.severity, Severity::None);
        assert_eq!(errata.topic, vec!["An update for cmake is now available."]);
        assert_eq!(errata.description, vec!["cmake now builds reproducibly"]);
        assert_eq!(errata.cves, vec!["CVE-2021-3602"]);
        assert_eq!(
            errata.fixes,
            vec![Fix {
                bugzilla_id: "1957948".to_string(),
                description: "cmake FTBFS".to_string(),
            }]
        );
        assert_eq!(errata.issued_at.map(|d| d.year()), Some(2021));
    }

    #[test]
    fn parses_per_product_packages() {
        let errata = parse_errata(PAGE).unwrap();

        let x86 = &errata.affected_products["Red Hat Enterprise Linux for x86_64 8"];
        assert_eq!(x86.srpms, vec!["cmake-3.18.2-11.el8_4.src.rpm"]);
        assert_eq!(x86.packages["x86_64"], vec!["cmake-3.18.2-11.el8_4.x86_64.rpm"]);
        assert_eq!(
            x86.packages["noarch"],
            vec!["cmake-doc-3.18.2-11.el8_4.noarch.rpm"]
        );

        let arm = &errata.affected_products["Red Hat Enterprise Linux for ARM 64 8"];
        assert_eq!(arm.srpms, vec!["cmake-3.18.2-11.el8_4.src.rpm"]);
    }

    #[test]
    fn parses_security_type_and_severity() {
        let page = r#"<div id="type-severity"><p>Security Advisory: Important</p></div>"#;
        let errata = parse_errata(page).unwrap();
        assert_eq!(errata.kind, Kind::Security);
        assert_eq!(errata.severity, Severity::Important);
    }

    #[test]
    fn rejects_malformed_type_severity() {
        let page = r#"<div id="type-severity"><p>Something: Odd: Here</p></div>"#;
        assert!(parse_errata(page).is_err());
    }
}
