pub mod advisory;
pub mod advisory_cve;
pub mod advisory_fix;
pub mod advisory_reference;
pub mod advisory_rpm;
pub mod affected_product;
pub mod build_reference;
pub mod cve;
pub mod fix;
pub mod ignored_upstream_package;
pub mod mirror_state;
pub mod product;
pub mod short_code;
