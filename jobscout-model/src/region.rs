//! Region buckets used to group admitted job postings.

/// Catch-all bucket for postings without a usable region.
pub const FALLBACK_REGION: &str = "אחר";

/// Regions every fresh projection starts with, in display order.
pub const DEFAULT_REGIONS: [&str; 5] =
    ["מרכז", "צפון", "דרום", "ירושלים", FALLBACK_REGION];

/// Returns the region a posting belongs to, falling back to `fallback` when
/// the payload carried none.
pub fn resolve_region<'a>(declared: Option<&'a str>, fallback: &'a str) -> &'a str {
    match declared {
        Some(region) if !region.is_empty() => region,
        _ => fallback,
    }
}
