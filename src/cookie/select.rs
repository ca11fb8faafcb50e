/// `matchDomain(candidate, reference)` (spec.md §4.1): true iff `candidate
/// == reference` or `candidate` ends with `"." + reference`. Asymmetric —
/// a subdomain matches its parent but not vice versa.
pub fn match_domain(candidate: &str, reference: &str) -> bool {
    candidate == reference || candidate.ends_with(&format!(".{reference}"))
}

/// Whether `host` is within scope of a cookie's `domain`, honoring
/// `allow_sub_domains`.
pub(crate) fn domain_in_scope(host: &str, cookie_domain: &str, allow_sub_domains: bool) -> bool {
    if allow_sub_domains {
        match_domain(host, cookie_domain)
    } else {
        host == cookie_domain
    }
}
