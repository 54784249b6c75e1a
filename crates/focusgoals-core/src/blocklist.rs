//! Site classifier.
//!
//! A pure function from hostname to blocked / not-blocked. Blocking is
//! only ever in force during a running focus phase with no emergency
//! override engaged.

use crate::timer::Mode;

/// Lowercase a hostname and strip a leading `www.`.
pub fn normalize_host(hostname: &str) -> String {
    let h = hostname.trim().to_ascii_lowercase();
    h.strip_prefix("www.").unwrap_or(&h).to_string()
}

/// Classify a hostname against the blocked list.
///
/// Match rule: symmetric substring containment between the normalized
/// hostname and each entry. Deliberately permissive so subdomains and
/// partial domains are caught.
pub fn is_blocked(
    hostname: &str,
    blocked_sites: &[String],
    mode: Mode,
    is_running: bool,
    override_active: bool,
) -> bool {
    if mode != Mode::Focus || !is_running || override_active {
        return false;
    }
    let host = normalize_host(hostname);
    if host.is_empty() {
        return false;
    }
    blocked_sites
        .iter()
        .any(|entry| host.contains(entry.as_str()) || entry.contains(&host))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sites(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn www_prefix_is_stripped_before_matching() {
        assert!(is_blocked(
            "www.facebook.com",
            &sites(&["facebook.com"]),
            Mode::Focus,
            true,
            false,
        ));
    }

    #[test]
    fn subdomains_match_by_containment() {
        assert!(is_blocked(
            "m.facebook.com",
            &sites(&["facebook.com"]),
            Mode::Focus,
            true,
            false,
        ));
    }

    #[test]
    fn partial_entry_matches_full_hostname() {
        // Entry longer than the hostname still matches via the
        // symmetric direction.
        assert!(is_blocked(
            "reddit.com",
            &sites(&["old.reddit.com"]),
            Mode::Focus,
            true,
            false,
        ));
    }

    #[test]
    fn never_blocked_during_break() {
        assert!(!is_blocked(
            "facebook.com",
            &sites(&["facebook.com"]),
            Mode::Break,
            true,
            false,
        ));
    }

    #[test]
    fn never_blocked_while_not_running() {
        assert!(!is_blocked(
            "facebook.com",
            &sites(&["facebook.com"]),
            Mode::Focus,
            false,
            false,
        ));
    }

    #[test]
    fn never_blocked_under_override() {
        assert!(!is_blocked(
            "facebook.com",
            &sites(&["facebook.com"]),
            Mode::Focus,
            true,
            true,
        ));
    }

    #[test]
    fn unlisted_host_passes() {
        assert!(!is_blocked(
            "docs.rs",
            &sites(&["facebook.com", "tiktok.com"]),
            Mode::Focus,
            true,
            false,
        ));
    }

    #[test]
    fn empty_hostname_passes() {
        assert!(!is_blocked("", &sites(&["facebook.com"]), Mode::Focus, true, false));
        assert!(!is_blocked("   ", &sites(&["facebook.com"]), Mode::Focus, true, false));
    }
}
