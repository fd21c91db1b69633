//! Browser User-Agent pool for outbound page requests.
//!
//! Store pages and many ad-tech hosts serve bot-detection pages to unknown
//! agents, so every request picks a browser-like User-Agent at random.

use rand::seq::SliceRandom;

/// Browser User-Agent strings sampled per request.
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Returns a browser User-Agent drawn uniformly from the pool.
#[must_use]
pub(crate) fn random_user_agent() -> &'static str {
    BROWSER_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_USER_AGENTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_comes_from_pool() {
        for _ in 0..32 {
            let ua = random_user_agent();
            assert!(BROWSER_USER_AGENTS.contains(&ua), "unexpected UA: {ua}");
        }
    }

    #[test]
    fn test_pool_entries_look_like_browsers() {
        for ua in BROWSER_USER_AGENTS {
            assert!(ua.starts_with("Mozilla/5.0"), "not a browser UA: {ua}");
            assert!(!ua.contains("adscout"), "UA must not identify the tool: {ua}");
        }
    }
}
