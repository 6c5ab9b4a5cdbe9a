//! Heuristic URL classifier
//!
//! Pattern-based first line of the risk pipeline. Pure and deterministic:
//! the same URL always yields the same verdict, with no I/O.

use phish_common::{RiskVerdict, VerdictSource};
use regex::Regex;

/// Verdict message for high-confidence pattern hits
pub const MSG_HIGH: &str = "High-confidence phishing pattern detected";
/// Verdict message for medium-confidence pattern hits
pub const MSG_MEDIUM: &str = "Suspicious URL pattern detected";
/// Verdict message for sensitive pages served over plain HTTP
pub const MSG_INSECURE: &str = "Sensitive page without HTTPS encryption";
/// Verdict message when all heuristic stages pass
pub const MSG_CLEAN: &str = "No threats detected (heuristic check)";

/// Layered pattern classifier
///
/// Checks run in severity order and the first hit wins, so a URL matching
/// both tables always resolves to the high-risk verdict.
pub struct HeuristicEngine {
    high_risk: Vec<Regex>,
    medium_risk: Vec<Regex>,
    sensitive: Regex,
}

impl HeuristicEngine {
    /// Compile the pattern tables
    pub fn new() -> Self {
        let high_risk = [
            r"phishing",
            r"malware",
            r"fake-login",
            r"testsafebrowsing\.appspot\.com",
            r"[?&]phish=true",
            r"adventure-nicaragua\.net",
            r"5movierulz\.dental",
        ];
        let medium_risk = [
            r"suspicious",
            r"account-verify",
            r"secure-update",
            r"bank.*login",
            r"paypal.*verify",
            r"login",
            r"verify",
        ];

        Self {
            high_risk: compile(&high_risk),
            medium_risk: compile(&medium_risk),
            sensitive: Regex::new(r"(?i)login|bank|account|verify|secure").unwrap(),
        }
    }

    /// Classify a URL
    pub fn classify(&self, url: &str) -> RiskVerdict {
        // 1. High-confidence patterns
        if self.high_risk.iter().any(|re| re.is_match(url)) {
            return RiskVerdict::phishing("PHISHING", MSG_HIGH);
        }

        // 2. Medium-confidence patterns
        if self.medium_risk.iter().any(|re| re.is_match(url)) {
            return RiskVerdict::suspicious(MSG_MEDIUM);
        }

        // 3. Sensitive keywords over an unencrypted transport
        if url.starts_with("http://") && self.sensitive.is_match(url) {
            return RiskVerdict::suspicious(MSG_INSECURE);
        }

        RiskVerdict::safe(MSG_CLEAN, VerdictSource::Heuristic)
    }
}

impl Default for HeuristicEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    // Tables are static; a failed compile is a programming error.
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use phish_common::ThreatLevel;

    #[test]
    fn test_high_risk_patterns_block() {
        let engine = HeuristicEngine::new();

        for url in [
            "https://adventure-nicaragua.net",
            "https://example.net/fake-login",
            "https://testsafebrowsing.appspot.com/s/phishing.html",
            "https://tracker.example/?phish=true",
            "https://cdn.example/MALWARE/payload",
        ] {
            let verdict = engine.classify(url);
            assert!(verdict.is_phishing(), "expected phishing for {url}");
            assert_eq!(verdict.threat_type.as_deref(), Some("PHISHING"));
            assert_eq!(verdict.message, MSG_HIGH);
        }
    }

    #[test]
    fn test_medium_risk_patterns_warn() {
        let engine = HeuristicEngine::new();

        let verdict = engine.classify("https://mybank.example/secure-update");
        assert_eq!(verdict.level, ThreatLevel::Suspicious);
        assert!(!verdict.safe);
        assert_eq!(verdict.threat_type.as_deref(), Some("SUSPICIOUS"));
        assert_eq!(verdict.message, MSG_MEDIUM);
    }

    #[test]
    fn test_medium_only_url_is_not_escalated() {
        // Matches the medium table (account-verify, login) but nothing
        // from the high table.
        let engine = HeuristicEngine::new();

        let verdict = engine.classify("http://account-verify.badsite.com/login");
        assert_eq!(verdict.level, ThreatLevel::Suspicious);
        assert_ne!(verdict.threat_type.as_deref(), Some("PHISHING"));
    }

    #[test]
    fn test_high_beats_medium_when_both_match() {
        let engine = HeuristicEngine::new();

        // "fake-login" is in the high table, "login" in the medium one.
        let verdict = engine.classify("https://portal.example/fake-login");
        assert_eq!(verdict.level, ThreatLevel::Phishing);
    }

    #[test]
    fn test_insecure_transport_with_sensitive_keyword() {
        let engine = HeuristicEngine::new();

        let verdict = engine.classify("http://shop.example/checkout/secure");
        assert_eq!(verdict.level, ThreatLevel::Suspicious);
        assert_eq!(verdict.message, MSG_INSECURE);

        // Same path over HTTPS passes.
        let verdict = engine.classify("https://shop.example/checkout/secure");
        assert!(verdict.safe);
    }

    #[test]
    fn test_clean_url_is_safe() {
        let engine = HeuristicEngine::new();

        let verdict = engine.classify("https://docs.example.org/guide/intro");
        assert!(verdict.safe);
        assert_eq!(verdict.level, ThreatLevel::None);
        assert_eq!(verdict.message, MSG_CLEAN);
        assert_eq!(verdict.source, VerdictSource::Heuristic);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let engine = HeuristicEngine::new();
        assert!(engine.classify("https://x.example/PHISHING/kit").is_phishing());
    }
}
