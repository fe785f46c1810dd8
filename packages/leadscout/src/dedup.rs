//! Multi-criteria duplicate detection.
//!
//! The index holds normalized identity keys for every lead seen before —
//! persisted history, the blacklist, and leads accepted earlier in the same
//! run. A candidate matching any criterion is a duplicate. Verdicts are
//! idempotent: checking never mutates the index; only [`DedupIndex::accept`]
//! does, and only the engine calls it.

use std::collections::HashSet;

use crate::types::{Candidate, EmailSource, Lead};

/// Identity attributes of a lead or candidate, as the validator sees them.
#[derive(Debug, Clone, Default)]
pub struct Fingerprint<'a> {
    pub website: Option<&'a str>,
    pub company: Option<&'a str>,
    pub email: Option<&'a str>,
    pub social: Option<&'a str>,
}

impl<'a> Fingerprint<'a> {
    pub fn of_candidate(candidate: &'a Candidate) -> Self {
        Self {
            website: candidate.website.as_deref(),
            company: non_empty(&candidate.company_name),
            email: candidate.emails.first().map(|e| e.as_str()),
            social: candidate.social_profiles.first().map(|s| s.as_str()),
        }
    }

    pub fn of_lead(lead: &'a Lead) -> Self {
        // A synthesized placeholder address identifies the domain, not the
        // lead, and the domain criterion already covers it.
        let email = match lead.decision_maker.email_source {
            Some(EmailSource::Synthesized) => None,
            _ => lead.decision_maker.email.as_deref(),
        };
        Self {
            website: lead.website.as_deref(),
            company: non_empty(&lead.company_name),
            email,
            social: lead.decision_maker.linkedin.as_deref(),
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Set of normalized identity keys seen so far in a run.
#[derive(Debug, Default)]
pub struct DedupIndex {
    keys: HashSet<String>,
    strict: bool,
}

impl DedupIndex {
    pub fn new(strict: bool) -> Self {
        Self {
            keys: HashSet::new(),
            strict,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a raw key (blacklist entries), normalized as a bare string.
    pub fn insert_key(&mut self, raw: &str) {
        let key = raw.trim().to_lowercase();
        if !key.is_empty() {
            self.keys.insert(key);
        }
    }

    /// Record every identity key of a fingerprint.
    pub fn accept(&mut self, fingerprint: &Fingerprint<'_>) {
        if let Some(website) = fingerprint.website {
            let domain = normalize_domain(website);
            if !domain.is_empty() {
                self.keys.insert(domain);
            }
        }
        if let Some(company) = fingerprint.company {
            let name = normalize_company(company);
            if !name.is_empty() {
                self.keys.insert(name);
            }
        }
        if let Some(email) = fingerprint.email {
            self.insert_key(email);
        }
        if let Some(social) = fingerprint.social {
            self.insert_key(social);
        }
    }

    /// Six-criterion duplicate check, in order. Any match is a duplicate.
    pub fn is_duplicate(&self, fingerprint: &Fingerprint<'_>) -> bool {
        // 1. Normalized website domain.
        if let Some(website) = fingerprint.website {
            let domain = normalize_domain(website);
            if !domain.is_empty() {
                if self.keys.contains(&domain) {
                    return true;
                }
                // 2. Domain TLD / bare-name variants (strict mode only:
                // catches re-registrations at the cost of false positives).
                if self.strict && domain_variants(&domain).iter().any(|v| self.keys.contains(v)) {
                    return true;
                }
            }
        }

        if let Some(company) = fingerprint.company {
            let name = normalize_company(company);
            if !name.is_empty() {
                // 3. Normalized company name.
                if self.keys.contains(&name) {
                    return true;
                }
                // 4. Substring containment (strict mode only).
                if self.strict
                    && self
                        .keys
                        .iter()
                        .any(|existing| !existing.is_empty() && name.contains(existing.as_str()))
                {
                    return true;
                }
            }
        }

        // 5. Decision-maker email.
        if let Some(email) = fingerprint.email {
            if !email.is_empty() && self.keys.contains(&email.to_lowercase()) {
                return true;
            }
        }

        // 6. Social profile URL.
        if let Some(social) = fingerprint.social {
            if !social.is_empty() && self.keys.contains(&social.to_lowercase()) {
                return true;
            }
        }

        false
    }
}

/// Reduce a website to its bare domain: lowercase, no scheme, no `www.`,
/// no path, no trailing slash.
pub fn normalize_domain(website: &str) -> String {
    let lowered = website.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    without_www
        .split('/')
        .next()
        .unwrap_or("")
        .trim_end_matches('/')
        .to_string()
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_company(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// TLD swaps and the bare name, for the strict-mode variant check.
fn domain_variants(domain: &str) -> Vec<String> {
    let mut variants = Vec::new();
    if let Some(base) = domain.strip_suffix(".es") {
        variants.push(format!("{base}.com"));
    }
    if let Some(base) = domain.strip_suffix(".com") {
        variants.push(format!("{base}.es"));
    }
    if let Some(bare) = domain.split('.').next() {
        if !bare.is_empty() && bare != domain {
            variants.push(bare.to_string());
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Channel;

    fn fp<'a>(
        website: Option<&'a str>,
        company: Option<&'a str>,
        email: Option<&'a str>,
        social: Option<&'a str>,
    ) -> Fingerprint<'a> {
        Fingerprint {
            website,
            company,
            email,
            social,
        }
    }

    #[test]
    fn domain_normalization() {
        assert_eq!(normalize_domain("https://www.Acme.com/contact/"), "acme.com");
        assert_eq!(normalize_domain("acme.com/"), "acme.com");
        assert_eq!(normalize_domain("http://acme.es"), "acme.es");
    }

    #[test]
    fn company_normalization() {
        assert_eq!(normalize_company("Acme,  S.L.!"), "acme sl");
        assert_eq!(normalize_company("  Fit & Go   Gym "), "fit go gym");
    }

    #[test]
    fn domain_criterion_catches_scheme_and_www_variants() {
        let mut index = DedupIndex::new(false);
        index.accept(&fp(Some("https://www.acme.com/"), None, None, None));
        assert!(index.is_duplicate(&fp(Some("acme.com"), None, None, None)));
        assert!(index.is_duplicate(&fp(Some("http://acme.com/about"), None, None, None)));
        assert!(!index.is_duplicate(&fp(Some("other.com"), None, None, None)));
    }

    #[test]
    fn variant_criterion_only_in_strict_mode() {
        let mut lax = DedupIndex::new(false);
        lax.accept(&fp(Some("acme.es"), None, None, None));
        assert!(!lax.is_duplicate(&fp(Some("acme.com"), None, None, None)));

        let mut strict = DedupIndex::new(true);
        strict.accept(&fp(Some("acme.es"), None, None, None));
        assert!(strict.is_duplicate(&fp(Some("acme.com"), None, None, None)));
    }

    #[test]
    fn company_name_criterion_is_punctuation_independent() {
        let mut index = DedupIndex::new(false);
        index.accept(&fp(None, Some("Acme, S.L."), None, None));
        assert!(index.is_duplicate(&fp(None, Some("acme sl"), None, None)));
    }

    #[test]
    fn substring_criterion_only_in_strict_mode() {
        let mut lax = DedupIndex::new(false);
        lax.accept(&fp(None, Some("Acme"), None, None));
        assert!(!lax.is_duplicate(&fp(None, Some("Acme Fitness Madrid"), None, None)));

        let mut strict = DedupIndex::new(true);
        strict.accept(&fp(None, Some("Acme"), None, None));
        assert!(strict.is_duplicate(&fp(None, Some("Acme Fitness Madrid"), None, None)));
    }

    #[test]
    fn email_and_social_criteria_are_case_insensitive() {
        let mut index = DedupIndex::new(false);
        index.accept(&fp(None, None, Some("Jane@Acme.com"), None));
        index.insert_key("https://linkedin.com/in/janedoe");

        assert!(index.is_duplicate(&fp(None, None, Some("jane@acme.com"), None)));
        assert!(index.is_duplicate(&fp(
            None,
            None,
            None,
            Some("https://LinkedIn.com/in/JaneDoe")
        )));
    }

    #[test]
    fn verdicts_are_idempotent() {
        let mut index = DedupIndex::new(false);
        index.accept(&fp(Some("acme.com"), Some("Acme"), None, None));
        let probe = fp(Some("acme.com"), None, None, None);
        assert_eq!(index.is_duplicate(&probe), index.is_duplicate(&probe));
        let size_before = index.len();
        index.is_duplicate(&probe);
        assert_eq!(index.len(), size_before);
    }

    #[test]
    fn accepting_once_blocks_same_domain_later() {
        let mut index = DedupIndex::new(false);
        let first = fp(Some("acme.com"), Some("Acme"), None, None);
        assert!(!index.is_duplicate(&first));
        index.accept(&first);
        let second = fp(Some("www.acme.com"), Some("Totally Different Name"), None, None);
        assert!(index.is_duplicate(&second));
    }

    #[test]
    fn synthesized_email_is_not_a_fingerprint_key() {
        use crate::types::{Candidate, EmailSource, Lead};
        let mut lead =
            Lead::from_candidate(&Candidate::new("Acme", Some("acme.com")), Channel::Maps);
        lead.decision_maker
            .set_email("contact@acme.com", EmailSource::Synthesized);
        let fingerprint = Fingerprint::of_lead(&lead);
        assert!(fingerprint.email.is_none());
    }
}
