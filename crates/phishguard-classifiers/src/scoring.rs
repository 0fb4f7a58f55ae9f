//! Phishing score derivation
//!
//! Classifier output is a list of label/score pairs whose labels depend on the
//! model (`phishing`/`benign`, `LABEL_1`/`LABEL_0`, ...). [`PhishingScorer`]
//! reduces that list to a single phishing probability, normalizes user input
//! into a URL, and damps scores for well-known legitimate domains.

use phishguard_core::{Error, LabelScore, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use url::Url;

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Domains whose scores are capped unless the model is near-certain
    #[serde(default = "default_safe_domains")]
    pub safe_domains: Vec<String>,

    /// Score cap applied to allowlisted domains
    #[serde(default = "default_ceiling")]
    pub ceiling: f32,

    /// Scores at or above this bypass the allowlist cap
    #[serde(default = "default_certainty")]
    pub certainty: f32,
}

fn default_safe_domains() -> Vec<String> {
    [
        "google.com",
        "youtube.com",
        "microsoft.com",
        "apple.com",
        "github.com",
        "cloudflare.com",
        "figma.com",
        "openai.com",
        "amazon.com",
        "linkedin.com",
        "binge.com.au",
    ]
    .iter()
    .map(|d| d.to_string())
    .collect()
}

fn default_ceiling() -> f32 {
    0.15
}

fn default_certainty() -> f32 {
    0.99
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            safe_domains: default_safe_domains(),
            ceiling: default_ceiling(),
            certainty: default_certainty(),
        }
    }
}

/// Reduces classifier output to a phishing probability
pub struct PhishingScorer {
    config: ScoringConfig,
    phishing: Regex,
    benign: Regex,
    positive_index: Regex,
    negative_index: Regex,
}

impl PhishingScorer {
    /// Create a scorer, compiling the label patterns
    pub fn new(mut config: ScoringConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.ceiling) || !(0.0..=1.0).contains(&config.certainty) {
            return Err(Error::config(
                "scoring ceiling and certainty must lie in [0, 1]",
            ));
        }

        config.safe_domains = config
            .safe_domains
            .iter()
            .map(|d| d.trim().trim_start_matches("www.").to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::internal(format!("invalid label pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            config,
            phishing: compile(r"(?i)(phish|malicious|scam|fraud|attack|spam)")?,
            benign: compile(r"(?i)(benign|legit|ham|safe|clean|non[-_ ]?phish)")?,
            positive_index: compile(r"(?:^|_)1$")?,
            negative_index: compile(r"(?:^|_)0$")?,
        })
    }

    /// Scoring configuration in effect
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Turn a hostname or URL into the URL sent to the classifier.
    ///
    /// Inputs containing `://` that parse as URLs are used as-is (lowercased).
    /// Anything else is treated as a hostname, reduced to its registrable
    /// domain, and becomes `https://www.<domain>/`.
    pub fn normalize_target(&self, input: &str) -> Result<String> {
        let s = input.trim().to_lowercase();
        if s.is_empty() {
            return Err(Error::invalid_input("URL is required"));
        }

        if s.contains("://") {
            if let Ok(url) = Url::parse(&s) {
                if url.host_str().is_some() {
                    return Ok(url.to_string());
                }
            }
        }

        let host = s
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("www.");
        let host = host
            .split(|c| matches!(c, '/' | '?' | '#'))
            .next()
            .unwrap_or_default();

        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(Error::invalid_input(format!(
                "Invalid URL/hostname: {}",
                input.trim()
            )));
        }

        let url = Url::parse(&format!("https://www.{}/", registrable_domain(host)))
            .map_err(|e| Error::invalid_input(format!("Invalid URL/hostname: {}", e)))?;
        Ok(url.to_string())
    }

    /// Derive a phishing probability from classifier output.
    ///
    /// Preference order: an explicit phishing label, a lone benign label
    /// (inverted), `*_1`, a lone `*_0` (inverted), then the top entry read
    /// by its label. Empty output scores 0.
    pub fn extract_score(&self, result: &[LabelScore]) -> f32 {
        if let Some(entry) = result.iter().find(|r| self.is_phishing(&r.label)) {
            return entry.score;
        }

        if let [only] = result {
            if self.benign.is_match(&only.label) {
                return 1.0 - only.score;
            }
        }

        if let Some(entry) = result.iter().find(|r| self.positive_index.is_match(&r.label)) {
            return entry.score;
        }

        if let [only] = result {
            if self.negative_index.is_match(&only.label) {
                return 1.0 - only.score;
            }
        }

        result
            .iter()
            .fold(None::<&LabelScore>, |best, r| match best {
                Some(b) if b.score >= r.score => Some(b),
                _ => Some(r),
            })
            .map(|top| self.score_from_label(top))
            .unwrap_or(0.0)
    }

    /// Cap the score for allowlisted domains unless the model is near-certain
    pub fn clamp_for_allowlist(&self, url: &str, score: f32) -> f32 {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        else {
            return score;
        };

        let domain = registrable_domain(&host);

        let allowlisted = self
            .config
            .safe_domains
            .iter()
            .any(|d| domain == d || host == *d || host.ends_with(&format!(".{}", d)));

        if allowlisted && score < self.config.certainty {
            score.min(self.config.ceiling)
        } else {
            score
        }
    }

    /// Full pipeline: extract, apply the allowlist, clamp to [0, 1] and round
    /// to four decimals.
    pub fn phishing_score(&self, url: &str, result: &[LabelScore]) -> f32 {
        let score = self.extract_score(result);
        let score = self.clamp_for_allowlist(url, score).clamp(0.0, 1.0);
        (score * 10_000.0).round() / 10_000.0
    }

    // "non-phishing" matches both patterns; benign wins.
    fn is_phishing(&self, label: &str) -> bool {
        self.phishing.is_match(label) && !self.benign.is_match(label)
    }

    fn score_from_label(&self, entry: &LabelScore) -> f32 {
        if self.is_phishing(&entry.label) {
            entry.score
        } else if self.benign.is_match(&entry.label) {
            1.0 - entry.score
        } else if self.positive_index.is_match(&entry.label) {
            entry.score
        } else if self.negative_index.is_match(&entry.label) {
            1.0 - entry.score
        } else {
            entry.score
        }
    }
}

/// Registrable domain of `host` per the public suffix list, or the host
/// itself when it has none (IP addresses, single labels, bare suffixes).
fn registrable_domain(host: &str) -> &str {
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }
    psl::domain_str(host).unwrap_or(host)
}
