//! Fingerprint validation plus the population-relative measurements.
//!
//! Validation runs independent checks and accumulates typed errors (hard)
//! and warnings (soft). Errors alone flip `is_valid`; warnings only lower
//! the score. `similarity` and `uniqueness` are advisory measurements: the
//! core supplies the numbers and callers decide what to do with them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::model::{is_private_ip, Fingerprint, WebRtcMode};
use super::pools;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// 0..=100, errors and warnings both subtract.
    pub score: u32,
}

fn issue(field: &str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Check a fingerprint's internal consistency.
pub fn validate(fp: &Fingerprint) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut score: i32 = 100;

    // UA / platform consistency.
    let marker = fp.platform.ua_marker();
    if !fp.user_agent.contains(marker) {
        errors.push(issue(
            "userAgent",
            format!(
                "user agent does not match platform {} (expected substring '{}')",
                fp.platform, marker
            ),
        ));
        score -= 10;
    }

    // Resolution bounds.
    match (fp.screen_size(), fp.available_screen_size()) {
        (Some((sw, sh)), Some((aw, ah))) => {
            if aw > sw || ah > sh {
                errors.push(issue(
                    "availableScreenResolution",
                    format!(
                        "available resolution {} exceeds screen resolution {}",
                        fp.available_screen_resolution, fp.screen_resolution
                    ),
                ));
                score -= 10;
            }
        }
        _ => {
            errors.push(issue(
                "screenResolution",
                "resolution is not in WxH form".to_string(),
            ));
            score -= 10;
        }
    }

    // WebGL vendor / renderer pairing.
    let renderers = pools::renderers_for_vendor(&fp.webgl_vendor);
    if renderers.is_empty() {
        errors.push(issue(
            "webglVendor",
            format!("unknown WebGL vendor '{}'", fp.webgl_vendor),
        ));
        score -= 8;
    } else if !renderers.contains(&fp.webgl_renderer.as_str()) {
        errors.push(issue(
            "webglRenderer",
            format!(
                "renderer '{}' does not belong to vendor '{}'",
                fp.webgl_renderer, fp.webgl_vendor
            ),
        ));
        score -= 8;
    }

    // Language well-formedness and membership.
    if !language_well_formed(&fp.language) {
        errors.push(issue(
            "language",
            format!("'{}' is not a valid language tag", fp.language),
        ));
        score -= 5;
    }
    if fp.languages.is_empty() || !fp.languages.contains(&fp.language) {
        errors.push(issue(
            "languages",
            "languages must be non-empty and contain the primary language".to_string(),
        ));
        score -= 5;
    }

    // Hardware plausibility (soft).
    if !(2..=64).contains(&fp.hardware_concurrency) {
        warnings.push(issue(
            "hardwareConcurrency",
            format!("{} cores is outside the plausible 2-64 range", fp.hardware_concurrency),
        ));
        score -= 5;
    }
    if ![2, 4, 8, 16, 32, 64].contains(&fp.device_memory) {
        warnings.push(issue(
            "deviceMemory",
            format!("{} GB is not a navigator.deviceMemory value", fp.device_memory),
        ));
        score -= 5;
    }

    // WebRTC policy sanity (soft).
    if fp.webrtc.mode == WebRtcMode::Real && fp.webrtc.public_ip.is_some() {
        warnings.push(issue(
            "webrtc.publicIP",
            "real mode acquires its IP from the network; a predefined public IP will leak".to_string(),
        ));
        score -= 4;
    }
    for ip in &fp.webrtc.local_ips {
        if !is_private_ip(ip) {
            warnings.push(issue(
                "webrtc.localIPs",
                format!("'{}' is not an RFC1918 private address", ip),
            ));
            score -= 4;
        }
    }
    if fp.webrtc.mode == WebRtcMode::Disabled
        && (!fp.webrtc.local_ips.is_empty() || fp.webrtc.public_ip.is_some())
    {
        warnings.push(issue(
            "webrtc",
            "disabled mode should carry no IP addresses".to_string(),
        ));
        score -= 4;
    }

    // GPU flavor plausibility for the platform (soft).
    if fp.platform.as_str().contains("Mac") || fp.platform.as_str() == "iPhone" {
        let apple_flavored =
            fp.webgl_vendor.contains("Apple") || fp.webgl_vendor.contains("Intel");
        if !apple_flavored {
            warnings.push(issue(
                "webglVendor",
                format!("'{}' is an unusual vendor for {}", fp.webgl_vendor, fp.platform),
            ));
            score -= 3;
        }
    }
    if !fp.plugins.is_empty() && !fp.is_chromium_family() {
        warnings.push(issue(
            "plugins",
            "non-Chromium user agents do not expose this plugin set".to_string(),
        ));
        score -= 3;
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        score: score.max(0) as u32,
    }
}

/// `^[a-z]{2}(-[A-Z]{2})?$` without pulling in a regex engine.
fn language_well_formed(lang: &str) -> bool {
    let bytes = lang.as_bytes();
    match bytes.len() {
        2 => bytes.iter().all(|b| b.is_ascii_lowercase()),
        5 => {
            bytes[0].is_ascii_lowercase()
                && bytes[1].is_ascii_lowercase()
                && bytes[2] == b'-'
                && bytes[3].is_ascii_uppercase()
                && bytes[4].is_ascii_uppercase()
        }
        _ => false,
    }
}

/// Pairwise similarity in [0, 1]: a fixed weighted sum over exact-match
/// indicators, plus Jaccard similarity over the font sets. Weights sum to 1.
pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let mut total = 0.0;

    let exact: [(f64, bool); 8] = [
        (0.15, a.user_agent == b.user_agent),
        (0.10, a.platform == b.platform),
        (0.10, a.screen_resolution == b.screen_resolution),
        (0.05, a.timezone == b.timezone),
        (0.05, a.language == b.language),
        (0.15, a.webgl_vendor == b.webgl_vendor),
        (0.15, a.webgl_renderer == b.webgl_renderer),
        (0.15, a.canvas.hash == b.canvas.hash),
    ];
    for (weight, matched) in exact {
        if matched {
            total += weight;
        }
    }

    total += 0.10 * jaccard(&a.fonts, &b.fonts);
    total
}

fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let sa: HashSet<&String> = a.iter().collect();
    let sb: HashSet<&String> = b.iter().collect();
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Population-relative uniqueness as a percentage.
///
/// Over ten designated fields, count how many of `fp`'s values appear
/// nowhere in the population's corresponding field-value sets. An empty
/// population scores 100.
pub fn uniqueness(fp: &Fingerprint, population: &[Fingerprint]) -> f64 {
    if population.is_empty() {
        return 100.0;
    }

    let fields = |f: &Fingerprint| -> [String; 10] {
        [
            f.user_agent.clone(),
            f.platform.to_string(),
            f.screen_resolution.clone(),
            f.timezone.clone(),
            f.language.clone(),
            f.webgl_vendor.clone(),
            f.webgl_renderer.clone(),
            f.canvas.hash.clone(),
            f.hardware_concurrency.to_string(),
            f.device_memory.to_string(),
        ]
    };

    let own = fields(fp);
    let mut seen: [HashSet<String>; 10] = Default::default();
    for other in population {
        for (i, value) in fields(other).into_iter().enumerate() {
            seen[i].insert(value);
        }
    }

    let unique = own
        .iter()
        .enumerate()
        .filter(|(i, value)| !seen[*i].contains(*value))
        .count();
    unique as f64 / 10.0 * 100.0
}
