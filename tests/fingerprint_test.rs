//! End-to-end fingerprint behavior: generation plausibility, wire format,
//! and the validator/similarity/uniqueness surfaces together.

use maskfleet::fingerprint::{
    similarity, uniqueness, validate, Fingerprint, FingerprintGenerator, FingerprintOverrides,
    Platform, WebRtcMode,
};

#[test]
fn generated_fingerprints_are_internally_consistent() {
    let mut generator = FingerprintGenerator::new();
    for _ in 0..50 {
        let fp = generator.generate(None);
        let report = validate(&fp);
        assert!(
            report.errors.is_empty(),
            "generator produced errors: {:?}",
            report.errors
        );
        assert!(report.is_valid);
    }
}

#[test]
fn seeded_generation_is_reproducible_across_instances() {
    let a = FingerprintGenerator::with_seed(777).generate(None);
    let b = FingerprintGenerator::with_seed(777).generate(None);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );

    let c = FingerprintGenerator::with_seed(778).generate(None);
    assert_ne!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&c).unwrap()
    );
}

#[test]
fn wire_format_is_camel_case() {
    let fp = FingerprintGenerator::with_seed(1).generate(None);
    let json = serde_json::to_value(&fp).unwrap();
    let object = json.as_object().unwrap();

    for key in [
        "userAgent",
        "screenResolution",
        "availableScreenResolution",
        "hardwareConcurrency",
        "deviceMemory",
        "webglVendor",
        "webglRenderer",
        "colorDepth",
        "pixelRatio",
    ] {
        assert!(object.contains_key(key), "missing key {}", key);
    }
    assert!(!object.contains_key("user_agent"));

    // And it reads back.
    let back: Fingerprint = serde_json::from_value(json).unwrap();
    assert_eq!(back.user_agent, fp.user_agent);
}

#[test]
fn platform_override_keeps_user_agent_coherent() {
    let overrides = FingerprintOverrides {
        platform: Some(Platform::MacIntel),
        ..Default::default()
    };

    let mut generator = FingerprintGenerator::with_seed(5);
    for _ in 0..20 {
        let fp = generator.generate(Some(&overrides));
        assert_eq!(fp.platform, Platform::MacIntel);
        assert!(
            fp.user_agent.contains("Macintosh"),
            "mac platform got UA: {}",
            fp.user_agent
        );
        assert!(validate(&fp).errors.is_empty());
    }
}

#[test]
fn validator_flags_cross_field_mismatch() {
    let mut fp = FingerprintGenerator::with_seed(9).generate(Some(&FingerprintOverrides {
        platform: Some(Platform::Win32),
        ..Default::default()
    }));
    fp.platform = Platform::MacIntel;

    let report = validate(&fp);
    assert!(!report.is_valid);
    assert!(report
        .errors
        .iter()
        .any(|issue| issue.field == "platform" || issue.field == "userAgent"));
    assert!(report.score < 100);
}

#[test]
fn disabled_webrtc_exposes_no_addresses() {
    let mut generator = FingerprintGenerator::with_seed(13);
    for _ in 0..40 {
        let fp = generator.generate(None);
        if fp.webrtc.mode == WebRtcMode::Disabled {
            assert!(fp.webrtc.local_ips.is_empty());
            assert!(fp.webrtc.public_ip.is_none());
        }
    }
}

#[test]
fn available_resolution_fits_inside_screen() {
    let mut generator = FingerprintGenerator::with_seed(21);
    for _ in 0..30 {
        let fp = generator.generate(None);
        let (w, h) = fp.screen_size().unwrap();
        let (aw, ah) = fp.available_screen_size().unwrap();
        assert!(aw <= w);
        assert!(ah <= h);
    }
}

#[test]
fn similarity_and_uniqueness_bounds_hold_together() {
    let fp = FingerprintGenerator::with_seed(31).generate(None);
    let other = FingerprintGenerator::with_seed(32).generate(None);

    assert!((similarity(&fp, &fp) - 1.0).abs() < 1e-9);
    let ab = similarity(&fp, &other);
    let ba = similarity(&other, &fp);
    assert!((ab - ba).abs() < 1e-9);
    assert!((0.0..=1.0).contains(&ab));

    assert_eq!(uniqueness(&fp, &[]), 100.0);
    assert_eq!(uniqueness(&fp, &[fp.clone(), fp.clone()]), 0.0);
    let against_other = uniqueness(&fp, std::slice::from_ref(&other));
    assert!(against_other > 0.0);
}

#[test]
fn distinct_seeds_produce_a_spread_population() {
    let population: Vec<Fingerprint> = (0..20)
        .map(|seed| FingerprintGenerator::with_seed(seed).generate(None))
        .collect();

    let fresh = FingerprintGenerator::with_seed(999).generate(None);
    let score = uniqueness(&fresh, &population);
    // A freshly generated identity should not collapse into the population.
    assert!(score > 0.0, "uniqueness was {}", score);
}
