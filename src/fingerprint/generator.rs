//! Fingerprint generator.
//!
//! Builds a complete [`Fingerprint`] from an optional partial override.
//! Fields present in the partial are taken verbatim; absent fields resolve
//! from the pools, keyed by already-resolved fields where a dependency
//! exists (renderer follows vendor, available resolution follows screen
//! resolution, plugins follow the browser family parsed from the UA).
//!
//! The generator never fails: an inconsistent partial passes through
//! untouched, and judging it is the validator's job.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

use super::model::{
    is_chromium_ua, AudioContextFingerprint, BatteryHint, CanvasFingerprint, ConnectionHint,
    Fingerprint, FingerprintOverrides, Platform, WebRtcConfig, WebRtcMode,
};
use super::pools;

pub enum FingerprintGenerator {
    /// Fresh randomness per call.
    Random(ThreadRng),
    /// Seeded generator for reproducible fleets.
    Seeded(StdRng),
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintGenerator {
    pub fn new() -> Self {
        Self::Random(thread_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::Seeded(StdRng::seed_from_u64(seed))
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        match self {
            Self::Random(rng) => rng,
            Self::Seeded(rng) => rng,
        }
    }

    fn weighted_choice<T: Copy>(&mut self, choices: &[(T, f64)]) -> T {
        match WeightedIndex::new(choices.iter().map(|(_, w)| *w)) {
            Ok(dist) => choices[dist.sample(&mut self.rng())].0,
            // Degenerate weights fall back to a uniform pick.
            Err(_) => choices[self.rng().gen_range(0..choices.len())].0,
        }
    }

    fn hex_token(&mut self, bytes: usize) -> String {
        let rng = self.rng();
        (0..bytes).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
    }

    /// Build a complete fingerprint, honoring every field the partial supplies.
    pub fn generate(&mut self, partial: Option<&FingerprintOverrides>) -> Fingerprint {
        let empty = FingerprintOverrides::default();
        let partial = partial.unwrap_or(&empty);

        // User agent and platform resolve together: whichever side the
        // partial pins, the other follows it.
        let platform = match (&partial.platform, &partial.user_agent) {
            (Some(p), _) => *p,
            (None, Some(ua)) => derive_platform(ua),
            (None, None) => self.weighted_choice(pools::PLATFORM_WEIGHTS),
        };
        let user_agent = partial
            .user_agent
            .clone()
            .unwrap_or_else(|| self.weighted_choice(pools::user_agents_for(platform)).to_string());
        let chromium = is_chromium_ua(&user_agent);

        let (cores, memory) = self.weighted_choice(pools::HARDWARE_CONFIGS);
        let hardware_concurrency = partial.hardware_concurrency.unwrap_or(cores);
        let device_memory = partial.device_memory.unwrap_or(memory);

        let screen_resolution = partial
            .screen_resolution
            .clone()
            .unwrap_or_else(|| self.weighted_choice(pools::resolutions_for(platform)).to_string());
        let available_screen_resolution = partial
            .available_screen_resolution
            .clone()
            .unwrap_or_else(|| self.derive_available(&screen_resolution, platform));
        let color_depth = partial
            .color_depth
            .unwrap_or_else(|| self.weighted_choice(pools::COLOR_DEPTHS));
        let pixel_ratio = partial
            .pixel_ratio
            .unwrap_or_else(|| self.weighted_choice(pools::PIXEL_RATIOS));

        let timezone = partial
            .timezone
            .clone()
            .unwrap_or_else(|| self.weighted_choice(pools::TIMEZONES).to_string());
        let (default_lang, default_langs) = self.weighted_choice(pools::LOCALES);
        let language = partial
            .language
            .clone()
            .unwrap_or_else(|| default_lang.to_string());
        let languages = partial.languages.clone().unwrap_or_else(|| {
            // An overridden primary language must lead the list.
            if partial.language.is_some() && !default_langs.contains(&language.as_str()) {
                vec![language.clone(), "en".to_string()]
            } else {
                default_langs.iter().map(|s| s.to_string()).collect()
            }
        });

        let gpu = self.weighted_choice(pools::gpus_for(platform));
        let webgl_vendor = partial
            .webgl_vendor
            .clone()
            .unwrap_or_else(|| gpu.vendor.to_string());
        let webgl_renderer = partial.webgl_renderer.clone().unwrap_or_else(|| {
            // Renderer follows the resolved vendor, not the rolled GPU.
            let renderers = pools::renderers_for_vendor(&webgl_vendor);
            if renderers.is_empty() {
                gpu.renderers
                    .choose(&mut self.rng())
                    .unwrap_or(&gpu.renderers[0])
                    .to_string()
            } else {
                renderers.choose(&mut self.rng()).unwrap().to_string()
            }
        });

        let canvas = partial.canvas.clone().unwrap_or_else(|| CanvasFingerprint {
            hash: self.hex_token(16),
            noise: self.rng().gen_range(0.001..0.02),
        });
        let audio_context = partial
            .audio_context
            .clone()
            .unwrap_or_else(|| AudioContextFingerprint {
                sample_rate: self.weighted_choice(pools::AUDIO_SAMPLE_RATES),
                channel_count: 2,
                compressor_hash: self.hex_token(12),
            });

        let fonts = partial.fonts.clone().unwrap_or_else(|| {
            let count = self
                .rng()
                .gen_range(10..=pools::FONT_UNIVERSE.len());
            pools::FONT_UNIVERSE
                .choose_multiple(&mut self.rng(), count)
                .map(|s| s.to_string())
                .collect()
        });

        let plugins = partial.plugins.clone().unwrap_or_else(|| {
            if chromium && self.rng().gen_bool(0.6) {
                pools::CHROMIUM_PLUGINS.iter().map(|s| s.to_string()).collect()
            } else {
                Vec::new()
            }
        });

        let webrtc = partial.webrtc.clone().unwrap_or_else(|| self.generate_webrtc());

        let battery = partial.battery.clone().or_else(|| {
            self.rng().gen_bool(0.7).then(|| BatteryHint {
                charging: self.rng().gen_bool(0.6),
                level: (self.rng().gen_range(0.15..1.0f64) * 100.0).round() / 100.0,
            })
        });
        let connection = partial.connection.clone().or_else(|| {
            self.rng().gen_bool(0.7).then(|| ConnectionHint {
                effective_type: self.weighted_choice(pools::CONNECTION_TYPES).to_string(),
                downlink: (self.rng().gen_range(1.5..10.0f64) * 10.0).round() / 10.0,
                rtt: self.rng().gen_range(25..200),
            })
        });

        Fingerprint {
            user_agent,
            platform,
            hardware_concurrency,
            device_memory,
            screen_resolution,
            available_screen_resolution,
            color_depth,
            pixel_ratio,
            timezone,
            language,
            languages,
            webgl_vendor,
            webgl_renderer,
            canvas,
            audio_context,
            fonts,
            plugins,
            webrtc,
            battery,
            connection,
        }
    }

    /// Available resolution is the screen minus a plausible taskbar/menu bar.
    fn derive_available(&mut self, screen: &str, platform: Platform) -> String {
        match Fingerprint::parse_resolution(screen) {
            Some((w, h)) => {
                let chrome = match platform {
                    Platform::Win32 => 40,
                    Platform::MacIntel => 25,
                    Platform::LinuxX8664 => 27,
                    Platform::IPhone => 0,
                };
                format!("{}x{}", w, h.saturating_sub(chrome))
            }
            None => screen.to_string(),
        }
    }

    fn generate_webrtc(&mut self) -> WebRtcConfig {
        let mode = self.weighted_choice(&[
            (WebRtcMode::Real, 30.0),
            (WebRtcMode::Fake, 45.0),
            (WebRtcMode::Disabled, 25.0),
        ]);

        if mode == WebRtcMode::Disabled {
            return WebRtcConfig {
                mode,
                public_ip: None,
                local_ips: Vec::new(),
                stun_servers: Vec::new(),
            };
        }

        let local_ip = format!(
            "192.168.{}.{}",
            self.rng().gen_range(0..256u32),
            self.rng().gen_range(2..255u32)
        );
        let public_ip = (mode == WebRtcMode::Fake).then(|| {
            format!(
                "{}.{}.{}.{}",
                self.rng().gen_range(20..200u32),
                self.rng().gen_range(0..256u32),
                self.rng().gen_range(0..256u32),
                self.rng().gen_range(1..255u32)
            )
        });

        WebRtcConfig {
            mode,
            public_ip,
            local_ips: vec![local_ip],
            stun_servers: pools::STUN_SERVERS.iter().take(2).map(|s| s.to_string()).collect(),
        }
    }
}

/// Parse the platform out of a user agent string. Unknown UAs fall back to
/// Win32, the largest pool.
fn derive_platform(user_agent: &str) -> Platform {
    if user_agent.contains("iPhone") {
        Platform::IPhone
    } else if user_agent.contains("Windows") {
        Platform::Win32
    } else if user_agent.contains("Mac") {
        Platform::MacIntel
    } else if user_agent.contains("Linux") {
        Platform::LinuxX8664
    } else {
        Platform::Win32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_fields_are_populated() {
        let mut gen = FingerprintGenerator::new();
        let fp = gen.generate(None);

        assert!(!fp.user_agent.is_empty());
        assert!(fp.hardware_concurrency >= 2 && fp.hardware_concurrency <= 64);
        assert!([2, 4, 8, 16, 32, 64].contains(&fp.device_memory));
        assert!(fp.screen_size().is_some());
        assert!(fp.fonts.len() >= 10);
        assert!(!fp.webgl_vendor.is_empty());
        assert!(!fp.webgl_renderer.is_empty());
        assert!(fp.languages.contains(&fp.language));
    }

    #[test]
    fn platform_override_drives_user_agent() {
        let mut gen = FingerprintGenerator::new();
        let overrides = FingerprintOverrides {
            platform: Some(Platform::MacIntel),
            ..Default::default()
        };
        for _ in 0..20 {
            let fp = gen.generate(Some(&overrides));
            assert_eq!(fp.platform, Platform::MacIntel);
            assert!(fp.user_agent.contains("Mac"));
        }
    }

    #[test]
    fn user_agent_override_derives_platform() {
        let mut gen = FingerprintGenerator::new();
        let overrides = FingerprintOverrides {
            user_agent: Some(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            ..Default::default()
        };
        let fp = gen.generate(Some(&overrides));
        assert_eq!(fp.platform, Platform::LinuxX8664);
    }

    #[test]
    fn override_fields_survive_verbatim() {
        let mut gen = FingerprintGenerator::new();
        let overrides = FingerprintOverrides {
            user_agent: Some("custom-ua".to_string()),
            hardware_concurrency: Some(12),
            device_memory: Some(32),
            screen_resolution: Some("1111x999".to_string()),
            timezone: Some("Europe/Oslo".to_string()),
            language: Some("nb-NO".to_string()),
            webgl_vendor: Some("Custom Vendor".to_string()),
            webgl_renderer: Some("Custom Renderer".to_string()),
            fonts: Some(vec!["OnlyFont".to_string()]),
            plugins: Some(vec!["OnlyPlugin".to_string()]),
            ..Default::default()
        };

        let fp = gen.generate(Some(&overrides));
        assert_eq!(fp.user_agent, "custom-ua");
        assert_eq!(fp.hardware_concurrency, 12);
        assert_eq!(fp.device_memory, 32);
        assert_eq!(fp.screen_resolution, "1111x999");
        assert_eq!(fp.timezone, "Europe/Oslo");
        assert_eq!(fp.language, "nb-NO");
        assert_eq!(fp.webgl_vendor, "Custom Vendor");
        assert_eq!(fp.webgl_renderer, "Custom Renderer");
        assert_eq!(fp.fonts, vec!["OnlyFont".to_string()]);
        assert_eq!(fp.plugins, vec!["OnlyPlugin".to_string()]);
    }

    #[test]
    fn available_resolution_fits_screen() {
        let mut gen = FingerprintGenerator::new();
        for _ in 0..50 {
            let fp = gen.generate(None);
            let (sw, sh) = fp.screen_size().unwrap();
            let (aw, ah) = fp.available_screen_size().unwrap();
            assert!(aw <= sw && ah <= sh, "{} vs {}", fp.available_screen_resolution, fp.screen_resolution);
        }
    }

    #[test]
    fn disabled_webrtc_has_empty_ip_lists() {
        let mut gen = FingerprintGenerator::with_seed(7);
        for _ in 0..100 {
            let fp = gen.generate(None);
            if fp.webrtc.mode == WebRtcMode::Disabled {
                assert!(fp.webrtc.public_ip.is_none());
                assert!(fp.webrtc.local_ips.is_empty());
                assert!(fp.webrtc.stun_servers.is_empty());
            }
        }
    }

    #[test]
    fn non_chromium_ua_gets_no_plugins() {
        let mut gen = FingerprintGenerator::new();
        let overrides = FingerprintOverrides {
            user_agent: Some(
                "Mozilla/5.0 (X11; Linux x86_64; rv:132.0) Gecko/20100101 Firefox/132.0".to_string(),
            ),
            ..Default::default()
        };
        for _ in 0..20 {
            let fp = gen.generate(Some(&overrides));
            assert!(fp.plugins.is_empty());
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let mut a = FingerprintGenerator::with_seed(42);
        let mut b = FingerprintGenerator::with_seed(42);
        assert_eq!(a.generate(None), b.generate(None));
    }

    #[test]
    fn fresh_generators_diverge() {
        let mut gen = FingerprintGenerator::new();
        let mut hashes = std::collections::HashSet::new();
        for _ in 0..10 {
            hashes.insert(gen.generate(None).canvas.hash);
        }
        assert!(hashes.len() > 1);
    }
}
