//! Fingerprint value types.
//!
//! A [`Fingerprint`] describes one synthetic browser identity. It is created
//! once (by the generator or supplied whole by a caller), never mutated in
//! place, and serializes as camelCase JSON so profiles round-trip through
//! external stores unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// navigator.platform values the generator knows how to stay consistent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "Win32")]
    Win32,
    #[serde(rename = "MacIntel")]
    MacIntel,
    #[serde(rename = "Linux x86_64")]
    LinuxX8664,
    #[serde(rename = "iPhone")]
    IPhone,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win32 => "Win32",
            Self::MacIntel => "MacIntel",
            Self::LinuxX8664 => "Linux x86_64",
            Self::IPhone => "iPhone",
        }
    }

    /// Substring expected in a consistent user agent for this platform.
    pub fn ua_marker(&self) -> &'static str {
        match self {
            Self::Win32 => "Windows",
            Self::MacIntel => "Mac",
            Self::LinuxX8664 => "Linux",
            Self::IPhone => "iPhone",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "win32" | "windows" | "win" => Ok(Self::Win32),
            "macintel" | "macos" | "mac" => Ok(Self::MacIntel),
            "linux x86_64" | "linux" => Ok(Self::LinuxX8664),
            "iphone" | "ios" => Ok(Self::IPhone),
            _ => Err(format!("unknown platform: {}", s)),
        }
    }
}

/// Canvas read-back noise parameters. The hash identifies the canvas surface;
/// the noise magnitude is written into a 1x1 region before any export call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasFingerprint {
    pub hash: String,
    pub noise: f64,
}

/// AudioContext surface parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioContextFingerprint {
    pub sample_rate: u32,
    pub channel_count: u32,
    pub compressor_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebRtcMode {
    /// Session acquires its real IP from the network.
    Real,
    /// Spoofed public/local addresses.
    Fake,
    /// WebRTC killed entirely.
    Disabled,
}

/// WebRTC presentation policy.
///
/// `mode == Real` implies no predefined public IP; `local_ips` must stay
/// inside RFC1918 ranges (the validator enforces both).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebRtcConfig {
    pub mode: WebRtcMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub local_ips: Vec<String>,
    #[serde(default)]
    pub stun_servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryHint {
    pub charging: bool,
    /// 0.0 to 1.0
    pub level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHint {
    pub effective_type: String,
    pub downlink: f64,
    pub rtt: u32,
}

/// One synthetic browser identity. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub user_agent: String,
    pub platform: Platform,
    pub hardware_concurrency: u32,
    pub device_memory: u32,

    /// "WxH" form, e.g. "1920x1080".
    pub screen_resolution: String,
    /// "WxH" form; must fit inside `screen_resolution` on both axes.
    pub available_screen_resolution: String,
    pub color_depth: u32,
    pub pixel_ratio: f64,

    /// IANA timezone id.
    pub timezone: String,
    pub language: String,
    pub languages: Vec<String>,

    pub webgl_vendor: String,
    pub webgl_renderer: String,

    pub canvas: CanvasFingerprint,
    pub audio_context: AudioContextFingerprint,
    pub fonts: Vec<String>,
    pub plugins: Vec<String>,

    pub webrtc: WebRtcConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionHint>,
}

impl Fingerprint {
    /// Decompose a "WxH" resolution string into (width, height).
    pub fn parse_resolution(s: &str) -> Option<(u32, u32)> {
        let (w, h) = s.split_once('x')?;
        Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
    }

    pub fn screen_size(&self) -> Option<(u32, u32)> {
        Self::parse_resolution(&self.screen_resolution)
    }

    pub fn available_screen_size(&self) -> Option<(u32, u32)> {
        Self::parse_resolution(&self.available_screen_resolution)
    }

    /// True when the user agent belongs to the Chromium family
    /// (Chrome/Chromium/Edge). Plugins only make sense for these.
    pub fn is_chromium_family(&self) -> bool {
        is_chromium_ua(&self.user_agent)
    }
}

pub(crate) fn is_chromium_ua(user_agent: &str) -> bool {
    (user_agent.contains("Chrome/") || user_agent.contains("Chromium/") || user_agent.contains("Edg/"))
        && !user_agent.contains("Firefox/")
}

/// Partial fingerprint supplied by a caller. Every present field is taken
/// verbatim by the generator; absent fields resolve from the pools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FingerprintOverrides {
    pub user_agent: Option<String>,
    pub platform: Option<Platform>,
    pub hardware_concurrency: Option<u32>,
    pub device_memory: Option<u32>,
    pub screen_resolution: Option<String>,
    pub available_screen_resolution: Option<String>,
    pub color_depth: Option<u32>,
    pub pixel_ratio: Option<f64>,
    pub timezone: Option<String>,
    pub language: Option<String>,
    pub languages: Option<Vec<String>>,
    pub webgl_vendor: Option<String>,
    pub webgl_renderer: Option<String>,
    pub canvas: Option<CanvasFingerprint>,
    pub audio_context: Option<AudioContextFingerprint>,
    pub fonts: Option<Vec<String>>,
    pub plugins: Option<Vec<String>>,
    pub webrtc: Option<WebRtcConfig>,
    pub battery: Option<BatteryHint>,
    pub connection: Option<ConnectionHint>,
}

/// True for addresses inside the RFC1918 private ranges.
pub fn is_private_ip(ip: &str) -> bool {
    let octets: Vec<u32> = ip.split('.').filter_map(|p| p.parse().ok()).collect();
    if octets.len() != 4 || octets.iter().any(|&o| o > 255) {
        return false;
    }
    match (octets[0], octets[1]) {
        (10, _) => true,
        (172, b) => (16..=31).contains(&b),
        (192, 168) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolution_accepts_wxh() {
        assert_eq!(Fingerprint::parse_resolution("1920x1080"), Some((1920, 1080)));
        assert_eq!(Fingerprint::parse_resolution("2560x1600"), Some((2560, 1600)));
    }

    #[test]
    fn parse_resolution_rejects_garbage() {
        assert_eq!(Fingerprint::parse_resolution("1920"), None);
        assert_eq!(Fingerprint::parse_resolution("wxh"), None);
        assert_eq!(Fingerprint::parse_resolution(""), None);
    }

    #[test]
    fn private_ip_ranges() {
        assert!(is_private_ip("10.0.0.1"));
        assert!(is_private_ip("172.16.0.1"));
        assert!(is_private_ip("172.31.255.254"));
        assert!(is_private_ip("192.168.1.100"));

        assert!(!is_private_ip("172.32.0.1"));
        assert!(!is_private_ip("8.8.8.8"));
        assert!(!is_private_ip("192.169.0.1"));
        assert!(!is_private_ip("not-an-ip"));
        assert!(!is_private_ip("10.0.0"));
    }

    #[test]
    fn chromium_family_detection() {
        assert!(is_chromium_ua(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        ));
        assert!(!is_chromium_ua(
            "Mozilla/5.0 (X11; Linux x86_64; rv:132.0) Gecko/20100101 Firefox/132.0"
        ));
    }

    #[test]
    fn fingerprint_serializes_camel_case() {
        let fp = Fingerprint {
            user_agent: "ua".into(),
            platform: Platform::Win32,
            hardware_concurrency: 8,
            device_memory: 16,
            screen_resolution: "1920x1080".into(),
            available_screen_resolution: "1920x1040".into(),
            color_depth: 24,
            pixel_ratio: 1.0,
            timezone: "America/New_York".into(),
            language: "en-US".into(),
            languages: vec!["en-US".into(), "en".into()],
            webgl_vendor: "Intel Inc.".into(),
            webgl_renderer: "Intel Iris Xe Graphics".into(),
            canvas: CanvasFingerprint { hash: "abc".into(), noise: 0.01 },
            audio_context: AudioContextFingerprint {
                sample_rate: 44100,
                channel_count: 2,
                compressor_hash: "def".into(),
            },
            fonts: vec!["Arial".into()],
            plugins: vec![],
            webrtc: WebRtcConfig {
                mode: WebRtcMode::Disabled,
                public_ip: None,
                local_ips: vec![],
                stun_servers: vec![],
            },
            battery: None,
            connection: None,
        };

        let json = serde_json::to_value(&fp).unwrap();
        assert_eq!(json["userAgent"], "ua");
        assert_eq!(json["platform"], "Win32");
        assert_eq!(json["screenResolution"], "1920x1080");
        assert_eq!(json["webrtc"]["mode"], "disabled");
        assert!(json.get("battery").is_none());

        let back: Fingerprint = serde_json::from_value(json).unwrap();
        assert_eq!(back, fp);
    }
}
