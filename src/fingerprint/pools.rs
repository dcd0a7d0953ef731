//! Generation pools: immutable tables the generator resolves unset fields
//! from. Loaded once into the binary, passed by reference, never mutated.
//!
//! Weights are relative shares, not percentages; they only need to be
//! proportional to each other.

use super::model::Platform;

/// User agents per platform, with relative weights.
pub const WINDOWS_USER_AGENTS: &[(&str, f64)] = &[
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        30.0,
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        25.0,
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
        18.0,
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
        15.0,
    ),
    (
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
        12.0,
    ),
];

pub const MAC_USER_AGENTS: &[(&str, f64)] = &[
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        35.0,
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        30.0,
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
        20.0,
    ),
    (
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
        15.0,
    ),
];

pub const LINUX_USER_AGENTS: &[(&str, f64)] = &[
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
        40.0,
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        30.0,
    ),
    (
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
        30.0,
    ),
];

pub const IPHONE_USER_AGENTS: &[(&str, f64)] = &[
    (
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
        60.0,
    ),
    (
        "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
        40.0,
    ),
];

/// Platform share across generated fleets (desktop-heavy on purpose).
pub const PLATFORM_WEIGHTS: &[(Platform, f64)] = &[
    (Platform::Win32, 68.0),
    (Platform::MacIntel, 18.0),
    (Platform::LinuxX8664, 9.0),
    (Platform::IPhone, 5.0),
];

pub fn user_agents_for(platform: Platform) -> &'static [(&'static str, f64)] {
    match platform {
        Platform::Win32 => WINDOWS_USER_AGENTS,
        Platform::MacIntel => MAC_USER_AGENTS,
        Platform::LinuxX8664 => LINUX_USER_AGENTS,
        Platform::IPhone => IPHONE_USER_AGENTS,
    }
}

/// WebGL vendor with its associated renderer set.
pub struct GpuFamily {
    pub vendor: &'static str,
    pub renderers: &'static [&'static str],
}

pub const WINDOWS_GPUS: &[(&GpuFamily, f64)] = &[
    (
        &GpuFamily {
            vendor: "NVIDIA Corporation",
            renderers: &[
                "NVIDIA GeForce RTX 3060",
                "NVIDIA GeForce RTX 3070",
                "NVIDIA GeForce RTX 4060",
                "NVIDIA GeForce RTX 4070",
                "NVIDIA GeForce GTX 1660",
            ],
        },
        40.0,
    ),
    (
        &GpuFamily {
            vendor: "Intel Inc.",
            renderers: &["Intel UHD Graphics 630", "Intel Iris Xe Graphics"],
        },
        35.0,
    ),
    (
        &GpuFamily {
            vendor: "AMD",
            renderers: &["AMD Radeon RX 6800", "AMD Radeon RX 7800 XT", "AMD Radeon RX 6600"],
        },
        25.0,
    ),
];

pub const MAC_GPUS: &[(&GpuFamily, f64)] = &[
    (
        &GpuFamily {
            vendor: "Apple Inc.",
            renderers: &[
                "Apple M1 Pro",
                "Apple M1 Max",
                "Apple M2 Pro",
                "Apple M2 Max",
                "Apple M3 Pro",
                "Apple M3 Max",
                "Apple M4 Max",
            ],
        },
        80.0,
    ),
    (
        &GpuFamily {
            vendor: "Intel Inc.",
            renderers: &["Intel Iris Plus Graphics 655", "Intel UHD Graphics 630"],
        },
        20.0,
    ),
];

pub const LINUX_GPUS: &[(&GpuFamily, f64)] = &[
    (
        &GpuFamily {
            vendor: "Intel Inc.",
            renderers: &["Intel UHD Graphics 630", "Intel Iris Xe Graphics"],
        },
        40.0,
    ),
    (
        &GpuFamily {
            vendor: "NVIDIA Corporation",
            renderers: &["NVIDIA GeForce RTX 3060", "NVIDIA GeForce RTX 4070"],
        },
        35.0,
    ),
    (
        &GpuFamily {
            vendor: "AMD",
            renderers: &["AMD Radeon RX 6800"],
        },
        25.0,
    ),
];

pub const IPHONE_GPUS: &[(&GpuFamily, f64)] = &[(
    &GpuFamily {
        vendor: "Apple Inc.",
        renderers: &["Apple GPU", "Apple A16 GPU", "Apple A17 Pro GPU"],
    },
    100.0,
)];

pub fn gpus_for(platform: Platform) -> &'static [(&'static GpuFamily, f64)] {
    match platform {
        Platform::Win32 => WINDOWS_GPUS,
        Platform::MacIntel => MAC_GPUS,
        Platform::LinuxX8664 => LINUX_GPUS,
        Platform::IPhone => IPHONE_GPUS,
    }
}

/// All renderer names known for a vendor, across every platform pool.
/// Used by the validator to check vendor/renderer pairing.
pub fn renderers_for_vendor(vendor: &str) -> Vec<&'static str> {
    let mut out = Vec::new();
    for pool in [WINDOWS_GPUS, MAC_GPUS, LINUX_GPUS, IPHONE_GPUS] {
        for (family, _) in pool {
            if family.vendor == vendor {
                for r in family.renderers {
                    if !out.contains(r) {
                        out.push(r);
                    }
                }
            }
        }
    }
    out
}

pub const WINDOWS_RESOLUTIONS: &[(&str, f64)] = &[
    ("1920x1080", 28.0),
    ("1366x768", 18.0),
    ("2560x1440", 12.0),
    ("1536x864", 10.0),
    ("1440x900", 8.0),
    ("1600x900", 7.0),
    ("1280x720", 6.0),
    ("3840x2160", 5.0),
    ("1680x1050", 3.0),
    ("1920x1200", 3.0),
];

pub const MAC_RESOLUTIONS: &[(&str, f64)] = &[
    ("2560x1600", 30.0),
    ("2880x1800", 20.0),
    ("3024x1964", 15.0),
    ("1920x1080", 15.0),
    ("2560x1440", 10.0),
    ("3840x2160", 10.0),
];

pub const LINUX_RESOLUTIONS: &[(&str, f64)] = &[
    ("1920x1080", 45.0),
    ("2560x1440", 25.0),
    ("1366x768", 15.0),
    ("3840x2160", 8.0),
    ("1680x1050", 7.0),
];

pub const IPHONE_RESOLUTIONS: &[(&str, f64)] = &[
    ("390x844", 45.0),
    ("393x852", 30.0),
    ("428x926", 25.0),
];

pub fn resolutions_for(platform: Platform) -> &'static [(&'static str, f64)] {
    match platform {
        Platform::Win32 => WINDOWS_RESOLUTIONS,
        Platform::MacIntel => MAC_RESOLUTIONS,
        Platform::LinuxX8664 => LINUX_RESOLUTIONS,
        Platform::IPhone => IPHONE_RESOLUTIONS,
    }
}

/// (cores, memory GB, weight). Memory values stay on the navigator.deviceMemory
/// ladder {2,4,8,16,32,64}.
pub const HARDWARE_CONFIGS: &[((u32, u32), f64)] = &[
    ((8, 16), 25.0),
    ((6, 8), 20.0),
    ((4, 8), 18.0),
    ((12, 32), 12.0),
    ((8, 32), 10.0),
    ((16, 64), 5.0),
    ((4, 4), 10.0),
];

pub const TIMEZONES: &[(&str, f64)] = &[
    ("America/New_York", 22.0),
    ("America/Chicago", 12.0),
    ("America/Los_Angeles", 18.0),
    ("Europe/London", 14.0),
    ("Europe/Berlin", 10.0),
    ("Europe/Paris", 8.0),
    ("Asia/Tokyo", 6.0),
    ("Asia/Singapore", 5.0),
    ("Australia/Sydney", 5.0),
];

/// (primary language, full ordered list, weight).
pub const LOCALES: &[((&str, &[&str]), f64)] = &[
    (("en-US", &["en-US", "en"]), 55.0),
    (("en-GB", &["en-GB", "en"]), 15.0),
    (("de-DE", &["de-DE", "de", "en"]), 10.0),
    (("fr-FR", &["fr-FR", "fr", "en"]), 8.0),
    (("es-ES", &["es-ES", "es", "en"]), 7.0),
    (("ja-JP", &["ja-JP", "ja", "en"]), 5.0),
];

/// The known font universe; generated fingerprints carry a random subset.
pub const FONT_UNIVERSE: &[&str] = &[
    "Arial",
    "Arial Black",
    "Arial Narrow",
    "Calibri",
    "Cambria",
    "Candara",
    "Comic Sans MS",
    "Consolas",
    "Courier New",
    "Franklin Gothic Medium",
    "Garamond",
    "Georgia",
    "Gill Sans",
    "Helvetica",
    "Helvetica Neue",
    "Impact",
    "Lucida Console",
    "Lucida Sans Unicode",
    "Menlo",
    "Monaco",
    "Palatino Linotype",
    "Segoe UI",
    "Tahoma",
    "Times New Roman",
    "Trebuchet MS",
    "Verdana",
];

/// Fixed Chromium plugin set; a profile either carries all three or none.
pub const CHROMIUM_PLUGINS: &[&str] = &["Chrome PDF Plugin", "Chrome PDF Viewer", "Native Client"];

pub const STUN_SERVERS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun.cloudflare.com:3478",
];

pub const COLOR_DEPTHS: &[(u32, f64)] = &[(24, 90.0), (30, 10.0)];

pub const PIXEL_RATIOS: &[(f64, f64)] = &[(1.0, 55.0), (1.25, 10.0), (1.5, 10.0), (2.0, 25.0)];

pub const AUDIO_SAMPLE_RATES: &[(u32, f64)] = &[(44100, 60.0), (48000, 40.0)];

pub const CONNECTION_TYPES: &[(&str, f64)] = &[("4g", 80.0), ("3g", 12.0), ("wifi", 8.0)];
