//! Fingerprint injection script assembly.
//!
//! Builds the JavaScript installed into every page context before any
//! page-authored script runs. All values come from the one fingerprint of
//! the session, so every page observes the same identity. The script is
//! idempotent per document: re-navigation re-triggers installation and a
//! guard keeps double installation from throwing.

use crate::fingerprint::{Fingerprint, WebRtcMode};

/// Assemble the full override script for one fingerprint.
pub fn build_injection_script(fp: &Fingerprint) -> String {
    let (screen_w, screen_h) = fp.screen_size().unwrap_or((1920, 1080));
    let (avail_w, avail_h) = fp.available_screen_size().unwrap_or((screen_w, screen_h));

    let platform = js_str(fp.platform.as_str());
    let language = js_str(&fp.language);
    let languages = serde_json::to_string(&fp.languages).unwrap_or_else(|_| "[]".to_string());
    let vendor = js_str(&fp.webgl_vendor);
    let renderer = js_str(&fp.webgl_renderer);
    let plugins = serde_json::to_string(&fp.plugins).unwrap_or_else(|_| "[]".to_string());

    // Pixel perturbation derived from the model so repeated exports from
    // the same session stay stable.
    let noise_delta = ((fp.canvas.noise * 255.0).max(1.0)).min(8.0) as u32;
    let noise_channel = fp
        .canvas
        .hash
        .bytes()
        .next()
        .map(|b| (b as u32) % 3)
        .unwrap_or(0);

    let mut sections: Vec<String> = Vec::new();

    // Hardware/software identity getters.
    sections.push(format!(
        r#"
        const def = (obj, prop, value) =>
            Object.defineProperty(obj, prop, {{ get: () => value, configurable: true }});
        def(navigator, 'platform', {platform});
        def(navigator, 'hardwareConcurrency', {hc});
        def(navigator, 'deviceMemory', {dm});
        def(navigator, 'language', {language});
        def(navigator, 'languages', Object.freeze({languages}));
        "#,
        hc = fp.hardware_concurrency,
        dm = fp.device_memory,
    ));

    // Display getters, decomposed from the WxH model fields.
    sections.push(format!(
        r#"
        def(screen, 'width', {screen_w});
        def(screen, 'height', {screen_h});
        def(screen, 'availWidth', {avail_w});
        def(screen, 'availHeight', {avail_h});
        def(screen, 'colorDepth', {color_depth});
        def(screen, 'pixelDepth', {color_depth});
        def(window, 'devicePixelRatio', {pixel_ratio});
        "#,
        color_depth = fp.color_depth,
        pixel_ratio = fp.pixel_ratio,
    ));

    // WebGL vendor/renderer for both context generations; every other
    // parameter code passes through unchanged.
    sections.push(format!(
        r#"
        const patchGl = (proto) => {{
            if (!proto || proto.getParameter.__mfPatched) return;
            const orig = proto.getParameter;
            proto.getParameter = function (parameter) {{
                if (parameter === 37445) return {vendor};
                if (parameter === 37446) return {renderer};
                return orig.apply(this, arguments);
            }};
            proto.getParameter.__mfPatched = true;
        }};
        patchGl(window.WebGLRenderingContext && WebGLRenderingContext.prototype);
        patchGl(window.WebGL2RenderingContext && WebGL2RenderingContext.prototype);
        "#
    ));

    // Canvas read-back perturbation: write the model's noise into a 1x1
    // region before any export call returns. Stable within the session,
    // different from an unmodified browser.
    sections.push(format!(
        r#"
        const addNoise = (canvas) => {{
            try {{
                const ctx = canvas.getContext && canvas.getContext('2d');
                if (!ctx || canvas.width < 1 || canvas.height < 1) return;
                const px = ctx.getImageData(0, 0, 1, 1);
                px.data[{noise_channel}] = (px.data[{noise_channel}] + {noise_delta}) % 256;
                ctx.putImageData(px, 0, 0);
            }} catch (e) {{ /* tainted canvas: export will throw anyway */ }}
        }};
        const origToDataURL = HTMLCanvasElement.prototype.toDataURL;
        HTMLCanvasElement.prototype.toDataURL = function () {{
            addNoise(this);
            return origToDataURL.apply(this, arguments);
        }};
        const origToBlob = HTMLCanvasElement.prototype.toBlob;
        HTMLCanvasElement.prototype.toBlob = function () {{
            addNoise(this);
            return origToBlob.apply(this, arguments);
        }};
        "#
    ));

    // Automation tells: webdriver flag, headless-only globals, and a chrome
    // object that headless builds leave out.
    sections.push(
        r#"
        def(navigator, 'webdriver', undefined);
        try { delete Object.getPrototypeOf(navigator).webdriver; } catch (e) {}
        delete window.__nightmare;
        delete window._phantom;
        delete window.callPhantom;
        if (!window.chrome) window.chrome = { runtime: {} };
        if (navigator.permissions && navigator.permissions.query) {
            const origQuery = navigator.permissions.query.bind(navigator.permissions);
            navigator.permissions.query = (parameters) =>
                parameters.name === 'notifications'
                    ? Promise.resolve({ state: Notification.permission })
                    : origQuery(parameters);
        }
        "#
        .to_string(),
    );

    // Plugin identity.
    sections.push(format!(
        r#"
        def(navigator, 'plugins', {plugins}.map((name) => ({{ name, filename: name.toLowerCase().replace(/ /g, '-') }})));
        "#
    ));

    if fp.webrtc.mode == WebRtcMode::Disabled {
        sections.push(
            r#"
        def(window, 'RTCPeerConnection', undefined);
        def(window, 'webkitRTCPeerConnection', undefined);
        if (navigator.mediaDevices) def(navigator.mediaDevices, 'enumerateDevices', () => Promise.resolve([]));
        "#
            .to_string(),
        );
    }

    if let Some(battery) = &fp.battery {
        sections.push(format!(
            r#"
        navigator.getBattery = () => Promise.resolve({{
            charging: {charging},
            level: {level},
            chargingTime: 0,
            dischargingTime: Infinity,
            addEventListener: () => {{}},
            removeEventListener: () => {{}},
        }});
        "#,
            charging = battery.charging,
            level = battery.level,
        ));
    }

    if let Some(connection) = &fp.connection {
        sections.push(format!(
            r#"
        def(navigator, 'connection', {{
            effectiveType: {effective_type},
            downlink: {downlink},
            rtt: {rtt},
            saveData: false,
            addEventListener: () => {{}},
            removeEventListener: () => {{}},
        }});
        "#,
            effective_type = js_str(&connection.effective_type),
            downlink = connection.downlink,
            rtt = connection.rtt,
        ));
    }

    format!(
        r#"(() => {{
    if (window.__mfInstalled) return;
    window.__mfInstalled = true;
    try {{
{body}
    }} catch (e) {{ /* overrides are best-effort per surface */ }}
}})();"#,
        body = sections.join("\n")
    )
}

fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}
