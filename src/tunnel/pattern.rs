//! Quick-tunnel endpoint recognition

use regex::Regex;
use std::sync::LazyLock;

static QUICK_TUNNEL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://[a-zA-Z0-9-]+\.trycloudflare\.com").expect("static regex is valid")
});

/// First `https://<label>.trycloudflare.com` endpoint in a line of cloudflared output
pub fn extract_public_url(line: &str) -> Option<&str> {
    QUICK_TUNNEL_URL.find(line).map(|m| m.as_str())
}
