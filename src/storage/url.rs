//! Object URL derivation.
//!
//! A pure function of (base URL, layout, hex key). Key validation is weak:
//! the front-end may hand over keys of any length, including empty, and
//! every layout has to produce something sensible.

use crate::config::UrlLayout;

/// Bazel action-cache entries are addressed by a SHA-256 hex digest.
const SHA256_HEX_LEN: usize = 64;

/// Derive the object URL for `hex_key` below `base`.
///
/// The base is used verbatim apart from guaranteeing exactly one trailing
/// slash before the layout-specific suffix.
pub fn object_url(base: &str, layout: UrlLayout, hex_key: &str) -> String {
    let mut url = String::with_capacity(base.len() + hex_key.len() + SHA256_HEX_LEN);
    url.push_str(base);
    if !url.ends_with('/') {
        url.push('/');
    }

    match layout {
        UrlLayout::Bazel => {
            url.push_str("ac/");
            if hex_key.len() >= SHA256_HEX_LEN {
                url.push_str(&hex_key[..SHA256_HEX_LEN]);
            } else if !hex_key.is_empty() {
                // Pad short keys by cycling the key until the digest width
                // is reached.
                let mut remaining = SHA256_HEX_LEN;
                while remaining > 0 {
                    let take = remaining.min(hex_key.len());
                    url.push_str(&hex_key[..take]);
                    remaining -= take;
                }
            }
        }
        UrlLayout::Flat => url.push_str(hex_key),
        UrlLayout::Subdirs => {
            if hex_key.len() >= 2 {
                url.push_str(&hex_key[..2]);
                url.push('/');
                url.push_str(&hex_key[2..]);
            } else {
                url.push_str(hex_key);
            }
        }
    }

    url
}
