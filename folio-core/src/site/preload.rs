//! Request hook that controls resource preloading.
//!
//! The server resolves every request through [`handle`]. The hook changes
//! nothing about the response except the preload decision: fonts, scripts
//! and stylesheets are preloaded, everything else is not.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Kinds of resource a page can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Font,
    Js,
    Css,
    Asset,
}

impl ResourceKind {
    /// Classify a resource by its file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("woff" | "woff2" | "ttf" | "otf" | "eot") => ResourceKind::Font,
            Some("js" | "mjs") => ResourceKind::Js,
            Some("css") => ResourceKind::Css,
            _ => ResourceKind::Asset,
        }
    }

    /// Parse the lowercase name used on the wire.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "font" => Some(ResourceKind::Font),
            "js" => Some(ResourceKind::Js),
            "css" => Some(ResourceKind::Css),
            "asset" => Some(ResourceKind::Asset),
            _ => None,
        }
    }
}

/// Which resource kinds the client should preload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadPolicy {
    kinds: HashSet<ResourceKind>,
}

impl PreloadPolicy {
    /// Preload exactly `kinds`.
    pub fn only(kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn should_preload(&self, kind: ResourceKind) -> bool {
        self.kinds.contains(&kind)
    }
}

impl Default for PreloadPolicy {
    fn default() -> Self {
        Self::only([ResourceKind::Font, ResourceKind::Js, ResourceKind::Css])
    }
}

/// Options handed to the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub preload: PreloadPolicy,
}

/// Resolve `event` with the site's preload policy attached.
///
/// Whatever `resolve` returns is passed back untouched.
pub fn handle<E, R>(event: E, resolve: impl FnOnce(E, ResolveOptions) -> R) -> R {
    resolve(event, ResolveOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_preloads_fonts_scripts_and_styles() {
        let policy = PreloadPolicy::default();

        assert!(policy.should_preload(ResourceKind::Font));
        assert!(policy.should_preload(ResourceKind::Js));
        assert!(policy.should_preload(ResourceKind::Css));
        assert!(!policy.should_preload(ResourceKind::Asset));
    }

    #[test]
    fn kinds_from_paths() {
        assert_eq!(ResourceKind::from_path("fonts/Inter.WOFF2"), ResourceKind::Font);
        assert_eq!(ResourceKind::from_path("_app/immutable/start.js"), ResourceKind::Js);
        assert_eq!(ResourceKind::from_path("app.css"), ResourceKind::Css);
        assert_eq!(ResourceKind::from_path("images/me.png"), ResourceKind::Asset);
        assert_eq!(ResourceKind::from_path("README"), ResourceKind::Asset);
    }

    #[test]
    fn handle_passes_the_response_through() {
        let response = handle("GET /", |event, options| {
            assert!(options.preload.should_preload(ResourceKind::Css));
            format!("resolved {event}")
        });

        assert_eq!(response, "resolved GET /");
    }

    #[test]
    fn kind_names_round_trip_through_serde() {
        let json = serde_json::to_string(&ResourceKind::Font).unwrap();
        assert_eq!(json, "\"font\"");
        assert_eq!(ResourceKind::parse("css"), Some(ResourceKind::Css));
        assert_eq!(ResourceKind::parse("image"), None);
    }
}
