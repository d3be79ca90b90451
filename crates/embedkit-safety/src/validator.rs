use std::sync::LazyLock;

use embedkit_core::{EmbeddedAsset, Markup, Whitelist};
use scraper::{Html, Selector};

static IFRAME_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("iframe").expect("valid iframe selector"));
static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("valid script selector"));

/// Frame attributes that name the frame's destination.
const FRAME_TARGET_ATTRS: [&str; 2] = ["src", "href"];

/// A single reason an embed is not safe to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The asset's own URL is not whitelisted.
    UrlNotWhitelisted { url: String },
    FrameNotWhitelisted { url: String },
    /// Inline script bodies cannot be vetted, so any is rejected.
    InlineScript,
    ScriptNotWhitelisted { url: String },
    /// The markup produced no document to inspect.
    Unparsable,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::UrlNotWhitelisted { url } => write!(f, "asset url {url} is not whitelisted"),
            Violation::FrameNotWhitelisted { url } => {
                write!(f, "iframe target {url} is not whitelisted")
            }
            Violation::InlineScript => write!(f, "markup contains an inline script"),
            Violation::ScriptNotWhitelisted { url } => {
                write!(f, "script source {url} is not whitelisted")
            }
            Violation::Unparsable => write!(f, "markup could not be parsed"),
        }
    }
}

/// Outcome of inspecting one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyReport {
    violations: Vec<Violation>,
}

impl SafetyReport {
    #[must_use]
    pub fn is_safe(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

/// Decides whether an asset's markup may be rendered unescaped.
#[derive(Debug, Clone)]
pub struct SafetyValidator {
    whitelist: Whitelist,
}

impl SafetyValidator {
    #[must_use]
    pub fn new(whitelist: Whitelist) -> Self {
        Self { whitelist }
    }

    #[must_use]
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// True when the asset URL is whitelisted and its markup (if any) only
    /// frames or loads whitelisted URLs and has no inline script.
    #[must_use]
    pub fn is_embed_safe(&self, asset: &EmbeddedAsset) -> bool {
        self.inspect(asset).is_safe()
    }

    /// Collects every violation instead of stopping at the first.
    #[must_use]
    pub fn inspect(&self, asset: &EmbeddedAsset) -> SafetyReport {
        let mut violations = Vec::new();

        if !self.whitelist.is_match(asset.url()) {
            violations.push(Violation::UrlNotWhitelisted {
                url: asset.url().to_string(),
            });
        }

        if let Some(code) = asset.code() {
            violations.extend(self.inspect_markup(code));
        }

        if !violations.is_empty() {
            tracing::debug!(
                url = asset.url(),
                violations = violations.len(),
                "embed rejected by safety check"
            );
        }

        SafetyReport { violations }
    }

    /// Violations found in a markup fragment alone.
    #[must_use]
    pub fn inspect_markup(&self, code: &Markup) -> Vec<Violation> {
        let Some(document) = parse_markup(code.as_str()) else {
            return vec![Violation::Unparsable];
        };

        let mut violations = Vec::new();

        for frame in document.select(&IFRAME_SELECTOR) {
            for attr in FRAME_TARGET_ATTRS {
                let Some(target) = frame.value().attr(attr).filter(|t| !t.is_empty()) else {
                    continue;
                };
                if !self.whitelist.is_match(target) {
                    tracing::debug!(attr, target, "iframe target not whitelisted");
                    violations.push(Violation::FrameNotWhitelisted {
                        url: target.to_string(),
                    });
                }
            }
        }

        for script in document.select(&SCRIPT_SELECTOR) {
            let has_content = script.text().any(|chunk| !chunk.is_empty());
            if has_content {
                tracing::debug!("inline script found in markup");
                violations.push(Violation::InlineScript);
                continue;
            }
            if let Some(src) = script.value().attr("src").filter(|s| !s.is_empty()) {
                if !self.whitelist.is_match(src) {
                    tracing::debug!(src, "script source not whitelisted");
                    violations.push(Violation::ScriptNotWhitelisted {
                        url: src.to_string(),
                    });
                }
            }
        }

        violations
    }
}

/// Parses a fragment with a tolerant HTML5 parser. Entities are never
/// fetched and parse diagnostics stay on the returned document.
fn parse_markup(markup: &str) -> Option<Html> {
    if markup.trim().is_empty() {
        return None;
    }

    let document = Html::parse_fragment(markup);
    if !document.errors.is_empty() {
        tracing::debug!(
            diagnostics = document.errors.len(),
            first = %document.errors[0],
            "markup parsed with recoverable errors"
        );
    }
    Some(document)
}
