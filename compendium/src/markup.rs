//! Post-processing for fetched detail pages.
//!
//! Detail pages reference their stylesheets relative to the compendium site,
//! so they render unstyled once saved or shown anywhere else. `fix_styles`
//! points them back at the site and widens the stat block to fit its window.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::DEFAULT_SITE_ROOT;

/// Rule injected so the stat block fills the available width.
pub const DETAIL_WIDTH_RULE: &str = "#detail { width: auto !important; }";

static STYLESHEET_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href="styles/(.*?\.css)""#).expect("stylesheet pattern is valid")
});

/// Rewrite relative stylesheet links against the live site and inject the
/// width override before `</head>`.
///
/// Not idempotent: each call injects another style block. Call it once per
/// fetched document.
pub fn fix_styles(html: &str) -> String {
    fix_styles_with_base(html, &format!("{DEFAULT_SITE_ROOT}/styles"))
}

/// Same as [`fix_styles`] with an explicit absolute styles base.
///
/// The `href="styles/....css"` match ignores case; the file name keeps its
/// case. The `</head>` match is literal.
pub fn fix_styles_with_base(html: &str, styles_base: &str) -> String {
    let base = styles_base.trim_end_matches('/');
    let linked = STYLESHEET_HREF.replace_all(html, |caps: &regex::Captures<'_>| {
        format!("href=\"{base}/{}\"", &caps[1])
    });
    linked.replace("</head>", &format!("<style>{DETAIL_WIDTH_RULE}</style></head>"))
}
