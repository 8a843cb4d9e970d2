//! Building evidence bundles from fetched pages.

use commhub_core::Evidence;
use scraper::{ElementRef, Html, Selector};

/// Mount points left behind by client-rendered frameworks.
const SPA_ROOT_IDS: [&str; 4] = ["root", "app", "__next", "__nuxt"];

/// Elements whose text counts as server-rendered content.
const CONTENT_ELEMENTS: &str = "p, h1, h2, h3, h4, li, article, blockquote, td";

/// Below this many characters of content-element text a page counts as an empty shell.
pub const MIN_STATIC_TEXT_CHARS: usize = 200;

/// Build evidence from a fetched page, pulling the `<meta name="generator">` value out of the HTML.
pub fn evidence_from_page(url: &str, html: &str, server_header: Option<&str>) -> Evidence {
    let document = Html::parse_document(html);
    Evidence {
        html: html.to_string(),
        url: url.to_string(),
        server_header: server_header
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string),
        meta_generator: meta_generator(&document),
    }
}

fn meta_generator(document: &Html) -> Option<String> {
    let sel = Selector::parse("meta[name]").ok()?;
    document
        .select(&sel)
        .filter(|el| {
            el.value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("generator"))
        })
        .find_map(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// True when the HTML carries an `id="root"`-style SPA mount point (either quote style).
pub fn has_spa_root_marker(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    SPA_ROOT_IDS.iter().any(|id| {
        lower.contains(&format!("id=\"{id}\"")) || lower.contains(&format!("id='{id}'"))
    })
}

/// True when the page has almost no text inside content elements. Text under
/// nested content elements (`article > p`) is counted once, at the outermost match.
pub fn has_minimal_static_content(html: &str) -> bool {
    let Ok(sel) = Selector::parse(CONTENT_ELEMENTS) else {
        return true;
    };
    let document = Html::parse_document(html);
    let mut chars = 0usize;
    let outermost = document.select(&sel).filter(|el| {
        !el.ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| sel.matches(&ancestor))
    });
    for el in outermost {
        chars += el
            .text()
            .map(|t| t.trim().chars().count())
            .sum::<usize>();
        if chars >= MIN_STATIC_TEXT_CHARS {
            return false;
        }
    }
    true
}
