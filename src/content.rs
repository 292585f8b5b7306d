use crate::models::Chapter;
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;

/// One block-level node of normalized chapter markup. The pagination
/// engine never splits inside a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub html: String,
    pub text: String,
}

/// Normalized markup for a chapter: the server's pre-rendered HTML when it
/// has one, otherwise the plain-text fallback transform.
pub fn normalize_chapter(chapter: &Chapter) -> String {
    match &chapter.content_html {
        Some(html) if !html.trim().is_empty() => html.clone(),
        _ => plain_text_to_html(&chapter.content),
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn regexes() -> &'static (Regex, Regex, Regex, Regex) {
    static RE: OnceLock<(Regex, Regex, Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"\n{3,}").unwrap(),
            Regex::new(r"\*\*(.+?)\*\*").unwrap(),
            Regex::new(r"\*(.+?)\*").unwrap(),
            Regex::new(r"`(.+?)`").unwrap(),
        )
    })
}

/// Turn plain text into paragraphs with simple emphasis: blank lines split
/// paragraphs, single newlines become `<br/>`, and `**`, `*`, backticks
/// map to strong/em/code.
pub fn plain_text_to_html(text: &str) -> String {
    let (collapse, strong, em, code) = regexes();
    let t = text.replace("\r\n", "\n");
    let t = collapse.replace_all(&t, "\n\n").into_owned();
    let t = escape_html(&t);
    let t = strong.replace_all(&t, "<strong>$1</strong>");
    let t = em.replace_all(&t, "<em>$1</em>");
    let t = code.replace_all(&t, "<code>$1</code>");
    t.split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("<p>{}</p>", p.replace('\n', "<br/>")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split normalized markup into its top-level block nodes, preserving tags.
/// Stray top-level text gets wrapped in a paragraph. If the markup yields
/// nothing parseable but isn't blank, the whole thing becomes one block so
/// the reader degrades to a single page instead of failing.
pub fn split_blocks(html: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(html);
    let mut blocks = Vec::new();
    for child in fragment.root_element().children() {
        match child.value() {
            scraper::Node::Element(_) => {
                if let Some(el) = scraper::ElementRef::wrap(child) {
                    let text: String = el.text().collect();
                    blocks.push(Block {
                        html: el.html(),
                        text,
                    });
                }
            }
            scraper::Node::Text(t) => {
                let trimmed = t.trim();
                if !trimmed.is_empty() {
                    blocks.push(Block {
                        html: format!("<p>{}</p>", escape_html(trimmed)),
                        text: trimmed.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    if blocks.is_empty() && !html.trim().is_empty() {
        blocks.push(Block {
            html: html.to_string(),
            text: html.to_string(),
        });
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_becomes_paragraphs_with_emphasis() {
        let html = plain_text_to_html("Hello **world**.\nSecond line.\n\n\n\nNext *para* with `code`.");
        assert_eq!(
            html,
            "<p>Hello <strong>world</strong>.<br/>Second line.</p>\n\
             <p>Next <em>para</em> with <code>code</code>.</p>"
        );
    }

    #[test]
    fn plain_text_is_escaped_before_markup() {
        let html = plain_text_to_html("a < b & \"c\"");
        assert_eq!(html, "<p>a &lt; b &amp; &quot;c&quot;</p>");
    }

    #[test]
    fn normalize_prefers_pre_rendered_html() {
        let mut ch = Chapter {
            id: 1,
            story: None,
            title: "t".to_string(),
            content: "plain".to_string(),
            content_html: Some("<p>rendered</p>".to_string()),
            position: None,
        };
        assert_eq!(normalize_chapter(&ch), "<p>rendered</p>");
        ch.content_html = Some("   ".to_string());
        assert_eq!(normalize_chapter(&ch), "<p>plain</p>");
    }

    #[test]
    fn split_blocks_preserves_order_and_wraps_stray_text() {
        let blocks = split_blocks("<p>one</p>loose<h2>two</h2>");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].text, "one");
        assert_eq!(blocks[1].html, "<p>loose</p>");
        assert_eq!(blocks[2].text, "two");
    }

    #[test]
    fn split_blocks_empty_input_yields_no_blocks() {
        assert!(split_blocks("").is_empty());
        assert!(split_blocks("   \n ").is_empty());
    }
}
