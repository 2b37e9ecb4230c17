use reportflow::{Document, DrawCommand};

/// Texts drawn on one page (0-based), in drawing order.
pub fn page_texts(doc: &Document, page: usize) -> Vec<String> {
    doc.pages
        .get(page)
        .map(|page| {
            page.commands
                .iter()
                .filter_map(|command| match command {
                    DrawCommand::Text { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Baseline y of the first text equal to `text` on a page.
pub fn text_y(doc: &Document, page: usize, text: &str) -> Option<f32> {
    doc.pages.get(page)?.commands.iter().find_map(|command| match command {
        DrawCommand::Text { text: t, y, .. } if t == text => Some(*y),
        _ => None,
    })
}

pub fn count_commands(doc: &Document, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
    doc.pages
        .iter()
        .flat_map(|page| page.commands.iter())
        .filter(|command| predicate(command))
        .count()
}

#[macro_export]
macro_rules! assert_page_count {
    ($doc:expr, $expected:expr) => {
        assert_eq!(
            $doc.pages.len(),
            $expected,
            "expected {} page(s), got {}",
            $expected,
            $doc.pages.len()
        );
    };
}

#[macro_export]
macro_rules! assert_page_contains_text {
    ($doc:expr, $page:expr, $text:expr) => {
        let texts = $crate::common::document_assertions::page_texts(&$doc, $page);
        assert!(
            texts.iter().any(|t| t == $text),
            "page {} does not contain '{}': {:?}",
            $page,
            $text,
            texts
        );
    };
}

#[macro_export]
macro_rules! assert_page_lacks_text {
    ($doc:expr, $page:expr, $text:expr) => {
        let texts = $crate::common::document_assertions::page_texts(&$doc, $page);
        assert!(
            !texts.iter().any(|t| t == $text),
            "page {} unexpectedly contains '{}'",
            $page,
            $text
        );
    };
}
