//! One-call post-processing of an exported PDF.

use crate::config::ExportConfig;
use crate::document::PdfDocument;
use crate::error::Result;
use crate::outline::HeadingExtractor;
use crate::page_boxes::PageBoxes;

/// Post-process the browser's PDF bytes.
///
/// Loads `pdf`, sets trim boxes from `pages` (when enabled), builds an outline
/// from the headings `extractor` yields for the configured tags (when any are
/// configured), and serializes the result.
///
/// A document without matching headings is saved without an outline.
///
/// # Example
///
/// ```no_run
/// use paged_pdf::{postprocess, ExportConfig, HeadingRecord};
///
/// let input = std::fs::read("book.pdf")?;
/// let headings = vec![HeadingRecord::new("h1", "Intro", "intro")];
/// let output = postprocess(&input, &headings, &[], &ExportConfig::default())?;
/// std::fs::write("book-with-outline.pdf", output)?;
/// # Ok::<(), paged_pdf::Error>(())
/// ```
pub fn postprocess<E>(
    pdf: &[u8],
    extractor: &E,
    pages: &[PageBoxes],
    config: &ExportConfig,
) -> Result<Vec<u8>>
where
    E: HeadingExtractor + ?Sized,
{
    let mut doc = PdfDocument::load(pdf)?;

    if config.trim_boxes && !pages.is_empty() {
        let changed = doc.set_trim_boxes(pages)?;
        log::debug!("Set trim boxes on {} pages", changed);
    }

    if config.outline_enabled() {
        let headings = extractor.headings(&config.outline_tags);
        log::debug!("{} headings for the outline", headings.len());
        doc.add_outline(&headings, &config.outline_tags)?;
    } else {
        log::debug!("No outline tags configured; skipping the outline");
    }

    doc.save(config)
}
