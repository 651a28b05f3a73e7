use tracing::warn;

/// Extract per-page text from PDF bytes.
///
/// An unparseable PDF yields an empty page list rather than an error;
/// callers treat a file with no extractable text as a no-op.
#[inline]
pub fn extract_pages(bytes: &[u8]) -> Vec<String> {
    match pdf_extract::extract_text_from_mem_by_pages(bytes) {
        Ok(pages) => pages,
        Err(e) => {
            warn!("PDF extraction failed, treating document as empty: {}", e);
            Vec::new()
        }
    }
}
