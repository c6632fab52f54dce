//! PDF document backend trait.
//!
//! Defines the [`PdfBackend`] trait that abstracts the document operations
//! the rewriter needs: page enumeration, content stream access, resource
//! scopes for font lookup, and writing rewritten content back.

use std::io::Write;

use pdfswap_core::PdfError;

use crate::font::ResourceScope;

/// Trait abstracting PDF document operations.
///
/// # Associated Types
///
/// - `Document`: The parsed PDF document representation.
/// - `Page`: A reference to a single page within a document.
/// - `Error`: Backend-specific error type, convertible to [`PdfError`].
///
/// # Usage
///
/// ```ignore
/// let mut doc = MyBackend::open(pdf_bytes)?;
/// let page = MyBackend::get_page(&doc, 0)?;
/// let content = MyBackend::page_content(&doc, &page)?;
/// let scope = MyBackend::page_resources(&doc, &page)?;
/// MyBackend::replace_page_content(&mut doc, &page, rewritten)?;
/// MyBackend::save_to(&mut doc, &mut out)?;
/// ```
pub trait PdfBackend {
    /// The parsed PDF document type.
    type Document;

    /// A reference to a single page within a document.
    type Page;

    /// Backend-specific error type, convertible to [`PdfError`].
    type Error: std::error::Error + Into<PdfError>;

    /// Parse PDF bytes into a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a PDF, or the PDF is encrypted.
    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error>;

    /// Return the number of pages in the document.
    fn page_count(doc: &Self::Document) -> usize;

    /// Access a page by 0-based index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error>;

    /// The page's content streams, decompressed and joined into one stream.
    ///
    /// # Errors
    ///
    /// Returns an error if `/Contents` is malformed or cannot be decompressed.
    fn page_content(doc: &Self::Document, page: &Self::Page) -> Result<Vec<u8>, Self::Error>;

    /// The page's font resources as a scope chain: the page's own
    /// `/Resources` first, then those of each ancestor in the page tree.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource dictionary or ToUnicode stream is
    /// malformed.
    fn page_resources(doc: &Self::Document, page: &Self::Page)
    -> Result<ResourceScope, Self::Error>;

    /// Replace the page's content with a single new stream holding `content`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page dictionary cannot be updated.
    fn replace_page_content(
        doc: &mut Self::Document,
        page: &Self::Page,
        content: Vec<u8>,
    ) -> Result<(), Self::Error>;

    /// Write the document.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn save_to<W: Write>(doc: &mut Self::Document, target: &mut W) -> Result<(), Self::Error>;
}
