//! Top-level PDF document type for reading and rewriting text.

use std::io::Write;

use pdfswap_core::{
    ExtractResult, ExtractWarning, PdfError, ReplaceReport, RewriteOptions, Rule,
};
use pdfswap_parse::{
    CMapCache, FontResolver, LopdfBackend, LopdfDocument, PdfBackend, TextLayer, build_text_layer,
    serialize,
};

use crate::rewrite::apply_to_layers;

/// Outcome of [`Pdf::rewrite`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewriteSummary {
    /// Match counts per rule.
    pub report: ReplaceReport,
    /// 0-based indices of pages whose content stream was replaced.
    pub pages_rewritten: Vec<usize>,
}

/// A PDF document opened for text rewriting.
///
/// Owns the parsed document and the ToUnicode CMap cache shared by all of
/// its pages.
///
/// # Example
///
/// ```ignore
/// let mut pdf = Pdf::open(bytes, None)?;
/// let rules = vec![Rule::literal("John Smith", "Maria Garcia")?];
/// let summary = pdf.rewrite(&rules)?;
/// pdf.save("out.pdf")?;
/// ```
pub struct Pdf {
    doc: LopdfDocument,
    options: RewriteOptions,
    cmaps: CMapCache,
}

impl std::fmt::Debug for Pdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pdf")
            .field("doc", &self.doc)
            .field("options", &self.options)
            .field("cmaps", &self.cmaps)
            .finish()
    }
}

impl Pdf {
    /// Open a PDF document from a file path.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the PDF file.
    /// * `options` - Rewrite options. Uses defaults if `None`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the file cannot be read or is not a valid PDF.
    #[cfg(feature = "std")]
    pub fn open_file(
        path: impl AsRef<std::path::Path>,
        options: Option<RewriteOptions>,
    ) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| PdfError::IoError(e.to_string()))?;
        Self::open(&bytes, options)
    }

    /// Open a PDF document from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PasswordRequired`] for encrypted documents and
    /// [`PdfError::ParseError`] if the bytes are not a valid PDF.
    pub fn open(bytes: &[u8], options: Option<RewriteOptions>) -> Result<Self, PdfError> {
        let doc = LopdfBackend::open(bytes).map_err(PdfError::from)?;
        Ok(Self {
            doc,
            options: options.unwrap_or_default(),
            cmaps: CMapCache::new(),
        })
    }

    /// Return the number of pages in the document.
    pub fn page_count(&self) -> usize {
        LopdfBackend::page_count(&self.doc)
    }

    /// The options this document was opened with.
    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    /// The ToUnicode CMap cache shared by all pages.
    pub fn cmap_cache(&self) -> &CMapCache {
        &self.cmaps
    }

    /// Tokenize a page and build its text layer.
    ///
    /// Warnings are tagged with the page index and filtered through the
    /// document's [`RewriteOptions`].
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PageError`] wrapping the cause if the page is out
    /// of range, its content exceeds `max_stream_bytes`, its content stream
    /// or a CMap is malformed, or (in strict mode) a warning is raised.
    pub fn build_text_layer(&self, index: usize) -> Result<ExtractResult<TextLayer>, PdfError> {
        self.read_page(index).map_err(|e| e.on_page(index))
    }

    fn read_page(&self, index: usize) -> Result<ExtractResult<TextLayer>, PdfError> {
        let page = LopdfBackend::get_page(&self.doc, index)?;
        let content = LopdfBackend::page_content(&self.doc, &page)?;
        if content.len() > self.options.max_stream_bytes {
            return Err(PdfError::ResourceLimitExceeded {
                limit_name: "max_stream_bytes".to_string(),
                limit_value: self.options.max_stream_bytes,
                actual_value: content.len(),
            });
        }
        let scope = LopdfBackend::page_resources(&self.doc, &page)?;
        let mut fonts = FontResolver::new(&scope, &self.cmaps);
        let layer = build_text_layer(content, &mut fonts)?;
        let warnings = self.screen(index, layer.warnings)?;
        Ok(ExtractResult::with_warnings(layer.value, warnings))
    }

    fn screen(
        &self,
        index: usize,
        warnings: Vec<ExtractWarning>,
    ) -> Result<Vec<ExtractWarning>, PdfError> {
        self.options
            .screen(warnings.into_iter().map(|w| w.set_page(index)).collect())
    }

    /// Build the text layer of every page, in page order.
    ///
    /// With the `parallel` feature, pages are processed concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first page error, as for [`Pdf::build_text_layer`].
    pub fn text_layers(&self) -> Result<ExtractResult<Vec<TextLayer>>, PdfError> {
        #[cfg(feature = "parallel")]
        let results: Vec<_> = {
            use rayon::prelude::*;
            (0..self.page_count())
                .into_par_iter()
                .map(|i| self.build_text_layer(i))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = (0..self.page_count())
            .map(|i| self.build_text_layer(i))
            .collect();

        let mut layers = Vec::with_capacity(results.len());
        let mut warnings = Vec::new();
        for result in results {
            let result = result?;
            warnings.extend(result.warnings);
            layers.push(result.value);
        }
        Ok(ExtractResult::with_warnings(layers, warnings))
    }

    /// The decoded text of every page.
    ///
    /// # Errors
    ///
    /// Returns the first page error, as for [`Pdf::build_text_layer`].
    pub fn extract_text(&self) -> Result<ExtractResult<Vec<String>>, PdfError> {
        Ok(self
            .text_layers()?
            .map(|layers| layers.iter().map(TextLayer::text).collect()))
    }

    /// Serialize a page's text layer and, if any of its text changed,
    /// install the result as the page's only content stream.
    ///
    /// Returns `true` if the page was rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PageError`] if edited text cannot be encoded with
    /// its font's encoding, or (in strict mode) a character was dropped.
    pub fn write_layer(
        &mut self,
        index: usize,
        layer: &TextLayer,
    ) -> Result<ExtractResult<bool>, PdfError> {
        let ExtractResult { value, warnings } =
            self.serialize_layer(index, layer).map_err(|e| e.on_page(index))?;
        let Some(content) = value else {
            return Ok(ExtractResult::ok(false));
        };
        self.install(index, content).map_err(|e| e.on_page(index))?;
        Ok(ExtractResult::with_warnings(true, warnings))
    }

    /// Serialized content for an edited layer, `None` when nothing changed.
    fn serialize_layer(
        &self,
        index: usize,
        layer: &TextLayer,
    ) -> Result<ExtractResult<Option<Vec<u8>>>, PdfError> {
        if !layer.is_edited() {
            return Ok(ExtractResult::ok(None));
        }
        let serialized = serialize(layer)?;
        let warnings = self.screen(index, serialized.warnings)?;
        Ok(ExtractResult::with_warnings(Some(serialized.value), warnings))
    }

    fn install(&mut self, index: usize, content: Vec<u8>) -> Result<(), PdfError> {
        let page = LopdfBackend::get_page(&self.doc, index)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(page = index, bytes = content.len(), "replacing page content");
        LopdfBackend::replace_page_content(&mut self.doc, &page, content)?;
        Ok(())
    }

    /// Apply `rules` in order to the document's text and write every changed
    /// page back.
    ///
    /// The match space is chosen by [`RewriteOptions::match_scope`]. Pages
    /// whose text is unchanged keep their original content streams.
    ///
    /// # Errors
    ///
    /// Returns the first page error from reading or serializing. Every
    /// edited page is serialized before any is installed, so on error the
    /// document is untouched.
    pub fn rewrite(&mut self, rules: &[Rule]) -> Result<ExtractResult<RewriteSummary>, PdfError> {
        let ExtractResult {
            value: mut layers,
            mut warnings,
        } = self.text_layers()?;
        let report = apply_to_layers(&mut layers, rules, self.options.match_scope);

        let mut contents = Vec::new();
        for (index, layer) in layers.iter().enumerate() {
            let serialized = self
                .serialize_layer(index, layer)
                .map_err(|e| e.on_page(index))?;
            warnings.extend(serialized.warnings);
            if let Some(content) = serialized.value {
                contents.push((index, content));
            }
        }

        let mut pages_rewritten = Vec::with_capacity(contents.len());
        for (index, content) in contents {
            self.install(index, content).map_err(|e| e.on_page(index))?;
            pages_rewritten.push(index);
        }
        #[cfg(feature = "tracing")]
        tracing::info!(
            matches = report.total(),
            pages = pages_rewritten.len(),
            "rewrite finished"
        );
        Ok(ExtractResult::with_warnings(
            RewriteSummary {
                report,
                pages_rewritten,
            },
            warnings,
        ))
    }

    /// Write the document to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::IoError`] if writing fails.
    pub fn save_to<W: Write>(&mut self, target: &mut W) -> Result<(), PdfError> {
        LopdfBackend::save_to(&mut self.doc, target).map_err(PdfError::from)
    }

    /// Write the document to a byte vector.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if serialization fails.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, PdfError> {
        let mut buf = Vec::new();
        self.save_to(&mut buf)?;
        Ok(buf)
    }

    /// Write the document to a file.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::IoError`] if the file cannot be written.
    #[cfg(feature = "std")]
    pub fn save(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), PdfError> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = std::io::BufWriter::new(file);
        self.save_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Object, Stream, dictionary};
    use pdfswap_core::{ExtractWarningCode, MatchScope};

    fn pdf_with_pages(contents: &[&[u8]]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let mut kids = Vec::new();
        for content in contents {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
            kids.push(Object::Reference(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => Object::Reference(content_id),
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                },
            })));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => contents.len() as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("failed to save test PDF");
        buf
    }

    #[test]
    fn extract_text_per_page() {
        let bytes = pdf_with_pages(&[
            b"BT /F1 12 Tf (Hello) Tj ET".as_slice(),
            b"BT /F1 12 Tf [(Wor) 10 (ld)] TJ ET".as_slice(),
        ]);
        let pdf = Pdf::open(&bytes, None).unwrap();
        let text = pdf.extract_text().unwrap();
        assert!(text.is_clean());
        assert_eq!(text.value, vec!["Hello".to_string(), "World".to_string()]);
    }

    #[test]
    fn rewrite_only_touches_changed_pages() {
        let bytes = pdf_with_pages(&[
            b"BT /F1 12 Tf (Dear John Smith) Tj ET".as_slice(),
            b"BT /F1 12 Tf (Nothing here) Tj ET".as_slice(),
        ]);
        let mut pdf = Pdf::open(&bytes, None).unwrap();
        let rules = [Rule::literal("John Smith", "Maria Garcia").unwrap()];
        let summary = pdf.rewrite(&rules).unwrap().value;
        assert_eq!(summary.report.matches, vec![1]);
        assert_eq!(summary.pages_rewritten, vec![0]);

        let saved = pdf.to_bytes().unwrap();
        let reopened = Pdf::open(&saved, None).unwrap();
        assert_eq!(
            reopened.extract_text().unwrap().value,
            vec!["Dear Maria Garcia".to_string(), "Nothing here".to_string()]
        );
    }

    #[test]
    fn stream_limit_is_enforced_per_page() {
        let bytes = pdf_with_pages(&[b"BT /F1 12 Tf (Hello) Tj ET".as_slice()]);
        let options = RewriteOptions {
            max_stream_bytes: 8,
            ..RewriteOptions::default()
        };
        let pdf = Pdf::open(&bytes, Some(options)).unwrap();
        let err = pdf.build_text_layer(0).unwrap_err();
        assert_eq!(err.page(), Some(0));
        let PdfError::PageError { source, .. } = err else {
            panic!("expected a page error");
        };
        assert!(matches!(
            *source,
            PdfError::ResourceLimitExceeded { limit_value: 8, .. }
        ));
    }

    #[test]
    fn warnings_carry_the_page_index() {
        let bytes = pdf_with_pages(&[
            b"BT (plain) Tj ET".as_slice(),
            b"BT /F7 12 Tf (x) Tj ET".as_slice(),
        ]);
        let pdf = Pdf::open(&bytes, None).unwrap();
        let layers = pdf.text_layers().unwrap();
        assert_eq!(layers.warnings.len(), 2);
        assert_eq!(layers.warnings[0].code, ExtractWarningCode::EncodingFallback);
        assert_eq!(layers.warnings[0].page, Some(0));
        assert_eq!(layers.warnings[1].code, ExtractWarningCode::MissingFont);
        assert_eq!(layers.warnings[1].page, Some(1));
    }

    #[test]
    fn strict_mode_turns_warnings_into_page_errors() {
        let bytes = pdf_with_pages(&[b"BT /F7 12 Tf (x) Tj ET".as_slice()]);
        let options = RewriteOptions {
            strict_mode: true,
            ..RewriteOptions::default()
        };
        let pdf = Pdf::open(&bytes, Some(options)).unwrap();
        let err = pdf.extract_text().unwrap_err();
        assert_eq!(err.page(), Some(0));
    }

    #[test]
    fn page_scope_from_options() {
        let bytes = pdf_with_pages(&[
            b"BT /F1 12 Tf (John) Tj ET".as_slice(),
            b"BT /F1 12 Tf ( Smith) Tj ET".as_slice(),
        ]);
        let options = RewriteOptions {
            match_scope: MatchScope::Page,
            ..RewriteOptions::default()
        };
        let mut pdf = Pdf::open(&bytes, Some(options)).unwrap();
        let rules = [Rule::literal("John Smith", "X").unwrap()];
        let summary = pdf.rewrite(&rules).unwrap().value;
        assert_eq!(summary.report.total(), 0);
        assert!(summary.pages_rewritten.is_empty());
    }
}
