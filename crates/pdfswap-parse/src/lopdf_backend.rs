//! lopdf-based PDF backend.
//!
//! Implements [`PdfBackend`] using the [lopdf](https://crates.io/crates/lopdf)
//! crate for PDF document parsing and writing.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use crate::backend::PdfBackend;
use crate::error::BackendError;
use crate::font::{CMapSource, FontDescriptor, ResourceScope, StreamKey};

/// A parsed PDF document backed by lopdf.
pub struct LopdfDocument {
    /// The underlying lopdf document.
    inner: lopdf::Document,
    /// Cached ordered list of page ObjectIds (indexed by 0-based page number).
    page_ids: Vec<lopdf::ObjectId>,
}

impl LopdfDocument {
    /// Access the underlying lopdf document.
    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

/// A reference to a single page within a [`LopdfDocument`].
#[derive(Debug, Clone, Copy)]
pub struct LopdfPage {
    /// The lopdf object ID for this page.
    pub object_id: lopdf::ObjectId,
    /// The 0-based page index.
    pub index: usize,
}

/// The lopdf-based PDF backend.
///
/// # Example
///
/// ```ignore
/// use pdfswap_parse::lopdf_backend::LopdfBackend;
/// use pdfswap_parse::PdfBackend;
///
/// let doc = LopdfBackend::open(pdf_bytes)?;
/// let page = LopdfBackend::get_page(&doc, 0)?;
/// let content = LopdfBackend::page_content(&doc, &page)?;
/// ```
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
    type Document = LopdfDocument;
    type Page = LopdfPage;
    type Error = BackendError;

    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error> {
        let inner = lopdf::Document::load_mem(bytes)
            .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;

        // Unlocking is done by an external tool before rewriting.
        if inner.is_encrypted() {
            return Err(BackendError::Core(pdfswap_core::PdfError::PasswordRequired));
        }

        // get_pages returns BTreeMap<u32, ObjectId> with 1-based keys
        let page_ids: Vec<lopdf::ObjectId> = inner.get_pages().values().copied().collect();

        Ok(LopdfDocument { inner, page_ids })
    }

    fn page_count(doc: &Self::Document) -> usize {
        doc.page_ids.len()
    }

    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error> {
        let Some(&object_id) = doc.page_ids.get(index) else {
            return Err(BackendError::Parse(format!(
                "page index {index} out of range (0..{})",
                doc.page_ids.len()
            )));
        };
        Ok(LopdfPage { object_id, index })
    }

    fn page_content(doc: &Self::Document, page: &Self::Page) -> Result<Vec<u8>, Self::Error> {
        let page_dict = page_dictionary(&doc.inner, page.object_id)?;
        get_page_content_bytes(&doc.inner, page_dict)
    }

    fn page_resources(
        doc: &Self::Document,
        page: &Self::Page,
    ) -> Result<ResourceScope, Self::Error> {
        let mut levels = Vec::new();
        let mut current = Some(page.object_id);
        let mut depth = 0;
        while let Some(id) = current {
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                return Err(BackendError::Parse(
                    "page tree /Parent chain too deep".to_string(),
                ));
            }
            let dict = page_dictionary(&doc.inner, id)?;
            if let Ok(resources) = dict.get(b"Resources") {
                let resources = resolve_ref(&doc.inner, resources).as_dict().map_err(|_| {
                    BackendError::Parse("/Resources is not a dictionary".to_string())
                })?;
                levels.push(font_descriptors(&doc.inner, resources)?);
            }
            current = match dict.get(b"Parent") {
                Ok(parent) => Some(parent.as_reference().map_err(|e| {
                    BackendError::Parse(format!("invalid /Parent reference: {e}"))
                })?),
                Err(_) => None,
            };
        }
        Ok(ResourceScope::chain(levels))
    }

    fn replace_page_content(
        doc: &mut Self::Document,
        page: &Self::Page,
        content: Vec<u8>,
    ) -> Result<(), Self::Error> {
        let stream = lopdf::Stream::new(lopdf::Dictionary::new(), content);
        let stream_id = doc.inner.add_object(stream);
        let page_dict = doc
            .inner
            .get_object_mut(page.object_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
        page_dict.set("Contents", lopdf::Object::Reference(stream_id));
        Ok(())
    }

    fn save_to<W: Write>(doc: &mut Self::Document, target: &mut W) -> Result<(), Self::Error> {
        doc.inner.save_to(target)?;
        Ok(())
    }
}

const MAX_TREE_DEPTH: usize = 64;

fn page_dictionary(
    doc: &lopdf::Document,
    id: lopdf::ObjectId,
) -> Result<&lopdf::Dictionary, BackendError> {
    doc.get_object(id)
        .and_then(|o| o.as_dict())
        .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))
}

fn resolve_ref<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Get the content stream bytes from a page dictionary.
///
/// Handles both single stream references and arrays of stream references.
fn get_page_content_bytes(
    doc: &lopdf::Document,
    page_dict: &lopdf::Dictionary,
) -> Result<Vec<u8>, BackendError> {
    let contents_obj = match page_dict.get(b"Contents") {
        Ok(obj) => obj,
        Err(_) => return Ok(Vec::new()), // Page with no content
    };

    match contents_obj {
        lopdf::Object::Reference(id) => {
            let obj = doc
                .get_object(*id)
                .map_err(|e| BackendError::Parse(format!("failed to resolve /Contents: {e}")))?;
            match obj {
                lopdf::Object::Array(arr) => join_content_streams(doc, arr),
                other => {
                    let stream = other.as_stream().map_err(|e| {
                        BackendError::Parse(format!("/Contents is not a stream: {e}"))
                    })?;
                    decode_content_stream(stream)
                }
            }
        }
        lopdf::Object::Array(arr) => join_content_streams(doc, arr),
        _ => Err(BackendError::Parse(
            "/Contents is not a reference or array".to_string(),
        )),
    }
}

fn join_content_streams(
    doc: &lopdf::Document,
    arr: &[lopdf::Object],
) -> Result<Vec<u8>, BackendError> {
    let mut content = Vec::new();
    for item in arr {
        let id = item.as_reference().map_err(|e| {
            BackendError::Parse(format!("/Contents array item is not a reference: {e}"))
        })?;
        let obj = doc
            .get_object(id)
            .map_err(|e| BackendError::Parse(format!("failed to resolve /Contents stream: {e}")))?;
        let stream = obj.as_stream().map_err(|e| {
            BackendError::Parse(format!("/Contents array item is not a stream: {e}"))
        })?;
        let bytes = decode_content_stream(stream)?;
        if !content.is_empty() {
            content.push(b' ');
        }
        content.extend_from_slice(&bytes);
    }
    Ok(content)
}

/// Decode a stream, decompressing if needed.
fn decode_content_stream(stream: &lopdf::Stream) -> Result<Vec<u8>, BackendError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Read the `/Font` entries of one resource dictionary.
fn font_descriptors(
    doc: &lopdf::Document,
    resources: &lopdf::Dictionary,
) -> Result<HashMap<String, FontDescriptor>, BackendError> {
    let mut fonts = HashMap::new();
    let Ok(font_obj) = resources.get(b"Font") else {
        return Ok(fonts);
    };
    let Ok(font_dict) = resolve_ref(doc, font_obj).as_dict() else {
        return Ok(fonts);
    };
    for (name, value) in font_dict.iter() {
        let name = String::from_utf8_lossy(name).into_owned();
        let Ok(dict) = resolve_ref(doc, value).as_dict() else {
            continue;
        };
        fonts.insert(name, font_descriptor(doc, dict)?);
    }
    Ok(fonts)
}

fn name_string(obj: &lopdf::Object) -> Option<String> {
    obj.as_name()
        .ok()
        .and_then(|name| std::str::from_utf8(name).ok())
        .map(str::to_string)
}

fn font_descriptor(
    doc: &lopdf::Document,
    dict: &lopdf::Dictionary,
) -> Result<FontDescriptor, BackendError> {
    let base_font = dict.get(b"BaseFont").ok().and_then(name_string);

    let encoding = dict.get(b"Encoding").ok().and_then(|o| {
        let resolved = resolve_ref(doc, o);
        name_string(resolved).or_else(|| {
            // Differences are not applied; only the base encoding counts.
            resolved
                .as_dict()
                .ok()
                .and_then(|d| d.get(b"BaseEncoding").ok())
                .and_then(name_string)
        })
    });

    let to_unicode = match dict.get(b"ToUnicode") {
        Ok(lopdf::Object::Reference(id)) => {
            let stream = doc
                .get_object(*id)
                .and_then(|o| o.as_stream())
                .map_err(|e| BackendError::Parse(format!("invalid /ToUnicode stream: {e}")))?;
            Some(CMapSource {
                key: StreamKey::from(*id),
                data: Arc::from(decode_content_stream(stream)?),
            })
        }
        // Predefined names such as /Identity-H carry no mapping.
        _ => None,
    };

    Ok(FontDescriptor {
        base_font,
        encoding,
        to_unicode,
    })
}
