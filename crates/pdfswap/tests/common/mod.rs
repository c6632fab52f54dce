//! Shared PDF fixtures for integration tests.
//!
//! Documents are built in memory with lopdf. Fonts are placed in the page
//! tree root's `/Resources`, so every page inherits them.

#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

/// How a fixture font maps bytes to text.
#[derive(Debug, Clone, Copy)]
pub enum FontSpec<'a> {
    /// Simple font with an `/Encoding` name.
    Encoding(&'a str),
    /// Simple font with an encoding dictionary naming a `/BaseEncoding`.
    BaseEncoding(&'a str),
    /// Composite font with a ToUnicode CMap stream.
    ToUnicode { cmap: &'a [u8], compress: bool },
}

/// Two-byte CMap mapping codes `0x0020..=0x007E` to the same ASCII
/// characters, plus `0x0100` to the "fi" ligature.
pub const ASCII_CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin\n\
    12 dict begin\nbegincmap\n\
    1 begincodespacerange <0000> <FFFF> endcodespacerange\n\
    1 beginbfrange <0020> <007E> <0020> endbfrange\n\
    1 beginbfchar <0100> <00660069> endbfchar\n\
    endcmap\nend\nend";

/// Encode ASCII text as a hex string in [`ASCII_CMAP`] codes.
pub fn ascii_cmap_hex(text: &str) -> String {
    let mut hex = String::from("<");
    for byte in text.bytes() {
        hex.push_str(&format!("{:04X}", u16::from(byte)));
    }
    hex.push('>');
    hex
}

fn font_object(doc: &mut Document, font: FontSpec<'_>) -> ObjectId {
    match font {
        FontSpec::Encoding(name) => doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => name,
        }),
        FontSpec::BaseEncoding(name) => doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
            "Encoding" => dictionary! {
                "Type" => "Encoding",
                "BaseEncoding" => name,
                "Differences" => vec![Object::Integer(32), Object::Name(b"space".to_vec())],
            },
        }),
        FontSpec::ToUnicode { cmap, compress } => {
            let mut stream = Stream::new(dictionary! {}, cmap.to_vec());
            if compress {
                stream.compress().expect("failed to compress CMap");
            }
            let cmap_id = doc.add_object(stream);
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => "Custom-Identity",
                "Encoding" => "Identity-H",
                "ToUnicode" => cmap_id,
            })
        }
    }
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>, resources: Dictionary) -> Vec<u8> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources,
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

/// One page per content stream, with the given fonts inherited by all pages.
pub fn pdf_with_fonts<C: AsRef<[u8]>>(contents: &[C], fonts: &[(&str, FontSpec<'_>)]) -> Vec<u8> {
    pdf_with_page_streams(
        &contents
            .iter()
            .map(|content| vec![content.as_ref().to_vec()])
            .collect::<Vec<_>>(),
        fonts,
    )
}

/// One page per entry; each page has one content stream per inner entry.
/// When a page has several streams, the first one is flate-compressed.
pub fn pdf_with_page_streams(pages: &[Vec<Vec<u8>>], fonts: &[(&str, FontSpec<'_>)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let mut font_dict = Dictionary::new();
    for (name, font) in fonts {
        let id = font_object(&mut doc, *font);
        font_dict.set(*name, Object::Reference(id));
    }

    let mut kids = Vec::new();
    for streams in pages {
        let mut stream_ids = Vec::new();
        for (i, content) in streams.iter().enumerate() {
            let mut stream = Stream::new(dictionary! {}, content.clone());
            if i == 0 && streams.len() > 1 {
                stream.compress().expect("failed to compress content");
            }
            stream_ids.push(Object::Reference(doc.add_object(stream)));
        }
        let contents = if stream_ids.len() == 1 {
            stream_ids.remove(0)
        } else {
            Object::Array(stream_ids)
        };
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => contents,
        });
        kids.push(Object::Reference(page_id));
    }

    finish(doc, pages_id, kids, dictionary! { "Font" => font_dict })
}

/// One page per content stream, each using /F1 (WinAnsiEncoding).
pub fn pdf_with_pages<C: AsRef<[u8]>>(contents: &[C]) -> Vec<u8> {
    pdf_with_fonts(contents, &[("F1", FontSpec::Encoding("WinAnsiEncoding"))])
}

/// PDF standard password padding bytes.
const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: Vec<u8> = (0..=255).collect();
    let mut j: usize = 0;
    for i in 0..256 {
        j = (j + s[i] as usize + key[i % key.len()] as usize) & 0xFF;
        s.swap(i, j);
    }
    let mut out = Vec::with_capacity(data.len());
    let (mut i, mut j) = (0usize, 0usize);
    for &byte in data {
        i = (i + 1) & 0xFF;
        j = (j + s[i] as usize) & 0xFF;
        s.swap(i, j);
        out.push(byte ^ s[(s[i] as usize + s[j] as usize) & 0xFF]);
    }
    out
}

/// A one-page PDF encrypted with RC4 (40-bit, revision 2) under
/// `user_password`.
pub fn encrypted_pdf(user_password: &[u8]) -> Vec<u8> {
    let file_id = b"pdfswapfileid001";
    let permissions: i32 = -4;

    let mut padded = Vec::with_capacity(32);
    let len = user_password.len().min(32);
    padded.extend_from_slice(&user_password[..len]);
    padded.extend_from_slice(&PAD_BYTES[..32 - len]);

    let owner_digest = md5::compute(&padded);
    let owner_value = rc4(&owner_digest[..5], &padded);

    let mut key_input = Vec::with_capacity(128);
    key_input.extend_from_slice(&padded);
    key_input.extend_from_slice(&owner_value);
    key_input.extend_from_slice(&(permissions as u32).to_le_bytes());
    key_input.extend_from_slice(file_id);
    let key = md5::compute(&key_input)[..5].to_vec();
    let user_value = rc4(&key, &PAD_BYTES);

    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"BT /F1 12 Tf (Secret Name) Tj ET".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => Object::Reference(content_id),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1_i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    for (&id, object) in doc.objects.iter_mut() {
        let mut object_key = key.clone();
        object_key.extend_from_slice(&id.0.to_le_bytes()[..3]);
        object_key.extend_from_slice(&id.1.to_le_bytes()[..2]);
        let digest = md5::compute(&object_key);
        let object_key = &digest[..(key.len() + 5).min(16)];
        match object {
            Object::Stream(stream) => {
                let encrypted = rc4(object_key, &stream.content);
                stream.set_content(encrypted);
            }
            Object::String(content, _) => *content = rc4(object_key, content),
            _ => {}
        }
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1_i64,
        "R" => 2_i64,
        "Length" => 40_i64,
        "O" => Object::String(owner_value, StringFormat::Literal),
        "U" => Object::String(user_value, StringFormat::Literal),
        "P" => permissions as i64,
    });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(file_id.to_vec(), StringFormat::Literal),
            Object::String(file_id.to_vec(), StringFormat::Literal),
        ]),
    );

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save encrypted PDF");
    buf
}

/// The decompressed content of page `index` of a saved PDF.
pub fn page_content(bytes: &[u8], index: usize) -> Vec<u8> {
    let doc = Document::load_mem(bytes).expect("failed to reload PDF");
    let page_id = doc.get_pages()[&(index as u32 + 1)];
    doc.get_page_content(page_id).expect("failed to read page content")
}

/// Number of content streams on page `index` of a saved PDF.
pub fn content_stream_count(bytes: &[u8], index: usize) -> usize {
    let doc = Document::load_mem(bytes).expect("failed to reload PDF");
    let page_id = doc.get_pages()[&(index as u32 + 1)];
    doc.get_page_contents(page_id).len()
}
