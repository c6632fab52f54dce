//! PDF fixtures for CLI tests, built in memory with lopdf.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::{Object, Stream, dictionary};

/// A PDF with one page per content stream, all using /F1 (WinAnsiEncoding).
pub fn pdf_with_contents(contents: &[&str]) -> Vec<u8> {
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
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        kids.push(Object::Reference(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
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
            "Count" => Object::Integer(contents.len() as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A PDF whose pages each show one line of text.
pub fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
    let contents: Vec<String> = texts
        .iter()
        .map(|text| format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET"))
        .collect();
    let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
    pdf_with_contents(&refs)
}

/// Write `bytes` to `name` inside `dir` and return the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// The decompressed content of page `index` of the PDF at `path`.
pub fn page_content(path: &Path, index: usize) -> Vec<u8> {
    let doc = lopdf::Document::load(path).unwrap();
    let page_id = doc.get_pages()[&(index as u32 + 1)];
    doc.get_page_content(page_id).unwrap()
}
