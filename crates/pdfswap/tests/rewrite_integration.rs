//! End-to-end tests: PDF bytes → Pdf::open → rewrite → save → reopen.
//!
//! Test PDFs are created programmatically using lopdf.

mod common;

use common::{
    ASCII_CMAP, FontSpec, ascii_cmap_hex, content_stream_count, encrypted_pdf, page_content,
    pdf_with_fonts, pdf_with_page_streams, pdf_with_pages,
};
use pdfswap::{
    ExtractWarningCode, MatchScope, NameSwap, Pdf, PdfError, RewriteOptions, Rule, SearchOptions,
    serialize,
};

fn reopen_text(pdf: &mut Pdf) -> Vec<String> {
    let bytes = pdf.to_bytes().unwrap();
    Pdf::open(&bytes, None).unwrap().extract_text().unwrap().value
}

#[test]
fn untouched_document_round_trips_content() {
    let content = "%comment\nq 1 0 0 1 10 10 cm\nBT /F1 12 Tf 72 720 Td [(Hel) -20 (lo)] TJ\n\
                   0 -14 Td (world\\051) ' ET Q\n/Span << /ActualText (x) >> BDC EMC";
    let bytes = pdf_with_pages(&[content]);
    let mut pdf = Pdf::open(&bytes, None).unwrap();

    let layer = pdf.build_text_layer(0).unwrap().value;
    assert_eq!(serialize(&layer).unwrap().value, content.as_bytes());

    let rules = [Rule::literal("absent", "x").unwrap()];
    let summary = pdf.rewrite(&rules).unwrap().value;
    assert_eq!(summary.report.total(), 0);
    assert!(summary.pages_rewritten.is_empty());
    let saved = pdf.to_bytes().unwrap();
    assert_eq!(page_content(&saved, 0), content.as_bytes());
}

#[test]
fn match_split_across_two_strings() {
    let bytes = pdf_with_pages(&["BT /F1 12 Tf [(Dear Mr. ) -10 (John ) 20 (Smith) (, ...)] TJ ET"]);
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    let rules = [Rule::literal("John Smith", "Maria Garcia").unwrap()];
    let summary = pdf.rewrite(&rules).unwrap();
    assert!(summary.is_clean());
    assert_eq!(summary.value.report.matches, vec![1]);

    let saved = pdf.to_bytes().unwrap();
    assert_eq!(
        page_content(&saved, 0),
        b"BT /F1 12 Tf [(Dear Mr. ) -10 (Maria) 20 ( Garcia) (, ...)] TJ ET".to_vec()
    );
    assert_eq!(reopen_text(&mut pdf), vec!["Dear Mr. Maria Garcia, ...".to_string()]);
}

#[test]
fn name_swap_over_whole_document() {
    let bytes = pdf_with_pages(&[
        "BT /F1 12 Tf (Dear John Smith and family) Tj ET",
        "BT /F1 12 Tf (thanks, JOHN. Regards to SMITH and Smithers ) Tj ET",
    ]);
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    let rule = NameSwap::parse("John Smith", "Maria Garcia")
        .unwrap()
        .to_rule()
        .unwrap();
    pdf.rewrite(&[rule]).unwrap();
    assert_eq!(
        reopen_text(&mut pdf),
        vec![
            "Dear Maria Garcia and family".to_string(),
            "thanks, JOHN. Regards to Garcia and Smithers ".to_string(),
        ]
    );
}

#[test]
fn match_crossing_pages_depends_on_scope() {
    let contents = ["BT /F1 12 Tf (see John) Tj ET", "BT /F1 12 Tf ( Smith here) Tj ET"];
    let rules = [Rule::literal("John Smith", "Ann Lee").unwrap()];

    let mut document = Pdf::open(&pdf_with_pages(&contents), None).unwrap();
    let summary = document.rewrite(&rules).unwrap().value;
    assert_eq!(summary.pages_rewritten, vec![0, 1]);
    assert_eq!(
        reopen_text(&mut document),
        vec!["see Ann ".to_string(), "Lee here".to_string()]
    );

    let options = RewriteOptions {
        match_scope: MatchScope::Page,
        ..RewriteOptions::default()
    };
    let mut paged = Pdf::open(&pdf_with_pages(&contents), Some(options)).unwrap();
    assert_eq!(paged.rewrite(&rules).unwrap().value.report.total(), 0);
}

#[test]
fn regex_rules_with_captures() {
    let bytes = pdf_with_pages(&["BT /F1 12 Tf (Invoice 2023-07-14 for ACME) Tj ET"]);
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    let rules = [Rule::regex(
        r"(\d{4})-(\d{2})-(\d{2})",
        "$3.$2.$1",
        &SearchOptions {
            regex: true,
            case_sensitive: true,
        },
    )
    .unwrap()];
    pdf.rewrite(&rules).unwrap();
    assert_eq!(
        reopen_text(&mut pdf),
        vec!["Invoice 14.07.2023 for ACME".to_string()]
    );
}

#[test]
fn cmap_font_text_is_decoded_and_reencoded() {
    let content = format!("BT /C0 10 Tf {} Tj ET", ascii_cmap_hex("Hi John Smith"));
    let bytes = pdf_with_fonts(
        &[content],
        &[(
            "C0",
            FontSpec::ToUnicode {
                cmap: ASCII_CMAP,
                compress: true,
            },
        )],
    );
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    assert_eq!(
        pdf.extract_text().unwrap().value,
        vec!["Hi John Smith".to_string()]
    );

    let rules = [Rule::literal("John Smith", "Ann Lee").unwrap()];
    pdf.rewrite(&rules).unwrap();
    let saved = pdf.to_bytes().unwrap();
    let expected = format!("BT /C0 10 Tf {} Tj ET", ascii_cmap_hex("Hi Ann Lee"));
    assert_eq!(page_content(&saved, 0), expected.into_bytes());
}

#[test]
fn cmap_ligatures_round_trip() {
    let bytes = pdf_with_fonts(
        &["BT /C0 10 Tf <0100006C0065> Tj ET"],
        &[(
            "C0",
            FontSpec::ToUnicode {
                cmap: ASCII_CMAP,
                compress: false,
            },
        )],
    );
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    assert_eq!(pdf.extract_text().unwrap().value, vec!["file".to_string()]);
    pdf.rewrite(&[Rule::literal("file", "fixed file").unwrap()])
        .unwrap();
    let saved = pdf.to_bytes().unwrap();
    assert_eq!(
        page_content(&saved, 0),
        b"BT /C0 10 Tf <010000780065006400200100006C0065> Tj ET".to_vec()
    );
}

#[test]
fn shared_cmap_is_parsed_once_for_all_pages() {
    let page = format!("BT /C0 10 Tf {} Tj ET", ascii_cmap_hex("abc"));
    let bytes = pdf_with_fonts(
        &[page.clone(), page.clone(), page],
        &[(
            "C0",
            FontSpec::ToUnicode {
                cmap: ASCII_CMAP,
                compress: false,
            },
        )],
    );
    let pdf = Pdf::open(&bytes, None).unwrap();
    assert_eq!(pdf.extract_text().unwrap().value.len(), 3);
    assert_eq!(pdf.cmap_cache().builds(), 1);
}

#[test]
fn mac_roman_base_encoding() {
    // 0x8E is e-acute in Mac Roman.
    let bytes = pdf_with_fonts(
        &[b"BT /F1 12 Tf (Ren\x8E) Tj ET".as_slice()],
        &[("F1", FontSpec::BaseEncoding("MacRomanEncoding"))],
    );
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    assert_eq!(pdf.extract_text().unwrap().value, vec!["Ren\u{E9}".to_string()]);
    pdf.rewrite(&[Rule::literal("Ren\u{E9}", "Zo\u{EB}").unwrap()])
        .unwrap();
    let saved = pdf.to_bytes().unwrap();
    // 0x91 is e-diaeresis in Mac Roman.
    assert_eq!(page_content(&saved, 0), b"BT /F1 12 Tf (Zo\x91) Tj ET".to_vec());
}

#[test]
fn inline_image_payload_is_preserved() {
    let mut content = b"q BI /W 4 /H 1 /BPC 8 /CS /G ID ".to_vec();
    content.extend_from_slice(b"\x00EI \xFF");
    content.extend_from_slice(b"\nEI Q BT /F1 12 Tf (John) Tj ET");
    let bytes = pdf_with_pages(&[content.clone()]);
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    pdf.rewrite(&[Rule::literal("John", "Ann").unwrap()])
        .unwrap();
    let saved = pdf.to_bytes().unwrap();
    let mut expected = b"q BI /W 4 /H 1 /BPC 8 /CS /G ID \x00EI \xFF\nEI Q ".to_vec();
    expected.extend_from_slice(b"BT /F1 12 Tf (Ann) Tj ET");
    assert_eq!(page_content(&saved, 0), expected);
}

#[test]
fn edited_pages_get_a_single_stream() {
    let pages = vec![
        vec![
            b"BT /F1 12 Tf (Dear ".to_vec(),
            b"John) Tj ET".to_vec(),
        ],
        vec![b"BT /F1 12 Tf (keep) Tj".to_vec(), b"ET".to_vec()],
    ];
    let bytes = pdf_with_page_streams(&pages, &[("F1", FontSpec::Encoding("WinAnsiEncoding"))]);
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    assert_eq!(
        pdf.extract_text().unwrap().value,
        vec!["Dear  John".to_string(), "keep".to_string()]
    );

    let summary = pdf
        .rewrite(&[Rule::literal("John", "Ann").unwrap()])
        .unwrap()
        .value;
    assert_eq!(summary.pages_rewritten, vec![0]);
    let saved = pdf.to_bytes().unwrap();
    assert_eq!(content_stream_count(&saved, 0), 1);
    assert_eq!(content_stream_count(&saved, 1), 2);
    assert_eq!(page_content(&saved, 0), b"BT /F1 12 Tf (Dear  Ann) Tj ET".to_vec());
}

#[test]
fn unmapped_characters_are_dropped_and_reported() {
    let bytes = pdf_with_pages(&["BT /F1 12 Tf (Lee) Tj ET"]);
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    let result = pdf
        .rewrite(&[Rule::literal("Lee", "Li \u{674E}").unwrap()])
        .unwrap();
    assert_eq!(result.warnings.len(), 1);
    let warning = &result.warnings[0];
    assert_eq!(warning.code, ExtractWarningCode::UnmappedCharacter);
    assert_eq!(warning.page, Some(0));
    assert_eq!(reopen_text(&mut pdf), vec!["Li ".to_string()]);
}

#[test]
fn strict_mode_rejects_lossy_edits() {
    let bytes = pdf_with_pages(&["BT /F1 12 Tf (Lee) Tj ET"]);
    let options = RewriteOptions {
        strict_mode: true,
        ..RewriteOptions::default()
    };
    let mut pdf = Pdf::open(&bytes, Some(options)).unwrap();
    let err = pdf
        .rewrite(&[Rule::literal("Lee", "\u{674E}").unwrap()])
        .unwrap_err();
    assert_eq!(err.page(), Some(0));
}

#[test]
fn unsupported_encoding_blocks_edits_on_that_page() {
    let bytes = pdf_with_fonts(
        &[
            "BT /F1 12 Tf (fine) Tj ET",
            "BT /F2 12 Tf (John) Tj ET",
        ],
        &[
            ("F1", FontSpec::Encoding("WinAnsiEncoding")),
            ("F2", FontSpec::Encoding("StandardEncoding")),
        ],
    );
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    let text = pdf.extract_text().unwrap();
    assert_eq!(text.value[1], "\u{FFFD}\u{FFFD}\u{FFFD}\u{FFFD}");
    assert_eq!(text.warnings[0].code, ExtractWarningCode::UnsupportedEncoding);

    let err = pdf
        .rewrite(&[Rule::literal("\u{FFFD}", "x").unwrap()])
        .unwrap_err();
    let PdfError::PageError { page, source } = err else {
        panic!("expected a page error");
    };
    assert_eq!(page, 1);
    assert!(matches!(*source, PdfError::EncodeError(_)));
}

#[test]
fn failed_rewrite_leaves_every_page_untouched() {
    let bytes = pdf_with_fonts(
        &[
            "BT /F1 12 Tf (John) Tj ET",
            "BT /F2 12 Tf (John) Tj ET",
        ],
        &[
            ("F1", FontSpec::Encoding("WinAnsiEncoding")),
            ("F2", FontSpec::Encoding("StandardEncoding")),
        ],
    );
    let mut pdf = Pdf::open(&bytes, None).unwrap();

    let rules = [
        Rule::literal("John", "Mark").unwrap(),
        Rule::literal("\u{FFFD}", "x").unwrap(),
    ];
    let err = pdf.rewrite(&rules).unwrap_err();
    assert_eq!(err.page(), Some(1));

    let saved = pdf.to_bytes().unwrap();
    assert_eq!(page_content(&saved, 0), b"BT /F1 12 Tf (John) Tj ET");
    assert_eq!(reopen_text(&mut pdf)[0], "John");
}

#[test]
fn malformed_content_names_the_page() {
    let bytes = pdf_with_pages(&["BT /F1 12 Tf (ok) Tj ET", "BT [(unclosed) TJ ET"]);
    let pdf = Pdf::open(&bytes, None).unwrap();
    assert!(pdf.build_text_layer(0).is_ok());
    let err = pdf.extract_text().unwrap_err();
    let PdfError::PageError { page, source } = err else {
        panic!("expected a page error");
    };
    assert_eq!(page, 1);
    assert!(matches!(*source, PdfError::ParseError(_)));
}

#[test]
fn encrypted_documents_need_unlocking() {
    let bytes = encrypted_pdf(b"secret");
    match Pdf::open(&bytes, None) {
        Err(PdfError::PasswordRequired) => {}
        Err(e) => panic!("expected PasswordRequired, got: {e}"),
        Ok(_) => panic!("expected error, got Ok"),
    }
}

#[test]
fn save_writes_a_readable_file() {
    let dir = std::env::temp_dir().join(format!("pdfswap-save-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("out.pdf");

    let bytes = pdf_with_pages(&["BT /F1 12 Tf (old) Tj ET"]);
    let mut pdf = Pdf::open(&bytes, None).unwrap();
    pdf.rewrite(&[Rule::literal("old", "new").unwrap()]).unwrap();
    pdf.save(&path).unwrap();

    let reopened = Pdf::open_file(&path, None).unwrap();
    assert_eq!(reopened.extract_text().unwrap().value, vec!["new".to_string()]);
    std::fs::remove_dir_all(&dir).unwrap();
}
