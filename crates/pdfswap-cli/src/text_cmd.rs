use std::path::Path;

use crate::cli::OutputFormat;
use crate::shared::{ProgressReporter, fail, open_pdf, print_warnings, resolve_pages};

pub fn run(file: &Path, pages: Option<&str>, format: &OutputFormat) -> Result<(), i32> {
    let pdf = open_pdf(file, None)?;
    let page_indices = resolve_pages(pages, pdf.page_count())?;
    let progress = ProgressReporter::new(page_indices.len());

    for (i, &idx) in page_indices.iter().enumerate() {
        progress.report(i + 1);

        let layer = pdf.build_text_layer(idx).map_err(fail)?;
        print_warnings(&layer.warnings);
        let text = layer.value.text();

        match format {
            OutputFormat::Text => {
                println!("--- Page {} ---", idx + 1);
                println!("{text}");
            }
            OutputFormat::Json => {
                let obj = serde_json::json!({
                    "page": idx + 1,
                    "text": text,
                });
                println!("{obj}");
            }
        }
    }

    progress.finish();
    Ok(())
}
