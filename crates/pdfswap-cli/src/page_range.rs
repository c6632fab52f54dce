/// Parse a page range string like "1,3-5,8-" into a sorted list of 0-indexed page numbers.
///
/// Input is 1-indexed (user-facing); `N-` runs to the last page. Output is
/// 0-indexed (internal). Returns an error for page 0, pages past the end,
/// reversed or malformed ranges.
pub fn parse_page_range(input: &str, page_count: usize) -> Result<Vec<usize>, String> {
    let mut pages = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (start, end) = match part.split_once('-') {
            Some((start, end)) if end.trim().is_empty() => (page_number(start)?, page_count),
            Some((start, end)) => (page_number(start)?, page_number(end)?),
            None => {
                let page = page_number(part)?;
                (page, page)
            }
        };
        if start > end {
            return Err(format!("reversed page range: '{part}'"));
        }
        if end > page_count {
            return Err(format!(
                "page {end} exceeds document page count ({page_count})"
            ));
        }
        pages.extend(start - 1..end);
    }

    pages.sort();
    pages.dedup();
    Ok(pages)
}

fn page_number(text: &str) -> Result<usize, String> {
    let page: usize = text
        .trim()
        .parse()
        .map_err(|_| format!("invalid page number: '{}'", text.trim()))?;
    if page == 0 {
        return Err("page 0 is invalid (pages start at 1)".to_string());
    }
    Ok(page)
}
