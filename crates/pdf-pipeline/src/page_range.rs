//! Page range mini-language
//!
//! A range string is a comma separated list of sections. Each section is one of
//! `ALL`, `ODD`, `EVEN`, a page number, `N` (the last page) or `A-B` where both
//! ends are page numbers or `N`. Page numbers are 1-based in the string and
//! 0-based in the resulting [`PageRange`].

use thiserror::Error;

pub const ALL_PAGES: &str = "ALL";
pub const ODD_PAGES: &str = "ODD";
pub const EVEN_PAGES: &str = "EVEN";
pub const LAST_PAGE: &str = "N";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid page range `{section}`: {reason}")]
pub struct InvalidPageRange {
    pub section: String,
    pub reason: String,
}

impl InvalidPageRange {
    fn new(section: &str, reason: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            reason: reason.into(),
        }
    }
}

/// Ordered zero-based page indices resolved from a range string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    indices: Vec<usize>,
    page_count: usize,
}

impl PageRange {
    /// Resolve `input` against a document with `page_count` pages.
    ///
    /// Blank input selects every page. Sections are concatenated in the given
    /// order and repeated pages are kept.
    pub fn parse(input: &str, page_count: usize) -> Result<Self, InvalidPageRange> {
        let normalized = normalize(input);
        let mut indices = Vec::new();

        for section in normalized.split(',') {
            if section.is_empty() {
                return Err(InvalidPageRange::new(&normalized, "empty section"));
            }
            resolve_section(section, page_count, &mut indices)?;
        }

        Ok(Self {
            indices,
            page_count,
        })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.indices.iter()
    }

    pub fn into_indices(self) -> Vec<usize> {
        self.indices
    }
}

impl IntoIterator for PageRange {
    type Item = usize;
    type IntoIter = std::vec::IntoIter<usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.into_iter()
    }
}

impl<'a> IntoIterator for &'a PageRange {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.indices.iter()
    }
}

/// Convenience wrapper returning the indices directly
pub fn parse(input: &str, page_count: usize) -> Result<Vec<usize>, InvalidPageRange> {
    PageRange::parse(input, page_count).map(PageRange::into_indices)
}

fn normalize(input: &str) -> String {
    let normalized: String = input
        .replace('\u{ff0c}', ",")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if normalized.is_empty() {
        ALL_PAGES.to_string()
    } else {
        normalized
    }
}

fn resolve_section(
    section: &str,
    page_count: usize,
    indices: &mut Vec<usize>,
) -> Result<(), InvalidPageRange> {
    match section {
        ALL_PAGES => indices.extend(0..page_count),
        ODD_PAGES => indices.extend((1..page_count).step_by(2)),
        EVEN_PAGES => indices.extend((0..page_count).step_by(2)),
        _ if is_page_number(section) => indices.push(page_index(section, page_count)?),
        _ => {
            let Some((start, end)) = section.split_once('-') else {
                return Err(InvalidPageRange::new(section, "unrecognized section"));
            };
            if !is_page_number(start) || !is_page_number(end) {
                return Err(InvalidPageRange::new(section, "malformed range"));
            }

            let start = page_index(start, page_count)
                .map_err(|e| InvalidPageRange::new(section, e.reason))?;
            let end = page_index(end, page_count)
                .map_err(|e| InvalidPageRange::new(section, e.reason))?;

            if start <= end + 1 {
                // start == end + 1 is an empty range
                indices.extend(start..=end);
            } else {
                indices.extend((end..=start).rev());
            }
        }
    }
    Ok(())
}

fn is_page_number(token: &str) -> bool {
    token == LAST_PAGE || (!token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
}

fn page_index(token: &str, page_count: usize) -> Result<usize, InvalidPageRange> {
    if token == LAST_PAGE {
        return page_count
            .checked_sub(1)
            .ok_or_else(|| InvalidPageRange::new(token, "document has no pages"));
    }

    let page_num: usize = token
        .parse()
        .map_err(|_| InvalidPageRange::new(token, "not a page number"))?;

    if page_num < 1 || page_num > page_count {
        return Err(InvalidPageRange::new(
            token,
            format!("page number out of range 1..={page_count}"),
        ));
    }

    Ok(page_num - 1)
}
