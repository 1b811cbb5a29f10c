use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};

/// The published timetable, seen as two read-only endpoints: a per-day id
/// listing and a per-entry detail page.
pub trait Source {
    fn day_entry_ids(&self, date: NaiveDate) -> Result<Vec<String>>;
    fn entry_detail(&self, id: &str) -> Result<DetailPage>;
}

/// Field lookup over one fetched detail page. Labels are stored without
/// their trailing colon; a missing label is an empty string, never an error.
#[derive(Debug, Clone, Default)]
pub struct DetailPage {
    fields: HashMap<String, String>,
}

impl DetailPage {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn value_of(&self, label: &str) -> &str {
        self.fields.get(label).map(String::as_str).unwrap_or("")
    }

    pub fn from_html(html: &str) -> Self {
        parse_detail_fields(html)
    }
}

/// Harvest entry ids from a day-listing page: the `id` parameter of every
/// hyperlink pointing at the entry view. De-duplicated and sorted so a run
/// processes ids in a stable order.
pub fn extract_entry_ids(html: &str) -> Vec<String> {
    const NEEDLE: &str = "view_entry.php?id=";

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut rest = html;
    while let Some(pos) = rest.find(NEEDLE) {
        let after = &rest[pos + NEEDLE.len()..];
        // The id runs until the next query-string or markup delimiter.
        // `&amp;`-encoded separators end at the `&` like plain ones.
        let end = after
            .find(|c: char| matches!(c, '&' | '"' | '\'' | '<' | '>' | '#' | ' '))
            .unwrap_or(after.len());
        let id = &after[..end];
        if !id.is_empty() && seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
        rest = after;
    }
    ids.sort();
    ids
}

/// Pair up `<td>` cells: a cell whose text ends with `:` labels the cell
/// that follows it. First occurrence of a label wins.
pub fn parse_detail_fields(html: &str) -> DetailPage {
    let cells = td_texts(html);
    let mut fields = HashMap::new();
    let mut i = 0;
    while i + 1 < cells.len() {
        if let Some(label) = cells[i].trim().strip_suffix(':') {
            fields
                .entry(label.trim().to_string())
                .or_insert_with(|| cells[i + 1].trim().to_string());
            // The value cell is consumed; its text never acts as a label.
            i += 2;
        } else {
            i += 1;
        }
    }
    DetailPage { fields }
}

/// Inner text of every `<td>` block, in document order. Case-insensitive
/// tag scan over the raw text; lowercasing ASCII keeps byte offsets stable.
fn td_texts(html: &str) -> Vec<String> {
    let lower = html.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("<td") {
        let start = from + rel;
        let after_name = start + 3;
        let tag_boundary = matches!(
            lower.as_bytes().get(after_name).copied(),
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/')
        );
        if !tag_boundary {
            from = after_name;
            continue;
        }
        let Some(open_rel) = lower[start..].find('>') else {
            break;
        };
        let open_end = start + open_rel + 1;
        let Some(close_rel) = lower[open_end..].find("</td") else {
            break;
        };
        let close = open_end + close_rel;
        out.push(clean_text(&html[open_end..close]));
        from = close + 4;
    }
    out
}

/// Tag-stripped, entity-decoded cell text. NBSP survives as the real
/// character; the name canonicalizer deals with it downstream.
fn clean_text(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    let text = text
        .replace("&nbsp;", "\u{00A0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.trim().to_string()
}

/// HTTP-backed source over a blocking client with a per-request timeout.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    base_url: String,
    area: String,
}

impl HttpSource {
    pub fn new(base_url: &str, area: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            area: area.to_string(),
        })
    }

    fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        resp.text().with_context(|| format!("reading body of {url}"))
    }
}

impl Source for HttpSource {
    fn day_entry_ids(&self, date: NaiveDate) -> Result<Vec<String>> {
        let url = format!(
            "{}/day.php?year={}&month={}&day={}&area={}",
            self.base_url,
            date.year(),
            date.month(),
            date.day(),
            self.area
        );
        Ok(extract_entry_ids(&self.get_text(&url)?))
    }

    fn entry_detail(&self, id: &str) -> Result<DetailPage> {
        let url = format!("{}/view_entry.php?id={}", self.base_url, id);
        Ok(parse_detail_fields(&self.get_text(&url)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture(rel: &str) -> String {
        let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        std::fs::read_to_string(base.join("fixtures").join(rel)).expect("read fixture")
    }

    #[test]
    fn day_page_ids_are_harvested_and_deduped() {
        let ids = extract_entry_ids(&fixture("day.html"));
        assert_eq!(ids, vec!["18233", "18234", "18301"]);
    }

    #[test]
    fn amp_encoded_query_strings_terminate_the_id() {
        let html = r#"<a href="view_entry.php?id=42&amp;area=1&amp;day=5">x</a>"#;
        assert_eq!(extract_entry_ids(html), vec!["42"]);
    }

    #[test]
    fn no_links_means_no_ids() {
        assert!(extract_entry_ids("<html><body>nothing here</body></html>").is_empty());
    }

    #[test]
    fn detail_page_fields_resolve_by_label() {
        let page = DetailPage::from_html(&fixture("view_entry.html"));
        assert_eq!(
            page.value_of("Description"),
            "BBA Sem IV - Div A - Data Structures - Dr. Hema Gaikwad"
        );
        assert_eq!(page.value_of("Room"), "Lab 2 & 3");
        assert_eq!(page.value_of("Type"), "BBA Sem IV");
        assert_eq!(page.value_of("Start time"), "09:00:00");
        assert_eq!(page.value_of("End time"), "10:00:00");
    }

    #[test]
    fn missing_label_is_empty_not_an_error() {
        let page = DetailPage::from_html("<table><td>Room:</td><td>101</td></table>");
        assert_eq!(page.value_of("Description"), "");
        assert_eq!(page.value_of("Room"), "101");
    }

    #[test]
    fn nested_markup_in_cells_is_stripped() {
        let page =
            DetailPage::from_html("<td class=\"l\"><b>Room:</b></td>\n<td><i>Lab</i> 1</td>");
        assert_eq!(page.value_of("Room"), "Lab 1");
    }

    #[test]
    fn first_occurrence_of_a_label_wins() {
        let html = "<td>Room:</td><td>First</td><td>Room:</td><td>Second</td>";
        let page = DetailPage::from_html(html);
        assert_eq!(page.value_of("Room"), "First");
    }

    #[test]
    fn value_cell_text_never_acts_as_label() {
        // The description itself ends with a colon; the following cell must
        // not be swallowed as its "value"'s value.
        let html = "<td>Description:</td><td>Note:</td><td>Room:</td><td>101</td>";
        let page = DetailPage::from_html(html);
        assert_eq!(page.value_of("Description"), "Note:");
        assert_eq!(page.value_of("Room"), "101");
    }
}
