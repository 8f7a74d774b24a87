//! Sitemap parsing: extract `<loc>` URLs and filter them by path segment.
//!
//! Exported sitemaps are often slightly malformed: stray text around the
//! XML and unescaped ampersands inside URLs. The content is cleaned up
//! before parsing.

use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::core::errors::PipelineError;

/// Read the sitemap file and return the `<loc>` URLs containing `segment`,
/// in document order.
pub fn filter_sitemap_urls(path: &Path, segment: &str) -> Result<Vec<String>, PipelineError> {
    let raw = fs::read_to_string(path)?;
    let urls = parse_loc_urls(&raw)?;
    Ok(urls
        .into_iter()
        .filter(|url| url.contains(segment))
        .collect())
}

/// Parse every `<loc>` value out of sitemap content, tolerating the usual
/// export damage.
pub fn parse_loc_urls(content: &str) -> Result<Vec<String>, PipelineError> {
    let cleaned = clean_xml_content(content);

    let mut reader = Reader::from_str(&cleaned);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"loc" => in_loc = true,
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"loc" => in_loc = false,
            Ok(Event::Text(e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|err| PipelineError::Api(format!("invalid sitemap: {}", err)))?;
                urls.push(text.trim().to_string());
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(PipelineError::Api(format!("invalid sitemap: {}", err)));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(urls)
}

/// Drop non-markup lines and escape ampersands that are not part of a
/// valid entity reference.
fn clean_xml_content(content: &str) -> String {
    let markup: String = content
        .lines()
        .filter(|line| line.trim_start().starts_with('<'))
        .collect::<Vec<_>>()
        .join("\n");

    escape_stray_ampersands(&markup)
}

fn escape_stray_ampersands(content: &str) -> String {
    const ENTITIES: [&str; 5] = ["amp;", "lt;", "gt;", "quot;", "apos;"];

    let mut result = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(pos) = rest.find('&') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        if ENTITIES.iter().any(|entity| after.starts_with(entity)) {
            result.push('&');
        } else {
            result.push_str("&amp;");
        }
        rest = after;
    }
    result.push_str(rest);
    result
}
