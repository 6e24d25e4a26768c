// src/ingest/parser.rs
//! Tolerant RSS 2.0 / RSS 1.0 (RDF) / Atom parser.
//!
//! Never fails: malformed markup yields whatever items were complete before the
//! error plus a warning, and a document that is not a feed at all (an HTML error
//! page, JSON, plain text) yields no items.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::ingest::types::RawItem;

#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub items: Vec<RawItem>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
    Created,
    Tag,
}

/// Child elements we read, by qualified name. Namespaced elements are only
/// accepted for the Dublin Core / content-module names.
fn field_for(qname: &[u8]) -> Option<Field> {
    let (prefixed, local) = match qname.iter().position(|&b| b == b':') {
        Some(i) => (true, &qname[i + 1..]),
        None => (false, qname),
    };
    match (prefixed, local) {
        (false, b"guid") | (false, b"id") => Some(Field::Id),
        (false, b"title") => Some(Field::Title),
        (false, b"link") => Some(Field::Link),
        (false, b"description") | (false, b"summary") => Some(Field::Summary),
        (false, b"content") | (true, b"encoded") => Some(Field::Content),
        (false, b"pubDate") | (false, b"published") | (_, b"date") | (_, b"issued") => {
            Some(Field::Published)
        }
        (false, b"updated") | (_, b"modified") => Some(Field::Updated),
        (_, b"created") => Some(Field::Created),
        (false, b"category") | (_, b"subject") => Some(Field::Tag),
        _ => None,
    }
}

#[derive(Default)]
struct EntryBuilder {
    item: RawItem,
    content: Option<String>,
    fallback_link: Option<String>,
}

impl EntryBuilder {
    fn set(&mut self, field: Field, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        let slot = match field {
            Field::Id => &mut self.item.id,
            Field::Link => &mut self.item.link,
            Field::Summary => &mut self.item.summary,
            Field::Content => &mut self.content,
            Field::Published => &mut self.item.published,
            Field::Updated => &mut self.item.updated,
            Field::Created => &mut self.item.created,
            Field::Title => {
                if self.item.title.is_empty() {
                    self.item.title = value;
                }
                return;
            }
            Field::Tag => {
                self.item.tags.push(value);
                return;
            }
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    /// Atom-style attributes: `<link href rel>` and `<category term>`.
    fn absorb_attributes(&mut self, field: Field, e: &BytesStart<'_>) {
        match field {
            Field::Link => {
                let mut href = None;
                let mut rel = None;
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"href" => href = Some(decode(&attr.value)),
                        b"rel" => rel = Some(decode(&attr.value)),
                        _ => {}
                    }
                }
                if let Some(href) = href.filter(|h| !h.trim().is_empty()) {
                    match rel.as_deref() {
                        None | Some("alternate") => self.set(Field::Link, href),
                        Some(_) => {
                            if self.fallback_link.is_none() {
                                self.fallback_link = Some(href.trim().to_string());
                            }
                        }
                    }
                }
            }
            Field::Tag => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"term" {
                        self.set(Field::Tag, decode(&attr.value));
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> RawItem {
        if self.item.summary.is_none() {
            self.item.summary = self.content.take();
        }
        if self.item.link.is_none() {
            self.item.link = self.fallback_link.take();
        }
        self.item
    }
}

fn decode(raw: &[u8]) -> String {
    // Feeds routinely use HTML entities (&nbsp;, &rsquo;) that plain XML rejects.
    html_escape::decode_html_entities(&String::from_utf8_lossy(raw)).into_owned()
}

fn is_feed_root(local: &[u8]) -> bool {
    matches!(local, b"rss" | b"feed" | b"RDF")
}

fn is_entry(local: &[u8]) -> bool {
    matches!(local, b"item" | b"entry")
}

/// End tags that cannot appear inside an entry, so seeing one closes it.
fn ends_entry(local: &[u8]) -> bool {
    is_entry(local) || matches!(local, b"channel" | b"rss" | b"feed" | b"RDF")
}

fn name_of(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Flush a still-open field into the entry and emit it.
fn close_entry(
    out: &mut ParsedFeed,
    entry: &mut Option<EntryBuilder>,
    active: &mut Option<(Field, String)>,
) {
    if let Some(mut b) = entry.take() {
        if let Some((field, value)) = active.take() {
            b.set(field, value);
        }
        out.items.push(b.finish());
    }
    *active = None;
}

/// Parse a feed body. See module docs for the tolerance policy.
pub fn parse_feed(bytes: &[u8]) -> ParsedFeed {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}');

    let mut out = ParsedFeed::default();
    let mut reader = Reader::from_str(text);
    {
        let cfg = reader.config_mut();
        cfg.trim_text(true);
        cfg.check_end_names = false;
    }

    let mut saw_root = false;
    let mut entry: Option<EntryBuilder> = None;
    // Qualified names of the elements open inside the current entry; the
    // entry element itself sits at index 0, its fields at index 1.
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut active: Option<(Field, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                if !saw_root {
                    saw_root = true;
                    if !is_feed_root(local.as_ref()) {
                        out.warnings.push(format!(
                            "not a feed document (root element `{}`)",
                            String::from_utf8_lossy(local.as_ref())
                        ));
                        return out;
                    }
                    continue;
                }
                if is_entry(local.as_ref()) {
                    if entry.is_some() {
                        out.warnings.push(format!(
                            "item opened before the previous `<{}>` was closed",
                            open.first().map(|n| name_of(n)).unwrap_or_default()
                        ));
                        close_entry(&mut out, &mut entry, &mut active);
                    }
                    entry = Some(EntryBuilder::default());
                    open.clear();
                    open.push(e.name().as_ref().to_vec());
                    continue;
                }
                if let Some(b) = entry.as_mut() {
                    open.push(e.name().as_ref().to_vec());
                    if open.len() == 2 {
                        if let Some(field) = field_for(e.name().as_ref()) {
                            b.absorb_attributes(field, &e);
                            active = Some((field, String::new()));
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if !saw_root {
                    saw_root = true;
                    out.warnings.push("empty document root".to_string());
                    return out;
                }
                if let (Some(b), 1) = (entry.as_mut(), open.len()) {
                    if let Some(field) = field_for(e.name().as_ref()) {
                        b.absorb_attributes(field, &e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, buf)) = active.as_mut() {
                    if !buf.is_empty() {
                        buf.push(' ');
                    }
                    buf.push_str(&decode(&t));
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, buf)) = active.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => {
                if entry.is_none() {
                    continue;
                }
                let name = e.name();
                match open.iter().rposition(|n| n.as_slice() == name.as_ref()) {
                    Some(at) => {
                        for unclosed in open.drain(at + 1..).rev() {
                            out.warnings.push(format!(
                                "unclosed `<{}>` inside an item",
                                name_of(&unclosed)
                            ));
                        }
                        match at {
                            0 => {
                                close_entry(&mut out, &mut entry, &mut active);
                                open.clear();
                            }
                            1 => {
                                if let (Some(b), Some((field, value))) =
                                    (entry.as_mut(), active.take())
                                {
                                    b.set(field, value);
                                }
                                open.truncate(1);
                            }
                            _ => open.truncate(at),
                        }
                    }
                    None if ends_entry(e.local_name().as_ref()) => {
                        out.warnings.push(format!(
                            "`</{}>` closed an item opened as `<{}>`",
                            name_of(name.as_ref()),
                            open.first().map(|n| name_of(n)).unwrap_or_default()
                        ));
                        close_entry(&mut out, &mut entry, &mut active);
                        open.clear();
                    }
                    None => out.warnings.push(format!(
                        "stray `</{}>` inside an item",
                        name_of(name.as_ref())
                    )),
                }
            }
            Ok(Event::Eof) => {
                if !saw_root {
                    out.warnings.push("no feed root element found".to_string());
                }
                if entry.is_some() {
                    out.warnings
                        .push("document ended inside an unfinished item".to_string());
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                out.warnings.push(format!(
                    "malformed feed at byte {}: {e}; kept {} complete item(s)",
                    reader.buffer_position(),
                    out.items.len()
                ));
                break;
            }
        }
    }

    out
}
