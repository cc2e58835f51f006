use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{Result, ToolError};

const ITEM_TAG: &str = "item";
const RESULT_CODE_TAG: &str = "resultCode";
const RESULT_MSG_TAG: &str = "resultMsg";

/// Direct child elements of one `<item>` node, keyed by tag name.
///
/// Only the first occurrence of a repeated child is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlItem {
    children: BTreeMap<String, String>,
}

impl XmlItem {
    /// Text content of the named child element, if it was present.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.children.get(name).map(String::as_str)
    }

    fn insert_first(&mut self, name: String, text: String) {
        self.children.entry(name).or_insert(text);
    }
}

/// The parts of an API XML response the fetcher cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlEnvelope {
    /// Text of the first `resultCode` element anywhere in the document.
    pub result_code: Option<String>,
    /// Text of the first `resultMsg` element anywhere in the document.
    pub result_msg: Option<String>,
    /// Every outermost `<item>` element in document order.
    pub items: Vec<XmlItem>,
}

enum Capture {
    Code(String),
    Message(String),
}

/// Parses an API XML response into its result header and item list.
pub fn parse_envelope(body: &str) -> Result<XmlEnvelope> {
    let mut reader = Reader::from_str(body);
    let mut envelope = XmlEnvelope::default();

    let mut depth = 0usize;
    // (depth of the open <item>, item being filled)
    let mut item: Option<(usize, XmlItem)> = None;
    let mut field: Option<(String, String)> = None;
    let mut capture: Option<Capture> = None;

    loop {
        let item_depth = item.as_ref().map(|(item_depth, _)| *item_depth);
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                let name = local_name(e);
                match item_depth {
                    None if name == ITEM_TAG => item = Some((depth, XmlItem::default())),
                    Some(open) if depth == open + 1 => field = Some((name, String::new())),
                    Some(_) => {}
                    None => capture = header_capture(&envelope, &name),
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e);
                match item_depth {
                    None if name == ITEM_TAG => envelope.items.push(XmlItem::default()),
                    Some(open) if depth == open => {
                        if let Some((_, current)) = item.as_mut() {
                            current.insert_first(name, String::new());
                        }
                    }
                    Some(_) => {}
                    None => match header_capture(&envelope, &name) {
                        Some(Capture::Code(_)) => envelope.result_code = Some(String::new()),
                        Some(Capture::Message(_)) => envelope.result_msg = Some(String::new()),
                        None => {}
                    },
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| ToolError::Xml(err.to_string()))?;
                append_text(&mut field, &mut capture, item_depth, depth, &text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                append_text(&mut field, &mut capture, item_depth, depth, &text);
            }
            Ok(Event::End(_)) => {
                match item_depth {
                    Some(open) if depth == open + 1 => {
                        let finished_field = field.take();
                        if let (Some((_, current)), Some((name, text))) =
                            (item.as_mut(), finished_field)
                        {
                            current.insert_first(name, text);
                        }
                    }
                    Some(open) if depth == open => {
                        if let Some((_, finished)) = item.take() {
                            envelope.items.push(finished);
                        }
                    }
                    Some(_) => {}
                    None => match capture.take() {
                        Some(Capture::Code(text)) => envelope.result_code = Some(text),
                        Some(Capture::Message(text)) => envelope.result_msg = Some(text),
                        None => {}
                    },
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(ToolError::Xml(format!(
                    "at position {}: {err}",
                    reader.buffer_position()
                )));
            }
        }
    }

    if item.is_some() || depth != 0 {
        return Err(ToolError::Xml("unexpected end of document".into()));
    }

    Ok(envelope)
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn header_capture(envelope: &XmlEnvelope, name: &str) -> Option<Capture> {
    match name {
        RESULT_CODE_TAG if envelope.result_code.is_none() => Some(Capture::Code(String::new())),
        RESULT_MSG_TAG if envelope.result_msg.is_none() => Some(Capture::Message(String::new())),
        _ => None,
    }
}

fn append_text(
    field: &mut Option<(String, String)>,
    capture: &mut Option<Capture>,
    item_depth: Option<usize>,
    depth: usize,
    text: &str,
) {
    match item_depth {
        Some(open) if depth == open + 1 => {
            if let Some((_, buffer)) = field {
                buffer.push_str(text);
            }
        }
        Some(_) => {}
        None => {
            if let Some(Capture::Code(buffer) | Capture::Message(buffer)) = capture {
                buffer.push_str(text);
            }
        }
    }
}
