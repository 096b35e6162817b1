//! Subscription list parser.
//!
//! The subscription endpoint answers with a document of
//! `DeviceSubscriptionInfo` elements, each holding `Name`, `Description` and
//! `IsSubscribed` children. Records are reported in document order, wherever
//! they sit below the root.

use pushsync_core::SubscriptionRecord;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use thiserror::Error;
use tracing::debug;

const RECORD_ELEMENT: &[u8] = b"DeviceSubscriptionInfo";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("subscription record {index} has no <{field}> element")]
    MissingField { index: usize, field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Description,
    IsSubscribed,
}

impl Field {
    fn from_element_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Name" => Some(Field::Name),
            b"Description" => Some(Field::Description),
            b"IsSubscribed" => Some(Field::IsSubscribed),
            _ => None,
        }
    }

    fn element_name(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Description => "Description",
            Field::IsSubscribed => "IsSubscribed",
        }
    }
}

#[derive(Debug, Default)]
struct PartialRecord {
    name: Option<String>,
    description: Option<String>,
    is_subscribed: Option<String>,
}

impl PartialRecord {
    /// Only the first occurrence of a field is kept.
    fn fill(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Description => &mut self.description,
            Field::IsSubscribed => &mut self.is_subscribed,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    fn finish(self, index: usize) -> Result<SubscriptionRecord, ParseError> {
        let missing = |field: Field| ParseError::MissingField {
            index,
            field: field.element_name(),
        };
        let name = self.name.ok_or_else(|| missing(Field::Name))?;
        let description = self.description.ok_or_else(|| missing(Field::Description))?;
        let is_subscribed = self.is_subscribed.ok_or_else(|| missing(Field::IsSubscribed))?;

        Ok(SubscriptionRecord {
            name,
            description,
            subscribed: is_subscribed == "true",
        })
    }
}

struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

#[derive(Default)]
struct ParseState {
    records: Vec<PartialRecord>,
    /// (record index, element depth) of every record element still open.
    open: Vec<(usize, usize)>,
    capture: Option<Capture>,
}

impl ParseState {
    fn start_element(&mut self, name: &[u8], depth: usize) {
        if name == RECORD_ELEMENT {
            self.records.push(PartialRecord::default());
            self.open.push((self.records.len() - 1, depth));
            return;
        }

        if self.capture.is_none() && !self.open.is_empty() {
            if let Some(field) = Field::from_element_name(name) {
                self.capture = Some(Capture {
                    field,
                    depth,
                    text: String::new(),
                });
            }
        }
    }

    fn end_element(&mut self, depth: usize) {
        if let Some(capture) = self.capture.take_if(|capture| capture.depth == depth) {
            // The field is a descendant of every record still open.
            for &(index, _) in &self.open {
                self.records[index].fill(capture.field, &capture.text);
            }
        }

        if self.open.last().is_some_and(|&(_, open_depth)| open_depth == depth) {
            self.open.pop();
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
    }

    fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }
}

fn decode(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|e| ParseError::Malformed(format!("invalid UTF-8: {e}")))
}

fn unescaped(raw: &str) -> Result<String, ParseError> {
    unescape(raw)
        .map(|text| text.into_owned())
        .map_err(|e| ParseError::Malformed(e.to_string()))
}

/// Parses a subscription list document.
///
/// Element text is kept verbatim, so `IsSubscribed` is true only for the
/// exact text `true` with no surrounding whitespace. Element names are
/// matched as written, prefix included. A record lacking any of its three
/// fields fails the whole document.
pub fn parse_subscriptions(xml: &str) -> Result<Vec<SubscriptionRecord>, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut state = ParseState::default();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    if seen_root {
                        return Err(ParseError::Malformed("multiple root elements".to_string()));
                    }
                    seen_root = true;
                }
                depth += 1;
                state.start_element(e.name().as_ref(), depth);
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    if seen_root {
                        return Err(ParseError::Malformed("multiple root elements".to_string()));
                    }
                    seen_root = true;
                }
                state.start_element(e.name().as_ref(), depth + 1);
                state.end_element(depth + 1);
            }
            Ok(Event::End(_)) => {
                state.end_element(depth);
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) => {
                if depth == 0 {
                    if !e.iter().all(u8::is_ascii_whitespace) {
                        return Err(ParseError::Malformed("text outside the root element".to_string()));
                    }
                } else if state.is_capturing() {
                    let text = unescaped(decode(&e)?)?;
                    state.push_text(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if state.is_capturing() {
                    state.push_text(decode(&e)?);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if state.is_capturing() {
                    let reference = format!("&{};", decode(&e)?);
                    state.push_text(&unescaped(&reference)?);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ParseError::Malformed(e.to_string())),
        }
    }

    if !seen_root {
        return Err(ParseError::Malformed("document has no root element".to_string()));
    }
    if depth != 0 {
        return Err(ParseError::Malformed("unexpected end of document".to_string()));
    }

    let records = state
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.finish(index))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(count = records.len(), "parsed subscription list");
    Ok(records)
}
