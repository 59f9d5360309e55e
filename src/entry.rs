use crate::error::LookupError;
use crate::tree::{GenericChild, GenericNode};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

pub const ENTRY_LIST_TAG: &str = "entry_list";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupQuery {
    text: String,
}

impl LookupQuery {
    pub fn from_selection(raw: &str) -> Option<Self> {
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            None
        } else {
            Some(Self { text })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// First word of the selection; used for the placeholder and bookmarks.
    pub fn headword(&self) -> &str {
        self.text.split(' ').next().unwrap_or(&self.text)
    }
}

impl fmt::Display for LookupQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Anything able to answer an entry query.
///
/// `Ok(None)` means the source explicitly has no entry for the query.
pub trait EntrySource {
    fn fetch(
        &self,
        query: &LookupQuery,
    ) -> impl Future<Output = Result<Option<GenericNode>, LookupError>>;
}

/// Entry source backed by in-memory XML documents keyed by lower-cased query.
#[derive(Debug, Clone, Default)]
pub struct XmlFixtures {
    documents: HashMap<String, String>,
}

impl XmlFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, query: &str, xml: impl Into<String>) {
        let key = LookupQuery::from_selection(query)
            .map(|query| query.as_str().to_lowercase())
            .unwrap_or_default();
        self.documents.insert(key, xml.into());
    }

    pub fn with(mut self, query: &str, xml: impl Into<String>) -> Self {
        self.insert(query, xml);
        self
    }
}

impl EntrySource for XmlFixtures {
    async fn fetch(&self, query: &LookupQuery) -> Result<Option<GenericNode>, LookupError> {
        match self.documents.get(&query.as_str().to_lowercase()) {
            Some(xml) => parse_entry_list(xml),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(GenericNode),
    NotFound,
    Failed(LookupError),
}

/// Queries `source`, treating anything slower than `deadline` as a failure.
pub async fn lookup<S: EntrySource>(
    source: &S,
    query: &LookupQuery,
    deadline: Duration,
) -> LookupOutcome {
    match timeout(deadline, source.fetch(query)).await {
        Ok(Ok(Some(root))) => LookupOutcome::Found(root),
        Ok(Ok(None)) => LookupOutcome::NotFound,
        Ok(Err(err)) => LookupOutcome::Failed(err),
        Err(_) => LookupOutcome::Failed(LookupError::Timeout(deadline)),
    }
}

/// Extracts the first `entry_list` element of a dictionary response.
///
/// Attributes are dropped; text, CDATA and entity references become text children,
/// adjacent pieces merged. Returns `Ok(None)` when the document has no entry list.
pub fn parse_entry_list(xml: &str) -> Result<Option<GenericNode>, LookupError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<GenericNode> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                if !stack.is_empty() || tag == ENTRY_LIST_TAG {
                    stack.push(GenericNode::new(tag));
                }
            }
            Event::Empty(start) => {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let node = GenericNode::new(tag);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(GenericChild::Element(node)),
                    None if node.tag == ENTRY_LIST_TAG => return Ok(Some(node)),
                    None => {}
                }
            }
            Event::End(_) => {
                let Some(node) = stack.pop() else {
                    continue;
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(GenericChild::Element(node)),
                    None => return Ok(Some(node)),
                }
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let decoded = reader
                        .decoder()
                        .decode(&text)
                        .map_err(|err| LookupError::Malformed(err.to_string()))?;
                    push_text(parent, &decoded);
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let decoded = reader
                        .decoder()
                        .decode(&data)
                        .map_err(|err| LookupError::Malformed(err.to_string()))?;
                    push_text(parent, &decoded);
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(parent) = stack.last_mut() {
                    let name = reference
                        .decode()
                        .map_err(|err| LookupError::Malformed(err.to_string()))?;
                    let raw = format!("&{name};");
                    match unescape(&raw) {
                        Ok(resolved) => push_text(parent, &resolved),
                        Err(_) => push_text(parent, &raw),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.is_empty() {
        Ok(None)
    } else {
        Err(LookupError::Malformed(format!(
            "unterminated <{ENTRY_LIST_TAG}> element"
        )))
    }
}

fn push_text(parent: &mut GenericNode, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(GenericChild::Text(previous)) = parent.children.last_mut() {
        previous.push_str(text);
    } else {
        parent.children.push(GenericChild::Text(text.to_string()));
    }
}
