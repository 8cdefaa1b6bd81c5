//! Incremental stanza reader over an XMPP stream

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tokio::io::{AsyncRead, BufReader};

use crate::application::errors::XmppError;

/// A parsed XML element with its children
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmppError> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Name without namespace prefix
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given local name
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.local_name() == local_name)
    }
}

/// One unit read off the stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// The server opened (or reopened) the stream
    StreamStart(Element),
    /// A complete top-level element
    Stanza(Element),
}

/// Reads top-level stanzas from an XMPP stream
pub struct StanzaReader<R> {
    reader: Reader<BufReader<R>>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> StanzaReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: Reader::from_reader(BufReader::new(inner)),
            buf: Vec::new(),
        }
    }

    /// Give back the underlying reader, e.g. to restart the stream
    pub fn into_inner(self) -> R {
        self.reader.into_inner().into_inner()
    }

    /// Read until a stream header or a complete stanza is available
    pub async fn next(&mut self) -> Result<Frame, XmppError> {
        let mut stack: Vec<Element> = Vec::new();

        loop {
            self.buf.clear();
            match self.reader.read_event_into_async(&mut self.buf).await? {
                Event::Start(start) => {
                    let element = Element::from_start(&start)?;
                    if stack.is_empty() && element.name == "stream:stream" {
                        return Ok(Frame::StreamStart(element));
                    }
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(Frame::Stanza(element)),
                    }
                }
                Event::End(_) => match stack.pop() {
                    Some(element) => match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(Frame::Stanza(element)),
                    },
                    // </stream:stream>
                    None => return Err(XmppError::StreamClosed),
                },
                Event::Text(text) => {
                    if let Some(element) = stack.last_mut() {
                        element.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(element) = stack.last_mut() {
                        element.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => return Err(XmppError::StreamClosed),
                _ => {}
            }
        }
    }
}
