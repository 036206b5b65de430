//! Generic XML tree for interpreter responses.
//!
//! Responses are small enough to hold in memory, so the processor works on a
//! parsed tree rather than the event stream.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

/// Errors raised while parsing a response body.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The body is not well-formed XML.
    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        /// Reader offset when the fault was detected.
        position: usize,
        /// Underlying parser error.
        #[source]
        source: quick_xml::Error,
    },
    /// A closing tag did not match any open element.
    #[error("unexpected closing tag </{name}>")]
    UnbalancedEnd {
        /// Name of the stray closing tag.
        name: String,
    },
    /// The body ended while elements were still open.
    #[error("document ended inside <{name}>")]
    Truncated {
        /// Innermost element left open.
        name: String,
    },
}

/// One element with its attributes and child elements.
///
/// Text content is kept only for diagnostics; the interpreter carries all
/// data in attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
    /// Concatenated text content.
    pub text: String,
}

impl XmlElement {
    /// Create an element without attributes or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder-style child appender.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Value of the first attribute called `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Direct children called `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Drop every direct child called `name`, returning how many were removed.
    pub fn remove_children_named(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|child| child.name != name);
        before - self.children.len()
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let mut element = Self::new(String::from_utf8_lossy(start.name().as_ref()));
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() && self.text.is_empty() {
            return writer.write_event(Event::Empty(start));
        }
        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))
    }
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseDocument {
    /// Root element, absent for bodies with no elements at all.
    pub root: Option<XmlElement>,
}

impl ResponseDocument {
    /// Parse `text` into a tree.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when the text is not well-formed XML.
    ///
    /// # Examples
    /// ```
    /// use mapsnap_data::document::ResponseDocument;
    ///
    /// let doc = ResponseDocument::parse(r#"<osm><node id="1"/></osm>"#)?;
    /// let root = doc.osm_root().expect("osm root");
    /// assert_eq!(root.children_named("node").count(), 1);
    /// # Ok::<(), mapsnap_data::document::DocumentError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|source| DocumentError::Xml {
                    position: reader.buffer_position(),
                    source,
                })?;
            match event {
                Event::Start(start) => {
                    let element = XmlElement::from_start(&start).map_err(|source| {
                        DocumentError::Xml {
                            position: reader.buffer_position(),
                            source,
                        }
                    })?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let element = XmlElement::from_start(&start).map_err(|source| {
                        DocumentError::Xml {
                            position: reader.buffer_position(),
                            source,
                        }
                    })?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(end) => {
                    let Some(element) = stack.pop() else {
                        return Err(DocumentError::UnbalancedEnd {
                            name: String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                        });
                    };
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let unescaped = text.unescape().map_err(|source| DocumentError::Xml {
                            position: reader.buffer_position(),
                            source,
                        })?;
                        current.text.push_str(&unescaped);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.pop() {
            return Err(DocumentError::Truncated { name: open.name });
        }
        Ok(Self { root })
    }

    /// The root element when it is called `osm`.
    #[must_use]
    pub fn osm_root(&self) -> Option<&XmlElement> {
        self.root.as_ref().filter(|root| root.name == "osm")
    }

    /// Mutable access to the root element when it is called `osm`.
    pub fn osm_root_mut(&mut self) -> Option<&mut XmlElement> {
        self.root.as_mut().filter(|root| root.name == "osm")
    }

    /// Serialise the tree back to XML for logging.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let Some(root) = &self.root else {
            return String::new();
        };
        let mut writer = Writer::new(Vec::new());
        if let Err(err) = root.write_to(&mut writer) {
            log::debug!("failed to serialise response for logging: {err}");
        }
        String::from_utf8_lossy(&writer.into_inner()).into_owned()
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        // Only the first top-level element counts as the root.
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
