//! Construction of Overpass XML query documents.
//!
//! Every document shares one envelope: an `osm-script` root with
//! `output="xml"` wrapping a single `union` clause and a trailing `print`.
//! The union ends with `recurse type="down"` so member nodes are returned
//! alongside the matched ways.

use std::fmt;

use mapsnap_core::{MapBoundingBox, Tags};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

/// Element class addressed by an ID query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Point element.
    Node,
    /// Polyline or polygon element.
    Way,
}

impl ElementType {
    /// Name used by the query grammar.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialised query ready to POST to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDocument(String);

impl QueryDocument {
    /// XML text of the query.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the document, returning the XML text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for QueryDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ways whose `name` tag equals `place`, with their member nodes.
///
/// # Examples
/// ```
/// use mapsnap_data::query::name_query;
///
/// let query = name_query("Example Park");
/// assert!(query.as_str().contains(r#"<has-kv k="name" v="Example Park"/>"#));
/// ```
#[must_use]
pub fn name_query(place: &str) -> QueryDocument {
    build(vec![
        Clause::Open("query", vec![("type", "way".to_owned())]),
        Clause::Empty("has-kv", vec![("k", "name".to_owned()), ("v", place.to_owned())]),
        Clause::Close("query"),
    ])
}

/// Ways inside `bbox`, optionally filtered by exact tag matches.
///
/// Filters are emitted as `has-kv` children of the way query, ahead of the
/// `bbox-query` element. Coordinates use the shortest decimal form that
/// round-trips.
#[must_use]
pub fn bbox_query(bbox: &MapBoundingBox, tags: &Tags) -> QueryDocument {
    let mut clauses = vec![Clause::Open("query", vec![("type", "way".to_owned())])];
    clauses.extend(
        tags.iter()
            .map(|(k, v)| Clause::Empty("has-kv", vec![("k", k.clone()), ("v", v.clone())])),
    );
    clauses.push(Clause::Empty(
        "bbox-query",
        vec![
            ("n", bbox.y_max.to_string()),
            ("e", bbox.x_max.to_string()),
            ("s", bbox.y_min.to_string()),
            ("w", bbox.x_min.to_string()),
        ],
    ));
    clauses.push(Clause::Close("query"));
    build(clauses)
}

/// Elements of `element_type` addressed by ID, with their members.
///
/// An empty `ids` slice yields a well-formed query that matches nothing.
#[must_use]
pub fn id_union_query<S: AsRef<str>>(ids: &[S], element_type: ElementType) -> QueryDocument {
    build(
        ids.iter()
            .map(|id| {
                Clause::Empty(
                    "id-query",
                    vec![
                        ("type", element_type.as_str().to_owned()),
                        ("ref", id.as_ref().to_owned()),
                    ],
                )
            })
            .collect(),
    )
}

enum Clause {
    Open(&'static str, Vec<(&'static str, String)>),
    Empty(&'static str, Vec<(&'static str, String)>),
    Close(&'static str),
}

impl Clause {
    fn into_event(self) -> Event<'static> {
        match self {
            Self::Open(name, attributes) => Event::Start(element(name, &attributes)),
            Self::Empty(name, attributes) => Event::Empty(element(name, &attributes)),
            Self::Close(name) => Event::End(BytesEnd::new(name)),
        }
    }
}

fn element(name: &'static str, attributes: &[(&'static str, String)]) -> BytesStart<'static> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute((*key, value.as_str()));
    }
    start
}

fn build(union_body: Vec<Clause>) -> QueryDocument {
    let mut events = Vec::with_capacity(union_body.len() + 6);
    events.push(Clause::Open("osm-script", vec![("output", "xml".to_owned())]).into_event());
    events.push(Clause::Open("union", Vec::new()).into_event());
    events.extend(union_body.into_iter().map(Clause::into_event));
    events.push(Clause::Empty("recurse", vec![("type", "down".to_owned())]).into_event());
    events.push(Clause::Close("union").into_event());
    events.push(Clause::Empty("print", Vec::new()).into_event());
    events.push(Clause::Close("osm-script").into_event());

    let mut writer = Writer::new(Vec::new());
    for event in &events {
        // A Vec sink never reports an IO error.
        if let Err(err) = writer.write_event(event) {
            log::error!("failed to serialise query element: {err}");
        }
    }
    QueryDocument(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}
