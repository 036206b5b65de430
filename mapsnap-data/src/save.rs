//! Save files: a tracked place list plus a [`QueryResult`] and its entities.
//!
//! Layout, in order, under an `fms-save` root:
//! - one `place name=...` per tracked place;
//! - the result `bbox` with `xMin`, `xMax`, `yMin`, `yMax`;
//! - one `way id=... visibility=...` per result way, holding its own `bbox`,
//!   its `tag k v` pairs sorted by key and one `node id=...` per member;
//! - one top-level `node id=... way=...` per referenced node, in first
//!   reference order, holding `pos x y` and its tags.
//!
//! Numbers use the shortest decimal form that parses back to the same value,
//! so coordinates round-trip exactly, including infinities and NaN.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::str::FromStr;

use mapsnap_core::{
    EntityStore, InvalidVisibility, MapBoundingBox, MapPoint, NodeId, QueryResult, Tags,
    Visibility,
};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use thiserror::Error;

use crate::document::{DocumentError, ResponseDocument, XmlElement};

const ROOT: &str = "fms-save";

/// Errors raised while writing or reading a save file.
#[derive(Debug, Error)]
pub enum SaveError {
    /// Writing XML to the sink failed.
    #[error("failed to write save file: {source}")]
    Xml {
        /// Writer error.
        #[source]
        source: quick_xml::Error,
    },
    /// IO on the underlying file failed.
    #[error("save file IO failed: {source}")]
    Io {
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not well-formed XML.
    #[error("save file is not well-formed: {source}")]
    Malformed {
        /// Parser error.
        #[source]
        source: DocumentError,
    },
    /// The root element is not `fms-save`.
    #[error("expected an <fms-save> root, found {found:?}")]
    UnexpectedRoot {
        /// Root element name, if any element was present.
        found: Option<String>,
    },
    /// A required attribute is absent.
    #[error("<{element}> is missing attribute {attribute:?}")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: &'static str,
    },
    /// An attribute does not hold a number.
    #[error("<{element}> attribute {attribute:?} is not a number: {value:?}")]
    InvalidNumber {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: &'static str,
        /// Offending text.
        value: String,
    },
    /// A way carries an unknown visibility code.
    #[error("way {way} has an invalid visibility: {source}")]
    InvalidVisibility {
        /// External way ID.
        way: String,
        /// Rejected code.
        #[source]
        source: InvalidVisibility,
    },
}

impl From<quick_xml::Error> for SaveError {
    fn from(source: quick_xml::Error) -> Self {
        Self::Xml { source }
    }
}

/// Contents of a loaded save file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveFile {
    /// Tracked place names in saved order.
    pub places: Vec<String>,
    /// Restored result; handles refer to the store passed to [`read_save`].
    pub result: QueryResult,
}

/// Serialise `places`, `result` and the entities it references.
///
/// # Errors
///
/// Returns [`SaveError::Xml`] when the sink rejects a write.
///
/// # Examples
/// ```
/// use mapsnap_core::{EntityStore, MapPoint, QueryResult};
/// use mapsnap_data::save::{read_save, write_save};
///
/// let mut store = EntityStore::new();
/// let way = store.get_way("1");
/// let node = store.get_node("10");
/// store.node_mut(node).location = MapPoint::new(0.5, 51.0);
/// store.way_mut(way).nodes.push(node);
/// let mut result = QueryResult::new();
/// result.push_way(way);
///
/// let mut bytes = Vec::new();
/// write_save(&mut bytes, &["Example Park"], &result, &store)?;
///
/// let mut restored = EntityStore::new();
/// let save = read_save(bytes.as_slice(), &mut restored)?;
/// assert_eq!(save.places, vec!["Example Park"]);
/// assert_eq!(save.result.len(), 1);
/// # Ok::<(), mapsnap_data::save::SaveError>(())
/// ```
pub fn write_save<W: Write, P: AsRef<str>>(
    sink: W,
    places: &[P],
    result: &QueryResult,
    store: &EntityStore,
) -> Result<(), SaveError> {
    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(ROOT)))?;

    for place in places {
        let mut element = BytesStart::new("place");
        element.push_attribute(("name", place.as_ref()));
        writer.write_event(Event::Empty(element))?;
    }
    write_bbox(&mut writer, &result.bbox)?;

    let mut referenced: Vec<NodeId> = Vec::new();
    let mut seen = HashSet::new();
    for way_id in &result.ways {
        let way = store.way(*way_id);
        let mut element = BytesStart::new("way");
        element.push_attribute(("id", way.id()));
        element.push_attribute(("visibility", way.visibility.code().to_string().as_str()));
        writer.write_event(Event::Start(element))?;
        write_bbox(&mut writer, &way.bbox)?;
        write_tags(&mut writer, &way.tags)?;
        for node_id in &way.nodes {
            let mut member = BytesStart::new("node");
            member.push_attribute(("id", store.node(*node_id).id()));
            writer.write_event(Event::Empty(member))?;
            if seen.insert(*node_id) {
                referenced.push(*node_id);
            }
        }
        writer.write_event(Event::End(BytesEnd::new("way")))?;
    }

    for node_id in referenced {
        let node = store.node(node_id);
        let mut element = BytesStart::new("node");
        element.push_attribute(("id", node.id()));
        if let Some(way) = node.way {
            element.push_attribute(("way", store.way(way).id()));
        }
        writer.write_event(Event::Start(element))?;
        let mut pos = BytesStart::new("pos");
        pos.push_attribute(("x", node.location.x.to_string().as_str()));
        pos.push_attribute(("y", node.location.y.to_string().as_str()));
        writer.write_event(Event::Empty(pos))?;
        write_tags(&mut writer, &node.tags)?;
        writer.write_event(Event::End(BytesEnd::new("node")))?;
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    writer
        .into_inner()
        .flush()
        .map_err(|source| SaveError::Io { source })
}

/// Restore a save file into `store`.
///
/// Entities are resolved through the store's idempotent lookups, so loading
/// into a store that already knows an ID updates that entity in place. A
/// way's members, tags, bounding box and visibility are replaced by the saved
/// values.
///
/// # Errors
///
/// Returns [`SaveError`] when the input cannot be read, is not well-formed,
/// or deviates from the layout above.
pub fn read_save<R: Read>(mut source: R, store: &mut EntityStore) -> Result<SaveFile, SaveError> {
    let mut text = String::new();
    source
        .read_to_string(&mut text)
        .map_err(|source| SaveError::Io { source })?;
    let document =
        ResponseDocument::parse(&text).map_err(|source| SaveError::Malformed { source })?;
    let root = match document.root {
        Some(root) if root.name == ROOT => root,
        other => {
            return Err(SaveError::UnexpectedRoot {
                found: other.map(|root| root.name),
            });
        }
    };

    let mut save = SaveFile::default();
    for child in &root.children {
        match child.name.as_str() {
            "place" => save.places.push(required(child, "name")?.to_owned()),
            "bbox" => save.result.bbox = read_bbox(child)?,
            "way" => read_way(child, store, &mut save.result)?,
            "node" => read_node(child, store)?,
            other => log::warn!("ignoring unexpected <{other}> in save file"),
        }
    }
    Ok(save)
}

fn write_bbox<W: Write>(writer: &mut Writer<W>, bbox: &MapBoundingBox) -> Result<(), SaveError> {
    let mut element = BytesStart::new("bbox");
    element.push_attribute(("xMin", bbox.x_min.to_string().as_str()));
    element.push_attribute(("xMax", bbox.x_max.to_string().as_str()));
    element.push_attribute(("yMin", bbox.y_min.to_string().as_str()));
    element.push_attribute(("yMax", bbox.y_max.to_string().as_str()));
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn write_tags<W: Write>(writer: &mut Writer<W>, tags: &Tags) -> Result<(), SaveError> {
    for (key, value) in tags {
        let mut element = BytesStart::new("tag");
        element.push_attribute(("k", key.as_str()));
        element.push_attribute(("v", value.as_str()));
        writer.write_event(Event::Empty(element))?;
    }
    Ok(())
}

fn read_way(
    element: &XmlElement,
    store: &mut EntityStore,
    result: &mut QueryResult,
) -> Result<(), SaveError> {
    let id = required(element, "id")?;
    let code: u8 = number(element, "visibility")?;
    let visibility = Visibility::try_from(code).map_err(|source| SaveError::InvalidVisibility {
        way: id.to_owned(),
        source,
    })?;

    let mut bbox = MapBoundingBox::EMPTY;
    let mut tags = Tags::new();
    let mut members = Vec::new();
    for child in &element.children {
        match child.name.as_str() {
            "bbox" => bbox = read_bbox(child)?,
            "tag" => read_tag(child, &mut tags)?,
            "node" => members.push(store.get_node(required(child, "id")?)),
            other => log::warn!("ignoring unexpected <{other}> in way {id}"),
        }
    }

    let way = store.get_way(id);
    let target = store.way_mut(way);
    target.visibility = visibility;
    target.bbox = bbox;
    target.tags = tags;
    target.nodes = members;
    result.push_way(way);
    Ok(())
}

fn read_node(element: &XmlElement, store: &mut EntityStore) -> Result<(), SaveError> {
    let id = required(element, "id")?;
    let owner = element.attribute("way").map(|way| store.get_way(way));
    let node = store.get_node(id);

    let mut location = MapPoint::NOWHERE;
    let mut tags = Tags::new();
    for child in &element.children {
        match child.name.as_str() {
            "pos" => location = MapPoint::new(number(child, "x")?, number(child, "y")?),
            "tag" => read_tag(child, &mut tags)?,
            other => log::warn!("ignoring unexpected <{other}> in node {id}"),
        }
    }

    let target = store.node_mut(node);
    target.location = location;
    target.tags = tags;
    target.way = owner;
    Ok(())
}

fn read_bbox(element: &XmlElement) -> Result<MapBoundingBox, SaveError> {
    Ok(MapBoundingBox {
        x_min: number(element, "xMin")?,
        y_min: number(element, "yMin")?,
        x_max: number(element, "xMax")?,
        y_max: number(element, "yMax")?,
    })
}

fn read_tag(element: &XmlElement, tags: &mut Tags) -> Result<(), SaveError> {
    let key = required(element, "k")?;
    let value = required(element, "v")?;
    tags.insert(key.to_owned(), value.to_owned());
    Ok(())
}

fn required<'a>(element: &'a XmlElement, attribute: &'static str) -> Result<&'a str, SaveError> {
    element
        .attribute(attribute)
        .ok_or_else(|| SaveError::MissingAttribute {
            element: element.name.clone(),
            attribute,
        })
}

fn number<T: FromStr>(element: &XmlElement, attribute: &'static str) -> Result<T, SaveError> {
    let value = required(element, attribute)?;
    value.trim().parse().map_err(|_| SaveError::InvalidNumber {
        element: element.name.clone(),
        attribute,
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    struct Sample {
        store: EntityStore,
        result: QueryResult,
        places: Vec<String>,
    }

    #[fixture]
    fn sample() -> Sample {
        let mut store = EntityStore::new();
        let mut result = QueryResult::new();

        let park = store.get_way("100");
        let lane = store.get_way("200");
        let coords = [
            ("1", 0.1, 51.000_000_1),
            ("2", 0.2 + 0.1, 51.5),
            ("3", -0.000_123_456_789, f64::INFINITY),
            ("4", 1.0e-300, -1.0 / 3.0),
        ];
        for (id, x, y) in coords {
            let node = store.get_node(id);
            store.node_mut(node).location = MapPoint::new(x, y);
        }
        let nodes: Vec<NodeId> = ["1", "2", "3", "1"]
            .iter()
            .map(|id| store.get_node(id))
            .collect();
        for node in &nodes {
            store.node_mut(*node).way = Some(park);
        }
        let shared = store.get_node("4");
        store.node_mut(shared).way = Some(lane);
        store
            .node_mut(shared)
            .tags
            .insert("barrier".into(), "gate & stile".into());

        let park_way = store.way_mut(park);
        park_way.nodes = nodes;
        park_way.visibility = Visibility::NoLabel;
        park_way.tags.insert("name".into(), "Example <Park>".into());
        park_way.tags.insert("leisure".into(), "park".into());
        park_way.bbox = MapBoundingBox::from_corners(MapPoint::new(0.1, 51.0), MapPoint::new(0.3, 51.5));

        let lane_node = store.get_node("2");
        let lane_way = store.way_mut(lane);
        lane_way.nodes = vec![shared, lane_node];
        lane_way.visibility = Visibility::Hide;

        result.push_way(park);
        result.push_way(lane);
        result.bbox = MapBoundingBox::from_corners(MapPoint::new(-1.0, -1.0), MapPoint::new(1.0, 1.0));

        Sample {
            store,
            result,
            places: vec!["Example Park".into(), "Quay & Lane".into()],
        }
    }

    fn round_trip(sample: &Sample) -> (SaveFile, EntityStore) {
        let mut bytes = Vec::new();
        write_save(&mut bytes, &sample.places, &sample.result, &sample.store).expect("write");
        let mut restored = EntityStore::new();
        let save = read_save(bytes.as_slice(), &mut restored).expect("read");
        (save, restored)
    }

    #[rstest]
    fn round_trip_preserves_ways(sample: Sample) {
        let (save, restored) = round_trip(&sample);
        assert_eq!(save.places, sample.places);
        assert_eq!(save.result.bbox, sample.result.bbox);
        assert_eq!(save.result.len(), 2);

        for (original, loaded) in sample.result.ways.iter().zip(&save.result.ways) {
            let before = sample.store.way(*original);
            let after = restored.way(*loaded);
            assert_eq!(after.id(), before.id());
            assert_eq!(after.visibility, before.visibility);
            assert_eq!(after.tags, before.tags);
            assert_eq!(after.bbox, before.bbox);
            let ids = |store: &EntityStore, nodes: &[NodeId]| -> Vec<String> {
                nodes.iter().map(|n| store.node(*n).id().to_owned()).collect()
            };
            assert_eq!(ids(&restored, &after.nodes), ids(&sample.store, &before.nodes));
        }
    }

    #[rstest]
    fn round_trip_preserves_nodes_bit_for_bit(sample: Sample) {
        let (_, restored) = round_trip(&sample);
        for (_, before) in sample.store.nodes() {
            let handle = restored.find_node(before.id()).expect("node restored");
            let after = restored.node(handle);
            assert_eq!(after.location.x.to_bits(), before.location.x.to_bits());
            assert_eq!(after.location.y.to_bits(), before.location.y.to_bits());
            assert_eq!(after.tags, before.tags);
            let owner = |store: &EntityStore, node: &mapsnap_core::Node| {
                node.way.map(|way| store.way(way).id().to_owned())
            };
            assert_eq!(owner(&restored, after), owner(&sample.store, before));
        }
    }

    #[rstest]
    fn shared_nodes_are_written_once(sample: Sample) {
        let mut bytes = Vec::new();
        write_save(&mut bytes, &sample.places, &sample.result, &sample.store).expect("write");
        let text = String::from_utf8(bytes).expect("utf-8");
        assert_eq!(text.matches(r#"<node id="2" way="100">"#).count(), 1);
        assert_eq!(text.matches("<pos ").count(), 4);
        let first_way = text.find("<way ").expect("way written");
        let first_place = text.find("<place ").expect("place written");
        assert!(first_place < first_way);
    }

    #[rstest]
    fn empty_bbox_round_trips(mut sample: Sample) {
        sample.result.bbox = MapBoundingBox::EMPTY;
        let (save, _) = round_trip(&sample);
        assert!(save.result.bbox.is_empty());
        assert_eq!(save.result.bbox, MapBoundingBox::EMPTY);
    }

    #[rstest]
    fn nowhere_nodes_round_trip(mut sample: Sample) {
        let ghost = sample.store.get_node("ghost");
        let park = sample.store.find_way("100").expect("park");
        sample.store.way_mut(park).nodes.push(ghost);
        let (_, restored) = round_trip(&sample);
        let handle = restored.find_node("ghost").expect("ghost restored");
        assert!(restored.node(handle).location.is_nowhere());
    }

    #[rstest]
    #[case("<other/>", "UnexpectedRoot")]
    #[case("<fms-save><place/></fms-save>", "MissingAttribute")]
    #[case(r#"<fms-save><bbox xMin="a" xMax="1" yMin="0" yMax="1"/></fms-save>"#, "InvalidNumber")]
    #[case(r#"<fms-save><way id="1" visibility="7"/></fms-save>"#, "InvalidVisibility")]
    #[case("<fms-save><way>", "Malformed")]
    fn rejects_invalid_files(#[case] body: &str, #[case] expected: &str) {
        let mut store = EntityStore::new();
        let err = read_save(body.as_bytes(), &mut store).expect_err("must fail");
        let matched = match err {
            SaveError::UnexpectedRoot { .. } => "UnexpectedRoot",
            SaveError::MissingAttribute { .. } => "MissingAttribute",
            SaveError::InvalidNumber { .. } => "InvalidNumber",
            SaveError::InvalidVisibility { .. } => "InvalidVisibility",
            SaveError::Malformed { .. } => "Malformed",
            SaveError::Xml { .. } | SaveError::Io { .. } => "other",
        };
        assert_eq!(matched, expected);
    }
}
