//! `.osm`/`.xml` decoding via `quick-xml`.
//!
//! The element/attribute walking style — `read_event_into` into a reused
//! buffer, a `process_element`/`process_subelements` split, and small
//! `get_required_attr`/`parse_required_attr` helpers — is lifted from the
//! teacher's `geodata/importer.rs::parse_osm_xml`. Unlike the teacher,
//! which eagerly loads the whole file into in-memory entity storages, this
//! is pull-based: `next()` parses and returns exactly one primitive per
//! call, so it can feed a bounded channel without buffering the file.

use std::io::BufRead;

use quick_xml::events::attributes::Attributes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::location::{Identifier, Location};
use crate::tags::TagList;

use super::decoder::{DecodeError, PrimitiveSource};
use super::primitive::{Member, MemberKind, Node, Primitive, Relation, Way};

pub struct XmlSource<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> XmlSource<R> {
    pub fn new(inner: R) -> XmlSource<R> {
        let reader = Reader::from_reader(inner);
        XmlSource { reader, buf: Vec::new() }
    }
}

impl<R: BufRead> PrimitiveSource for XmlSource<R> {
    fn next(&mut self) -> Result<Option<Primitive>, DecodeError> {
        loop {
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| DecodeError::Malformed(e.to_string()))?;

            let result = match event {
                Event::Eof => return Ok(None),
                Event::Start(start) => self.dispatch(start, true),
                Event::Empty(start) => self.dispatch(start, false),
                _ => {
                    self.buf.clear();
                    continue;
                }
            };

            self.buf.clear();
            if let Some(primitive) = result? {
                return Ok(Some(primitive));
            }
        }
    }
}

impl<R: BufRead> XmlSource<R> {
    fn dispatch(&mut self, start: BytesStart, has_subelements: bool) -> Result<Option<Primitive>, DecodeError> {
        match start.local_name().as_ref() {
            b"node" => self.parse_node(&start, has_subelements).map(|n| Some(Primitive::Node(n))),
            b"way" => self.parse_way(&start, has_subelements).map(|w| Some(Primitive::Way(w))),
            b"relation" => self
                .parse_relation(&start, has_subelements)
                .map(|r| Some(Primitive::Relation(r))),
            _ => {
                if has_subelements {
                    self.skip_subtree(start.local_name().as_ref())?;
                }
                Ok(None)
            }
        }
    }

    /// Consumes and discards events until the matching end tag for an
    /// element we don't care about (e.g. `<bounds>`, `<osm>`).
    fn skip_subtree(&mut self, name: &[u8]) -> Result<(), DecodeError> {
        let mut depth = 0u32;
        let mut buf = Vec::new();
        loop {
            let event = self
                .reader
                .read_event_into(&mut buf)
                .map_err(|e| DecodeError::Malformed(e.to_string()))?;
            match event {
                Event::Eof => break,
                Event::Start(s) if s.local_name().as_ref() == name => depth += 1,
                Event::End(e) if e.local_name().as_ref() == name => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    fn parse_node(&mut self, start: &BytesStart, has_subelements: bool) -> Result<Node, DecodeError> {
        let mut attrs = start.attributes();
        // Attribute lookups scan forward through a single iterator (see
        // `get_required_attr`), so these must be queried in the order
        // real `.osm` XML writes them: `id`, `lat`, `lon`.
        let id = get_id(&mut self.reader, b"node", &mut attrs)?;
        let lat: f64 = parse_required_attr(&mut self.reader, b"node", &mut attrs, b"lat")?;
        let lon: f64 = parse_required_attr(&mut self.reader, b"node", &mut attrs, b"lon")?;
        let mut tags = TagList::new();

        if has_subelements {
            self.each_subelement(b"node", |sub_name, sub_attrs, reader| {
                try_add_tag(reader, sub_name, sub_attrs, &mut tags)?;
                Ok(())
            })?;
        }

        Ok(Node { id, location: Location::from_degrees(lon, lat), tags })
    }

    fn parse_way(&mut self, start: &BytesStart, has_subelements: bool) -> Result<Way, DecodeError> {
        let mut attrs = start.attributes();
        let id = get_id(&mut self.reader, b"way", &mut attrs)?;
        let mut node_ids = Vec::new();
        let mut tags = TagList::new();

        if has_subelements {
            self.each_subelement(b"way", |sub_name, sub_attrs, reader| {
                if try_add_tag(reader, sub_name, sub_attrs, &mut tags)? {
                    return Ok(());
                }
                if sub_name == b"nd" {
                    let node_ref: Identifier = parse_required_attr(reader, b"nd", sub_attrs, b"ref")?;
                    node_ids.push(node_ref);
                }
                Ok(())
            })?;
        }

        Ok(Way { id, node_ids, tags })
    }

    fn parse_relation(&mut self, start: &BytesStart, has_subelements: bool) -> Result<Relation, DecodeError> {
        let mut attrs = start.attributes();
        let id = get_id(&mut self.reader, b"relation", &mut attrs)?;
        let mut members = Vec::new();
        let mut tags = TagList::new();

        if has_subelements {
            self.each_subelement(b"relation", |sub_name, sub_attrs, reader| {
                if try_add_tag(reader, sub_name, sub_attrs, &mut tags)? {
                    return Ok(());
                }
                if sub_name == b"member" {
                    let kind_str = get_required_attr(reader, b"member", sub_attrs, b"type")?;
                    let kind = match kind_str.as_ref() {
                        "node" => MemberKind::Node,
                        "way" => MemberKind::Way,
                        "relation" => MemberKind::Relation,
                        other => {
                            return Err(DecodeError::Malformed(format!("unknown member type `{}`", other)))
                        }
                    };
                    let member_id: Identifier = parse_required_attr(reader, b"member", sub_attrs, b"ref")?;
                    let role = get_required_attr(reader, b"member", sub_attrs, b"role")
                        .unwrap_or_default()
                        .into_owned();
                    members.push(Member { kind, id: member_id, role });
                }
                Ok(())
            })?;
        }

        Ok(Relation { id, members, tags })
    }

    /// Walks every direct child element of the entity currently open,
    /// invoking `f` for each, until the matching end tag.
    fn each_subelement<F>(&mut self, entity_name: &[u8], mut f: F) -> Result<(), DecodeError>
    where
        F: FnMut(&[u8], &mut Attributes, &mut Reader<R>) -> Result<(), DecodeError>,
    {
        let mut buf = Vec::new();
        loop {
            let event = self
                .reader
                .read_event_into(&mut buf)
                .map_err(|e| DecodeError::Malformed(e.to_string()))?;
            match event {
                Event::Eof => break,
                Event::End(end) if end.local_name().as_ref() == entity_name => break,
                Event::Start(s) | Event::Empty(s) => {
                    f(s.local_name().as_ref(), &mut s.attributes(), &mut self.reader)?;
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }
}

fn ascii_name_as_str(name: &[u8]) -> &str {
    std::str::from_utf8(name).unwrap_or("N/A")
}

fn get_required_attr<'a, R: BufRead>(
    reader: &mut Reader<R>,
    elem_name: &[u8],
    attrs: &mut Attributes<'a>,
    attr_name: &[u8],
) -> Result<std::borrow::Cow<'a, str>, DecodeError> {
    for attr in attrs {
        let attr = attr.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        if attr.key.local_name().as_ref() == attr_name {
            return attr
                .decode_and_unescape_value(reader)
                .map_err(|e| DecodeError::Malformed(e.to_string()));
        }
    }
    Err(DecodeError::MissingAttribute {
        element: leak_name(elem_name),
        attr: leak_name(attr_name),
    })
}

fn parse_required_attr<T, R: BufRead>(
    reader: &mut Reader<R>,
    elem_name: &[u8],
    attrs: &mut Attributes,
    attr_name: &[u8],
) -> Result<T, DecodeError>
where
    T: std::str::FromStr,
{
    let value = get_required_attr(reader, elem_name, attrs, attr_name)?;
    value.parse::<T>().map_err(|_| {
        DecodeError::Malformed(format!(
            "failed to parse attribute {} (`{}`) on <{}>",
            ascii_name_as_str(attr_name),
            value,
            ascii_name_as_str(elem_name)
        ))
    })
}

fn try_add_tag<R: BufRead>(
    reader: &mut Reader<R>,
    elem_name: &[u8],
    attrs: &mut Attributes,
    tags: &mut TagList,
) -> Result<bool, DecodeError> {
    if elem_name != b"tag" {
        return Ok(false);
    }
    let key = get_required_attr(reader, elem_name, attrs, b"k")?;
    let value = get_required_attr(reader, elem_name, attrs, b"v")?;
    tags.insert(key.into_owned(), value.into_owned());
    Ok(true)
}

fn get_id<R: BufRead>(reader: &mut Reader<R>, elem_name: &[u8], attrs: &mut Attributes) -> Result<Identifier, DecodeError> {
    parse_required_attr(reader, elem_name, attrs, b"id")
}

/// Element/attribute names used in error messages are always one of a
/// small fixed set of ASCII literals (`node`, `lat`, `ref`, ...), so a
/// `'static` leak is a cheap way to avoid threading lifetimes through
/// `DecodeError` just for diagnostics.
fn leak_name(name: &[u8]) -> &'static str {
    Box::leak(ascii_name_as_str(name).to_string().into_boxed_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(xml: &str) -> XmlSource<Cursor<&[u8]>> {
        XmlSource::new(Cursor::new(xml.as_bytes()))
    }

    #[test]
    fn parses_a_tagged_node() {
        let xml = r#"<osm><node id="1" lat="12.5" lon="-3.25"><tag k="amenity" v="cafe"/></node></osm>"#;
        let mut src = source(xml);
        match src.next().unwrap().unwrap() {
            Primitive::Node(n) => {
                assert_eq!(n.id, 1);
                assert_eq!(n.tags.get("amenity"), Some("cafe"));
                assert!((n.location.lat() - 12.5).abs() < 1e-9);
                assert!((n.location.lon() - (-3.25)).abs() < 1e-9);
            }
            _ => panic!("expected a node"),
        }
        assert!(src.next().unwrap().is_none());
    }

    #[test]
    fn parses_a_way_with_node_refs() {
        let xml = r#"<osm><way id="5"><nd ref="1"/><nd ref="2"/><tag k="highway" v="residential"/></way></osm>"#;
        let mut src = source(xml);
        match src.next().unwrap().unwrap() {
            Primitive::Way(w) => {
                assert_eq!(w.id, 5);
                assert_eq!(w.node_ids, vec![1, 2]);
                assert_eq!(w.tags.get("highway"), Some("residential"));
            }
            _ => panic!("expected a way"),
        }
    }

    #[test]
    fn parses_a_relation_with_member_roles() {
        let xml = r#"<osm><relation id="9">
            <member type="way" ref="1" role="outer"/>
            <member type="way" ref="2" role="inner"/>
            <tag k="type" v="multipolygon"/>
        </relation></osm>"#;
        let mut src = source(xml);
        match src.next().unwrap().unwrap() {
            Primitive::Relation(r) => {
                assert_eq!(r.id, 9);
                assert_eq!(r.members.len(), 2);
                assert_eq!(r.members[0].role, "outer");
                assert_eq!(r.members[1].role, "inner");
                assert!(r.tags.is_multipolygon_candidate());
            }
            _ => panic!("expected a relation"),
        }
    }

    #[test]
    fn missing_required_attribute_is_an_error() {
        let xml = r#"<osm><node id="1" lat="0"/></osm>"#;
        let mut src = source(xml);
        assert!(src.next().unwrap_err().to_string().contains("lon"));
    }

    #[test]
    fn unknown_top_level_elements_are_skipped() {
        let xml = r#"<osm><bounds minlat="0" minlon="0" maxlat="1" maxlon="1"/><node id="1" lat="0" lon="0"/></osm>"#;
        let mut src = source(xml);
        match src.next().unwrap().unwrap() {
            Primitive::Node(n) => assert_eq!(n.id, 1),
            _ => panic!("expected a node"),
        }
    }
}
