//! XML archive format
//!
//! ```xml
//! <Reflect FormatVersion="1">
//!   <Object Type="Version">
//!     <Field Name="m_Source">void_reflect</Field>
//!     <Field Name="m_SourceVersion">0.1.0</Field>
//!   </Object>
//!   <Object Type="Foo">
//!     <Field Name="m_Count">5</Field>
//!     <Field Name="m_Tags"><Item>a</Item><Item>b</Item></Field>
//!     <Field Name="m_Child"><Object Type="Bar">...</Object></Field>
//!   </Object>
//! </Reflect>
//! ```
//!
//! Maps are written as `<Entry><Key/><Value/></Entry>` children and an empty
//! optional element as `<Null/>`. Fields are matched by name on read, so
//! unknown fields are skipped and missing ones keep their defaults, as do
//! fields whose text no longer parses as the field's type.

use super::binary::CURRENT_FORMAT;
use super::{finish, persisted_fields, take_version, ArchiveContents, ArchiveState, ElementFailure, Progress, StatusSink};
use crate::error::{ReflectError, Result};
use crate::object::{Object, ObjectPtr};
use crate::registry::Registry;
use crate::value::{DataKind, Value};
use crate::version::Version;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

const ROOT: &str = "Reflect";
const OBJECT: &str = "Object";
const NULL: &str = "Null";
const FIELD: &str = "Field";

/// A parsed XML element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated character data
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Parse a document and return its root element
    pub fn parse(text: &str) -> Result<XmlNode> {
        let mut reader = quick_xml::Reader::from_str(text);
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event().map_err(ReflectError::xml)? {
                Event::Start(ref e) => {
                    stack.push(node_from_start(e)?);
                }
                Event::Empty(ref e) => {
                    let node = node_from_start(e)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| ReflectError::xml("unbalanced closing tag"))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Text(ref e) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&e.unescape().map_err(ReflectError::xml)?);
                    }
                }
                Event::CData(ref e) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(ReflectError::xml("unexpected end of document"));
        }
        root.ok_or_else(|| ReflectError::xml("document has no root element"))
    }

    /// Serialize as an indented document
    pub fn to_document(&self) -> Result<String> {
        let mut writer = quick_xml::Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(ReflectError::xml)?;
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(ReflectError::xml)
    }

    fn write_to(&self, writer: &mut quick_xml::Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(ReflectError::xml);
        }

        writer.write_event(Event::Start(start)).map_err(ReflectError::xml)?;
        if self.children.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(ReflectError::xml)?;
        } else {
            for child in &self.children {
                child.write_to(writer)?;
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(ReflectError::xml)
    }
}

fn node_from_start(e: &BytesStart<'_>) -> Result<XmlNode> {
    let mut node = XmlNode::new(&String::from_utf8_lossy(e.name().as_ref()));
    for attribute in e.attributes() {
        let attribute = attribute.map_err(ReflectError::xml)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
        let value = attribute.unescape_value().map_err(ReflectError::xml)?.to_string();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(ReflectError::xml("document has more than one root element")),
    }
}

/// Output context handed to serializers while writing XML
pub struct XmlWriter<'r> {
    registry: &'r Registry,
}

impl<'r> XmlWriter<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Fill `node` using the serializer registered for `kind`
    pub fn write_value(&mut self, kind: &DataKind, value: &Value, node: &mut XmlNode) -> Result<()> {
        let data = self.registry.serializer_for(kind)?;
        data.write_xml(self, kind, value, node)
    }

    /// Build an `<Object>` node, or `<Null/>` for `None`
    pub fn write_element(&mut self, object: Option<&dyn Object>) -> Result<XmlNode> {
        let Some(object) = object else {
            return Ok(XmlNode::new(NULL));
        };

        let registry = self.registry;
        let class = registry
            .get_class(object.reflect_type())
            .ok_or_else(|| ReflectError::UnknownType(object.class_name().to_string()))?;

        let mut node = XmlNode::new(OBJECT).with_attribute("Type", class.name());
        for (field, value) in persisted_fields(registry, &class, object)? {
            log::trace!("Write {}::{} as XML", class.name(), field.name());
            let mut child = XmlNode::new(FIELD).with_attribute("Name", field.name());
            self.write_value(field.kind(), &value, &mut child)?;
            node.children.push(child);
        }
        Ok(node)
    }
}

/// Input context handed to serializers while reading XML
pub struct XmlReader<'r> {
    registry: &'r Registry,
    depth: usize,
    max_depth: usize,
}

impl<'r> XmlReader<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            depth: 0,
            max_depth: registry.config().max_archive_depth,
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Read the value held by `node` using the serializer registered for `kind`
    pub fn read_value(&mut self, kind: &DataKind, node: &XmlNode) -> Result<Value> {
        let data = self.registry.serializer_for(kind)?;
        data.read_xml(self, kind, node)
    }

    /// Read an `<Object>` node, `None` for `<Null/>`
    pub fn read_element(&mut self, node: &XmlNode) -> Result<Option<ObjectPtr>> {
        if node.name == NULL {
            return Ok(None);
        }
        if node.name != OBJECT {
            return Err(ReflectError::xml(format!("expected <{}>, found <{}>", OBJECT, node.name)));
        }
        if self.depth >= self.max_depth {
            return Err(ReflectError::DepthExceeded(self.max_depth));
        }

        self.depth += 1;
        let result = self.read_object(node);
        self.depth -= 1;
        result.map(Some)
    }

    fn read_object(&mut self, node: &XmlNode) -> Result<ObjectPtr> {
        let type_name = node
            .attribute("Type")
            .ok_or_else(|| ReflectError::xml("<Object> without a Type attribute"))?;
        let class = self
            .registry
            .resolve_class(type_name)
            .ok_or_else(|| ReflectError::UnknownType(type_name.to_string()))?;
        let mut object = self
            .registry
            .create_instance_of(&class)
            .ok_or_else(|| ReflectError::NotCreatable(type_name.to_string()))?;

        for child in node.children_named(FIELD) {
            let Some(name) = child.attribute("Name") else {
                log::warn!("Skipping <Field> without a Name in '{}'", type_name);
                continue;
            };
            let Some(field) = class.find_field_by_name(name) else {
                log::warn!("Skipping unknown field '{}' of '{}'", name, type_name);
                continue;
            };

            let applied = self
                .read_value(field.kind(), child)
                .and_then(|value| field.set(&mut *object, value));
            match applied {
                Ok(()) => {}
                Err(e @ ReflectError::DepthExceeded(_)) => {
                    self.registry.release(object);
                    return Err(e);
                }
                Err(e) => log::warn!("Keeping the default of {}::{}: {}", type_name, name, e),
            }
        }

        if self.depth > 1 {
            object.post_deserialize_object();
        }
        Ok(object)
    }
}

/// Render objects as an XML archive document
pub fn write(
    registry: &Registry,
    objects: &[&dyn Object],
    version: &Version,
    sink: Option<&mut dyn StatusSink>,
) -> Result<String> {
    let mut progress = Progress::new(sink);
    progress.state(ArchiveState::Starting, 0);

    let mut writer = XmlWriter::new(registry);
    let mut root = XmlNode::new(ROOT).with_attribute("FormatVersion", &CURRENT_FORMAT.to_string());
    root.children.push(writer.write_element(Some(version as &dyn Object))?);
    for (index, object) in objects.iter().enumerate() {
        root.children.push(writer.write_element(Some(*object))?);
        progress.element(index + 1, objects.len());
    }

    progress.state(ArchiveState::PostProcessing, 100);
    let document = root.to_document()?;
    progress.state(ArchiveState::Complete, 100);
    Ok(document)
}

/// Parse an XML archive document
pub fn read(registry: &Registry, text: &str, sink: Option<&mut dyn StatusSink>) -> Result<ArchiveContents> {
    let root = XmlNode::parse(text)?;
    if root.name != ROOT {
        return Err(ReflectError::xml(format!("expected <{}> root, found <{}>", ROOT, root.name)));
    }
    if let Some(format) = root.attribute("FormatVersion") {
        let found: u32 = format
            .trim()
            .parse()
            .map_err(|_| ReflectError::xml(format!("invalid FormatVersion '{}'", format)))?;
        if found > CURRENT_FORMAT {
            return Err(ReflectError::UnsupportedVersion {
                found,
                current: CURRENT_FORMAT,
            });
        }
    }

    let mut progress = Progress::new(sink);
    progress.state(ArchiveState::Starting, 0);

    let mut records = root.children.iter().filter(|c| c.name == OBJECT || c.name == NULL);
    let mut reader = XmlReader::new(registry);

    let record = match records.next() {
        Some(node) => reader.read_element(node)?,
        None => None,
    };
    let version = take_version(registry, record)?;

    let records: Vec<&XmlNode> = records.collect();
    let total = records.len();
    let mut contents = ArchiveContents::new(version);

    for (index, node) in records.into_iter().enumerate() {
        match reader.read_element(node) {
            Ok(Some(element)) => contents.elements.push(element),
            Ok(None) => log::debug!("Null top-level element {}", index),
            Err(error) if !error.is_structural() => {
                let failure = ElementFailure {
                    index,
                    type_name: node.attribute("Type").unwrap_or_default().to_string(),
                    error,
                };
                progress.exception(&failure);
                contents.failures.push(failure);
            }
            Err(error) => return Err(error),
        }
        progress.element(index + 1, total);
    }

    finish(&mut contents, &mut progress);
    Ok(contents)
}

/// Render objects as an XML string tagged with the current version
pub fn to_string(registry: &Registry, objects: &[&dyn Object]) -> Result<String> {
    write(registry, objects, &Version::current(), None)
}

/// Parse an XML string produced by [`to_string`]
pub fn from_string(registry: &Registry, text: &str) -> Result<ArchiveContents> {
    read(registry, text, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_round_trip() {
        let mut root = XmlNode::new("Root").with_attribute("Kind", "a<b & \"c\"");
        let mut leaf = XmlNode::new("Leaf");
        leaf.text = "  padded <text>  ".to_string();
        root.children.push(leaf);
        root.children.push(XmlNode::new("Empty"));

        let text = root.to_document().unwrap();
        let parsed = XmlNode::parse(&text).unwrap();
        assert_eq!(parsed.attribute("Kind"), Some("a<b & \"c\""));
        assert_eq!(parsed.child("Leaf").unwrap().text, "  padded <text>  ");
        assert!(parsed.child("Empty").unwrap().text.is_empty());
        assert_eq!(parsed.children.len(), 2);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(XmlNode::parse("<a><b></a>").is_err());
        assert!(XmlNode::parse("").is_err());
        assert!(XmlNode::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_wrong_root_rejected() {
        let registry = Registry::default();
        assert!(matches!(read(&registry, "<Other/>", None), Err(ReflectError::Xml(_))));
    }
}
