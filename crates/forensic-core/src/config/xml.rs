//! Árbol XML mínimo para los documentos de configuración.
//!
//! Se parsea el documento completo a `ConfigElement` (nombre, atributos,
//! hijos) con `quick_xml::Reader`; cada sub-árbol puede re-serializarse con
//! `quick_xml::Writer` para entregarlo a un pipeline como string
//! independiente.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::CoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNode {
    Element(ConfigElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<ConfigNode>,
}

fn xml_err(e: impl std::fmt::Display) -> CoreError { CoreError::Xml(e.to_string()) }

fn element_from_start(e: &BytesStart<'_>) -> Result<ConfigElement, CoreError> {
    let name = String::from_utf8(e.name().as_ref().to_vec()).map_err(xml_err)?;
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = String::from_utf8(attr.key.as_ref().to_vec()).map_err(xml_err)?;
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        attributes.push((key, value));
    }
    Ok(ConfigElement { name, attributes, children: Vec::new() })
}

impl ConfigElement {
    /// Parsea un documento y devuelve su elemento raíz.
    pub fn parse(xml: &str) -> Result<ConfigElement, CoreError> {
        let mut reader = Reader::from_reader(xml.as_bytes());
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut stack: Vec<ConfigElement> = Vec::new();
        let mut root: Option<ConfigElement> = None;

        loop {
            match reader.read_event_into(&mut buf).map_err(xml_err)? {
                Event::Start(ref e) => stack.push(element_from_start(e)?),
                Event::Empty(ref e) => {
                    let el = element_from_start(e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(ConfigNode::Element(el)),
                        None if root.is_none() => root = Some(el),
                        None => return Err(CoreError::Xml("multiple root elements".into())),
                    }
                }
                Event::End(_) => {
                    let el = stack.pop()
                                  .ok_or_else(|| CoreError::Xml("unbalanced end tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(ConfigNode::Element(el)),
                        None if root.is_none() => root = Some(el),
                        None => return Err(CoreError::Xml("multiple root elements".into())),
                    }
                }
                Event::Text(ref t) => {
                    let text = t.unescape().map_err(xml_err)?.into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(ConfigNode::Text(text));
                    } else if !text.trim().is_empty() {
                        return Err(CoreError::Xml("text outside of root element".into()));
                    }
                }
                Event::CData(ref c) => {
                    let text = String::from_utf8(c.to_vec()).map_err(xml_err)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(ConfigNode::Text(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(CoreError::Xml(format!("unclosed element <{}>", stack[stack.len() - 1].name)));
        }
        root.ok_or_else(|| CoreError::Xml("document has no root element".into()))
    }

    /// Valor de un atributo (nombre exacto).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn is_named(&self, name: &str) -> bool { self.name.eq_ignore_ascii_case(name) }

    pub fn child_elements(&self) -> impl Iterator<Item = &ConfigElement> {
        self.children.iter().filter_map(|c| match c {
                                           ConfigNode::Element(e) => Some(e),
                                           ConfigNode::Text(_) => None,
                                       })
    }

    /// Todos los descendientes (incluido `self`) con ese nombre, en orden de
    /// documento. La comparación ignora mayúsculas.
    pub fn find_all(&self, name: &str) -> Vec<&ConfigElement> {
        let mut out = Vec::new();
        self.collect(name, &mut out);
        out
    }

    fn collect<'a>(&'a self, name: &str, out: &mut Vec<&'a ConfigElement>) {
        if self.is_named(name) {
            out.push(self);
        }
        for child in self.child_elements() {
            child.collect(name, out);
        }
    }

    /// Texto directo del elemento (concatenado y recortado).
    pub fn text(&self) -> String {
        let mut s = String::new();
        for c in &self.children {
            if let ConfigNode::Text(t) = c {
                s.push_str(t);
            }
        }
        s.trim().to_string()
    }

    /// Serializa el sub-árbol como documento XML autónomo.
    pub fn to_xml_string(&self) -> Result<String, CoreError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_to(&mut writer)?;
        String::from_utf8(writer.into_inner().into_inner()).map_err(xml_err)
    }

    fn write_to(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<(), CoreError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attributes {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(xml_err);
        }
        writer.write_event(Event::Start(start)).map_err(xml_err)?;
        for child in &self.children {
            match child {
                ConfigNode::Element(e) => e.write_to(writer)?,
                ConfigNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t))).map_err(xml_err)?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str()))).map_err(xml_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<PIPELINE_CONFIG>
  <PIPELINE type="FileAnalysis">
    <MODULE order="1" type="executable" location="/bin/sh" arguments="-c &quot;x&quot; @FILE"/>
  </PIPELINE>
  <pipeline type="Report"></pipeline>
</PIPELINE_CONFIG>"#;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let root = ConfigElement::parse(DOC).unwrap();
        assert_eq!(root.name, "PIPELINE_CONFIG");
        let pipelines = root.find_all("PIPELINE");
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].attribute("type"), Some("FileAnalysis"));
        let modules = pipelines[0].find_all("module");
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].attribute("arguments"), Some("-c \"x\" @FILE"));
    }

    #[test]
    fn subtree_survives_reserialization() {
        let root = ConfigElement::parse(DOC).unwrap();
        let first = root.find_all("PIPELINE")[0];
        let xml = first.to_xml_string().unwrap();
        let reparsed = ConfigElement::parse(&xml).unwrap();
        assert_eq!(&reparsed, first);
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(ConfigElement::parse("").is_err());
        assert!(ConfigElement::parse("<a><b></a>").is_err());
        assert!(ConfigElement::parse("<a>").is_err());
        assert!(ConfigElement::parse("<a/><b/>").is_err());
    }

    #[test]
    fn text_content() {
        let root = ConfigElement::parse("<X><OUT_DIR> /tmp/out </OUT_DIR></X>").unwrap();
        assert_eq!(root.find_all("OUT_DIR")[0].text(), "/tmp/out");
    }
}
