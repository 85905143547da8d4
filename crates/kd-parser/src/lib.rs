mod po;
mod xml;

pub use po::{
    parse_po_document, parse_po_file, write_po_document, PoDocument, PoEntry, PoOccurrence,
};
pub use xml::{
    escape_xml, parse_xml_document, parse_xml_file, read_xml_file, XmlDocument, XmlElementNode,
    XmlNode, XmlTextNode,
};
