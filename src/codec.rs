//! XML codec
//!
//! Entities implement [`FieldSet`] and the codec writes them by walking their
//! descriptor table, enforcing each field's multiplicity on the way. Reading
//! goes through [`XmlDocument`] and the small helpers at the bottom of this
//! module.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::document::{XmlDocument, XmlElement, XmlFragment};
use crate::envelope::Envelope;
use crate::error::{OaiError, Result};
use crate::fields::{FieldDescriptor, FieldValue};

pub const OAI_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const OAI_SCHEMA_LOCATION: &str =
    "http://www.openarchives.org/OAI/2.0/ http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd";

pub type XmlWriter = Writer<Vec<u8>>;

/// Anything that serializes itself as XML elements
pub trait WriteElement {
    fn write_element(&self, writer: &mut XmlWriter) -> Result<()>;
}

/// An element whose content is described by a static descriptor table
pub trait FieldSet: Sized + 'static {
    /// Element name
    const TAG: &'static str;

    /// Fields in wire order
    fn descriptors() -> &'static [FieldDescriptor<Self>];

    /// Attributes written on the element itself
    fn attributes(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Cross-field invariants checked before anything is written
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: FieldSet> WriteElement for T {
    fn write_element(&self, writer: &mut XmlWriter) -> Result<()> {
        self.check()?;

        let mut start = BytesStart::new(T::TAG);
        for (name, value) in self.attributes() {
            start.push_attribute((name, value.as_str()));
        }
        writer.write_event(Event::Start(start))?;
        write_fields(self, writer)?;
        writer.write_event(Event::End(BytesEnd::new(T::TAG)))?;
        Ok(())
    }
}

/// Checks every field of `entity` against its multiplicity without writing anything
pub fn check_cardinality<T: FieldSet>(entity: &T) -> Result<()> {
    for descriptor in T::descriptors() {
        check_field(descriptor, &descriptor.value(entity))?;
    }
    Ok(())
}

fn check_field<T: FieldSet>(descriptor: &FieldDescriptor<T>, value: &FieldValue<'_>) -> Result<()> {
    let found = value.count();
    if descriptor.multiplicity.admits(found) {
        return Ok(());
    }
    let multiplicity = descriptor.multiplicity;
    if found == 0 && multiplicity.is_required() && !multiplicity.is_plural() {
        return Err(OaiError::MissingRequiredField {
            element: T::TAG,
            field: descriptor.name,
        });
    }
    Err(OaiError::CardinalityViolation {
        element: T::TAG,
        field: descriptor.name,
        expected: descriptor.multiplicity,
        found,
    })
}

fn write_fields<T: FieldSet>(entity: &T, writer: &mut XmlWriter) -> Result<()> {
    for descriptor in T::descriptors() {
        let value = descriptor.value(entity);
        check_field(descriptor, &value)?;

        match value {
            FieldValue::Text(None) => {}
            FieldValue::Text(Some(text)) => write_text_element(writer, descriptor.name, text)?,
            FieldValue::Texts(items) => {
                for text in items {
                    write_text_element(writer, descriptor.name, text)?;
                }
            }
            FieldValue::Fragments(items) => {
                for fragment in items {
                    write_fragment_element(writer, descriptor.name, fragment)?;
                }
            }
            FieldValue::Elements(items) => {
                for item in items {
                    item.write_element(writer)?;
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Writes `<name>` wrapping an opaque fragment, copied through unescaped
pub(crate) fn write_fragment_element(
    writer: &mut XmlWriter,
    name: &str,
    fragment: &XmlFragment,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(fragment.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Serializes a full `OAI-PMH` document: envelope header followed by `body`
pub fn encode_document(envelope: &Envelope, body: &dyn WriteElement) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("OAI-PMH");
    root.push_attribute(("xmlns", OAI_NAMESPACE));
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    root.push_attribute(("xsi:schemaLocation", OAI_SCHEMA_LOCATION));
    writer.write_event(Event::Start(root))?;

    envelope.write(&mut writer)?;
    body.write_element(&mut writer)?;

    writer.write_event(Event::End(BytesEnd::new("OAI-PMH")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| OaiError::malformed(format!("encoder produced invalid UTF-8: {e}")))
}

// Decoding helpers

/// Trimmed text of the single OAI child `name`
pub(crate) fn required_text(parent: &XmlElement, name: &str) -> Result<String> {
    Ok(parent.exactly_one(OAI_NAMESPACE, name)?.text().to_string())
}

/// Trimmed text of the OAI child `name`, if present
pub(crate) fn optional_text(parent: &XmlElement, name: &str) -> Result<Option<String>> {
    Ok(parent
        .at_most_one(OAI_NAMESPACE, name)?
        .map(|child| child.text().to_string()))
}

/// Trimmed texts of every OAI child `name`, in document order
pub(crate) fn all_texts(parent: &XmlElement, name: &str) -> Vec<String> {
    parent
        .children_named(OAI_NAMESPACE, name)
        .map(|child| child.text().to_string())
        .collect()
}

/// Payload fragments of every OAI wrapper child `name`, in document order
pub(crate) fn all_fragments(
    doc: &XmlDocument,
    parent: &XmlElement,
    name: &str,
) -> Result<Vec<XmlFragment>> {
    parent
        .children_named(OAI_NAMESPACE, name)
        .map(|wrapper| doc.fragment_of(wrapper))
        .collect()
}
