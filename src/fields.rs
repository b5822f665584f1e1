//! Field model
//!
//! Every verb entity publishes a closed table of [`FieldDescriptor`]s. The
//! table fixes each field's element name, its [`Multiplicity`] and an accessor,
//! and the codec walks it in order to serialize the body and enforce
//! cardinality. Multiplicity is also carried by the field types themselves:
//! singular fields are plain values, plural fields are [`RequiredPlural`] or
//! [`OptionalPlural`].

use std::fmt;

use serde::Serialize;

use crate::codec::WriteElement;
use crate::document::XmlFragment;

/// Cardinality contract of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Multiplicity {
    /// Exactly one
    RequiredSingular,
    /// Zero or one
    OptionalSingular,
    /// One or more
    RequiredPlural,
    /// Zero or more
    OptionalPlural,
}

impl Multiplicity {
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Multiplicity::RequiredSingular | Multiplicity::RequiredPlural
        )
    }

    pub fn is_plural(self) -> bool {
        matches!(
            self,
            Multiplicity::RequiredPlural | Multiplicity::OptionalPlural
        )
    }

    /// Whether `count` occurrences satisfy this multiplicity
    pub fn admits(self, count: usize) -> bool {
        match self {
            Multiplicity::RequiredSingular => count == 1,
            Multiplicity::OptionalSingular => count <= 1,
            Multiplicity::RequiredPlural => count >= 1,
            Multiplicity::OptionalPlural => true,
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Multiplicity::RequiredSingular => "exactly one",
            Multiplicity::OptionalSingular => "at most one",
            Multiplicity::RequiredPlural => "one or more",
            Multiplicity::OptionalPlural => "zero or more",
        })
    }
}

/// Ordered, append-only sequence backing a plural field.
///
/// `REQUIRED` selects the multiplicity class; use the [`RequiredPlural`] and
/// [`OptionalPlural`] aliases. Entries can only be appended, so insertion
/// order is serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Plural<T, const REQUIRED: bool> {
    items: Vec<T>,
}

/// One-or-more field
pub type RequiredPlural<T> = Plural<T, true>;

/// Zero-or-more field
pub type OptionalPlural<T> = Plural<T, false>;

impl<T, const REQUIRED: bool> Plural<T, REQUIRED> {
    pub const MULTIPLICITY: Multiplicity = if REQUIRED {
        Multiplicity::RequiredPlural
    } else {
        Multiplicity::OptionalPlural
    };

    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the current contents satisfy the multiplicity class
    pub fn is_satisfied(&self) -> bool {
        Self::MULTIPLICITY.admits(self.items.len())
    }
}

impl<T, const REQUIRED: bool> Default for Plural<T, REQUIRED> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const REQUIRED: bool> Extend<T> for Plural<T, REQUIRED> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl<T, const REQUIRED: bool> FromIterator<T> for Plural<T, REQUIRED> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T, const REQUIRED: bool> IntoIterator for &'a Plural<T, REQUIRED> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Borrowed view of a field's current value, as produced by a descriptor accessor
pub enum FieldValue<'a> {
    /// Singular text element; `None` when not (yet) known
    Text(Option<&'a str>),
    /// Repeated text elements
    Texts(&'a [String]),
    /// Wrapper elements each holding one opaque XML fragment
    Fragments(&'a [XmlFragment]),
    /// Structured child elements that write themselves
    Elements(Vec<&'a dyn WriteElement>),
}

impl<'a> FieldValue<'a> {
    /// Structured children, one element per item
    pub fn elements<E: WriteElement>(items: &'a [E]) -> Self {
        FieldValue::Elements(items.iter().map(|item| item as &dyn WriteElement).collect())
    }

    /// A structured child that may be absent
    pub fn element<E: WriteElement>(item: Option<&'a E>) -> Self {
        FieldValue::Elements(item.map(|item| item as &dyn WriteElement).into_iter().collect())
    }

    /// Number of elements this value serializes to
    pub fn count(&self) -> usize {
        match self {
            FieldValue::Text(value) => usize::from(value.is_some()),
            FieldValue::Texts(items) => items.len(),
            FieldValue::Fragments(items) => items.len(),
            FieldValue::Elements(items) => items.len(),
        }
    }
}

/// Static description of one field of an entity
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub multiplicity: Multiplicity,
    pub accessor: fn(&T) -> FieldValue<'_>,
}

impl<T> FieldDescriptor<T> {
    pub const fn new(
        name: &'static str,
        multiplicity: Multiplicity,
        accessor: fn(&T) -> FieldValue<'_>,
    ) -> Self {
        Self {
            name,
            multiplicity,
            accessor,
        }
    }

    pub fn value<'a>(&self, entity: &'a T) -> FieldValue<'a> {
        (self.accessor)(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicity_admits() {
        assert!(Multiplicity::RequiredSingular.admits(1));
        assert!(!Multiplicity::RequiredSingular.admits(0));
        assert!(!Multiplicity::RequiredSingular.admits(2));

        assert!(Multiplicity::OptionalSingular.admits(0));
        assert!(!Multiplicity::OptionalSingular.admits(2));

        assert!(!Multiplicity::RequiredPlural.admits(0));
        assert!(Multiplicity::RequiredPlural.admits(7));

        assert!(Multiplicity::OptionalPlural.admits(0));
    }

    #[test]
    fn test_multiplicity_classes() {
        assert!(Multiplicity::RequiredSingular.is_required());
        assert!(!Multiplicity::RequiredSingular.is_plural());
        assert!(Multiplicity::RequiredPlural.is_required());
        assert!(Multiplicity::RequiredPlural.is_plural());
        assert!(!Multiplicity::OptionalSingular.is_required());
        assert!(Multiplicity::OptionalPlural.is_plural());
        assert!(!Multiplicity::OptionalPlural.is_required());
    }

    #[test]
    fn test_plural_is_append_only_and_ordered() {
        let mut emails: RequiredPlural<String> = RequiredPlural::new();
        assert!(!emails.is_satisfied());

        emails.push("a@example.org".to_string());
        emails.push("b@example.org".to_string());
        emails.push("a@example.org".to_string());

        assert!(emails.is_satisfied());
        assert_eq!(
            emails.as_slice(),
            ["a@example.org", "b@example.org", "a@example.org"]
        );
    }

    #[test]
    fn test_plural_multiplicity_constants() {
        assert_eq!(
            RequiredPlural::<String>::MULTIPLICITY,
            Multiplicity::RequiredPlural
        );
        assert_eq!(
            OptionalPlural::<String>::MULTIPLICITY,
            Multiplicity::OptionalPlural
        );
        assert!(OptionalPlural::<String>::new().is_satisfied());
    }

    #[test]
    fn test_field_value_count() {
        let items = vec!["x".to_string(), "y".to_string()];
        assert_eq!(FieldValue::Text(None).count(), 0);
        assert_eq!(FieldValue::Text(Some("v")).count(), 1);
        assert_eq!(FieldValue::Texts(&items).count(), 2);
        assert_eq!(FieldValue::Elements(Vec::new()).count(), 0);
    }
}
