use super::registry::Field;
use super::value::MetaValue;

/// Pending, unsaved edits of one image, in first-write order.
///
/// A field is present only after it has been written; rewriting a field
/// replaces its value but keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    entries: Vec<(&'static Field, MetaValue)>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &'static Field, value: MetaValue) {
        match self.entries.iter_mut().find(|(f, _)| f.key == field.key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries
            .iter()
            .find(|(field, _)| field.key == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static Field, &MetaValue)> {
        self.entries.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::registry::lookup;

    #[test]
    fn rewrite_keeps_position() {
        let mut overlay = Overlay::new();
        overlay.set(lookup("city").unwrap(), "A".into());
        overlay.set(lookup("country").unwrap(), "B".into());
        overlay.set(lookup("city").unwrap(), "C".into());

        let order: Vec<_> = overlay.iter().map(|(f, v)| (f.key, v.clone())).collect();
        assert_eq!(
            order,
            vec![("city", MetaValue::from("C")), ("country", MetaValue::from("B"))]
        );
        assert_eq!(overlay.len(), 2);
    }

    #[test]
    fn absent_until_written() {
        let mut overlay = Overlay::new();
        assert!(overlay.is_empty());
        assert_eq!(overlay.get("city"), None);

        overlay.set(lookup("city").unwrap(), "".into());
        assert_eq!(overlay.get("city"), Some(&MetaValue::from("")));
    }
}
