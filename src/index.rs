//! The indirect-object arena of a document being exported.
//!
//! A [`DocumentIndex`] owns every indirect object of one export together with
//! the counter that hands out new object numbers. It is created once per
//! export, mutated through `&mut` while outlines are assembled, and consumed
//! by the serializer.

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef, MAX_OBJECT_NUMBER};
use indexmap::IndexMap;

/// Mapping from object reference to indirect object.
///
/// Iteration follows insertion order, which makes serialized output
/// deterministic.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    objects: IndexMap<ObjectRef, Object>,
    /// Next object number handed out by [`DocumentIndex::allocate`]
    next_number: u32,
}

impl DocumentIndex {
    /// Create an empty index. The first allocated object is `1 0 R`.
    pub fn new() -> Self {
        Self {
            objects: IndexMap::new(),
            next_number: 1,
        }
    }

    /// Reserve a fresh object reference without storing an object yet.
    ///
    /// The outline assembler uses this to wire up forward links before the
    /// target dictionaries exist.
    ///
    /// Fails with [`Error::ObjectNumberOutOfRange`] once the numbers above
    /// [`MAX_OBJECT_NUMBER`] would be needed.
    pub fn allocate(&mut self) -> Result<ObjectRef> {
        let number = self.next_number;
        if number > MAX_OBJECT_NUMBER {
            return Err(Error::ObjectNumberOutOfRange(u64::from(number)));
        }
        self.next_number = number
            .checked_add(1)
            .ok_or(Error::ObjectNumberOutOfRange(u64::from(number)))?;
        Ok(ObjectRef::new(number, 0))
    }

    /// Store `object` under `reference`, replacing any previous value.
    ///
    /// Externally numbered objects (e.g. loaded from a file) bump the
    /// allocation counter past their number so later allocations never collide.
    /// Object number 0 and numbers above [`MAX_OBJECT_NUMBER`] are rejected.
    pub fn assign(&mut self, reference: ObjectRef, object: Object) -> Result<()> {
        if reference.id == 0 || reference.id > MAX_OBJECT_NUMBER {
            return Err(Error::ObjectNumberOutOfRange(u64::from(reference.id)));
        }
        if reference.id >= self.next_number {
            self.next_number = reference
                .id
                .checked_add(1)
                .ok_or(Error::ObjectNumberOutOfRange(u64::from(reference.id)))?;
        }
        self.objects.insert(reference, object);
        Ok(())
    }

    /// Allocate a reference and store `object` under it.
    pub fn register(&mut self, object: Object) -> Result<ObjectRef> {
        let reference = self.allocate()?;
        self.objects.insert(reference, object);
        Ok(reference)
    }

    /// Look up an object.
    pub fn get(&self, reference: ObjectRef) -> Option<&Object> {
        self.objects.get(&reference)
    }

    /// Look up an object mutably.
    pub fn get_mut(&mut self, reference: ObjectRef) -> Option<&mut Object> {
        self.objects.get_mut(&reference)
    }

    /// Follow `object` through one level of indirection.
    ///
    /// Direct objects are returned as-is; references resolve against the index.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(r) => self.get(*r),
            other => Some(other),
        }
    }

    /// Whether an object is stored under `reference`.
    pub fn contains(&self, reference: ObjectRef) -> bool {
        self.objects.contains_key(&reference)
    }

    /// Remove an object, keeping the relative order of the others.
    pub fn remove(&mut self, reference: ObjectRef) -> Option<Object> {
        self.objects.shift_remove(&reference)
    }

    /// Iterate objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &Object)> + '_ {
        self.objects.iter().map(|(r, o)| (*r, o))
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the index holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Highest object number stored, or 0 when empty.
    pub fn max_object_number(&self) -> u32 {
        self.objects.keys().map(|r| r.id).max().unwrap_or(0)
    }

    /// The first object whose `/Type` is `/Catalog`.
    pub fn catalog_ref(&self) -> Option<ObjectRef> {
        self.objects
            .iter()
            .find(|(_, obj)| obj.has_type("Catalog"))
            .map(|(r, _)| *r)
    }

    /// References that point at objects missing from the index.
    pub fn dangling_references(&self) -> Vec<(ObjectRef, ObjectRef)> {
        let mut dangling = Vec::new();
        let mut refs = Vec::new();
        for (owner, obj) in &self.objects {
            refs.clear();
            obj.collect_references(&mut refs);
            for target in &refs {
                if !self.objects.contains_key(target) {
                    dangling.push((*owner, *target));
                }
            }
        }
        dangling
    }
}

impl Default for DocumentIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Dictionary;

    fn catalog() -> Object {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::Name("Catalog".to_string()));
        Object::Dictionary(dict)
    }

    #[test]
    fn test_allocate_is_sequential() {
        let mut index = DocumentIndex::new();
        assert_eq!(index.allocate().unwrap(), ObjectRef::new(1, 0));
        assert_eq!(index.allocate().unwrap(), ObjectRef::new(2, 0));
        // Allocation alone stores nothing
        assert!(index.is_empty());
    }

    #[test]
    fn test_assign_bumps_counter() {
        let mut index = DocumentIndex::new();
        index.assign(ObjectRef::new(10, 0), Object::Null).unwrap();
        assert_eq!(index.allocate().unwrap(), ObjectRef::new(11, 0));
    }

    #[test]
    fn test_assign_lower_number_keeps_counter() {
        let mut index = DocumentIndex::new();
        index.assign(ObjectRef::new(10, 0), Object::Null).unwrap();
        index.assign(ObjectRef::new(3, 0), Object::Null).unwrap();
        assert_eq!(index.allocate().unwrap(), ObjectRef::new(11, 0));
        assert_eq!(index.max_object_number(), 10);
    }

    #[test]
    fn test_register_and_get() {
        let mut index = DocumentIndex::new();
        let r = index.register(Object::Integer(7)).unwrap();
        assert_eq!(index.get(r), Some(&Object::Integer(7)));
        assert!(index.contains(r));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut index = DocumentIndex::new();
        index.assign(ObjectRef::new(5, 0), Object::Integer(5)).unwrap();
        index.assign(ObjectRef::new(2, 0), Object::Integer(2)).unwrap();
        index.assign(ObjectRef::new(9, 0), Object::Integer(9)).unwrap();

        let ids: Vec<u32> = index.iter().map(|(r, _)| r.id).collect();
        assert_eq!(ids, vec![5, 2, 9]);

        index.remove(ObjectRef::new(2, 0));
        let ids: Vec<u32> = index.iter().map(|(r, _)| r.id).collect();
        assert_eq!(ids, vec![5, 9]);
    }

    #[test]
    fn test_catalog_ref() {
        let mut index = DocumentIndex::new();
        index.register(Object::Integer(1)).unwrap();
        assert_eq!(index.catalog_ref(), None);
        let cat = index.register(catalog()).unwrap();
        assert_eq!(index.catalog_ref(), Some(cat));
    }

    #[test]
    fn test_resolve() {
        let mut index = DocumentIndex::new();
        let r = index.register(Object::Integer(3)).unwrap();
        let reference = Object::Reference(r);
        assert_eq!(index.resolve(&reference), Some(&Object::Integer(3)));
        let direct = Object::Boolean(true);
        assert_eq!(index.resolve(&direct), Some(&Object::Boolean(true)));
        let missing = Object::Reference(ObjectRef::new(99, 0));
        assert_eq!(index.resolve(&missing), None);
    }

    #[test]
    fn test_dangling_references() {
        let mut index = DocumentIndex::new();
        let a = index.register(Object::Null).unwrap();
        let b = index.register(Object::Array(vec![
            Object::Reference(a),
            Object::Reference(ObjectRef::new(42, 0)),
        ]))
        .unwrap();
        assert_eq!(index.dangling_references(), vec![(b, ObjectRef::new(42, 0))]);
    }

    #[test]
    fn test_object_number_limit() {
        let mut index = DocumentIndex::new();
        assert!(matches!(
            index.assign(ObjectRef::new(u32::MAX, 0), Object::Null),
            Err(Error::ObjectNumberOutOfRange(4294967295))
        ));
        assert!(matches!(
            index.assign(ObjectRef::new(0, 0), Object::Null),
            Err(Error::ObjectNumberOutOfRange(0))
        ));
        assert!(index.is_empty());

        index.assign(ObjectRef::new(MAX_OBJECT_NUMBER, 0), Object::Null).unwrap();
        assert!(matches!(index.allocate(), Err(Error::ObjectNumberOutOfRange(8388608))));
        assert!(index.register(Object::Null).is_err());
        assert_eq!(index.len(), 1);
    }
}
