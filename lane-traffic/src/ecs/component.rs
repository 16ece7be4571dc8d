// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Component kinds, signatures and type-erased column storage
//!
//! Components are plain data attached to entities. Every concrete component
//! type registers itself statically by implementing [`Component`]; its
//! [`ComponentKind`] is derived from the type at compile time, so no runtime
//! reflection is needed to build archetypes or route values to columns.

use std::any::{Any, TypeId};
use std::fmt;

/// Trait that all components must implement
///
/// Components should be plain data structures without behavior.
/// Keep components small and focused for better cache performance.
pub trait Component: 'static + Send + Sync {}

/// Identifies a component type inside signatures, queries and access sets
#[derive(Clone, Copy)]
pub struct ComponentKind {
    id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    /// Kind of the component type `T`
    pub fn of<T: Component>() -> Self {
        ComponentKind {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name, for diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Short type name without the module path
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentKind {}

impl std::hash::Hash for ComponentKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for ComponentKind {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentKind {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Sorted, duplicate-free set of component kinds
///
/// Archetypes are keyed by their signature; queries match against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    kinds: Vec<ComponentKind>,
}

impl Signature {
    /// Create an empty signature
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a signature from arbitrary kinds
    pub fn from_kinds<I: IntoIterator<Item = ComponentKind>>(kinds: I) -> Self {
        let mut kinds: Vec<ComponentKind> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        Signature { kinds }
    }

    /// Check whether the kind is part of this signature
    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.kinds.binary_search(&kind).is_ok()
    }

    /// Check whether every kind of `other` is part of this signature
    pub fn contains_all(&self, other: &Signature) -> bool {
        other.kinds.iter().all(|k| self.contains(*k))
    }

    /// Check whether this signature shares any kind with `other`
    pub fn intersects(&self, other: &Signature) -> bool {
        other.kinds.iter().any(|k| self.contains(*k))
    }

    /// Copy of this signature with `kind` added
    pub fn with(&self, kind: ComponentKind) -> Signature {
        let mut next = self.clone();
        next.insert(kind);
        next
    }

    /// Copy of this signature with `kind` removed
    pub fn without(&self, kind: ComponentKind) -> Signature {
        let mut next = self.clone();
        if let Ok(pos) = next.kinds.binary_search(&kind) {
            next.kinds.remove(pos);
        }
        next
    }

    /// Add a kind in place
    pub fn insert(&mut self, kind: ComponentKind) {
        if let Err(pos) = self.kinds.binary_search(&kind) {
            self.kinds.insert(pos, kind);
        }
    }

    /// Position of a kind in sorted order
    pub fn position(&self, kind: ComponentKind) -> Option<usize> {
        self.kinds.binary_search(&kind).ok()
    }

    /// Kinds in sorted order
    pub fn kinds(&self) -> &[ComponentKind] {
        &self.kinds
    }

    /// Number of kinds
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// True for the empty signature
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Constructor for an empty column of a given component type
pub(crate) type ColumnFactory = fn(usize) -> Box<dyn Column>;

/// Type-erased dense array of one component kind inside a chunk
pub(crate) trait Column: Any + Send + Sync {
    fn len(&self) -> usize;

    /// Remove `row`, moving the last element into its place
    fn swap_remove(&mut self, row: usize);

    /// Swap-remove `row` and append the value to `dst`, which must hold
    /// the same component type
    fn move_row(&mut self, row: usize, dst: &mut dyn Column);

    /// Append a boxed value; hands it back if the type does not match
    fn push_boxed(&mut self, value: Box<dyn Any + Send>) -> Result<(), Box<dyn Any + Send>>;

    /// Overwrite `row` with a boxed value; hands it back on type mismatch
    fn replace_boxed(&mut self, row: usize, value: Box<dyn Any + Send>) -> Result<(), Box<dyn Any + Send>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Concrete column storing `T` contiguously
pub(crate) struct TypedColumn<T> {
    pub(crate) items: Vec<T>,
}

impl<T: Component> TypedColumn<T> {
    pub(crate) fn boxed(capacity: usize) -> Box<dyn Column> {
        Box::new(TypedColumn::<T> {
            items: Vec::with_capacity(capacity),
        })
    }
}

impl<T: Component> Column for TypedColumn<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn swap_remove(&mut self, row: usize) {
        self.items.swap_remove(row);
    }

    fn move_row(&mut self, row: usize, dst: &mut dyn Column) {
        let value = self.items.swap_remove(row);
        match dst.as_any_mut().downcast_mut::<TypedColumn<T>>() {
            Some(target) => target.items.push(value),
            None => debug_assert!(false, "column type mismatch while moving {}", std::any::type_name::<T>()),
        }
    }

    fn push_boxed(&mut self, value: Box<dyn Any + Send>) -> Result<(), Box<dyn Any + Send>> {
        let value = value.downcast::<T>()?;
        self.items.push(*value);
        Ok(())
    }

    fn replace_boxed(&mut self, row: usize, value: Box<dyn Any + Send>) -> Result<(), Box<dyn Any + Send>> {
        let value = value.downcast::<T>()?;
        self.items[row] = *value;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A single component value waiting to be written into a column
pub struct ComponentValue {
    pub(crate) kind: ComponentKind,
    pub(crate) value: Box<dyn Any + Send>,
    pub(crate) factory: ColumnFactory,
}

impl ComponentValue {
    /// Wrap a concrete component
    pub fn new<T: Component>(component: T) -> Self {
        ComponentValue {
            kind: ComponentKind::of::<T>(),
            value: Box::new(component),
            factory: TypedColumn::<T>::boxed,
        }
    }

    /// Kind of the wrapped component
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }
}

impl fmt::Debug for ComponentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentValue").field("kind", &self.kind).finish()
    }
}

/// Set of component values spawned together as one entity
///
/// # Examples
///
/// ```
/// use lane_traffic::ecs::Bundle;
/// use lane_traffic::ecs::components::Position;
///
/// let bundle = Bundle::new().with(Position::new(0.0, 0.0, 5.0));
/// assert_eq!(bundle.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Bundle {
    values: Vec<ComponentValue>,
}

impl Bundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component, replacing an earlier value of the same kind
    pub fn with<T: Component>(mut self, component: T) -> Self {
        self.push(ComponentValue::new(component));
        self
    }

    /// Add an already wrapped value, replacing one of the same kind
    pub fn push(&mut self, value: ComponentValue) {
        match self.values.iter_mut().find(|v| v.kind == value.kind) {
            Some(existing) => *existing = value,
            None => self.values.push(value),
        }
    }

    /// Signature of the entity this bundle would create
    pub fn signature(&self) -> Signature {
        Signature::from_kinds(self.values.iter().map(|v| v.kind))
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the bundle holds no components
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_values(self) -> Vec<ComponentValue> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Speed(f64);
    impl Component for Speed {}

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Tag;
    impl Component for Tag {}

    #[test]
    fn test_signature_is_order_independent() {
        let a = Signature::from_kinds([ComponentKind::of::<Speed>(), ComponentKind::of::<Tag>()]);
        let b = Signature::from_kinds([ComponentKind::of::<Tag>(), ComponentKind::of::<Speed>()]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_signature_with_without() {
        let base = Signature::from_kinds([ComponentKind::of::<Speed>()]);
        let tagged = base.with(ComponentKind::of::<Tag>());
        assert!(tagged.contains(ComponentKind::of::<Tag>()));
        assert!(tagged.contains_all(&base));
        assert_eq!(tagged.without(ComponentKind::of::<Tag>()), base);
    }

    #[test]
    fn test_bundle_replaces_duplicate_kind() {
        let bundle = Bundle::new().with(Speed(1.0)).with(Speed(2.0));
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn test_column_rejects_wrong_type() {
        let mut column = TypedColumn::<Speed>::boxed(4);
        assert!(column.push_boxed(Box::new(Speed(3.0))).is_ok());
        assert!(column.push_boxed(Box::new(Tag)).is_err());
        assert_eq!(column.len(), 1);
    }

    #[test]
    fn test_column_move_row() {
        let mut src = TypedColumn::<Speed>::boxed(4);
        let mut dst = TypedColumn::<Speed>::boxed(4);
        src.push_boxed(Box::new(Speed(1.0))).unwrap();
        src.push_boxed(Box::new(Speed(2.0))).unwrap();
        src.move_row(0, dst.as_mut());

        let src_items = &src.as_any().downcast_ref::<TypedColumn<Speed>>().unwrap().items;
        let dst_items = &dst.as_any().downcast_ref::<TypedColumn<Speed>>().unwrap().items;
        assert_eq!(src_items, &vec![Speed(2.0)]);
        assert_eq!(dst_items, &vec![Speed(1.0)]);
    }
}
