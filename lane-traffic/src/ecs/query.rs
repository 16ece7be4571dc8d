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
//! Chunk queries by required and excluded component kinds

use crate::ecs::component::{Component, ComponentKind, Signature};

/// Filter selecting the chunks whose signature contains every required
/// kind and none of the excluded ones
///
/// # Examples
///
/// ```
/// use lane_traffic::ecs::Query;
/// use lane_traffic::ecs::components::Position;
/// use lane_traffic::traffic::components::{Car, Hero};
///
/// let street_cars = Query::new().with::<Car>().with::<Position>().without::<Hero>();
/// assert_eq!(street_cars.required().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Query {
    required: Signature,
    excluded: Signature,
}

impl Query {
    /// Create a query that matches every chunk
    pub fn new() -> Self {
        Self::default()
    }

    /// Require component `T`
    pub fn with<T: Component>(mut self) -> Self {
        self.required.insert(ComponentKind::of::<T>());
        self
    }

    /// Exclude chunks that carry component `T`
    pub fn without<T: Component>(mut self) -> Self {
        self.excluded.insert(ComponentKind::of::<T>());
        self
    }

    /// Required kinds
    pub fn required(&self) -> &Signature {
        &self.required
    }

    /// Excluded kinds
    pub fn excluded(&self) -> &Signature {
        &self.excluded
    }

    /// Check a signature against this filter
    pub fn matches(&self, signature: &Signature) -> bool {
        signature.contains_all(&self.required) && !signature.intersects(&self.excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    impl Component for A {}
    struct B;
    impl Component for B {}
    struct C;
    impl Component for C {}

    #[test]
    fn test_required_and_excluded() {
        let query = Query::new().with::<A>().without::<C>();
        let ab = Signature::from_kinds([ComponentKind::of::<A>(), ComponentKind::of::<B>()]);
        let ac = Signature::from_kinds([ComponentKind::of::<A>(), ComponentKind::of::<C>()]);
        let b = Signature::from_kinds([ComponentKind::of::<B>()]);

        assert!(query.matches(&ab));
        assert!(!query.matches(&ac));
        assert!(!query.matches(&b));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let query = Query::new();
        assert!(query.matches(&Signature::new()));
        assert!(query.matches(&Signature::from_kinds([ComponentKind::of::<B>()])));
    }
}
