//! Generic, validated, insertion-ordered collections of named components.
//!
//! [`ComponentSet`] is the structural basis for both the object registry and
//! the stage registry: the collection logic is written once, and the per-type
//! invariants (what counts as a duplicate, which "missing" error to raise)
//! travel with the component type through the [`Component`] trait.

use indexmap::IndexMap;

use crate::error::PipelineError;

/// A named pipeline component that can live in a [`ComponentSet`].
///
/// `validate` is invoked with the *full* candidate set at construction and
/// on every merge, so cross-component invariants (e.g. "no two stages
/// produce the same value") are checked in one place.
pub trait Component: Clone {
    /// Unique name of this component within a set.
    fn name(&self) -> &str;

    /// Validate a full candidate set before it becomes a [`ComponentSet`].
    ///
    /// # Errors
    ///
    /// Returns the component type's duplicate-error kind when the candidate
    /// set violates an invariant.
    fn validate(candidates: &[Self]) -> Result<(), PipelineError>;

    /// Build the component type's missing-error kind for a failed lookup.
    fn missing_error(names: Vec<String>) -> PipelineError;
}

/// Validated, name-keyed, insertion-ordered collection of components.
///
/// All mutating operations preserve value semantics: [`ComponentSet::with`],
/// [`ComponentSet::add`], and [`ComponentSet::subset`] return a *new* set and
/// never touch the original. Components are cheap to clone (slots and stages
/// share their innards behind an `Arc`), so a derived set holds the same
/// underlying components as its source.
#[derive(Debug, Clone)]
pub struct ComponentSet<C> {
    components: IndexMap<String, C>,
}

impl<C: Component> ComponentSet<C> {
    /// Build a set from a candidate collection, validating the whole set.
    ///
    /// # Errors
    ///
    /// Returns the component type's duplicate error if validation fails.
    pub fn new(components: impl IntoIterator<Item = C>) -> Result<Self, PipelineError> {
        let candidates: Vec<C> = components.into_iter().collect();
        C::validate(&candidates)?;
        Ok(Self {
            components: candidates
                .into_iter()
                .map(|c| (c.name().to_string(), c))
                .collect(),
        })
    }

    /// The empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            components: IndexMap::new(),
        }
    }

    /// Look up a single component by name.
    ///
    /// # Errors
    ///
    /// Returns the component type's missing error if `name` is absent.
    pub fn get(&self, name: &str) -> Result<&C, PipelineError> {
        self.components
            .get(name)
            .ok_or_else(|| C::missing_error(vec![name.to_string()]))
    }

    /// Build a new set containing exactly `names`, in the requested order.
    ///
    /// # Errors
    ///
    /// Returns the missing error naming *every* absent name at once, or the
    /// duplicate error if the same name is requested twice.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, PipelineError> {
        let mut missing = Vec::new();
        for name in names {
            let name = name.as_ref();
            if !self.components.contains_key(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(C::missing_error(missing));
        }
        Self::new(
            names
                .iter()
                .map(|n| self.components[n.as_ref()].clone())
                .collect::<Vec<_>>(),
        )
    }

    /// Whether a component with `name` is in the set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Number of components in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Components in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &C> {
        self.components.values()
    }

    /// `(name, component)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &C)> {
        self.components.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// New set = this set plus one component.
    ///
    /// # Errors
    ///
    /// Returns the duplicate error identical to direct construction if the
    /// combined set fails validation.
    pub fn with(&self, component: C) -> Result<Self, PipelineError> {
        self.add(std::iter::once(component))
    }

    /// New set = this set plus a collection of components.
    ///
    /// The combined candidate set is revalidated from scratch, so re-adding
    /// a name that now collides raises the same error as construction.
    ///
    /// # Errors
    ///
    /// Returns the duplicate error if the combined set fails validation.
    pub fn add(&self, other: impl IntoIterator<Item = C>) -> Result<Self, PipelineError> {
        Self::new(self.components.values().cloned().chain(other))
    }

    /// New set = union of this set's and `other`'s components.
    ///
    /// # Errors
    ///
    /// Returns the duplicate error if any name appears in both sets.
    pub fn union(&self, other: &Self) -> Result<Self, PipelineError> {
        self.add(other.values().cloned())
    }
}

impl<C: Component> Default for ComponentSet<C> {
    fn default() -> Self {
        Self::empty()
    }
}
