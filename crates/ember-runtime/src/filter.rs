use std::collections::HashSet;

use crate::catalog::{Catalog, CatalogEntry, SystemDescriptor};

/// Inclusion and exclusion rules resolved against the catalog once per
/// build.
///
/// The three sets are independent and commutative. A descriptor is admitted
/// only when its category was opted in and neither exclusion set names it;
/// exclusions narrow an opted-in set, they never expand it. Rules that
/// reference a category or name absent from the catalog match nothing.
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    included_categories: HashSet<String>,
    excluded_names: HashSet<String>,
    excluded_descriptors: HashSet<SystemDescriptor>,
}

impl FilterRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt a category in for automatic inclusion.
    pub fn include_category(&mut self, category: impl Into<String>) -> &mut Self {
        self.included_categories.insert(category.into());
        self
    }

    /// Exclude a system by exact name.
    pub fn exclude_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.excluded_names.insert(name.into());
        self
    }

    /// Exclude a system by descriptor reference.
    pub fn exclude_descriptor(&mut self, descriptor: &SystemDescriptor) -> &mut Self {
        self.excluded_descriptors.insert(descriptor.clone());
        self
    }

    /// Whether a descriptor passes all three predicates.
    pub fn admits(&self, descriptor: &SystemDescriptor) -> bool {
        self.included_categories.contains(&descriptor.category)
            && !self.excluded_names.contains(&descriptor.name)
            && !self.excluded_descriptors.contains(descriptor)
    }

    /// Select the candidate subset of the catalog.
    ///
    /// Pure and deterministic: no input is mutated and the output order is
    /// the catalog's registration order. An empty inclusion set selects
    /// nothing.
    pub fn select<'c>(&self, catalog: &'c Catalog) -> Vec<&'c CatalogEntry> {
        catalog.iter().filter(|e| self.admits(e.descriptor())).collect()
    }
}
