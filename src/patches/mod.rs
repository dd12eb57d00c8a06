//! # Patches
//!
//! This module holds the built-in descriptor table.
//!
//! Descriptors are grouped by feature area, one module each. The table is built once per process
//! and never changes afterwards; what a descriptor does in a given cycle depends only on the live
//! configuration.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::patch::PatchDescriptor;

pub mod building;
pub mod crafting;
pub mod game;
pub mod inventory;
pub mod pickable;
pub mod placement;
pub mod server;
pub mod time;
pub mod turret;

lazy_static! {
    /// Every built-in descriptor
    static ref BUILTIN: Vec<Arc<PatchDescriptor>> = [
        time::descriptors(),
        game::descriptors(),
        crafting::descriptors(),
        inventory::descriptors(),
        pickable::descriptors(),
        turret::descriptors(),
        building::descriptors(),
        placement::descriptors(),
        server::descriptors(),
    ]
    .into_iter()
    .flatten()
    .map(Arc::new)
    .collect();
}

/// Every built-in descriptor, in registration order
pub fn builtin() -> &'static [Arc<PatchDescriptor>] {
    &BUILTIN
}

/// Built-in descriptor called `name`
pub fn find(name: &str) -> Option<&'static PatchDescriptor> {
    BUILTIN
        .iter()
        .find(|descriptor| descriptor.name == name)
        .map(Arc::as_ref)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    /// Names are unique, so diagnostics are unambiguous
    fn test_unique_names() {
        let names: HashSet<_> = builtin().iter().map(|descriptor| descriptor.name).collect();
        assert_eq!(names.len(), builtin().len());
    }

    #[test]
    /// Descriptors can be looked up by name
    fn test_find() {
        let descriptor = find("time.rescale_day_fraction").unwrap();
        assert_eq!(descriptor.expected(), vec![4, 2, 1]);
        assert_eq!(descriptor.target, *time::RESCALE_DAY_FRACTION);
        assert!(find("time.unknown").is_none());
    }

    #[test]
    /// Everything is off by default
    fn test_disabled_by_default() {
        let config = crate::config::Configuration::default();
        for descriptor in builtin().iter() {
            assert!(
                !(descriptor.enabled)(&config),
                "{} is enabled",
                descriptor.name
            );
        }
    }
}
