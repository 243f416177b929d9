//! Cross-module capability lookup.
//!
//! Modules publish values under a capability name at load time; other
//! modules fetch them by name and concrete type.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ModuleError;

struct Export {
    module: String,
    value: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub struct ModuleResolver {
    exports: BTreeMap<String, Export>,
}

impl ModuleResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `value` under `capability` on behalf of `module`.
    ///
    /// # Errors
    ///
    /// [`ModuleError::DuplicateExport`] if another module already exports
    /// the capability.
    pub fn export(
        &mut self,
        module: &str,
        capability: impl Into<String>,
        value: Arc<dyn Any + Send + Sync>,
    ) -> Result<(), ModuleError> {
        let capability = capability.into();
        if let Some(existing) = self.exports.get(&capability) {
            return Err(ModuleError::DuplicateExport {
                capability,
                first: existing.module.clone(),
                second: module.to_owned(),
            });
        }
        self.exports.insert(
            capability,
            Export {
                module: module.to_owned(),
                value,
            },
        );
        Ok(())
    }

    /// The exported value, if present and of type `T`.
    #[must_use]
    pub fn resolve<T: Any + Send + Sync>(&self, capability: &str) -> Option<Arc<T>> {
        let export = self.exports.get(capability)?;
        Arc::clone(&export.value).downcast::<T>().ok()
    }

    /// Module that exported `capability`.
    #[must_use]
    pub fn provider(&self, capability: &str) -> Option<&str> {
        self.exports.get(capability).map(|e| e.module.as_str())
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }
}

impl fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.exports.iter().map(|(k, v)| (k, &v.module)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Damage(f32);

    #[test]
    fn test_resolve_typed() {
        let mut resolver = ModuleResolver::new();
        resolver.export("Health", "health", Arc::new(Damage(2.0))).unwrap();
        let api = resolver.resolve::<Damage>("health").unwrap();
        assert_eq!(api.0, 2.0);
        assert_eq!(resolver.provider("health"), Some("Health"));
    }

    #[test]
    fn test_wrong_type_or_name_is_none() {
        let mut resolver = ModuleResolver::new();
        resolver.export("Health", "health", Arc::new(Damage(2.0))).unwrap();
        assert!(resolver.resolve::<String>("health").is_none());
        assert!(resolver.resolve::<Damage>("mana").is_none());
    }

    #[test]
    fn test_duplicate_export_rejected() {
        let mut resolver = ModuleResolver::new();
        resolver.export("A", "health", Arc::new(1u32)).unwrap();
        assert!(matches!(
            resolver.export("B", "health", Arc::new(2u32)),
            Err(ModuleError::DuplicateExport { .. })
        ));
    }
}
