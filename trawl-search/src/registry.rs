//! Driver registry: explicit, ordered, immutable after construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::drivers::SourceDriver;
use crate::errors::MediaSearchError;

/// Lookup key for a source name: lowercase with dots removed.
///
/// `Sex.com`, `sex.com` and `sexcom` all map to `sexcom`.
pub fn source_slug(name: &str) -> String {
    name.trim().to_lowercase().replace('.', "")
}

/// Registered drivers in registration order, with case-insensitive lookup.
///
/// Each driver is reachable by its lowercased name and, when the name contains
/// a dot, by its dotless alias.
#[derive(Debug, Default, Clone)]
pub struct DriverRegistry {
    drivers: Vec<Arc<dyn SourceDriver>>,
    index: HashMap<String, usize>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from drivers in the given order.
    ///
    /// # Errors
    /// - `MediaSearchError::DuplicateDriver` - Two drivers share a name or alias
    pub fn from_drivers(
        drivers: impl IntoIterator<Item = Arc<dyn SourceDriver>>,
    ) -> Result<Self, MediaSearchError> {
        let mut registry = Self::new();
        for driver in drivers {
            registry.register(driver)?;
        }
        Ok(registry)
    }

    /// Adds a driver at the end of the fan-out order.
    ///
    /// # Errors
    /// - `MediaSearchError::DuplicateDriver` - The name or alias is taken
    pub fn register(&mut self, driver: Arc<dyn SourceDriver>) -> Result<(), MediaSearchError> {
        let lowered = driver.name().trim().to_lowercase();
        let slug = source_slug(&lowered);

        for key in [&lowered, &slug] {
            if self.index.contains_key(key) {
                return Err(MediaSearchError::DuplicateDriver {
                    name: driver.name().to_string(),
                });
            }
        }

        let position = self.drivers.len();
        self.index.insert(lowered, position);
        self.index.insert(slug, position);
        tracing::debug!("Registered driver {} at position {}", driver.name(), position);
        self.drivers.push(driver);
        Ok(())
    }

    /// Finds a driver by name or dotless alias, case-insensitively.
    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn SourceDriver>> {
        let lowered = name.trim().to_lowercase();
        self.index
            .get(&lowered)
            .or_else(|| self.index.get(&source_slug(&lowered)))
            .and_then(|&position| self.drivers.get(position))
    }

    /// Drivers in registration order.
    pub fn all(&self) -> &[Arc<dyn SourceDriver>] {
        &self.drivers
    }

    /// Display names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.drivers.iter().map(|d| d.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticDriver;

    fn registry() -> DriverRegistry {
        DriverRegistry::from_drivers([
            StaticDriver::new("Alpha").into_arc(),
            StaticDriver::new("sex.com").into_arc(),
            StaticDriver::new("Gamma Tube").into_arc(),
        ])
        .unwrap()
    }

    #[test]
    fn test_preserves_registration_order() {
        assert_eq!(registry().names(), vec!["Alpha", "sex.com", "Gamma Tube"]);
    }

    #[test]
    fn test_resolve_is_case_insensitive_with_alias() {
        let registry = registry();
        for query in ["sex.com", "SEX.COM", "sexcom", "SexCom", " sexcom "] {
            assert_eq!(registry.resolve(query).unwrap().name(), "sex.com");
        }
        assert_eq!(registry.resolve("gamma tube").unwrap().name(), "Gamma Tube");
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut registry = registry();
        let result = registry.register(StaticDriver::new("SEXCOM").into_arc());
        assert!(matches!(
            result,
            Err(MediaSearchError::DuplicateDriver { .. })
        ));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_slug() {
        assert_eq!(source_slug(" Sex.Com "), "sexcom");
        assert_eq!(source_slug("Example Tube"), "example tube");
    }
}
