//! Registry for all ticket source plugins and their ports.

use std::fmt;
use std::sync::Arc;

use crate::model::{RoutePlan, SourceId, SourceMeta};
use crate::ports::SourcePort;

#[derive(Clone)]
/// A source adapter bundled with the routes it should search.
pub struct SourcePlugin {
    /// Static metadata describing the source.
    pub meta: SourceMeta,
    /// Implementation for searching tickets.
    pub port: Arc<dyn SourcePort>,
    /// Routes searched each cycle, per direction.
    pub routes: RoutePlan,
}

/// Ordered collection of plugins; sources run in registration order.
pub struct SourceRegistry {
    plugins: Vec<SourcePlugin>,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.plugins.iter().map(|plugin| &plugin.meta.id))
            .finish()
    }
}

impl SourceRegistry {
    /// Build a registry from the provided plugin list.
    ///
    /// A later plugin with an id already registered is ignored.
    #[must_use]
    pub fn new(plugins: Vec<SourcePlugin>) -> Self {
        let mut unique: Vec<SourcePlugin> = Vec::with_capacity(plugins.len());
        for plugin in plugins {
            if !unique.iter().any(|known| known.meta.id == plugin.meta.id) {
                unique.push(plugin);
            }
        }
        Self { plugins: unique }
    }

    /// Return metadata for all registered sources.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceMeta> {
        self.plugins
            .iter()
            .map(|plugin| plugin.meta.clone())
            .collect()
    }

    /// Iterator over registered plugins in run order.
    pub fn iter(&self) -> impl Iterator<Item = &SourcePlugin> {
        self.plugins.iter()
    }

    /// Look up a plugin for the given source.
    #[must_use]
    pub fn plugin(&self, source: &SourceId) -> Option<&SourcePlugin> {
        self.plugins.iter().find(|plugin| &plugin.meta.id == source)
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
