//! Plugin registry keyed by plugin type

use crate::error::{Error, Result};
use crate::plugin::{Plugin, PluginConstructor, PluginContext};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use tracing::debug;

/// Registered plugins in registration order
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
    index: HashMap<TypeId, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct `P` and register it
    pub fn register<P: PluginConstructor>(&mut self, context: &PluginContext) -> Result<()> {
        let plugin = P::construct(context)?;
        self.register_instance(plugin);
        Ok(())
    }

    /// Register a pre-built plugin
    ///
    /// Registering a type twice replaces the earlier instance in place.
    pub fn register_instance<P: Plugin>(&mut self, plugin: P) {
        let plugin: Box<dyn Plugin> = Box::new(plugin);
        let type_id = TypeId::of::<P>();

        debug!("Registering plugin {} ({})", plugin.alias(), plugin.type_name());

        match self.index.get(&type_id) {
            Some(&position) => self.plugins[position] = plugin,
            None => {
                self.index.insert(type_id, self.plugins.len());
                self.plugins.push(plugin);
            }
        }
    }

    /// Plugin registered under type `P`
    pub fn get<P: Plugin>(&self) -> Result<&P> {
        let position = self
            .index
            .get(&TypeId::of::<P>())
            .ok_or_else(|| Error::plugin_not_registered(std::any::type_name::<P>()))?;

        let plugin = self.plugins[*position].as_ref();
        let any: &dyn Any = plugin;
        any.downcast_ref::<P>()
            .ok_or_else(|| Error::PluginTypeMismatch {
                expected: std::any::type_name::<P>().to_string(),
                actual: plugin.type_name().to_string(),
            })
    }

    /// Plugin registered under `alias`
    pub fn get_by_alias(&self, alias: &str) -> Result<&dyn Plugin> {
        self.plugins
            .iter()
            .map(Box::as_ref)
            .find(|plugin| plugin.alias() == alias)
            .ok_or_else(|| Error::plugin_not_registered(alias))
    }

    /// Plugins in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
