use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::PoseEngine;

/// Named pose engines available to the binary.
pub struct EngineRegistry {
    engines: HashMap<String, Box<dyn PoseEngine>>,
    default_name: Option<String>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
            default_name: None,
        }
    }

    /// Register an engine. The first registered engine becomes the default.
    pub fn register<E: PoseEngine + 'static>(&mut self, engine: E) {
        let name = engine.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.engines.insert(name, Box::new(engine));
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.engines.contains_key(name) {
            return Err(anyhow!("engine '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Sorted engine names.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove and return the named engine, or the default when `name` is `None`.
    pub fn take(&mut self, name: Option<&str>) -> Result<Box<dyn PoseEngine>> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self
                .default_name
                .clone()
                .ok_or_else(|| anyhow!("no engines registered"))?,
        };
        self.engines.remove(&name).ok_or_else(|| {
            anyhow!(
                "engine '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
