use super::error::ParamError;
use super::param::Param;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// The parameters a script declares, in registration order.
///
/// Local parameters take their value from the startup payload. Global ones
/// are read from the server's configuration when no value is forced.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    params: Vec<Arc<Param>>,
    local: HashSet<String>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_param(&mut self, param: Param) -> Result<Arc<Param>, ParamError> {
        let param = self.insert(param)?;
        self.local.insert(param.name().to_string());
        Ok(param)
    }

    pub fn register_global_param(&mut self, param: Param) -> Result<Arc<Param>, ParamError> {
        self.insert(param)
    }

    fn insert(&mut self, param: Param) -> Result<Arc<Param>, ParamError> {
        if self.get(param.name()).is_some() {
            return Err(ParamError::Duplicate {
                name: param.name().to_string(),
            });
        }
        let param = Arc::new(param);
        self.params.push(param.clone());
        Ok(param)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Param>> {
        self.params.iter().find(|p| p.name() == name).cloned()
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.local.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Param>> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Checks `values` against the registered parameters without changing
    /// any of them.
    pub fn validate(&self, values: &BTreeMap<String, String>) -> Result<(), ParamError> {
        for (name, value) in values {
            if let Some(param) = self.get(name) {
                param.check_value(value)?;
            }
        }
        for param in self.missing_locals(values) {
            if param.is_required() && param.default_value().is_empty() {
                return Err(ParamError::MissingRequired {
                    name: param.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Forces every supplied value onto its parameter. Unknown names are
    /// skipped. Local parameters missing from `values` are pinned to their
    /// default, unless they are required and have none. Nothing is changed
    /// when any value is rejected.
    pub fn apply(&self, values: &BTreeMap<String, String>) -> Result<(), ParamError> {
        self.validate(values)?;

        for (name, value) in values {
            match self.get(name) {
                Some(param) => {
                    debug!(target: "params", "Setting {} to {:?}", param, param.masked(value));
                    param.force_value(value)?;
                }
                None => warn!(target: "params", "Ignoring unknown parameter {}", name),
            }
        }
        for param in self.missing_locals(values) {
            param.force_default();
        }
        Ok(())
    }

    fn missing_locals<'a>(
        &'a self,
        values: &'a BTreeMap<String, String>,
    ) -> impl Iterator<Item = &'a Arc<Param>> {
        self.params
            .iter()
            .filter(move |p| self.is_local(p.name()) && !values.contains_key(p.name()))
    }
}
