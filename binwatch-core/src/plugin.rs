//! Registry for backend plugins and their ports.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ports::{PortError, RoutePort, TelemetryPort};

/// Ports implementing one telemetry/optimizer backend.
pub struct BackendPlugin {
    /// Identifier selected in the configuration.
    pub id: String,
    /// Implementation for reading fill levels.
    pub telemetry_port: Arc<dyn TelemetryPort>,
    /// Implementation for requesting routes.
    pub route_port: Arc<dyn RoutePort>,
}

/// Registry that resolves plugins by backend identifier.
pub struct PluginRegistry {
    plugins: HashMap<String, BackendPlugin>,
}

impl PluginRegistry {
    /// Build a registry from the provided plugin list.
    #[must_use]
    pub fn new(plugins: Vec<BackendPlugin>) -> Self {
        let plugins_map = plugins
            .into_iter()
            .map(|plugin| (plugin.id.clone(), plugin))
            .collect();
        Self {
            plugins: plugins_map,
        }
    }

    /// Identifiers of all registered backends, sorted.
    #[must_use]
    pub fn backends(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Look up a plugin for the given backend.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::UnsupportedBackend`] when no plugin is registered.
    pub fn plugin(&self, id: &str) -> Result<&BackendPlugin, PortError> {
        self.plugins
            .get(id)
            .ok_or_else(|| PortError::UnsupportedBackend(id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::model::{BinId, FillLevel, Route, RouteRequest};

    struct Idle;

    #[async_trait]
    impl TelemetryPort for Idle {
        async fn fill_level(&self, _bin: BinId) -> Result<FillLevel, PortError> {
            Ok(FillLevel::EMPTY)
        }
    }

    #[async_trait]
    impl RoutePort for Idle {
        async fn optimize(&self, _request: &RouteRequest) -> Result<Route, PortError> {
            Ok(Route::default())
        }
    }

    fn idle_plugin(id: &str) -> BackendPlugin {
        BackendPlugin {
            id: id.to_owned(),
            telemetry_port: Arc::new(Idle),
            route_port: Arc::new(Idle),
        }
    }

    #[test]
    fn resolves_registered_backends() {
        let registry = PluginRegistry::new(vec![idle_plugin("simulated"), idle_plugin("http")]);

        assert_eq!(registry.backends(), vec!["http", "simulated"]);
        assert!(registry.plugin("http").is_ok(), "http must resolve");
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let registry = PluginRegistry::new(vec![idle_plugin("http")]);
        let err = registry.plugin("mqtt").err().expect("must fail");
        assert!(
            matches!(err, PortError::UnsupportedBackend(ref id) if id == "mqtt"),
            "got {err}"
        );
    }
}
