use async_trait::async_trait;
use sdk::{environ, registry, Context, PluginError, Registry};
use std::collections::HashMap;

/// Environment variables and registry credentials fixed at startup.
///
/// Every request receives the same values. Used by `drover serve`.
#[derive(Debug, Clone, Default)]
pub struct FixedStore {
    env: HashMap<String, String>,
    registries: Vec<Registry>,
}

impl FixedStore {
    /// Serve `env` to environ requests and `registries` to registry requests
    pub fn new(env: HashMap<String, String>, registries: Vec<Registry>) -> Self {
        Self { env, registries }
    }
}

#[async_trait]
impl environ::Plugin for FixedStore {
    async fn list(
        &self,
        _ctx: &Context,
        _req: &environ::Request,
    ) -> Result<HashMap<String, String>, PluginError> {
        Ok(self.env.clone())
    }
}

#[async_trait]
impl registry::Plugin for FixedStore {
    async fn list(
        &self,
        _ctx: &Context,
        _req: &registry::Request,
    ) -> Result<Vec<Registry>, PluginError> {
        Ok(self.registries.clone())
    }
}
