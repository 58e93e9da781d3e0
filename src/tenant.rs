use std::sync::Arc;

use dashmap::DashMap;

use crate::engine::{Engine, EngineError, Governance};
use crate::limits::{MAX_TENANT_NAME_LEN, MAX_TENANTS};
use crate::notify::EventHub;

/// Manages per-community engines. Each community gets its own isolated
/// Engine + EventHub; the governance collaborator is shared. The routing
/// key is whatever the host uses to identify a community.
pub struct TenantManager {
    engines: DashMap<String, Arc<Engine>>,
    governance: Arc<dyn Governance>,
}

impl TenantManager {
    pub fn new(governance: Arc<dyn Governance>) -> Self {
        Self {
            engines: DashMap::new(),
            governance,
        }
    }

    /// Get or lazily create the engine for the given community.
    pub fn get_or_create(&self, tenant: &str) -> Result<Arc<Engine>, EngineError> {
        if let Some(engine) = self.engines.get(tenant) {
            return Ok(engine.value().clone());
        }
        if tenant.is_empty() {
            return Err(EngineError::LimitExceeded("empty tenant name"));
        }
        if tenant.len() > MAX_TENANT_NAME_LEN {
            return Err(EngineError::LimitExceeded("tenant name too long"));
        }
        if self.engines.len() >= MAX_TENANTS {
            return Err(EngineError::LimitExceeded("too many tenants"));
        }

        let engine = Arc::new(Engine::new(
            Arc::new(EventHub::new()),
            self.governance.clone(),
        ));
        self.engines.insert(tenant.to_string(), engine.clone());
        metrics::gauge!(crate::observability::TENANTS_ACTIVE).set(self.engines.len() as f64);
        Ok(engine)
    }
}
