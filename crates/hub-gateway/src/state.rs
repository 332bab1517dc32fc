use std::sync::Arc;

use hub_auth::HubSessionResolver;
use hub_domain::config::Config;
use hub_protocol::dispatch::HubServices;
use hub_protocol::middleware::Pipeline;
use hub_store::bootstrap::BootstrapState;
use hub_store::RuntimeConfigCache;
use parking_lot::RwLock;

/// Everything the REST layer and the protocol transports share. Cheap to
/// clone — every field is either an `Arc` or internally pooled.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub services: HubServices,
    pub runtime_config: Arc<RuntimeConfigCache>,
    pub pipeline: Arc<Pipeline>,
    pub resolver: Arc<HubSessionResolver>,
    /// Mutated by the setup wizard as it walks NO_DATABASE/EMPTY_DATABASE/
    /// UNCONFIGURED -> CONFIGURED; read by the setup-required middleware on
    /// every request.
    pub bootstrap_state: Arc<RwLock<BootstrapState>>,
}

impl GatewayState {
    pub fn is_configured(&self) -> bool {
        *self.bootstrap_state.read() == BootstrapState::Configured
    }

    pub fn mark_configured(&self) {
        *self.bootstrap_state.write() = BootstrapState::Configured;
        self.runtime_config.invalidate();
    }
}
