//! The interface the host application provides.

use stasis_cache::ActiveComponent;

/// What stasis needs to know about the running host.
pub trait Host {
    /// The components active for this run, in load order.
    ///
    /// Only called once the host has fixed the list.
    fn active_components(&self) -> Vec<ActiveComponent>;
}

impl Host for Vec<ActiveComponent> {
    fn active_components(&self) -> Vec<ActiveComponent> {
        self.clone()
    }
}
