//! Per-process orchestration of the two triggers.

use std::borrow::Cow;

use stasis_cache::{CacheSettings, CommitOutcome, SessionContext};
use stasis_common::Role;
use stasis_config::StasisConfig;
use stasis_patch::{Transformer, Trigger};
use tracing::{info, warn};

use crate::host::Host;

/// Derives cache locations from the configuration.
pub fn cache_settings(config: &StasisConfig) -> CacheSettings {
    let settings = CacheSettings::new(config.cache_dir()).with_file_name(&config.cache.file);
    if config.cache.stage_in_cache_dir {
        settings
    } else {
        settings.with_temp_dir(std::env::temp_dir())
    }
}

/// Owns the transformer and the run's [`SessionContext`].
///
/// The session exists from the finalize trigger until the finish trigger and
/// is dropped afterwards. Dropping the lifecycle with a snapshot still staged
/// (startup never finished) discards the staged file and leaves the canonical
/// cache alone.
pub struct Lifecycle<H: Host> {
    host: H,
    role: Role,
    settings: CacheSettings,
    transformer: Transformer,
    session: Option<SessionContext>,
    finalized: bool,
}

impl<H: Host> Lifecycle<H> {
    /// Creates a lifecycle for `role`, with the default hook table.
    pub fn new(host: H, role: Role, settings: CacheSettings) -> Self {
        info!(%role, "initializing stasis hooks");
        Self {
            host,
            role,
            settings,
            transformer: Transformer::for_role(role),
            session: None,
            finalized: false,
        }
    }

    /// Creates a lifecycle from a loaded configuration.
    pub fn from_config(host: H, config: &StasisConfig) -> Self {
        Self::new(host, config.session.role, cache_settings(config))
    }

    /// The role resolved at startup.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The transformer the host should present units to.
    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    /// Shorthand for presenting one unit to the transformer.
    pub fn transform<'a>(&self, name: &str, bytes: &'a [u8]) -> Cow<'a, [u8]> {
        self.transformer.transform(name, bytes)
    }

    /// The current session, between the two triggers.
    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    /// Trigger: the host's active component list is fixed.
    pub fn after_component_list_finalized(&mut self) {
        if self.finalized {
            warn!("component list finalized more than once; ignoring");
            return;
        }
        self.finalized = true;
        let components = self.host.active_components();
        self.session = Some(SessionContext::finalize(&self.settings, &components));
    }

    /// Trigger: startup completed without failing.
    ///
    /// Returns `None` if the finalize trigger has not run (or this trigger
    /// already has).
    pub fn after_run_finished_successfully(&mut self) -> Option<CommitOutcome> {
        let Some(mut session) = self.session.take() else {
            warn!("run finished without an active cache session; ignoring");
            return None;
        };
        Some(session.commit())
    }

    /// Fires `trigger`.
    pub fn fire(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::ComponentListFinalized => self.after_component_list_finalized(),
            Trigger::RunFinishedSuccessfully => {
                self.after_run_finished_successfully();
            }
        }
    }

    /// Handles an injected call executed by the host.
    ///
    /// Returns `false` if `target` is not one of the hook targets.
    pub fn dispatch_call(&mut self, target: &str) -> bool {
        match Trigger::from_call_target(target) {
            Some(trigger) => {
                self.fire(trigger);
                true
            }
            None => false,
        }
    }
}
