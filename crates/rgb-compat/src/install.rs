//! Putting the compatibility scheduler into service and taking it out.

use core::fmt;
use std::sync::Arc;

use legacy_scheduler::{SchedulerRef, SchedulerSlot, SlotSwap};
use parking_lot::Mutex;
use rgb_tick::Host;
use tracing::{error, info, warn};

use crate::adapter::SchedulerAdapter;
use crate::config::CompatConfig;
use crate::error::InstallError;
use crate::proxy::CompatScheduler;

struct Installed {
    original: SchedulerRef,
    proxy: Arc<CompatScheduler>,
    /// `proxy` as it sits in the slot.
    in_slot: SchedulerRef,
}

/// Swaps the host's legacy scheduler for a [`CompatScheduler`] and back.
///
/// Installing twice without restoring in between is rejected with
/// [`InstallError::AlreadyInstalled`]; the saved original is never touched by
/// the second attempt.
pub struct SchedulerManager {
    slot: Arc<dyn SchedulerSlot>,
    host: Arc<dyn Host>,
    config: CompatConfig,
    installed: Mutex<Option<Installed>>,
}

impl SchedulerManager {
    pub fn new(slot: Arc<dyn SchedulerSlot>, host: Arc<dyn Host>, config: CompatConfig) -> Self {
        Self {
            slot,
            host,
            config,
            installed: Mutex::new(None),
        }
    }

    /// Replace the scheduler in the slot with a fresh proxy around it.
    pub fn install(&self) -> Result<Arc<CompatScheduler>, InstallError> {
        let mut installed = self.installed.lock();
        if installed.is_some() {
            warn!("compatibility scheduler already installed, keeping existing install");
            return Err(InstallError::AlreadyInstalled);
        }

        let original = self.slot.load().map_err(|source| {
            error!(%source, "cannot read scheduler slot, continuing unadapted");
            InstallError::SlotUnavailable(source)
        })?;

        let adapter = SchedulerAdapter::new(Arc::clone(&self.host), self.config.tick_duration);
        let proxy = Arc::new(CompatScheduler::new(
            adapter,
            Arc::clone(&original),
            self.config.clone(),
        ));
        let in_slot: SchedulerRef = proxy.clone();

        match self.slot.swap_if(&original, Arc::clone(&in_slot)) {
            Ok(SlotSwap::Swapped) => {
                info!(
                    shadow_id_base = self.config.shadow_id_base,
                    "compatibility scheduler installed"
                );
                *installed = Some(Installed {
                    original,
                    proxy: Arc::clone(&proxy),
                    in_slot,
                });
                Ok(proxy)
            }
            Ok(SlotSwap::Mismatch { .. }) => {
                error!("scheduler slot changed while installing, continuing unadapted");
                Err(InstallError::Raced)
            }
            Err(source) => {
                error!(%source, "cannot write scheduler slot, continuing unadapted");
                Err(InstallError::SlotUnavailable(source))
            }
        }
    }

    /// Put the original scheduler back, but only if our proxy is still the
    /// one in the slot. Returns the original.
    pub fn restore(&self) -> Result<SchedulerRef, InstallError> {
        let mut installed = self.installed.lock();
        let Some(current) = installed.as_ref() else {
            return Err(InstallError::NotInstalled);
        };

        match self
            .slot
            .swap_if(&current.in_slot, Arc::clone(&current.original))
        {
            Ok(SlotSwap::Swapped) => {
                let original = Arc::clone(&current.original);
                let shadowed = current.proxy.registry().len();
                *installed = None;
                info!(shadowed, "original scheduler restored");
                Ok(original)
            }
            Ok(SlotSwap::Mismatch { .. }) => {
                // Someone else's scheduler is in service; leave it there.
                *installed = None;
                warn!("scheduler slot was replaced after install, not restoring original");
                Err(InstallError::Replaced)
            }
            Err(source) => {
                error!(%source, "cannot write scheduler slot, original not restored");
                Err(InstallError::SlotUnavailable(source))
            }
        }
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.lock().is_some()
    }

    /// The proxy currently in service.
    #[must_use]
    pub fn proxy(&self) -> Option<Arc<CompatScheduler>> {
        self.installed
            .lock()
            .as_ref()
            .map(|installed| Arc::clone(&installed.proxy))
    }

    /// The scheduler saved at install time.
    #[must_use]
    pub fn original(&self) -> Option<SchedulerRef> {
        self.installed
            .lock()
            .as_ref()
            .map(|installed| Arc::clone(&installed.original))
    }
}

impl Drop for SchedulerManager {
    fn drop(&mut self) {
        if self.installed.get_mut().is_some() {
            warn!("scheduler manager dropped while installed, proxy stays in service");
        }
    }
}

impl fmt::Debug for SchedulerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerManager")
            .field("installed", &self.is_installed())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
