//! Owner identity for scheduled work.

use core::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Stable numeric identity of a loaded module.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// Where a module is in its lifecycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Phase {
    /// Still inside its own startup; the host has not finished wiring it.
    Loading = 0,
    /// Fully initialized.
    Enabled = 1,
    /// Shut down or being shut down.
    Disabled = 2,
}

impl Phase {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Loading,
            1 => Self::Enabled,
            _ => Self::Disabled,
        }
    }
}

struct ModuleInner {
    id: ModuleId,
    name: String,
    phase: AtomicU8,
}

/// Shared handle to a loaded module.
///
/// Cloning is cheap. Equality and hashing use the [`ModuleId`] only.
#[derive(Clone)]
pub struct ModuleRef(Arc<ModuleInner>);

impl ModuleRef {
    /// A module that has just started loading.
    pub fn new(id: ModuleId, name: impl Into<String>) -> Self {
        Self(Arc::new(ModuleInner {
            id,
            name: name.into(),
            phase: AtomicU8::new(Phase::Loading as u8),
        }))
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.0.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.0.phase.load(Ordering::Acquire))
    }

    pub fn set_phase(&self, phase: Phase) {
        self.0.phase.store(phase as u8, Ordering::Release);
    }

    /// Whether the module finished its own startup and has not been disabled.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.phase() == Phase::Enabled
    }
}

impl PartialEq for ModuleRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ModuleRef {}

impl Hash for ModuleRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRef")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .field("phase", &self.phase())
            .finish()
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_is_shared_between_clones() {
        let module = ModuleRef::new(ModuleId(1), "economy");
        let clone = module.clone();
        assert_eq!(clone.phase(), Phase::Loading);
        assert!(!clone.is_initialized());

        module.set_phase(Phase::Enabled);
        assert!(clone.is_initialized());

        module.set_phase(Phase::Disabled);
        assert!(!clone.is_initialized());
    }

    #[test]
    fn identity_is_by_id() {
        let a = ModuleRef::new(ModuleId(4), "a");
        let renamed = ModuleRef::new(ModuleId(4), "b");
        let other = ModuleRef::new(ModuleId(5), "a");
        assert_eq!(a, renamed);
        assert_ne!(a, other);
        assert_eq!(a.to_string(), "a");
    }
}
