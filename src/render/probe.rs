//! Runtime capability detection for off-thread painting

use std::thread;

use log::debug;

/// Set to any value to force main-thread painting
pub const DISABLE_RENDER_THREAD_ENV: &str = "PAGESTRIP_DISABLE_RENDER_THREAD";

/// What the runtime offers for painting away from the owner thread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Painting control of a canvas can be handed over
    pub offscreen_transfer: bool,
    /// A background render thread can run
    pub background_context: bool,
}

impl Capabilities {
    /// Both paths available
    #[must_use]
    pub const fn full() -> Self {
        Self {
            offscreen_transfer: true,
            background_context: true,
        }
    }

    /// Main-thread painting only
    #[must_use]
    pub const fn main_thread_only() -> Self {
        Self {
            offscreen_transfer: false,
            background_context: false,
        }
    }

    #[must_use]
    pub fn supports_off_thread(&self) -> bool {
        self.offscreen_transfer && self.background_context
    }
}

/// Probe once at surface construction.
///
/// `prefer_render_thread` comes from settings; the environment override
/// and a single-core host both force the main-thread path.
pub fn probe_capabilities(prefer_render_thread: bool) -> Capabilities {
    let disabled_by_env = std::env::var_os(DISABLE_RENDER_THREAD_ENV).is_some();
    let parallelism = thread::available_parallelism().map_or(1, |n| n.get());

    let background_context = prefer_render_thread && !disabled_by_env && parallelism > 1;
    let caps = Capabilities {
        offscreen_transfer: !disabled_by_env,
        background_context,
    };

    debug!(
        "Render capabilities: {caps:?} (parallelism={parallelism}, env_disabled={disabled_by_env})"
    );
    caps
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn env_override_forces_main_thread() {
        // SAFETY: serialized with the other env-touching tests.
        unsafe { std::env::set_var(DISABLE_RENDER_THREAD_ENV, "1") };
        let caps = probe_capabilities(true);
        unsafe { std::env::remove_var(DISABLE_RENDER_THREAD_ENV) };
        assert!(!caps.supports_off_thread());
    }

    #[test]
    #[serial]
    fn settings_can_opt_out() {
        assert!(!probe_capabilities(false).supports_off_thread());
    }
}
