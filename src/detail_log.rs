use tracing::debug;

/// Verbose, opt-in diagnostics for tokenization and mapping decisions.
///
/// Disabled by default; when disabled every call is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailLog {
    enabled: bool,
}

impl DetailLog {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&self, message: &str, channel: &str) {
        if self.enabled {
            debug!(target: "ldapsync::detail", channel, "{}", message);
        }
    }
}
