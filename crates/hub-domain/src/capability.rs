use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Declares what a tool needs from the Hub before it may run.
    ///
    /// A tool descriptor advertises these; the Instance Manager and the
    /// authorization layer both consult them before starting a process or
    /// forwarding a request to one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ToolCapabilities: u16 {
        /// Tool requires a user-scoped credential (OAuth token or API key).
        const REQUIRES_CREDENTIAL = 0b0000_0001;
        /// Tool requires workspace-level configuration before activation.
        const REQUIRES_CONFIG     = 0b0000_0010;
        /// Tool reads data on behalf of the user.
        const READS_DATA          = 0b0000_0100;
        /// Tool writes or mutates data on behalf of the user.
        const WRITES_DATA         = 0b0000_1000;
        /// Tool may spawn a long-running subprocess (counts toward the
        /// per-user instance quota).
        const LONG_RUNNING        = 0b0001_0000;
        /// Only a workspace owner or super-admin may activate this tool.
        const ADMIN_ONLY          = 0b0010_0000;
        /// Tool participates in inter-agent messaging (channels).
        const USES_CHANNELS       = 0b0100_0000;
    }
}

impl Default for ToolCapabilities {
    fn default() -> Self {
        ToolCapabilities::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert!(ToolCapabilities::default().is_empty());
    }

    #[test]
    fn admin_only_excludes_write() {
        let caps = ToolCapabilities::ADMIN_ONLY | ToolCapabilities::READS_DATA;
        assert!(caps.contains(ToolCapabilities::ADMIN_ONLY));
        assert!(!caps.contains(ToolCapabilities::WRITES_DATA));
    }

    #[test]
    fn serde_roundtrip() {
        let caps = ToolCapabilities::REQUIRES_CREDENTIAL | ToolCapabilities::LONG_RUNNING;
        let json = serde_json::to_string(&caps).unwrap();
        let back: ToolCapabilities = serde_json::from_str(&json).unwrap();
        assert_eq!(caps, back);
    }
}
