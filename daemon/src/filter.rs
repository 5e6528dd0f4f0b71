//! Process name matching

use serde::{Deserialize, Serialize};

pub const DEFAULT_PATTERN: &str = "vm";

/// Case-insensitive substring match against a process name.
/// An empty pattern matches every process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFilter {
    pattern: String,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_lowercase(),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, name: &str) -> bool {
        name.to_lowercase().contains(&self.pattern)
    }
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_vm_case_insensitively() {
        let filter = NameFilter::default();
        assert!(filter.matches("VBoxHeadless-VM"));
        assert!(filter.matches("vmware-vmx"));
        assert!(filter.matches("qemu-system-x86_64 kvm"));
        assert!(!filter.matches("firefox"));
    }

    #[test]
    fn test_pattern_is_lowercased() {
        let filter = NameFilter::new("QEMU");
        assert_eq!(filter.pattern(), "qemu");
        assert!(filter.matches("qemu-system-aarch64"));
    }

    #[test]
    fn test_empty_pattern_matches_all() {
        let filter = NameFilter::new("");
        assert!(filter.matches("anything"));
    }
}
