//! Shared option types that replace boolean flag parameters in the Rust API.

/// Whether parsing nests single-parent Blank Nodes into their parent Thing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ChainDetection {
    #[default]
    Enabled,
    /// Keep every Blank Node as an opaque `_:id` reference.
    Disabled,
}

impl ChainDetection {
    pub fn is_enabled(self) -> bool {
        matches!(self, ChainDetection::Enabled)
    }
}

impl From<bool> for ChainDetection {
    fn from(value: bool) -> Self {
        if value {
            ChainDetection::Enabled
        } else {
            ChainDetection::Disabled
        }
    }
}

impl From<ChainDetection> for bool {
    fn from(value: ChainDetection) -> Self {
        value.is_enabled()
    }
}

/// Which WAC rules apply: those about the Resource itself, or the defaults a
/// Container passes on to its children.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessTarget {
    /// `acl:accessTo`
    Resource,
    /// `acl:default` (and the legacy `acl:defaultForNew`)
    Default,
}

impl AccessTarget {
    pub fn is_default(self) -> bool {
        matches!(self, AccessTarget::Default)
    }
}

impl From<bool> for AccessTarget {
    fn from(is_default: bool) -> Self {
        if is_default {
            AccessTarget::Default
        } else {
            AccessTarget::Resource
        }
    }
}

/// Whether listing Things returns Blank Node subjects as well.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum BlankNodeThings {
    Include,
    #[default]
    Exclude,
}

impl BlankNodeThings {
    pub fn is_included(self) -> bool {
        matches!(self, BlankNodeThings::Include)
    }
}

impl From<bool> for BlankNodeThings {
    fn from(value: bool) -> Self {
        if value {
            BlankNodeThings::Include
        } else {
            BlankNodeThings::Exclude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_conversions() {
        assert_eq!(ChainDetection::from(false), ChainDetection::Disabled);
        assert!(bool::from(ChainDetection::Enabled));
        assert!(AccessTarget::from(true).is_default());
        assert!(!BlankNodeThings::default().is_included());
    }
}
