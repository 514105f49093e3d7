//! Access-mode value types shared by the WAC engine, the ACP engine and the
//! universal facade.

use serde::{Deserialize, Serialize};

/// The four WAC modes. Write implies Append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WacAccessModes {
    pub read: bool,
    pub append: bool,
    pub write: bool,
    pub control: bool,
}

impl WacAccessModes {
    pub fn new(read: bool, append: bool, write: bool, control: bool) -> Self {
        Self {
            read,
            append: append || write,
            write,
            control,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// OR-combines two access sets, keeping Write-implies-Append.
    pub fn union(self, other: WacAccessModes) -> Self {
        Self::new(
            self.read || other.read,
            self.append || other.append,
            self.write || other.write,
            self.control || other.control,
        )
    }

    pub fn is_empty(&self) -> bool {
        !(self.read || self.append || self.write || self.control)
    }
}

/// Access as both protocols can express it: WAC's Control is split into
/// reading and writing the access-control document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessModes {
    pub read: bool,
    pub append: bool,
    pub write: bool,
    pub control_read: bool,
    pub control_write: bool,
}

impl AccessModes {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            read: true,
            append: true,
            write: true,
            control_read: true,
            control_write: true,
        }
    }

    /// Applies the fields the patch sets, leaving the others untouched.
    pub fn apply(self, patch: &AccessModesPatch) -> Self {
        Self {
            read: patch.read.unwrap_or(self.read),
            append: patch.append.unwrap_or(self.append),
            write: patch.write.unwrap_or(self.write),
            control_read: patch.control_read.unwrap_or(self.control_read),
            control_write: patch.control_write.unwrap_or(self.control_write),
        }
    }
}

impl From<WacAccessModes> for AccessModes {
    fn from(access: WacAccessModes) -> Self {
        Self {
            read: access.read,
            append: access.append,
            write: access.write,
            control_read: access.control,
            control_write: access.control,
        }
    }
}

/// A partial update of [`AccessModes`]: `None` means "leave as is".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessModesPatch {
    pub read: Option<bool>,
    pub append: Option<bool>,
    pub write: Option<bool>,
    pub control_read: Option<bool>,
    pub control_write: Option<bool>,
}

impl From<AccessModes> for AccessModesPatch {
    fn from(access: AccessModes) -> Self {
        Self {
            read: Some(access.read),
            append: Some(access.append),
            write: Some(access.write),
            control_read: Some(access.control_read),
            control_write: Some(access.control_write),
        }
    }
}

/// The effective permissions a server advertises in its `WAC-Allow` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissions {
    pub user: WacAccessModes,
    pub public: WacAccessModes,
}
