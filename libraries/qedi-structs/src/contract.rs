use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::ObjectId;

/// Module holding every entry point the app calls.
pub const LINKTREE_MODULE: &str = "linktree";
/// Struct name of the profile object.
pub const PROFILE_STRUCT: &str = "LinkTreeProfile";

/// The shared system clock object.
pub const CLOCK_OBJECT_ID: ObjectId = ObjectId::from_low_byte(6);
pub const CLOCK_INITIAL_SHARED_VERSION: u64 = 1;

pub const CREATE_PROFILE: &str = "create_profile";
pub const ADD_LINK: &str = "add_link";
pub const UPDATE_PROFILE: &str = "update_profile";

/// Name of the click-recording entry point. It changed between deployed
/// package versions, so it is configuration rather than a constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickEntry {
    #[default]
    ClickLink,
    RecordClick,
}

impl ClickEntry {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickEntry::ClickLink => "click_link",
            ClickEntry::RecordClick => "record_click",
        }
    }
}

/// Where the deployed contract lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCoordinates {
    pub package_id: ObjectId,
    pub registry_id: ObjectId,
    #[serde(default)]
    pub click_entry: ClickEntry,
}

impl ContractCoordinates {
    pub fn new(package_id: ObjectId, registry_id: ObjectId) -> Self {
        Self {
            package_id,
            registry_id,
            click_entry: ClickEntry::default(),
        }
    }

    pub fn target(&self, function: &str) -> MoveCallTarget {
        MoveCallTarget {
            package: self.package_id,
            module: LINKTREE_MODULE.into(),
            function: function.into(),
        }
    }

    pub fn click_target(&self) -> MoveCallTarget {
        self.target(self.click_entry.as_str())
    }

    /// Fully qualified type of profile objects, used to filter owned objects.
    pub fn profile_type(&self) -> String {
        format!("{}::{LINKTREE_MODULE}::{PROFILE_STRUCT}", self.package_id)
    }
}

/// `package::module::function`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MoveCallTarget {
    pub package: ObjectId,
    pub module: String,
    pub function: String,
}

impl fmt::Display for MoveCallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_render_fully_qualified() {
        let coords = ContractCoordinates::new(ObjectId::from_low_byte(0xaa), ObjectId::ZERO);
        let target = coords.target(CREATE_PROFILE).to_string();
        assert!(target.ends_with("aa::linktree::create_profile"));
        assert!(coords.click_target().to_string().ends_with("::linktree::click_link"));
        assert!(coords.profile_type().ends_with("::linktree::LinkTreeProfile"));
    }

    #[test]
    fn click_entry_defaults_when_missing() {
        let coords: ContractCoordinates = serde_json::from_value(serde_json::json!({
            "package_id": "0x1",
            "registry_id": "0x2",
        }))
        .unwrap();
        assert_eq!(coords.click_entry, ClickEntry::ClickLink);
    }
}
