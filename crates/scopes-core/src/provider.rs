//! Identifiers shared with the storage and contacts virtualization
//! providers, and the configuration activity requests.
//!
//! The providers themselves live elsewhere; only names and payload shapes
//! are defined here.

use serde::{Deserialize, Serialize};

use crate::types::PackageName;

/// Authority of the real contacts provider.
pub const CONTACTS_AUTHORITY: &str = "com.android.contacts";

/// Authority of the virtualized contacts provider.
pub const SCOPED_CONTACTS_AUTHORITY: &str = "com.android.contacts.scoped";

/// Authority of the SIM phonebook provider.
pub const SIM_PHONEBOOK_AUTHORITY: &str = "com.android.simphonebook";

/// Authority of the legacy SIM phonebook provider.
pub const ICC_AUTHORITY: &str = "icc";

/// Suffix of the empty stand-in providers for the SIM phonebooks.
pub const STUB_AUTHORITY_SUFFIX: &str = ".stub";

/// Broadcast asking processes to drive their suppressed contacts observers.
pub const ACTION_NOTIFY_CONTENT_OBSERVERS: &str =
    "android.ext.cscopes.action.NOTIFY_CONTENT_OBSERVERS";

/// Payload keys of provider method calls.
pub mod key {
    pub const URI: &str = "uri";
    pub const ID: &str = "id";
    pub const RESULT: &str = "result";
}

/// Named methods exposed by the virtualization providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderMethod {
    /// Media provider: drop cached scope lists after a state change.
    InvalidateMediaProviderCache,
    /// Media provider: resolve a media id to its file path.
    MediaIdToFilePath,
    /// External storage provider: resolve a document id to a path.
    ConvertDocIdToPath,
    /// Scoped contacts provider: resolve a picked URI to a scope id.
    GetIdFromUri,
    /// Scoped contacts provider: fetch the configuration screen model.
    GetViewModel,
    /// Scoped contacts provider: list contact groups.
    GetGroups,
}

impl ProviderMethod {
    const ALL: [Self; 6] = [
        Self::InvalidateMediaProviderCache,
        Self::MediaIdToFilePath,
        Self::ConvertDocIdToPath,
        Self::GetIdFromUri,
        Self::GetViewModel,
        Self::GetGroups,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InvalidateMediaProviderCache => "StorageScopes_invalidateCache",
            Self::MediaIdToFilePath => "StorageScopes_mediaIdToFilePath",
            Self::ConvertDocIdToPath => "StorageScopes_convertDocIdToPath",
            Self::GetIdFromUri => "get_id_from_uri",
            Self::GetViewModel => "get_view_model",
            Self::GetGroups => "get_groups",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Payload keys the caller supplies.
    pub fn argument_keys(self) -> &'static [&'static str] {
        match self {
            Self::InvalidateMediaProviderCache | Self::GetViewModel | Self::GetGroups => &[],
            Self::MediaIdToFilePath | Self::ConvertDocIdToPath => &[key::ID],
            Self::GetIdFromUri => &[key::URI],
        }
    }
}

/// Package hosting the configuration activities.
pub const CONFIG_ACTIVITY_PACKAGE: &str = "com.android.permissioncontroller";

/// Intent extra naming the package to configure.
pub const EXTRA_PACKAGE_NAME: &str = "android.intent.extra.PACKAGE_NAME";

/// Which configuration screen to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigScreen {
    StorageScopes,
    ContactScopes,
}

/// An opaque request to open a scope configuration screen for a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRequest {
    pub package: &'static str,
    /// Activity class, relative to `package`.
    pub activity: &'static str,
    pub target: PackageName,
}

impl ConfigRequest {
    pub fn new(screen: ConfigScreen, target: PackageName) -> Self {
        let activity = match screen {
            ConfigScreen::StorageScopes => ".sscopes.StorageScopesActivity",
            ConfigScreen::ContactScopes => ".cscopes.ContactScopesActivity",
        };
        Self {
            package: CONFIG_ACTIVITY_PACKAGE,
            activity,
            target,
        }
    }

    /// Fully qualified activity class name.
    pub fn component(&self) -> String {
        format!("{}{}", self.package, self.activity)
    }

    /// Extras carried by the request.
    pub fn extras(&self) -> [(&'static str, &str); 1] {
        [(EXTRA_PACKAGE_NAME, self.target.as_str())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_roundtrip() {
        for m in ProviderMethod::ALL {
            assert_eq!(ProviderMethod::from_name(m.name()), Some(m));
        }
        assert_eq!(ProviderMethod::from_name("query"), None);
    }

    #[test]
    fn test_config_request_carries_only_the_target() {
        let req = ConfigRequest::new(ConfigScreen::ContactScopes, PackageName::new("org.example.chat"));
        assert_eq!(
            req.component(),
            "com.android.permissioncontroller.cscopes.ContactScopesActivity"
        );
        assert_eq!(req.extras(), [(EXTRA_PACKAGE_NAME, "org.example.chat")]);
    }
}
