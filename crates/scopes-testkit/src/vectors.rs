//! Golden wire-format vectors.
//!
//! These vectors pin the byte layout of both scope encodings. Persisted
//! records written by older builds must keep decoding to the same lists.

use scopes_core::{storage_scope, ContactScopeKind, ContactScopeSet, PathScope, PathScopeFlags};

/// A path scope list and its encoding.
#[derive(Debug, Clone)]
pub struct PathScopeVector {
    pub name: &'static str,
    /// (path, raw flags) pairs.
    pub scopes: &'static [(&'static str, u16)],
    pub expected_hex: &'static str,
}

impl PathScopeVector {
    pub fn scopes(&self) -> Vec<PathScope> {
        self.scopes
            .iter()
            .map(|(path, flags)| PathScope::new(*path, PathScopeFlags::from_bits_retain(*flags)))
            .collect()
    }
}

/// A contact scope set and its encoding.
#[derive(Debug, Clone)]
pub struct ContactScopeVector {
    pub name: &'static str,
    pub groups: &'static [(ContactScopeKind, &'static [i64])],
    pub expected_hex: &'static str,
}

impl ContactScopeVector {
    pub fn set(&self) -> ContactScopeSet {
        let mut set = ContactScopeSet::new();
        for (kind, ids) in self.groups {
            for id in *ids {
                set.add(*kind, *id);
            }
        }
        set
    }
}

pub fn path_scope_vectors() -> Vec<PathScopeVector> {
    vec![
        PathScopeVector {
            name: "single writable directory",
            scopes: &[("/sdcard/Pictures", 0b11)],
            expected_hex: "000100102f7364636172642f50696374757265730003",
        },
        PathScopeVector {
            name: "directory and writable file",
            scopes: &[("/sdcard/DCIM", 0b10), ("/sdcard/notes.txt", 0b01)],
            expected_hex: "0002000c2f7364636172642f4443494d000200112f7364636172642f6e6f7465732e7478740001",
        },
        PathScopeVector {
            name: "read-only file",
            scopes: &[("/storage/emulated/0/Download/report.pdf", 0)],
            expected_hex: "000100272f73746f726167652f656d756c617465642f302f446f776e6c6f61642f7265706f72742e7064660000",
        },
    ]
}

pub fn contact_scope_vectors() -> Vec<ContactScopeVector> {
    vec![
        ContactScopeVector {
            name: "contact and two emails",
            groups: &[(ContactScopeKind::Contact, &[42]), (ContactScopeKind::Email, &[7, 9])],
            expected_hex: "000100000001000000000000002a030000000200000000000000070000000000000009",
        },
        ContactScopeVector {
            name: "group and negative number id",
            groups: &[(ContactScopeKind::Group, &[5]), (ContactScopeKind::Number, &[-1])],
            expected_hex: "00000000000100000000000000050200000001ffffffffffffffff",
        },
    ]
}

/// Check every vector in both directions.
pub fn verify_all_vectors() -> Result<(), String> {
    for v in path_scope_vectors() {
        let encoded = storage_scope::encode(&v.scopes()).ok_or_else(|| format!("{}: encoded to nothing", v.name))?;
        if hex::encode(&encoded) != v.expected_hex {
            return Err(format!("{}: encoded {}", v.name, hex::encode(&encoded)));
        }
        let bytes = hex::decode(v.expected_hex).map_err(|e| format!("{}: {}", v.name, e))?;
        if storage_scope::decode(Some(&bytes)) != v.scopes() {
            return Err(format!("{}: decoded list differs", v.name));
        }
    }

    for v in contact_scope_vectors() {
        let encoded = v.set().encode().ok_or_else(|| format!("{}: encoded to nothing", v.name))?;
        if hex::encode(&encoded) != v.expected_hex {
            return Err(format!("{}: encoded {}", v.name, hex::encode(&encoded)));
        }
        let bytes = hex::decode(v.expected_hex).map_err(|e| format!("{}: {}", v.name, e))?;
        if ContactScopeSet::decode(Some(&bytes)) != v.set() {
            return Err(format!("{}: decoded set differs", v.name));
        }
    }

    Ok(())
}
