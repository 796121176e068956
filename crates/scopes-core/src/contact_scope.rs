//! Contact scopes: individual contacts, groups, numbers and emails granted
//! in place of the contacts permission.
//!
//! ## Wire Format
//!
//! ```text
//! [version: u8 = 0]{ [kind: u8][count: i32]{ [id: i64] } * count } *
//! ```
//!
//! Kind groups run until the end of input. Only non-empty kinds are
//! written, in kind order. All integers are big-endian.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{CoreError, Result};
use crate::wire::WireReader;

/// Maximum number of references across all kinds.
pub const MAX_CONTACT_SCOPES: usize = 100;

/// What a contact scope id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContactScopeKind {
    Group = 0,
    Contact = 1,
    Number = 2,
    Email = 3,
}

impl ContactScopeKind {
    pub const COUNT: usize = 4;

    pub const ALL: [Self; Self::COUNT] = [Self::Group, Self::Contact, Self::Number, Self::Email];

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Group),
            1 => Some(Self::Contact),
            2 => Some(Self::Number),
            3 => Some(Self::Email),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Contact references granted to a package, grouped by kind.
///
/// Ids keep insertion order within a kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactScopeSet {
    ids: [Vec<i64>; ContactScopeKind::COUNT],
}

impl ContactScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference. Returns false if it is already present or the set
    /// is full.
    pub fn add(&mut self, kind: ContactScopeKind, id: i64) -> bool {
        if self.count() >= MAX_CONTACT_SCOPES {
            return false;
        }
        let ids = &mut self.ids[kind.index()];
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);
        true
    }

    /// Remove a reference. Returns false if it was not present.
    pub fn remove(&mut self, kind: ContactScopeKind, id: i64) -> bool {
        let ids = &mut self.ids[kind.index()];
        match ids.iter().position(|&x| x == id) {
            Some(pos) => {
                ids.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, kind: ContactScopeKind, id: i64) -> bool {
        self.ids[kind.index()].contains(&id)
    }

    pub fn ids(&self, kind: ContactScopeKind) -> &[i64] {
        &self.ids[kind.index()]
    }

    /// Total number of references across all kinds.
    pub fn count(&self) -> usize {
        self.ids.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.iter().all(Vec::is_empty)
    }

    /// Encode the set. Returns `None` for an empty set.
    ///
    /// # Panics
    ///
    /// If the set holds more than [`MAX_CONTACT_SCOPES`] references, which
    /// [`add`](Self::add) never allows.
    pub fn encode(&self) -> Option<Bytes> {
        if self.is_empty() {
            return None;
        }

        let total = self.count();
        assert!(
            total <= MAX_CONTACT_SCOPES,
            "too many contact scopes: {} > {}",
            total,
            MAX_CONTACT_SCOPES
        );

        let mut buf = BytesMut::with_capacity(1 + ContactScopeKind::COUNT * 5 + total * 8);
        buf.put_u8(Format::CURRENT.to_byte());

        for kind in ContactScopeKind::ALL {
            let ids = self.ids(kind);
            if ids.is_empty() {
                continue;
            }
            buf.put_u8(kind.as_byte());
            buf.put_i32(ids.len() as i32);
            for &id in ids {
                buf.put_i64(id);
            }
        }

        Some(buf.freeze())
    }

    /// Decode a set. Absent, corrupt and unknown-version payloads all
    /// yield an empty set; failures are logged.
    pub fn decode(payload: Option<&[u8]>) -> Self {
        let Some(payload) = payload else {
            return Self::new();
        };

        match Self::try_decode(payload) {
            Ok(set) => set,
            Err(e) => {
                error!(error = %e, len = payload.len(), "contact scope deserialization failed");
                Self::new()
            }
        }
    }

    /// Decode a set, reporting why a payload was rejected.
    pub fn try_decode(payload: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(payload);

        let version = r.u8()?;
        match Format::from_byte(version) {
            Some(Format::V0) => decode_v0(&mut r),
            None => Err(CoreError::UnsupportedVersion(version)),
        }
    }
}

/// Known encoding versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    V0,
}

impl Format {
    const CURRENT: Self = Self::V0;

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::V0),
            _ => None,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::V0 => 0,
        }
    }
}

fn decode_v0(r: &mut WireReader<'_>) -> Result<ContactScopeSet> {
    let mut set = ContactScopeSet::new();
    while r.has_remaining() {
        let raw_kind = r.u8()?;
        let kind = ContactScopeKind::from_byte(raw_kind)
            .ok_or_else(|| CoreError::Decode(format!("unknown contact scope kind {}", raw_kind)))?;

        let count = r.i32()?;
        let count = usize::try_from(count)
            .map_err(|_| CoreError::Decode(format!("negative id count {}", count)))?;
        if count > MAX_CONTACT_SCOPES || count * 8 > r.remaining() {
            return Err(CoreError::Truncated {
                needed: count.saturating_mul(8),
                remaining: r.remaining(),
            });
        }

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(r.i64()?);
        }
        // A repeated kind replaces the earlier group.
        set.ids[kind.index()] = ids;

        let total = set.count();
        if total > MAX_CONTACT_SCOPES {
            return Err(CoreError::LimitExceeded {
                what: "contact scope count",
                actual: total,
                max: MAX_CONTACT_SCOPES,
            });
        }
    }

    Ok(set)
}

/// A single contact scope as presented by the contacts provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactScope {
    pub kind: ContactScopeKind,
    pub id: i64,
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Content URI of the referenced row, when it still exists.
    pub details_uri: Option<String>,
}

/// A contacts group as listed by the contacts provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactsGroup {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encodes_only_non_empty_kinds() {
        let mut set = ContactScopeSet::new();
        assert!(set.add(ContactScopeKind::Group, 1));
        assert!(set.add(ContactScopeKind::Group, 2));
        assert!(set.add(ContactScopeKind::Email, 7));

        let encoded = set.encode().unwrap();
        assert_eq!(
            hex::encode(&encoded),
            concat!(
                "00",
                "00", "00000002", "0000000000000001", "0000000000000002",
                "03", "00000001", "0000000000000007",
            )
        );
        assert_eq!(ContactScopeSet::decode(Some(&encoded)), set);
    }

    #[test]
    fn test_empty_set_is_absent() {
        assert_eq!(ContactScopeSet::new().encode(), None);
        assert!(ContactScopeSet::decode(None).is_empty());
        // A bare version byte is a valid empty encoding.
        assert!(ContactScopeSet::try_decode(&[0]).unwrap().is_empty());
    }

    #[test]
    fn test_add_rejects_duplicates_and_overflow() {
        let mut set = ContactScopeSet::new();
        assert!(set.add(ContactScopeKind::Contact, 5));
        assert!(!set.add(ContactScopeKind::Contact, 5));
        // Same id under a different kind is a different reference.
        assert!(set.add(ContactScopeKind::Number, 5));

        for id in 100..200 {
            set.add(ContactScopeKind::Email, id);
        }
        assert_eq!(set.count(), MAX_CONTACT_SCOPES);
        assert!(!set.add(ContactScopeKind::Group, 1));
    }

    #[test]
    fn test_remove() {
        let mut set = ContactScopeSet::new();
        set.add(ContactScopeKind::Group, 3);
        assert!(set.remove(ContactScopeKind::Group, 3));
        assert!(!set.remove(ContactScopeKind::Group, 3));
        assert!(set.is_empty());
    }

    #[test]
    fn test_corrupt_payloads_decode_to_empty() {
        // unknown version
        assert!(ContactScopeSet::decode(Some(&[1, 0, 0, 0, 0, 0])).is_empty());
        // unknown kind
        assert!(ContactScopeSet::decode(Some(&[0, 9, 0, 0, 0, 0])).is_empty());
        // count larger than the remaining input
        assert!(ContactScopeSet::decode(Some(&[0, 1, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 1])).is_empty());
        // negative count
        assert!(ContactScopeSet::decode(Some(&[0, 1, 0xff, 0xff, 0xff, 0xff])).is_empty());
    }

    #[test]
    fn test_unknown_version_is_reported() {
        assert!(matches!(
            ContactScopeSet::try_decode(&[1]),
            Err(CoreError::UnsupportedVersion(1))
        ));
        assert!(matches!(
            ContactScopeSet::try_decode(&[0xff, 1, 0, 0, 0, 0]),
            Err(CoreError::UnsupportedVersion(0xff))
        ));
        let mut set = ContactScopeSet::new();
        set.add(ContactScopeKind::Number, 1);
        assert_eq!(set.encode().unwrap()[0], Format::CURRENT.to_byte());
    }

    #[test]
    fn test_repeated_kind_replaces_earlier_group() {
        let payload = [
            0, //
            1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 4, //
            1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 8,
        ];
        let set = ContactScopeSet::decode(Some(&payload));
        assert_eq!(set.ids(ContactScopeKind::Contact), &[8]);
    }

    fn contact_scope_set() -> impl Strategy<Value = ContactScopeSet> {
        prop::collection::vec((0u8..4, any::<i64>()), 0..=MAX_CONTACT_SCOPES).prop_map(|refs| {
            let mut set = ContactScopeSet::new();
            for (kind, id) in refs {
                set.add(ContactScopeKind::from_byte(kind).unwrap(), id);
            }
            set
        })
    }

    proptest! {
        #[test]
        fn prop_roundtrip(set in contact_scope_set()) {
            let encoded = set.encode();
            prop_assert_eq!(encoded.is_none(), set.is_empty());
            prop_assert_eq!(ContactScopeSet::decode(encoded.as_deref()), set);
        }
    }
}
