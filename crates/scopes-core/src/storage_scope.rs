//! Path scopes: filesystem paths granted in place of broad storage access.
//!
//! ## Wire Format
//!
//! ```text
//! [version: u8 = 0][count: u8]{ [len: u16][len bytes UTF-8 path][flags: u16] } * count
//! ```
//!
//! All integers are big-endian. An empty list is never encoded: it is
//! represented by the absence of the payload.

use bitflags::bitflags;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{CoreError, Result};
use crate::wire::WireReader;

/// Maximum number of path scopes per package.
///
/// The storage provider filters query results against every scope, so the
/// list length bounds the cost of each filtered query.
pub const MAX_PATH_SCOPES: usize = 20;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PathScopeFlags: u16 {
        const WRITABLE = 1;
        /// Absence means the scope names a single file.
        const IS_DIR = 1 << 1;
    }
}

/// A single granted filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathScope {
    pub path: String,
    pub flags: PathScopeFlags,
}

impl PathScope {
    pub fn new(path: impl Into<String>, flags: PathScopeFlags) -> Self {
        Self {
            path: path.into(),
            flags,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.flags.contains(PathScopeFlags::WRITABLE)
    }

    pub fn is_directory(&self) -> bool {
        self.flags.contains(PathScopeFlags::IS_DIR)
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory()
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

/// Encode a path scope list.
///
/// Returns `None` for an empty list.
///
/// # Panics
///
/// If the list holds more than [`MAX_PATH_SCOPES`] entries or a path is
/// longer than `u16::MAX` bytes. Both are caller bugs: the editing UI
/// enforces the limits before encoding.
pub fn encode(scopes: &[PathScope]) -> Option<Bytes> {
    if scopes.is_empty() {
        return None;
    }

    assert!(
        scopes.len() <= MAX_PATH_SCOPES,
        "too many path scopes: {} > {}",
        scopes.len(),
        MAX_PATH_SCOPES
    );

    let capacity = 2 + scopes.iter().map(|s| 4 + s.path.len()).sum::<usize>();
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_u8(Format::CURRENT.to_byte());
    buf.put_u8(scopes.len() as u8);

    for scope in scopes {
        let path = scope.path.as_bytes();
        let len = u16::try_from(path.len()).unwrap_or_else(|_| {
            panic!("path scope is too long: {} bytes", path.len());
        });
        buf.put_u16(len);
        buf.put_slice(path);
        buf.put_u16(scope.flags.bits());
    }

    Some(buf.freeze())
}

/// Decode a path scope list.
///
/// Never fails: an absent payload yields an empty list, and a corrupt or
/// unknown-version payload is logged and also yields an empty list.
pub fn decode(payload: Option<&[u8]>) -> Vec<PathScope> {
    let Some(payload) = payload else {
        return Vec::new();
    };

    match try_decode(payload) {
        Ok(scopes) => scopes,
        Err(e) => {
            error!(error = %e, len = payload.len(), "path scope deserialization failed");
            Vec::new()
        }
    }
}

/// Decode a path scope list, reporting why a payload was rejected.
pub fn try_decode(payload: &[u8]) -> Result<Vec<PathScope>> {
    let mut r = WireReader::new(payload);

    let version = r.u8()?;
    match Format::from_byte(version) {
        Some(Format::V0) => decode_v0(&mut r),
        None => Err(CoreError::UnsupportedVersion(version)),
    }
}

fn decode_v0(r: &mut WireReader<'_>) -> Result<Vec<PathScope>> {
    let count = r.u8()? as usize;
    if count > MAX_PATH_SCOPES {
        return Err(CoreError::LimitExceeded {
            what: "path scope count",
            actual: count,
            max: MAX_PATH_SCOPES,
        });
    }

    let mut scopes = Vec::with_capacity(count);
    for _ in 0..count {
        let len = r.u16()? as usize;
        let raw = r.take(len)?;
        let path = std::str::from_utf8(raw)
            .map_err(|e| CoreError::Decode(format!("path is not UTF-8: {}", e)))?;
        let flags = PathScopeFlags::from_bits_retain(r.u16()?);
        scopes.push(PathScope::new(path, flags));
    }

    Ok(scopes)
}
