//! Fingerprint Engine: order-independent digests of table contents.
//!
//! Each row is serialized to canonical JSON (object keys sorted) and hashed
//! with SHA-256. Row digests are combined by lane-wise wrapping addition, which
//! is commutative, so iteration order never affects the result. The combined
//! lanes, the row count and the table name are hashed once more to produce the
//! table fingerprint.

use crate::{Row, Table};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// SHA-256 digest of a table or of the whole model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Fingerprint the rows of `table`, in any order.
    pub fn of_rows<'a, R, I>(table: Table, rows: I) -> Self
    where
        R: Row,
        I: IntoIterator<Item = &'a R>,
    {
        let mut lanes = [0u64; 4];
        let mut count = 0u64;
        for row in rows {
            let digest = row_digest(row);
            for (lane, chunk) in lanes.iter_mut().zip(digest.chunks_exact(8)) {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                *lane = lane.wrapping_add(u64::from_le_bytes(bytes));
            }
            count += 1;
        }

        let mut hasher = Sha256::new();
        hasher.update(table.as_ref().as_bytes());
        hasher.update(count.to_le_bytes());
        for lane in lanes {
            hasher.update(lane.to_le_bytes());
        }
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Digest of one row's canonical serialization.
pub fn row_digest<R: Row>(row: &R) -> [u8; 32] {
    // serde_json::Value sorts object keys, giving a field-order-independent encoding
    let canonical = serde_json::to_value(row)
        .and_then(|value| serde_json::to_vec(&value))
        .unwrap_or_else(|_| format!("{:?}", row).into_bytes());
    Sha256::digest(&canonical).into()
}

/// Per-table fingerprints with a derived global digest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprints(BTreeMap<Table, Fingerprint>);

impl Fingerprints {
    /// Fingerprint recorded for `table`, if any.
    pub fn get(&self, table: Table) -> Option<Fingerprint> {
        self.0.get(&table).copied()
    }

    /// Record the fingerprint of `table`.
    pub fn insert(&mut self, table: Table, fingerprint: Fingerprint) {
        self.0.insert(table, fingerprint);
    }

    /// Number of tables recorded.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no table has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate tables and fingerprints in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Table, Fingerprint)> + '_ {
        self.0.iter().map(|(table, fp)| (*table, *fp))
    }

    /// Digest over every recorded table fingerprint, in table order.
    pub fn global(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        for (table, fingerprint) in &self.0 {
            hasher.update(table.as_ref().as_bytes());
            hasher.update(fingerprint.as_bytes());
        }
        Fingerprint(hasher.finalize().into())
    }
}

impl FromIterator<(Table, Fingerprint)> for Fingerprints {
    fn from_iter<T: IntoIterator<Item = (Table, Fingerprint)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
