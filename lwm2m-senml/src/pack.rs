//! SenML Pack - collection of SenML records

use crate::{Result, SenMLError, SenMLRecord};
use serde::{Deserialize, Serialize};

/// A SenML Pack represents a collection of SenML records
///
/// According to RFC 8428, a SenML Pack is an array of SenML Records. Base
/// fields (`bn`, `bt`) stay in effect for the following records until another
/// record overrides them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenMLPack {
    /// Array of SenML records
    pub records: Vec<SenMLRecord>,
}

impl SenMLPack {
    /// Create a new empty pack
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Add a record to this pack
    pub fn add_record(&mut self, record: SenMLRecord) {
        self.records.push(record);
    }

    /// Add multiple records to this pack
    pub fn add_records<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = SenMLRecord>,
    {
        self.records.extend(records);
    }

    /// Get the number of records in this pack
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if this pack is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in this pack
    pub fn iter(&self) -> impl Iterator<Item = &SenMLRecord> {
        self.records.iter()
    }

    /// Validate every record of this pack.
    ///
    /// An empty pack is valid: LwM2M uses it for empty multiple resources.
    pub fn validate(&self, allow_no_value: bool) -> Result<()> {
        for (i, record) in self.records.iter().enumerate() {
            record.validate(allow_no_value).map_err(|e| {
                SenMLError::validation(format!("Invalid record at index {}: {}", i, e))
            })?;
        }
        Ok(())
    }

    /// Convert this pack to a normalized form
    pub fn normalize(&self) -> crate::normalize::NormalizedPack {
        crate::normalize::NormalizedPack::from_pack(self)
    }
}

impl FromIterator<SenMLRecord> for SenMLPack {
    fn from_iter<I: IntoIterator<Item = SenMLRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SenMLPack {
    type Item = SenMLRecord;
    type IntoIter = std::vec::IntoIter<SenMLRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a SenMLPack {
    type Item = &'a SenMLRecord;
    type IntoIter = std::slice::Iter<'a, SenMLRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
