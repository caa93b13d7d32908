//! SenML normalization - converting packs to resolved form

use crate::{SenMLNumber, SenMLPack, SenMLValue};

/// A normalized SenML pack where base fields have been resolved into every record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedPack {
    /// All records in resolved form
    pub records: Vec<NormalizedRecord>,
}

/// A fully resolved SenML record
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Full resolved name (current base name + record name)
    pub name: String,
    /// Resolved time (current base time + record time), `None` when neither is set
    pub time: Option<SenMLNumber>,
    /// Value carried by the record, if any
    pub value: Option<SenMLValue>,
}

impl NormalizedPack {
    /// Create a normalized pack from a regular SenML pack.
    ///
    /// `bn` and `bt` are sticky: once set they apply to every following record
    /// until another record sets them again. Names are concatenated as plain
    /// strings, so a base name may end in the middle of a path segment.
    pub fn from_pack(pack: &SenMLPack) -> Self {
        let mut base_name: Option<&str> = None;
        let mut base_time: Option<SenMLNumber> = None;
        let mut records = Vec::with_capacity(pack.len());

        for record in pack {
            if let Some(bn) = record.bn.as_deref() {
                base_name = Some(bn);
            }
            if let Some(bt) = record.bt {
                base_time = Some(bt);
            }

            let name = match (base_name, record.n.as_deref()) {
                (Some(base), Some(n)) => format!("{}{}", base, n),
                (Some(base), None) => base.to_string(),
                (None, Some(n)) => n.to_string(),
                (None, None) => String::new(),
            };

            let time = match (base_time, record.t) {
                (Some(bt), Some(t)) => Some(bt.add(t)),
                (Some(bt), None) => Some(bt),
                (None, t) => t,
            };

            records.push(NormalizedRecord {
                name,
                time,
                value: record.value(),
            });
        }

        Self { records }
    }
}
