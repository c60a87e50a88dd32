//! Per-partition record schema.
//!
//! Every record in a partition stores its material identifier under the same field, but the
//! spelling of that field differs between partitions. The schema is resolved once from the first
//! record of a partition and then checked against every record a query reads.

use crate::error::VizzError;
use crate::store::Record;

use serde_json::Value;
use strum_macros::Display;

/// Spelling of the field holding the material identifier.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum MaterialField {
    #[strum(serialize = "MATERIAL")]
    Upper,
    #[strum(serialize = "Material")]
    Title,
    #[strum(serialize = "material")]
    Lower,
}

impl MaterialField {
    /// Candidate spellings in priority order.
    pub const PRIORITY: [MaterialField; 3] = [
        MaterialField::Upper,
        MaterialField::Title,
        MaterialField::Lower,
    ];

    /// Returns the field name.
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialField::Upper => "MATERIAL",
            MaterialField::Title => "Material",
            MaterialField::Lower => "material",
        }
    }

    /// Returns the highest priority spelling present in `record`.
    pub fn resolve(record: &Record) -> Option<MaterialField> {
        Self::PRIORITY
            .into_iter()
            .find(|field| record.contains_key(field.as_str()))
    }
}

/// Schema of the records in one partition.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionSchema {
    partition: String,
    material_field: MaterialField,
}

impl PartitionSchema {
    /// Resolve the schema of a partition from its first record.
    ///
    /// # Arguments
    ///
    /// * `partition`: Partition name, used in errors
    /// * `first`: The first record of the partition, if there is one
    pub fn resolve(partition: &str, first: Option<&Record>) -> Result<Self, VizzError> {
        let first = first.ok_or_else(|| VizzError::EmptyPartition {
            partition: partition.to_string(),
        })?;
        let material_field =
            MaterialField::resolve(first).ok_or_else(|| VizzError::MaterialFieldUnresolved {
                partition: partition.to_string(),
            })?;
        Ok(Self {
            partition: partition.to_string(),
            material_field,
        })
    }

    /// Resolve the schema of a partition from its full record set and validate every record.
    pub fn infer(partition: &str, records: &[Record]) -> Result<Self, VizzError> {
        let schema = Self::resolve(partition, records.first())?;
        schema.validate(records)?;
        Ok(schema)
    }

    /// Check that every record holds the material field.
    pub fn validate(&self, records: &[Record]) -> Result<(), VizzError> {
        let field = self.material_field.as_str();
        if records.iter().all(|record| record.contains_key(field)) {
            Ok(())
        } else {
            Err(self.mismatch())
        }
    }

    /// Returns the material field of this partition.
    pub fn material_field(&self) -> MaterialField {
        self.material_field
    }

    /// Returns the material identifier of a record.
    ///
    /// Text identifiers are returned as stored. Numeric identifiers are rendered as text. Any
    /// other value is a schema error.
    pub fn material_of(&self, record: &Record) -> Result<String, VizzError> {
        match record.get(self.material_field.as_str()) {
            Some(Value::String(material)) => Ok(material.clone()),
            Some(Value::Number(material)) => Ok(material.to_string()),
            Some(other) => Err(VizzError::InvalidMaterial {
                partition: self.partition.clone(),
                value: other.to_string(),
            }),
            None => Err(self.mismatch()),
        }
    }

    fn mismatch(&self) -> VizzError {
        VizzError::SchemaMismatch {
            partition: self.partition.clone(),
            field: self.material_field.as_str(),
        }
    }
}
