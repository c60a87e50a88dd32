//! Request parameters and response bodies of the query API.

use crate::month::Month;

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;
use validator::Validate;

/// Material value selecting every material in a partition.
pub const ALL_MATERIALS: &str = "All";

/// Query parameters of the options listing. There are none.
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
pub struct OptionsParams {}

/// Query parameters of the materials listing.
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
pub struct MaterialsParams {
    /// Year partition
    #[serde(default)]
    #[validate(length(min = 1, message = "year is required"))]
    pub year: String,
}

/// Query parameters of the months listing and the monthly aggregation.
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
pub struct MaterialParams {
    /// Year partition
    #[serde(default)]
    #[validate(length(min = 1, message = "year is required"))]
    pub year: String,
    /// Material identifier, or [ALL_MATERIALS]
    #[serde(default)]
    #[validate(length(min = 1, message = "material is required"))]
    pub material: String,
}

impl MaterialParams {
    /// Returns the material filter these parameters select.
    pub fn filter(&self) -> MaterialFilter<'_> {
        MaterialFilter::from_param(&self.material)
    }
}

/// Query parameters of the month pair comparison.
///
/// The month fields are literal record keys and are not normalised.
#[derive(Debug, Default, Deserialize, PartialEq, Validate)]
pub struct CompareParams {
    /// Year partition
    #[serde(default)]
    #[validate(length(min = 1, message = "year is required"))]
    pub year: String,
    /// Field holding the baseline volume
    #[serde(default)]
    #[validate(length(min = 1, message = "month1 is required"))]
    pub month1: String,
    /// Field holding the compared volume
    #[serde(default)]
    #[validate(length(min = 1, message = "month2 is required"))]
    pub month2: String,
}

/// Which records a monthly aggregation covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaterialFilter<'a> {
    /// Every record in the partition
    All,
    /// Only records of one material
    Only(&'a str),
}

impl<'a> MaterialFilter<'a> {
    /// Interpret a `material` query parameter.
    pub fn from_param(material: &'a str) -> Self {
        if material == ALL_MATERIALS {
            MaterialFilter::All
        } else {
            MaterialFilter::Only(material)
        }
    }
}

/// Response of the options listing.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct YearsResponse {
    pub years: Vec<String>,
}

/// Response of the materials listing.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct MaterialsResponse {
    pub materials: Vec<String>,
}

/// Response of the months listing.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct MonthsResponse {
    pub months: Vec<String>,
}

/// Response of the monthly aggregation.
#[derive(Debug, PartialEq, Serialize)]
pub struct DataResponse {
    pub data: BTreeMap<Month, Volume>,
}

/// A summed volume.
///
/// Integral volumes serialise as JSON integers, others as floats.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Volume(pub f64);

/// Largest magnitude below which every integral f64 is exactly representable as an i64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl AddAssign<f64> for Volume {
    fn add_assign(&mut self, rhs: f64) {
        self.0 += rhs;
    }
}

impl Serialize for Volume {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0.abs() < MAX_EXACT_INTEGER {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// Percentage change from one month to another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PercentageDifference {
    /// A finite percentage
    Defined(f64),
    /// The baseline is zero, so the change is unbounded
    Undefined,
}

/// Text rendering of [PercentageDifference::Undefined].
pub const UNDEFINED_PERCENTAGE: &str = "undefined";

impl PercentageDifference {
    /// Compute the change from `from` to `to` as a percentage of `from`.
    pub fn between(from: f64, to: f64) -> Self {
        if from == 0.0 {
            return PercentageDifference::Undefined;
        }
        let percentage = (to - from) / from * 100.0;
        if !percentage.is_finite() {
            PercentageDifference::Undefined
        } else if percentage == 0.0 {
            // Drop the sign of negative zero.
            PercentageDifference::Defined(0.0)
        } else {
            PercentageDifference::Defined(percentage)
        }
    }
}

/// Returns `percentage` in hundredths, rounded away from zero, if it lies exactly halfway
/// between two hundredths.
fn midpoint_hundredths(percentage: f64) -> Option<i64> {
    let scaled = percentage * 100.0;
    // The product must be exact for the tie to be a tie of the stored value.
    let exact = percentage.mul_add(100.0, -scaled) == 0.0;
    (exact && scaled.fract().abs() == 0.5).then(|| scaled.round() as i64)
}

impl fmt::Display for PercentageDifference {
    /// Two decimal places, or [UNDEFINED_PERCENTAGE].
    ///
    /// Values halfway between two hundredths round away from zero.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentageDifference::Defined(percentage) => match midpoint_hundredths(*percentage) {
                Some(hundredths) => {
                    let sign = if hundredths < 0 { "-" } else { "" };
                    let hundredths = hundredths.unsigned_abs();
                    write!(f, "{}{}.{:02}", sign, hundredths / 100, hundredths % 100)
                }
                None => write!(f, "{percentage:.2}"),
            },
            PercentageDifference::Undefined => f.write_str(UNDEFINED_PERCENTAGE),
        }
    }
}

impl Serialize for PercentageDifference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One entry of the month pair comparison.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub material: String,
    pub percentage_difference: PercentageDifference,
}
