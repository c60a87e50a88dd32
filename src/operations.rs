//! Query operations.
//!
//! Each operation is implemented as a struct that implements the
//! [Query](crate::operation::Query) trait. The record-level computations are plain functions so
//! that they can be exercised without a store.

use std::collections::{BTreeMap, HashSet};

use crate::collation::{caseless_cmp, natural_cmp};
use crate::error::VizzError;
use crate::models::{
    CompareParams, Comparison, DataResponse, MaterialFilter, MaterialParams, MaterialsParams,
    MaterialsResponse, MonthsResponse, OptionsParams, PercentageDifference, Volume, YearsResponse,
};
use crate::month::Month;
use crate::operation::Query;
use crate::schema::PartitionSchema;
use crate::store::{DocumentStore, Record};

use async_trait::async_trait;
use serde_json::Value;

/// Returns the numeric value of a record field, counting absent or non-numeric values as zero.
fn volume_of(record: &Record, field: &str) -> f64 {
    record.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Returns the distinct material identifiers of `records`, sorted case-insensitively.
///
/// Identifiers differing only by case keep their first-seen order.
pub fn distinct_materials(
    schema: &PartitionSchema,
    records: &[Record],
) -> Result<Vec<String>, VizzError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut materials: Vec<String> = vec![];
    for record in records {
        let material = schema.material_of(record)?;
        if seen.insert(material.clone()) {
            materials.push(material);
        }
    }
    materials.sort_by(|a, b| caseless_cmp(a, b));
    Ok(materials)
}

/// Returns the month field names of `records` as spelled in the records, in first-seen order.
///
/// Fields are deduplicated by spelling, so `Jan` and `JAN` are both returned if both occur.
pub fn month_fields(records: &[Record]) -> Vec<String> {
    let mut fields: Vec<String> = vec![];
    for record in records {
        for field in record.keys() {
            if Month::parse(field).is_some() && !fields.contains(field) {
                fields.push(field.clone());
            }
        }
    }
    fields
}

/// Sums the month fields of `records` by canonical month.
pub fn sum_by_month(records: &[Record]) -> BTreeMap<Month, Volume> {
    let mut sums: BTreeMap<Month, Volume> = BTreeMap::new();
    for record in records {
        for (field, value) in record {
            if let Some(month) = Month::parse(field) {
                *sums.entry(month).or_default() += value.as_f64().unwrap_or(0.0);
            }
        }
    }
    sums
}

/// Computes the percentage change from field `month1` to field `month2` for every record.
pub fn percentage_differences(
    schema: &PartitionSchema,
    records: &[Record],
    month1: &str,
    month2: &str,
) -> Result<Vec<Comparison>, VizzError> {
    records
        .iter()
        .map(|record| {
            Ok(Comparison {
                material: schema.material_of(record)?,
                percentage_difference: PercentageDifference::between(
                    volume_of(record, month1),
                    volume_of(record, month2),
                ),
            })
        })
        .collect()
}

/// Reads the records of a partition matching a material filter, along with the partition schema.
///
/// The schema is resolved from the first record of the partition and validated against every
/// record read.
async fn read_partition(
    store: &dyn DocumentStore,
    partition: &str,
    filter: MaterialFilter<'_>,
) -> Result<(PartitionSchema, Vec<Record>), VizzError> {
    match filter {
        MaterialFilter::All => {
            let records = store.find_all(partition).await?;
            let schema = PartitionSchema::infer(partition, &records)?;
            Ok((schema, records))
        }
        MaterialFilter::Only(material) => {
            let first = store.find_one(partition).await?;
            let schema = PartitionSchema::resolve(partition, first.as_ref())?;
            let records = store
                .find_matching(partition, schema.material_field().as_str(), material)
                .await?;
            schema.validate(&records)?;
            Ok((schema, records))
        }
    }
}

/// List the year partitions in natural order.
pub struct Options {}

#[async_trait]
impl Query for Options {
    const NAME: &'static str = "options";
    type Params = OptionsParams;
    type Output = YearsResponse;

    async fn execute(
        store: &dyn DocumentStore,
        _params: &Self::Params,
    ) -> Result<Self::Output, VizzError> {
        let mut years = store.list_partitions().await?;
        years.sort_by(|a, b| natural_cmp(a, b));
        Ok(YearsResponse { years })
    }
}

/// List the distinct materials of a year partition.
pub struct Materials {}

#[async_trait]
impl Query for Materials {
    const NAME: &'static str = "materials";
    type Params = MaterialsParams;
    type Output = MaterialsResponse;

    async fn execute(
        store: &dyn DocumentStore,
        params: &Self::Params,
    ) -> Result<Self::Output, VizzError> {
        let (schema, records) = read_partition(store, &params.year, MaterialFilter::All).await?;
        let materials = distinct_materials(&schema, &records)?;
        tracing::debug!(
            "{} materials in {} records of {}",
            materials.len(),
            records.len(),
            params.year
        );
        Ok(MaterialsResponse { materials })
    }
}

/// List the month fields present for a material.
pub struct Months {}

#[async_trait]
impl Query for Months {
    const NAME: &'static str = "months";
    type Params = MaterialParams;
    type Output = MonthsResponse;

    async fn execute(
        store: &dyn DocumentStore,
        params: &Self::Params,
    ) -> Result<Self::Output, VizzError> {
        let filter = MaterialFilter::Only(&params.material);
        let (_, records) = read_partition(store, &params.year, filter).await?;
        Ok(MonthsResponse {
            months: month_fields(&records),
        })
    }
}

/// Sum monthly volumes for one material or, given `All`, every material.
pub struct Data {}

#[async_trait]
impl Query for Data {
    const NAME: &'static str = "data";
    type Params = MaterialParams;
    type Output = DataResponse;

    async fn execute(
        store: &dyn DocumentStore,
        params: &Self::Params,
    ) -> Result<Self::Output, VizzError> {
        let (_, records) = read_partition(store, &params.year, params.filter()).await?;
        tracing::debug!("Summing {} records of {}", records.len(), params.year);
        let data = sum_by_month(&records);
        if let Some((month, _)) = data.iter().find(|(_, volume)| !volume.0.is_finite()) {
            return Err(VizzError::VolumeOverflow {
                partition: params.year.clone(),
                material: params.material.clone(),
                month: *month,
            });
        }
        Ok(DataResponse { data })
    }
}

/// Compare two month fields of every record in a year partition.
pub struct Compare {}

#[async_trait]
impl Query for Compare {
    const NAME: &'static str = "compare";
    type Params = CompareParams;
    type Output = Vec<Comparison>;

    async fn execute(
        store: &dyn DocumentStore,
        params: &Self::Params,
    ) -> Result<Self::Output, VizzError> {
        let (schema, records) = read_partition(store, &params.year, MaterialFilter::All).await?;
        percentage_differences(&schema, &records, &params.month1, &params.month2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::models::UNDEFINED_PERCENTAGE;
    use crate::store::memory_store::MemoryStore;
    use crate::test_utils::{self, record};

    use serde_json::json;

    fn material_params(year: &str, material: &str) -> MaterialParams {
        MaterialParams {
            year: year.to_string(),
            material: material.to_string(),
        }
    }

    fn compare_params(year: &str, month1: &str, month2: &str) -> CompareParams {
        CompareParams {
            year: year.to_string(),
            month1: month1.to_string(),
            month2: month2.to_string(),
        }
    }

    #[tokio::test]
    async fn options_natural_order() {
        let store = MemoryStore::new()
            .with_partition("2020", vec![])
            .with_partition("10000", vec![])
            .with_partition("2019", vec![]);
        let response = Options::execute(&store, &OptionsParams {}).await.unwrap();
        assert_eq!(vec!["2019", "2020", "10000"], response.years);
    }

    #[tokio::test]
    async fn materials_distinct_and_caseless_sorted() {
        let records = vec![
            record(json!({"Material": "wood", "Jan": 1})),
            record(json!({"Material": "Steel", "Jan": 1})),
            record(json!({"Material": "aluminium", "Jan": 1})),
            record(json!({"Material": "steel", "Jan": 1})),
            record(json!({"Material": "Steel", "Jan": 1})),
        ];
        let store = MemoryStore::new().with_partition("2021", records);
        let params = MaterialsParams {
            year: "2021".to_string(),
        };
        let response = Materials::execute(&store, &params).await.unwrap();
        assert_eq!(
            vec!["aluminium", "Steel", "steel", "wood"],
            response.materials
        );
    }

    #[tokio::test]
    async fn materials_absent_partition() {
        let store = test_utils::get_test_store();
        let params = MaterialsParams {
            year: "1999".to_string(),
        };
        let error = Materials::execute(&store, &params).await.unwrap_err();
        assert!(matches!(error, VizzError::EmptyPartition { .. }));
    }

    #[tokio::test]
    async fn materials_schema_mismatch() {
        let records = vec![
            record(json!({"MATERIAL": "Steel", "Jan": 1})),
            record(json!({"Material": "Wood", "Jan": 1})),
        ];
        let store = MemoryStore::new().with_partition("2021", records);
        let params = MaterialsParams {
            year: "2021".to_string(),
        };
        let error = Materials::execute(&store, &params).await.unwrap_err();
        assert!(matches!(error, VizzError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn months_keep_original_spelling() {
        let store = test_utils::get_test_store();
        let response = Months::execute(&store, &material_params("2020", "Steel"))
            .await
            .unwrap();
        assert_eq!(vec!["Jan", "Feb"], response.months);
        let response = Months::execute(&store, &material_params("2020", "Wood"))
            .await
            .unwrap();
        assert_eq!(vec!["JAN", "FEB"], response.months);
    }

    #[tokio::test]
    async fn months_unknown_material() {
        let store = test_utils::get_test_store();
        let response = Months::execute(&store, &material_params("2020", "Glass"))
            .await
            .unwrap();
        assert!(response.months.is_empty());
    }

    #[test]
    fn month_fields_dedup_by_spelling() {
        let records = vec![
            record(json!({"MATERIAL": "Steel", "Jan": 1, "notes": "x", "Feb": 2})),
            record(json!({"MATERIAL": "Steel", "JAN": 1, "Jan": 3, "March": 4})),
        ];
        assert_eq!(vec!["Jan", "Feb", "JAN", "March"], month_fields(&records));
    }

    #[tokio::test]
    async fn data_all_materials() {
        let store = test_utils::get_test_store();
        let response = Data::execute(&store, &material_params("2020", "All"))
            .await
            .unwrap();
        assert_eq!(
            json!({"data": {"JAN": 15, "FEB": 25}}),
            serde_json::to_value(&response).unwrap()
        );
    }

    #[tokio::test]
    async fn data_single_material() {
        let store = test_utils::get_test_store();
        let response = Data::execute(&store, &material_params("2020", "Steel"))
            .await
            .unwrap();
        let expected = BTreeMap::from([(Month::Jan, Volume(10.0)), (Month::Feb, Volume(20.0))]);
        assert_eq!(expected, response.data);
    }

    #[tokio::test]
    async fn data_all_equals_sum_over_materials() {
        let records = vec![
            record(json!({"material": "Steel", "jan": 10, "FEB": 2.5, "unit": "t"})),
            record(json!({"material": "Wood", "January": 5, "december": 1})),
            record(json!({"material": "Steel", "Jan": 1, "Dec": "n/a"})),
            record(json!({"material": "Brass", "MAY": 7, "May": 3})),
        ];
        let store = MemoryStore::new().with_partition("2018", records);
        let all = Data::execute(&store, &material_params("2018", "All"))
            .await
            .unwrap()
            .data;

        let materials = Materials::execute(
            &store,
            &MaterialsParams {
                year: "2018".to_string(),
            },
        )
        .await
        .unwrap()
        .materials;
        let mut summed: BTreeMap<Month, Volume> = BTreeMap::new();
        for material in &materials {
            let data = Data::execute(&store, &material_params("2018", material))
                .await
                .unwrap()
                .data;
            for (month, volume) in data {
                *summed.entry(month).or_default() += volume.0;
            }
        }
        assert_eq!(summed, all);
        assert_eq!(Some(&Volume(16.0)), all.get(&Month::Jan));
        assert_eq!(Some(&Volume(10.0)), all.get(&Month::May));
        assert_eq!(Some(&Volume(1.0)), all.get(&Month::Dec));
    }

    #[test]
    fn sum_by_month_non_numeric_is_zero() {
        let records = vec![record(json!({"MATERIAL": "Steel", "Jan": "12", "Feb": null}))];
        let sums = sum_by_month(&records);
        assert_eq!(Some(&Volume(0.0)), sums.get(&Month::Jan));
        assert_eq!(Some(&Volume(0.0)), sums.get(&Month::Feb));
        assert_eq!(None, sums.get(&Month::Mar));
    }

    #[tokio::test]
    async fn data_empty_partition() {
        let store = MemoryStore::new().with_partition("2020", vec![]);
        for material in ["All", "Steel"] {
            let error = Data::execute(&store, &material_params("2020", material))
                .await
                .unwrap_err();
            assert!(matches!(error, VizzError::EmptyPartition { .. }));
        }
    }

    #[tokio::test]
    async fn data_overflowing_total() {
        let store = MemoryStore::new().with_partition(
            "2020",
            vec![
                record(json!({"MATERIAL": "Steel", "Jan": f64::MAX, "Feb": 1})),
                record(json!({"MATERIAL": "Wood", "Jan": f64::MAX, "Feb": 1})),
            ],
        );
        let error = Data::execute(&store, &material_params("2020", "All"))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            VizzError::VolumeOverflow { month: Month::Jan, .. }
        ));
        let steel = Data::execute(&store, &material_params("2020", "Steel"))
            .await
            .unwrap();
        assert_eq!(Some(&Volume(1.0)), steel.data.get(&Month::Feb));
    }

    #[tokio::test]
    async fn compare_months() {
        let store = test_utils::get_test_store();
        let response = Compare::execute(&store, &compare_params("2020", "Jan", "Feb"))
            .await
            .unwrap();
        // Wood spells its months JAN and FEB, so its Jan value is absent.
        assert_eq!(
            vec![
                Comparison {
                    material: "Steel".to_string(),
                    percentage_difference: PercentageDifference::Defined(100.0),
                },
                Comparison {
                    material: "Wood".to_string(),
                    percentage_difference: PercentageDifference::Undefined,
                },
            ],
            response
        );
        assert_eq!("100.00", response[0].percentage_difference.to_string());
        assert_eq!(
            UNDEFINED_PERCENTAGE,
            response[1].percentage_difference.to_string()
        );
    }

    #[tokio::test]
    async fn compare_zero_baseline() {
        let records = vec![record(json!({"MATERIAL": "Steel", "Jan": 0, "Feb": 20}))];
        let store = MemoryStore::new().with_partition("2020", records);
        let response = Compare::execute(&store, &compare_params("2020", "Jan", "Feb"))
            .await
            .unwrap();
        assert_eq!(
            PercentageDifference::Undefined,
            response[0].percentage_difference
        );
    }

    #[tokio::test]
    async fn compare_literal_field_names() {
        let store = test_utils::get_test_store();
        let response = Compare::execute(&store, &compare_params("2020", "JAN", "FEB"))
            .await
            .unwrap();
        assert_eq!(PercentageDifference::Undefined, response[0].percentage_difference);
        assert_eq!(
            PercentageDifference::Defined(0.0),
            response[1].percentage_difference
        );
    }
}
