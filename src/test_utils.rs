use crate::store::memory_store::MemoryStore;
use crate::store::Record;

use serde_json::{json, Value};

/// Convert a JSON object into a [Record].
pub(crate) fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Partitions used across tests.
///
/// `2020` mixes month spellings between records; `2019` uses a lower case material field.
pub(crate) fn get_test_partitions() -> Vec<(&'static str, Vec<Record>)> {
    vec![
        (
            "2020",
            vec![
                record(json!({"MATERIAL": "Steel", "Jan": 10, "Feb": 20})),
                record(json!({"MATERIAL": "Wood", "JAN": 5, "FEB": 5})),
            ],
        ),
        (
            "2019",
            vec![
                record(json!({"material": "brass", "january": 3, "february": 6, "unit": "t"})),
                record(json!({"material": "Aluminium", "january": 4, "february": 2, "unit": "t"})),
            ],
        ),
    ]
}

/// Create a MemoryStore holding the test partitions.
pub(crate) fn get_test_store() -> MemoryStore {
    get_test_partitions()
        .into_iter()
        .fold(MemoryStore::new(), |store, (name, records)| {
            store.with_partition(name, records)
        })
}
