// Process definition index: two-level terms aggregation and its reshaping

use serde_json::{json, Value};

use super::types::{DefinitionQuery, ProcessDefinitionIndex};
use crate::utils::serde_helpers::parse_i64;

pub(crate) const NAME_AGGREGATION: &str = "processId";
pub(crate) const KEY_AGGREGATION: &str = "defKey";

impl DefinitionQuery {
    /// Outer buckets by definition name, inner buckets by definition key
    pub fn aggregations(&self) -> Value {
        json!({
            NAME_AGGREGATION: {
                "terms": {
                    "field": self.name_field,
                    "size": self.name_bucket_limit,
                },
                "aggs": {
                    KEY_AGGREGATION: {
                        "terms": {
                            "field": self.key_field,
                            "size": self.key_bucket_limit,
                        }
                    }
                }
            }
        })
    }
}

/// Find an aggregation by name; typed responses prefix it, e.g. `sterms#processId`
fn find_aggregation<'a>(container: &'a Value, name: &str) -> Option<&'a Value> {
    let object = container.as_object()?;
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.rsplit_once('#').map(|(_, n)| n == name).unwrap_or(false))
            .map(|(_, value)| value)
    })
}

fn buckets<'a>(container: &'a Value, name: &str) -> Result<&'a Vec<Value>, String> {
    find_aggregation(container, name)
        .ok_or_else(|| format!("aggregation '{}' is missing", name))?
        .get("buckets")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("aggregation '{}' has no buckets", name))
}

fn bucket_name(bucket: &Value) -> Result<String, String> {
    match bucket.get("key") {
        Some(Value::String(name)) => Ok(name.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err("definition name bucket has no key".to_string()),
    }
}

/// Flatten the nested buckets into name -> keys, keeping the ranking the index returned
pub(crate) fn reshape(response: &Value) -> Result<ProcessDefinitionIndex, String> {
    let aggregations = response
        .get("aggregations")
        .ok_or_else(|| "response has no aggregations".to_string())?;

    let mut index = ProcessDefinitionIndex::new();
    for bucket in buckets(aggregations, NAME_AGGREGATION)? {
        let name = bucket_name(bucket)?;
        let keys = buckets(bucket, KEY_AGGREGATION)?
            .iter()
            .map(|key_bucket| {
                let key = key_bucket
                    .get("key")
                    .ok_or_else(|| format!("definition key bucket under '{}' has no key", name))?;
                parse_i64(key).map_err(|e| format!("definition key under '{}': {}", name, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        index.insert(name, keys);
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_buckets(keys: &[i64]) -> Value {
        Value::Array(
            keys.iter()
                .map(|k| json!({ "key": k, "doc_count": 1 }))
                .collect(),
        )
    }

    #[test]
    fn test_aggregations_use_configured_limits() {
        let query = DefinitionQuery {
            name_bucket_limit: 7,
            key_bucket_limit: 20,
            ..Default::default()
        };
        let aggs = query.aggregations();

        assert_eq!(aggs["processId"]["terms"]["field"], json!("value.bpmnProcessId"));
        assert_eq!(aggs["processId"]["terms"]["size"], json!(7));
        assert_eq!(
            aggs["processId"]["aggs"]["defKey"]["terms"]["field"],
            json!("value.processDefinitionKey")
        );
        assert_eq!(aggs["processId"]["aggs"]["defKey"]["terms"]["size"], json!(20));
    }

    #[test]
    fn test_reshape_plain_aggregation_names() {
        let response = json!({
            "aggregations": {
                "processId": {
                    "buckets": [
                        { "key": "procA", "doc_count": 9, "defKey": { "buckets": key_buckets(&[100, 200]) } },
                        { "key": "procB", "doc_count": 4, "defKey": { "buckets": key_buckets(&[300]) } }
                    ]
                }
            }
        });

        let index = reshape(&response).unwrap();
        assert_eq!(
            serde_json::to_string(&index).unwrap(),
            r#"{"procA":[100,200],"procB":[300]}"#
        );
    }

    #[test]
    fn test_reshape_typed_keys_and_string_definition_keys() {
        let response = json!({
            "aggregations": {
                "sterms#processId": {
                    "buckets": [
                        {
                            "key": "international_remittance_payer_process-ibank-usa",
                            "lterms#defKey": {
                                "buckets": [
                                    { "key": "2251799813686414" },
                                    { "key": 2251799814069794i64 }
                                ]
                            }
                        }
                    ]
                }
            }
        });

        let index = reshape(&response).unwrap();
        assert_eq!(
            index.get("international_remittance_payer_process-ibank-usa"),
            Some(&[2251799813686414, 2251799814069794][..])
        );
    }

    #[test]
    fn test_reshape_empty_buckets() {
        let response = json!({ "aggregations": { "processId": { "buckets": [] } } });
        assert!(reshape(&response).unwrap().is_empty());
    }

    #[test]
    fn test_reshape_rejects_malformed_responses() {
        assert!(reshape(&json!({ "hits": {} })).is_err());
        assert!(reshape(&json!({ "aggregations": {} })).is_err());

        let bad_key = json!({
            "aggregations": {
                "processId": {
                    "buckets": [{ "key": "procA", "defKey": { "buckets": [{ "key": "abc" }] } }]
                }
            }
        });
        assert!(reshape(&bad_key).unwrap_err().contains("procA"));
    }
}
