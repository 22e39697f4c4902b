//! Builds the Elasticsearch-compatible query body: a `bool/must` wrapping a
//! `@timestamp` range and a `query_string` filter on `service.name` (or `*`
//! when no service is specified).

use serde_json::{json, Value};

use crate::duration::Window;

pub fn build_query(service_name: Option<&str>, window: Window) -> Value {
    let service_query = match service_name {
        Some(name) => format!("service.name: \"{name}\""),
        None => "*".to_string(),
    };

    json!({
        "bool": {
            "must": [
                {
                    "range": {
                        "@timestamp": {
                            "gte": window.start.to_rfc3339(),
                            "lte": window.end.to_rfc3339(),
                        }
                    }
                },
                {
                    "query_string": {
                        "query": service_query,
                    }
                }
            ]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window() -> Window {
        Window {
            start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap(),
        }
    }

    #[test]
    fn defaults_to_wildcard_service_query() {
        let query = build_query(None, window());
        assert_eq!(
            query["bool"]["must"][1]["query_string"]["query"],
            Value::String("*".to_string())
        );
    }

    #[test]
    fn filters_by_named_service() {
        let query = build_query(Some("API"), window());
        assert_eq!(
            query["bool"]["must"][1]["query_string"]["query"],
            Value::String("service.name: \"API\"".to_string())
        );
    }
}
