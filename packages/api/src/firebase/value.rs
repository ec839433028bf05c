//! Firestore typed values ↔ plain JSON.
//!
//! Firestore's REST API wraps every field in a type tag:
//! `{"title": {"stringValue": "A"}, "size": {"integerValue": "42"}}`.
//! Records in this app are plain serde structs, so documents cross the wire
//! through [`encode_fields`] and [`decode_fields`]. Timestamps decode to their
//! RFC 3339 string, which is what chrono's serde expects.

use serde_json::{json, Map, Number, Value};

use store::Document;

/// Fields stored as Firestore timestamps. Their RFC 3339 strings are sent as
/// `timestampValue` so records match the ones the web console and other
/// clients write.
pub const TIMESTAMP_FIELDS: [&str; 1] = ["uploadedAt"];

/// Encode a plain JSON document as a Firestore `fields` map.
pub fn encode_fields(doc: &Document) -> Value {
    Value::Object(
        doc.iter()
            .map(|(k, v)| {
                let encoded = match v {
                    Value::String(s) if TIMESTAMP_FIELDS.contains(&k.as_str()) => {
                        json!({ "timestampValue": s })
                    }
                    other => encode_value(other),
                };
                (k.clone(), encoded)
            })
            .collect(),
    )
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => json!({ "integerValue": i.to_string() }),
            (None, Some(u)) => json!({ "integerValue": u.to_string() }),
            _ => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({
            "mapValue": { "fields": encode_fields(map) }
        }),
    }
}

/// Decode a Firestore `fields` map. A missing map is an empty document.
pub fn decode_fields(fields: Option<&Value>) -> Result<Document, String> {
    let Some(fields) = fields else {
        return Ok(Map::new());
    };
    let map = fields
        .as_object()
        .ok_or_else(|| format!("fields is not an object: {fields}"))?;
    map.iter()
        .map(|(k, v)| decode_value(v).map(|v| (k.clone(), v)))
        .collect()
}

pub fn decode_value(value: &Value) -> Result<Value, String> {
    let tagged = value
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| format!("not a typed value: {value}"))?;
    let (tag, inner) = tagged
        .iter()
        .next()
        .ok_or_else(|| format!("not a typed value: {value}"))?;

    match tag.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or_default())),
        "integerValue" => {
            let digits = inner
                .as_str()
                .ok_or_else(|| format!("integerValue is not a string: {inner}"))?;
            let n: i64 = digits
                .parse()
                .map_err(|e| format!("bad integerValue {digits:?}: {e}"))?;
            Ok(Value::Number(n.into()))
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("bad doubleValue: {inner}")),
        "stringValue" | "timestampValue" | "referenceValue" => Ok(inner.clone()),
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(decode_value).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(Value::Array),
        "mapValue" => decode_fields(inner.get("fields")).map(Value::Object),
        other => Err(format!("unsupported value type {other}")),
    }
}

/// Last segment of a document resource name:
/// `projects/p/databases/(default)/documents/notes/abc` → `abc`.
pub fn document_id(name: &str) -> Option<&str> {
    name.rsplit('/').next().filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_file_record_encoding() {
        let record = doc(json!({
            "name": "a.txt",
            "size": 1536,
            "uploadedAt": "2024-05-01T10:00:00Z",
            "storagePath": null,
        }));
        let fields = encode_fields(&record);
        assert_eq!(fields["name"], json!({ "stringValue": "a.txt" }));
        assert_eq!(fields["size"], json!({ "integerValue": "1536" }));
        assert_eq!(fields["storagePath"], json!({ "nullValue": null }));
        assert_eq!(
            fields["uploadedAt"],
            json!({ "timestampValue": "2024-05-01T10:00:00Z" })
        );

        assert_eq!(decode_fields(Some(&fields)).unwrap(), record);
    }

    #[test]
    fn test_only_timestamp_fields_become_timestamps() {
        let record = doc(json!({
            "title": "2024-05-01T10:00:00Z",
            "uploadedAt": "2024-05-01T10:00:00Z",
        }));
        let fields = encode_fields(&record);
        assert_eq!(fields["title"], json!({ "stringValue": "2024-05-01T10:00:00Z" }));
        assert_eq!(
            fields["uploadedAt"],
            json!({ "timestampValue": "2024-05-01T10:00:00Z" })
        );
    }

    #[test]
    fn test_decodes_server_values() {
        let fields = json!({
            "title": { "stringValue": "Hi" },
            "pinned": { "booleanValue": true },
            "score": { "doubleValue": 1.5 },
            "createdAt": { "timestampValue": "2024-05-01T10:00:00.123456Z" },
            "tags": { "arrayValue": { "values": [{ "stringValue": "x" }] } },
            "empty": { "arrayValue": {} },
            "meta": { "mapValue": { "fields": { "n": { "integerValue": "-3" } } } },
        });
        let decoded = decode_fields(Some(&fields)).unwrap();
        assert_eq!(
            Value::Object(decoded),
            json!({
                "title": "Hi",
                "pinned": true,
                "score": 1.5,
                "createdAt": "2024-05-01T10:00:00.123456Z",
                "tags": ["x"],
                "empty": [],
                "meta": { "n": -3 },
            })
        );
    }

    #[test]
    fn test_rejects_untyped_values() {
        assert!(decode_value(&json!("plain")).is_err());
        assert!(decode_value(&json!({ "integerValue": "x1" })).is_err());
        assert!(decode_value(&json!({ "geoPointValue": {} })).is_err());
        assert_eq!(decode_fields(None).unwrap(), Document::new());
    }

    #[test]
    fn test_document_id() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/notes/abc"),
            Some("abc")
        );
        assert_eq!(document_id(""), None);
    }
}
