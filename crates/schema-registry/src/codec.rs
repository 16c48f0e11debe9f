//! Avro codec compiled from a registry schema.
//!
//! Decodes a binary Avro datum into an [`apache_avro::types::Value`] and
//! renders that value as standard JSON text: unions are unwrapped to their
//! branch value, records keep their schema field order, and bytes/fixed
//! values map each byte to the code point of the same value.

use crate::error::CodecError;
use apache_avro::types::Value;
use apache_avro::Schema;
use std::collections::BTreeMap;

/// A compiled Avro schema.
#[derive(Debug, Clone)]
pub struct AvroCodec {
    schema: Schema,
}

impl AvroCodec {
    /// Compile a codec from the schema's JSON definition.
    pub fn parse(schema_text: &str) -> Result<Self, apache_avro::Error> {
        let schema = Schema::parse_str(schema_text)?;
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decode a binary datum. The whole payload must be consumed.
    pub fn decode(&self, payload: &[u8]) -> Result<Value, CodecError> {
        let mut reader = payload;
        let value = apache_avro::from_avro_datum(&self.schema, &mut reader, None)
            .map_err(CodecError::Decode)?;
        if !reader.is_empty() {
            return Err(CodecError::TrailingBytes(reader.len()));
        }
        // A string cut short decodes as Null instead of failing
        if !value.validate(&self.schema) {
            return Err(CodecError::SchemaMismatch);
        }
        Ok(value)
    }

    /// Encode a value as a binary datum (no envelope).
    pub fn encode(&self, value: Value) -> Result<Vec<u8>, CodecError> {
        apache_avro::to_avro_datum(&self.schema, value).map_err(CodecError::Encode)
    }

    /// Render a decoded value as JSON text.
    pub fn to_json_text(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let json = avro_to_json(value)?;
        Ok(serde_json::to_vec(&json)?)
    }
}

fn avro_to_json(value: &Value) -> Result<serde_json::Value, CodecError> {
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => serde_json::json!(i),
        Value::Long(l)
        | Value::TimeMicros(l)
        | Value::TimestampMillis(l)
        | Value::TimestampMicros(l)
        | Value::TimestampNanos(l)
        | Value::LocalTimestampMillis(l)
        | Value::LocalTimestampMicros(l)
        | Value::LocalTimestampNanos(l) => serde_json::json!(l),
        Value::Float(f) => float32_to_json(*f)?,
        Value::Double(d) => float_to_json(*d)?,
        Value::Bytes(b) | Value::Fixed(_, b) => serde_json::Value::String(bytes_to_string(b)),
        Value::String(s) | Value::Enum(_, s) => serde_json::Value::String(s.clone()),
        Value::Union(_, inner) => avro_to_json(inner)?,
        Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(avro_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Map(entries) => {
            // HashMap iteration order is random; sort for stable output.
            let sorted: BTreeMap<&String, &Value> = entries.iter().collect();
            let mut map = serde_json::Map::with_capacity(sorted.len());
            for (k, v) in sorted {
                map.insert(k.clone(), avro_to_json(v)?);
            }
            serde_json::Value::Object(map)
        }
        Value::Record(fields) => {
            let mut map = serde_json::Map::with_capacity(fields.len());
            for (k, v) in fields {
                map.insert(k.clone(), avro_to_json(v)?);
            }
            serde_json::Value::Object(map)
        }
        Value::Decimal(d) => {
            let bytes = Vec::<u8>::try_from(d).map_err(CodecError::Decimal)?;
            serde_json::Value::String(bytes_to_string(&bytes))
        }
        Value::BigDecimal(d) => serde_json::Value::String(d.to_string()),
        Value::Uuid(u) => serde_json::Value::String(u.to_string()),
        Value::Duration(d) => serde_json::json!({
            "months": u32::from(d.months()),
            "days": u32::from(d.days()),
            "millis": u32::from(d.millis()),
        }),
    };
    Ok(json)
}

fn float_to_json(f: f64) -> Result<serde_json::Value, CodecError> {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .ok_or(CodecError::NonFiniteFloat(f))
}

/// Render through the shortest `f32` text so `0.1f32` stays `0.1`.
fn float32_to_json(f: f32) -> Result<serde_json::Value, CodecError> {
    let widened = f
        .to_string()
        .parse::<f64>()
        .map_err(|_| CodecError::NonFiniteFloat(f64::from(f)))?;
    float_to_json(widened)
}

fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
