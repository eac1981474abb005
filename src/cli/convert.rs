//! JSON <-> record Value conversion utilities

use serde_json::{Map, Number, Value as Json, json};

use super::CliError;
use crate::value::{Image, Record, Value, Waveform};

fn number(n: &Number) -> Value {
    n.as_f64().map_or(Value::Missing, Value::Number)
}

fn numbers(items: &[Json]) -> Option<Vec<f64>> {
    items.iter().map(Json::as_f64).collect()
}

fn field<'a>(obj: &'a Map<String, Json>, key: &str) -> Result<&'a Json, CliError> {
    obj.get(key)
        .ok_or_else(|| CliError::Record(format!("missing field '{}'", key)))
}

fn number_array(v: &Json, what: &str) -> Result<Vec<f64>, CliError> {
    v.as_array()
        .and_then(|items| numbers(items))
        .ok_or_else(|| CliError::Record(format!("'{}' must be an array of numbers", what)))
}

fn dimension(v: &Json, what: &str) -> Result<usize, CliError> {
    v.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| CliError::Record(format!("'{}' must be a non-negative integer", what)))
}

/// Convert one JSON cell to a Value.
///
/// Arrays of numbers are waveforms sampled at 0, 1, 2, ...; arrays of number
/// arrays are images given row by row. Objects spell either out explicitly:
/// `{"x": [...], "y": [...]}` or `{"width": w, "height": h, "pixels": [...]}`.
pub fn json_to_value(v: &Json) -> Result<Value, CliError> {
    match v {
        Json::Null => Ok(Value::Missing),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::Number(n) => Ok(number(n)),
        Json::String(s) => Ok(Value::Text(s.clone())),
        Json::Array(items) => {
            if let Some(samples) = numbers(items) {
                return Ok(Value::Waveform(Waveform::from_samples(samples)));
            }
            let rows = items
                .iter()
                .map(|row| number_array(row, "image row"))
                .collect::<Result<Vec<_>, _>>()?;
            Image::from_rows(rows)
                .map(Value::Image)
                .ok_or_else(|| CliError::Record("image rows must all have the same length".into()))
        }
        Json::Object(obj) if obj.contains_key("pixels") => {
            let width = dimension(field(obj, "width")?, "width")?;
            let height = dimension(field(obj, "height")?, "height")?;
            let pixels = number_array(field(obj, "pixels")?, "pixels")?;
            Image::new(width, height, pixels)
                .map(Value::Image)
                .ok_or_else(|| CliError::Record("'pixels' must hold width * height values".into()))
        }
        Json::Object(obj) => {
            let x = number_array(field(obj, "x")?, "x")?;
            let y = number_array(field(obj, "y")?, "y")?;
            Ok(Value::Waveform(Waveform::new(x, y)))
        }
    }
}

/// Convert a Value back to JSON. Missing and non-finite numbers become `null`.
pub fn value_to_json(v: &Value) -> Json {
    match v {
        Value::Missing => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Number(n) => Number::from_f64(*n).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::Waveform(w) => json!({
            "x": floats(w.x()),
            "y": floats(w.y()),
        }),
        Value::Image(img) => json!({
            "width": img.width(),
            "height": img.height(),
            "pixels": floats(img.pixels()),
        }),
    }
}

fn floats(values: &[f64]) -> Json {
    Json::Array(
        values
            .iter()
            .map(|n| Number::from_f64(*n).map_or(Json::Null, Json::Number))
            .collect(),
    )
}

pub fn json_to_record(v: &Json) -> Result<Record, CliError> {
    let obj = v
        .as_object()
        .ok_or_else(|| CliError::Record("each record must be a JSON object".into()))?;
    obj.iter()
        .map(|(name, cell)| Ok::<_, CliError>((name.clone(), json_to_value(cell)?)))
        .collect()
}

/// Records from a JSON array of objects (a single object is one record).
pub fn json_to_records(v: &Json) -> Result<Vec<Record>, CliError> {
    match v {
        Json::Array(items) => items.iter().map(json_to_record).collect(),
        other => Ok(vec![json_to_record(other)?]),
    }
}

pub fn record_to_json(record: &Record) -> Json {
    let obj: Map<String, Json> = record
        .iter()
        .map(|(name, value)| (name.clone(), value_to_json(value)))
        .collect();
    Json::Object(obj)
}

pub fn records_to_json(records: &[Record]) -> Json {
    Json::Array(records.iter().map(record_to_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells() {
        assert_eq!(json_to_value(&json!(null)).unwrap(), Value::Missing);
        assert_eq!(json_to_value(&json!(21.5)).unwrap(), Value::Number(21.5));
        assert_eq!(
            json_to_value(&json!([1, 2])).unwrap(),
            Value::Waveform(Waveform::from_samples(vec![1.0, 2.0]))
        );
        assert_eq!(
            json_to_value(&json!({"x": [0, 1], "y": [5, 6]})).unwrap(),
            Value::Waveform(Waveform::new(vec![0.0, 1.0], vec![5.0, 6.0]))
        );
        let img = json_to_value(&json!([[1, 2], [3, 4]])).unwrap();
        assert_eq!(img, json_to_value(&json!({"width": 2, "height": 2, "pixels": [1, 2, 3, 4]})).unwrap());
    }

    #[test]
    fn test_ragged_image_rejected() {
        assert!(json_to_value(&json!([[1, 2], [3]])).is_err());
    }

    #[test]
    fn test_nan_becomes_null() {
        assert_eq!(value_to_json(&Value::Number(f64::NAN)), Json::Null);
    }
}
