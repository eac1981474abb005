use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

/// A value flowing through expression evaluation.
///
/// # Missing Data
///
/// [`Value::Missing`] stands for a channel a record does not carry, or for any
/// result derived from one. It is data, not an error: filters treat it as a
/// non-matching row and functions hand it on as an empty derived cell.
///
/// # Examples
///
/// ```
/// use opgw_expr::value::{Value, Waveform};
///
/// let scalar = Value::Number(21.98);
/// let label = Value::Text("shot".to_string());
/// let trace = Value::Waveform(Waveform::new(vec![0.0, 1.0], vec![3.0, 4.0]));
/// assert!(Value::Missing.is_missing());
/// assert_eq!(scalar.as_number(), Some(21.98));
/// # let _ = (label, trace);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value for this record
    Missing,

    /// Result of a comparison or logical operation
    Boolean(bool),

    /// IEEE double
    Number(f64),

    /// Text channel value
    Text(String),

    /// Trace with x and y samples
    Waveform(Waveform),

    /// Row-major 2-D array
    Image(Image),
}

/// Static type of a value, as inferred by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Number,
    Text,
    Waveform,
    Image,
}

impl ValueType {
    /// Number, waveform or image: anything arithmetic applies to.
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueType::Number | ValueType::Waveform | ValueType::Image)
    }

    pub fn is_array(self) -> bool {
        matches!(self, ValueType::Waveform | ValueType::Image)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::Text => "text",
            ValueType::Waveform => "waveform",
            ValueType::Image => "image",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Paired x and y samples, always of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl Waveform {
    /// Extra samples on the longer axis are dropped.
    pub fn new(mut x: Vec<f64>, mut y: Vec<f64>) -> Self {
        let len = x.len().min(y.len());
        x.truncate(len);
        y.truncate(len);
        Waveform { x, y }
    }

    /// Trace sampled at `0, 1, 2, ...`.
    pub fn from_samples(y: Vec<f64>) -> Self {
        let x = (0..y.len()).map(|i| i as f64).collect();
        Waveform { x, y }
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Same x axis, y replaced pointwise.
    pub fn map_y(&self, f: impl Fn(f64) -> f64) -> Self {
        Waveform {
            x: self.x.clone(),
            y: self.y.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Row-major pixels; `pixels.len() == width * height` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<f64>,
}

impl Image {
    /// `None` unless `pixels.len() == width * height`.
    pub fn new(width: usize, height: usize, pixels: Vec<f64>) -> Option<Self> {
        (width.checked_mul(height)? == pixels.len()).then_some(Image {
            width,
            height,
            pixels,
        })
    }

    /// `None` for ragged rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        Some(Image {
            width,
            height,
            pixels: rows.into_iter().flatten().collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[f64] {
        &self.pixels
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.height && col < self.width {
            self.pixels.get(row * self.width + col).copied()
        } else {
            None
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) panics, and an image with zero width has no pixels anyway
        self.pixels.chunks(self.width.max(1))
    }

    pub fn same_shape(&self, other: &Image) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Image {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Pixelwise combination, `None` unless both images have the same shape.
    pub fn zip_with(&self, other: &Image, f: impl Fn(f64, f64) -> f64) -> Option<Self> {
        self.same_shape(other).then(|| Image {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().zip(&other.pixels).map(|(&a, &b)| f(a, b)).collect(),
        })
    }
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Runtime type, `None` for [`Value::Missing`].
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Missing => None,
            Value::Boolean(_) => Some(ValueType::Boolean),
            Value::Number(_) => Some(ValueType::Number),
            Value::Text(_) => Some(ValueType::Text),
            Value::Waveform(_) => Some(ValueType::Waveform),
            Value::Image(_) => Some(ValueType::Image),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The samples an aggregate runs over: waveform y values or image pixels.
    pub fn samples(&self) -> Option<&[f64]> {
        match self {
            Value::Waveform(w) => Some(&w.y),
            Value::Image(img) => Some(&img.pixels),
            _ => None,
        }
    }
}

/// One table row or experiment record: channel values keyed by system name.
///
/// Channels a record does not carry read back as [`Value::Missing`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Record {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
