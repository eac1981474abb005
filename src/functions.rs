//! Builtin functions available inside expressions.
//!
//! Names match case-insensitively, so `Mean ( trace )` and `mean ( trace )` call
//! the same builtin. Every builtin returns [`Value::Missing`] when any argument is
//! missing.

use std::fmt;

use crate::value::{Image, Value, ValueType};

/// Number of arguments a builtin takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }

    pub fn min(self) -> usize {
        match self {
            Arity::Exact(n) | Arity::AtLeast(n) => n,
        }
    }

    pub fn max(self) -> Option<usize> {
        match self {
            Arity::Exact(n) => Some(n),
            Arity::AtLeast(_) => None,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
        match self {
            Arity::Exact(n) => write!(f, "{} {}", n, plural(*n)),
            Arity::AtLeast(n) => write!(f, "at least {} {}", n, plural(*n)),
        }
    }
}

/// Argument and result types of a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    /// One waveform or image, reduced to a number
    Aggregate,
    /// One waveform or image reduced to a number, or several numbers
    Extremum,
    /// One waveform, reduced to a number
    WaveformScalar,
    /// One image, reduced to a number
    ImageScalar,
}

/// Argument `index` has a type the builtin does not take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgMismatch {
    pub index: usize,
    pub expected: &'static str,
    pub found: ValueType,
}

impl Signature {
    /// Result type for the given argument types. The argument count has already
    /// been checked against the builtin's [`Arity`] by the parser.
    pub fn result_type(self, args: &[ValueType]) -> Result<ValueType, ArgMismatch> {
        let check = |index: usize, ok: fn(ValueType) -> bool, expected: &'static str| {
            let found = args[index];
            if ok(found) {
                Ok(())
            } else {
                Err(ArgMismatch {
                    index,
                    expected,
                    found,
                })
            }
        };

        match self {
            Signature::Aggregate => {
                check(0, ValueType::is_array, "a waveform or image")?;
            }
            Signature::Extremum if args.len() == 1 => {
                check(0, ValueType::is_numeric, "a number, waveform or image")?;
            }
            Signature::Extremum => {
                for index in 0..args.len() {
                    check(index, |t| t == ValueType::Number, "a number")?;
                }
            }
            Signature::WaveformScalar => {
                check(0, |t| t == ValueType::Waveform, "a waveform")?;
            }
            Signature::ImageScalar => {
                check(0, |t| t == ValueType::Image, "an image")?;
            }
        }
        Ok(ValueType::Number)
    }
}

/// A builtin function.
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub signature: Signature,
    pub summary: &'static str,
    eval: fn(&[Value]) -> Value,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("signature", &self.signature)
            .finish()
    }
}

impl Builtin {
    pub fn call(&self, args: &[Value]) -> Value {
        if args.iter().any(Value::is_missing) {
            return Value::Missing;
        }
        (self.eval)(args)
    }
}

static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "mean",
        arity: Arity::Exact(1),
        signature: Signature::Aggregate,
        summary: "Mean of a waveform's y values or an image's pixels",
        eval: eval_mean,
    },
    Builtin {
        name: "min",
        arity: Arity::AtLeast(1),
        signature: Signature::Extremum,
        summary: "Smallest sample of one waveform or image, or smallest of several numbers",
        eval: eval_min,
    },
    Builtin {
        name: "max",
        arity: Arity::AtLeast(1),
        signature: Signature::Extremum,
        summary: "Largest sample of one waveform or image, or largest of several numbers",
        eval: eval_max,
    },
    Builtin {
        name: "centre",
        arity: Arity::Exact(1),
        signature: Signature::WaveformScalar,
        summary: "x position of a waveform's peak",
        eval: eval_centre,
    },
    Builtin {
        name: "fwhm",
        arity: Arity::Exact(1),
        signature: Signature::WaveformScalar,
        summary: "Full width at half maximum of a waveform's peak",
        eval: eval_fwhm,
    },
    Builtin {
        name: "background",
        arity: Arity::Exact(1),
        signature: Signature::WaveformScalar,
        summary: "Mean of the first and last 10% of a waveform's samples",
        eval: eval_background,
    },
    Builtin {
        name: "integrate",
        arity: Arity::Exact(1),
        signature: Signature::WaveformScalar,
        summary: "Trapezoidal integral of a waveform over x",
        eval: eval_integrate,
    },
    Builtin {
        name: "centroid_x",
        arity: Arity::Exact(1),
        signature: Signature::ImageScalar,
        summary: "Intensity-weighted mean column of an image",
        eval: eval_centroid_x,
    },
    Builtin {
        name: "centroid_y",
        arity: Arity::Exact(1),
        signature: Signature::ImageScalar,
        summary: "Intensity-weighted mean row of an image",
        eval: eval_centroid_y,
    },
    Builtin {
        name: "fwhm_x",
        arity: Arity::Exact(1),
        signature: Signature::ImageScalar,
        summary: "FWHM of an image's column profile (pixels summed down each column)",
        eval: eval_fwhm_x,
    },
    Builtin {
        name: "fwhm_y",
        arity: Arity::Exact(1),
        signature: Signature::ImageScalar,
        summary: "FWHM of an image's row profile (pixels summed along each row)",
        eval: eval_fwhm_y,
    },
];

/// Look up a builtin by name, ignoring ASCII case.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name.eq_ignore_ascii_case(name))
}

pub fn builtins() -> &'static [Builtin] {
    BUILTINS
}

fn number_or_missing(n: Option<f64>) -> Value {
    n.map_or(Value::Missing, Value::Number)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Index of the first largest non-NaN value.
fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

fn interpolate(x0: f64, y0: f64, x1: f64, y1: f64, target: f64) -> f64 {
    if y1 == y0 {
        x0
    } else {
        x0 + (target - y0) * (x1 - x0) / (y1 - y0)
    }
}

/// Width between the half-maximum crossings either side of the peak, linearly
/// interpolated. A side that never drops below half maximum ends at the edge.
fn full_width_half_max(x: &[f64], y: &[f64]) -> Option<f64> {
    let peak = argmax(y)?;
    let half = y[peak] / 2.0;
    let left = (0..peak)
        .rev()
        .find(|&i| y[i] < half)
        .map_or(x[0], |i| interpolate(x[i], y[i], x[i + 1], y[i + 1], half));
    let right = (peak + 1..y.len())
        .find(|&i| y[i] < half)
        .map_or(x[y.len() - 1], |i| {
            interpolate(x[i - 1], y[i - 1], x[i], y[i], half)
        });
    Some(right - left)
}

fn column_profile(img: &Image) -> Vec<f64> {
    let mut profile = vec![0.0; img.width()];
    for row in img.rows() {
        for (col, value) in row.iter().enumerate() {
            profile[col] += value;
        }
    }
    profile
}

fn row_profile(img: &Image) -> Vec<f64> {
    img.rows().take(img.height()).map(|row| row.iter().sum()).collect()
}

fn weighted_position(profile: &[f64]) -> Option<f64> {
    if profile.is_empty() {
        return None;
    }
    let total: f64 = profile.iter().sum();
    let weighted: f64 = profile
        .iter()
        .enumerate()
        .map(|(i, v)| i as f64 * v)
        .sum();
    Some(weighted / total)
}

fn profile_fwhm(profile: &[f64]) -> Option<f64> {
    let x: Vec<f64> = (0..profile.len()).map(|i| i as f64).collect();
    full_width_half_max(&x, profile)
}

fn eval_mean(args: &[Value]) -> Value {
    number_or_missing(args[0].samples().and_then(mean))
}

fn extremum(args: &[Value], pick: fn(f64, f64) -> f64) -> Value {
    let values: Vec<f64> = match args {
        [single] => match single {
            Value::Number(n) => vec![*n],
            other => match other.samples() {
                Some(samples) => samples.to_vec(),
                None => return Value::Missing,
            },
        },
        many => match many.iter().map(Value::as_number).collect::<Option<Vec<_>>>() {
            Some(values) => values,
            None => return Value::Missing,
        },
    };
    let mut iter = values.into_iter();
    number_or_missing(iter.next().map(|first| iter.fold(first, pick)))
}

fn eval_min(args: &[Value]) -> Value {
    extremum(args, f64::min)
}

fn eval_max(args: &[Value]) -> Value {
    extremum(args, f64::max)
}

fn eval_centre(args: &[Value]) -> Value {
    match &args[0] {
        Value::Waveform(w) => number_or_missing(argmax(w.y()).map(|i| w.x()[i])),
        _ => Value::Missing,
    }
}

fn eval_fwhm(args: &[Value]) -> Value {
    match &args[0] {
        Value::Waveform(w) => number_or_missing(full_width_half_max(w.x(), w.y())),
        _ => Value::Missing,
    }
}

fn eval_background(args: &[Value]) -> Value {
    match &args[0] {
        Value::Waveform(w) if !w.is_empty() => {
            let n = w.len();
            let edge = n.div_ceil(10).max(1);
            let samples: Vec<f64> = w.y()[..edge]
                .iter()
                .chain(&w.y()[n - edge..])
                .copied()
                .collect();
            number_or_missing(mean(&samples))
        }
        _ => Value::Missing,
    }
}

fn eval_integrate(args: &[Value]) -> Value {
    match &args[0] {
        Value::Waveform(w) if !w.is_empty() => {
            let area = w
                .x()
                .windows(2)
                .zip(w.y().windows(2))
                .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
                .sum();
            Value::Number(area)
        }
        _ => Value::Missing,
    }
}

fn eval_centroid_x(args: &[Value]) -> Value {
    match &args[0] {
        Value::Image(img) => number_or_missing(weighted_position(&column_profile(img))),
        _ => Value::Missing,
    }
}

fn eval_centroid_y(args: &[Value]) -> Value {
    match &args[0] {
        Value::Image(img) => number_or_missing(weighted_position(&row_profile(img))),
        _ => Value::Missing,
    }
}

fn eval_fwhm_x(args: &[Value]) -> Value {
    match &args[0] {
        Value::Image(img) => number_or_missing(profile_fwhm(&column_profile(img))),
        _ => Value::Missing,
    }
}

fn eval_fwhm_y(args: &[Value]) -> Value {
    match &args[0] {
        Value::Image(img) => number_or_missing(profile_fwhm(&row_profile(img))),
        _ => Value::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Waveform;

    fn peak() -> Value {
        Value::Waveform(Waveform::new(
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![0.0, 1.0, 2.0, 1.0, 0.0],
        ))
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(lookup("Mean").map(|b| b.name), Some("mean"));
        assert_eq!(lookup("CENTROID_X").map(|b| b.name), Some("centroid_x"));
        assert!(lookup("median").is_none());
    }

    #[test]
    fn test_waveform_builtins() {
        let trace = [peak()];
        assert_eq!(eval_centre(&trace), Value::Number(2.0));
        assert_eq!(eval_fwhm(&trace), Value::Number(2.0));
        assert_eq!(eval_integrate(&trace), Value::Number(4.0));
        assert_eq!(eval_mean(&trace), Value::Number(0.8));
        assert_eq!(eval_background(&trace), Value::Number(0.0));
    }

    #[test]
    fn test_extremum_variadic() {
        let args = [Value::Number(3.0), Value::Number(-1.0), Value::Number(2.0)];
        assert_eq!(eval_min(&args), Value::Number(-1.0));
        assert_eq!(eval_max(&args), Value::Number(3.0));
        assert_eq!(eval_max(&[peak()]), Value::Number(2.0));
    }

    #[test]
    fn test_image_centroid() {
        let img = Image::from_rows(vec![vec![0.0, 0.0, 0.0], vec![0.0, 0.0, 4.0]]).unwrap();
        let args = [Value::Image(img)];
        assert_eq!(eval_centroid_x(&args), Value::Number(2.0));
        assert_eq!(eval_centroid_y(&args), Value::Number(1.0));
    }

    #[test]
    fn test_missing_argument_propagates() {
        let centre = lookup("centre").unwrap();
        assert_eq!(centre.call(&[Value::Missing]), Value::Missing);
    }

    #[test]
    fn test_signature_rejects_wrong_kind() {
        let err = Signature::WaveformScalar
            .result_type(&[ValueType::Image])
            .unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.found, ValueType::Image);
        assert!(Signature::Extremum
            .result_type(&[ValueType::Number, ValueType::Number])
            .is_ok());
    }
}
