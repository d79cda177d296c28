//! Small engine value types (vectors, size, color, quaternion)
//!
//! Numbers are written the way the host writes them: integral values carry no
//! fractional part, so `1.0` serializes as `1`.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

pub const VEC2: &str = "cc.Vec2";
pub const VEC3: &str = "cc.Vec3";
pub const SIZE: &str = "cc.Size";
pub const COLOR: &str = "cc.Color";
pub const QUAT: &str = "cc.Quat";

/// Largest integer an f64 represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A JSON number that serializes integral values as integers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Num(pub f64);

impl Serialize for Num {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if !v.is_finite() {
            serializer.serialize_i64(0)
        } else if v.fract() == 0.0 && v.abs() <= MAX_SAFE_INTEGER {
            serializer.serialize_i64(v as i64)
        } else {
            serializer.serialize_f64(v)
        }
    }
}

impl From<f64> for Num {
    fn from(v: f64) -> Self {
        Num(v)
    }
}

/// Convert a plain number into a JSON value using the host's number format
pub fn num_value(v: f64) -> Value {
    to_json(&Num(v))
}

/// Serialize a value type into JSON.
///
/// The value types in this module only hold numbers and static strings, so
/// serialization cannot fail; `Null` is returned if it ever does.
pub fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Numeric cast with a zero default.
///
/// Numbers pass through, numeric strings are parsed, booleans map to 1/0,
/// everything else (including NaN) becomes 0.
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Read `key` from an object, falling back when it is missing or null
fn field(obj: Option<&Map<String, Value>>, key: &str, fallback: f64) -> f64 {
    match obj.and_then(|o| o.get(key)) {
        None | Some(Value::Null) => fallback,
        Some(v) => coerce_number(v),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec2 {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    pub x: Num,
    pub y: Num,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { type_tag: VEC2, x: Num(x), y: Num(y) }
    }

    pub fn from_value(value: &Value) -> Self {
        let obj = value.as_object();
        Self::new(field(obj, "x", 0.0), field(obj, "y", 0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vec3 {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    pub x: Num,
    pub y: Num,
    pub z: Num,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { type_tag: VEC3, x: Num(x), y: Num(y), z: Num(z) }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn one() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub fn from_value(value: &Value) -> Self {
        Self::from_value_or(value, Self::zero())
    }

    /// Read x/y/z, taking missing components from `fallback`
    pub fn from_value_or(value: &Value, fallback: Self) -> Self {
        let obj = value.as_object();
        Self::new(
            field(obj, "x", fallback.x.0),
            field(obj, "y", fallback.y.0),
            field(obj, "z", fallback.z.0),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Size {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    pub width: Num,
    pub height: Num,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { type_tag: SIZE, width: Num(width), height: Num(height) }
    }

    pub fn from_value(value: &Value) -> Self {
        let obj = value.as_object();
        Self::new(field(obj, "width", 0.0), field(obj, "height", 0.0))
    }
}

/// RGBA color with channels clamped to [0, 255]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    pub r: Num,
    pub g: Num,
    pub b: Num,
    pub a: Num,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            type_tag: COLOR,
            r: Num(clamp_channel(r)),
            g: Num(clamp_channel(g)),
            b: Num(clamp_channel(b)),
            a: Num(clamp_channel(a)),
        }
    }

    pub fn white() -> Self {
        Self::new(255.0, 255.0, 255.0, 255.0)
    }

    pub fn from_value(value: &Value) -> Self {
        let obj = value.as_object();
        Self::new(
            field(obj, "r", 0.0),
            field(obj, "g", 0.0),
            field(obj, "b", 0.0),
            field(obj, "a", 255.0),
        )
    }
}

#[inline]
fn clamp_channel(v: f64) -> f64 {
    v.clamp(0.0, 255.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quat {
    #[serde(rename = "__type__")]
    type_tag: &'static str,
    pub x: Num,
    pub y: Num,
    pub z: Num,
    pub w: Num,
}

impl Quat {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { type_tag: QUAT, x: Num(x), y: Num(y), z: Num(z), w: Num(w) }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    pub fn from_value(value: &Value) -> Self {
        Self::from_value_or(value, Self::new(0.0, 0.0, 0.0, 0.0))
    }

    pub fn from_value_or(value: &Value, fallback: Self) -> Self {
        let obj = value.as_object();
        Self::new(
            field(obj, "x", fallback.x.0),
            field(obj, "y", fallback.y.0),
            field(obj, "z", fallback.z.0),
            field(obj, "w", fallback.w.0),
        )
    }
}
