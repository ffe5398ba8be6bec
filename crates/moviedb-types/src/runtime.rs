//! Movie runtime in whole minutes and its wire format.
//!
//! Input is accepted as `"<N> mins"`, output is written as `"<N> minutes"`.
//! Existing clients depend on both forms, so they are kept as they are.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const INPUT_UNIT: &str = "mins";
const OUTPUT_UNIT: &str = "minutes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid runtime format")]
pub struct InvalidRuntimeFormat;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Runtime(i32);

impl Runtime {
    pub const fn new(minutes: i32) -> Self {
        Runtime(minutes)
    }

    pub fn minutes(&self) -> i32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Decodes a JSON value, which must be a string like `"102 mins"`.
    pub fn from_json(json: &[u8]) -> Result<Self, InvalidRuntimeFormat> {
        let unquoted: String = serde_json::from_slice(json).map_err(|_| InvalidRuntimeFormat)?;
        unquoted.parse()
    }

    /// Encodes as a JSON string like `"102 minutes"`.
    pub fn to_json(&self) -> String {
        serde_json::Value::String(self.to_string()).to_string()
    }
}

impl From<i32> for Runtime {
    fn from(minutes: i32) -> Self {
        Runtime(minutes)
    }
}

impl From<Runtime> for i32 {
    fn from(runtime: Runtime) -> Self {
        runtime.0
    }
}

impl Display for Runtime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, OUTPUT_UNIT)
    }
}

impl FromStr for Runtime {
    type Err = InvalidRuntimeFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(' ').collect();
        match parts.as_slice() {
            [number, unit] if *unit == INPUT_UNIT => number
                .parse::<i32>()
                .map(Runtime)
                .map_err(|_| InvalidRuntimeFormat),
            _ => Err(InvalidRuntimeFormat),
        }
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => s.parse().map_err(D::Error::custom),
            _ => Err(D::Error::custom(InvalidRuntimeFormat)),
        }
    }
}
