//! Numeric identifiers
//!
//! The server emits ids as JSON numbers, while some clients send them back as
//! strings. Both decode to the same id so equality checks never depend on the
//! wire representation. Ids always serialize as numbers.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Accepts an integer, an integral float or a numeric string
struct LenientId;

impl<'de> Visitor<'de> for LenientId {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer id or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        i64::try_from(v).map_err(|_| E::custom(format!("id {} out of range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            Ok(v as i64)
        } else {
            Err(E::custom(format!("id {} is not an integer", v)))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        v.trim()
            .parse()
            .map_err(|_| E::custom(format!("id {:?} is not numeric", v)))
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }

            /// Lenient extraction from an already-parsed JSON value
            pub fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Number(n) => n.as_i64().map($name),
                    Value::String(s) => s.trim().parse().ok().map($name),
                    _ => None,
                }
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(LenientId).map($name)
            }
        }
    };
}

numeric_id!(
    /// Account id
    UserId
);
numeric_id!(
    /// Chat room id
    RoomId
);
numeric_id!(
    /// Chat message id
    MessageId
);
