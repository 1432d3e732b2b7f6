//! Jail parameter value types

use crate::error::{Error, Result};
use crate::network::ip;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// The kind of value a jail parameter carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// C int
    Int,
    /// NUL-terminated string
    String,
    /// Boolean flag
    Bool,
    /// List of `in_addr`
    Ipv4,
}

impl ParamKind {
    /// Parse a command-line style value into this kind
    pub fn parse_value(self, name: &str, raw: &str) -> Result<ParamValue> {
        match self {
            ParamKind::Int => raw
                .parse::<i32>()
                .map(ParamValue::Int)
                .map_err(|_| mismatch(name, self, raw)),
            ParamKind::String => Ok(ParamValue::String(raw.to_string())),
            ParamKind::Bool => match raw {
                "true" | "1" | "yes" | "" => Ok(ParamValue::Bool(true)),
                "false" | "0" | "no" => Ok(ParamValue::Bool(false)),
                _ => Err(mismatch(name, self, raw)),
            },
            ParamKind::Ipv4 => raw
                .split(',')
                .map(|s| ip::encode(s.trim()).map(Ipv4Addr::from))
                .collect::<Result<Vec<_>>>()
                .map(ParamValue::Ipv4),
        }
    }
}

fn mismatch(name: &str, expected: ParamKind, actual: &str) -> Error {
    Error::UnsupportedParameterType {
        name: name.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Int => write!(f, "int"),
            ParamKind::String => write!(f, "string"),
            ParamKind::Bool => write!(f, "bool"),
            ParamKind::Ipv4 => write!(f, "ipv4"),
        }
    }
}

/// Jail parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value (maps to C int)
    Int(i32),
    /// String value
    String(String),
    /// Boolean value
    Bool(bool),
    /// List of IPv4 addresses
    Ipv4(Vec<Ipv4Addr>),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::String(_) => ParamKind::String,
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Ipv4(_) => ParamKind::Ipv4,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::String(s) => write!(f, "{}", s),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Ipv4(addrs) => {
                let list: Vec<String> = addrs.iter().map(|a| a.to_string()).collect();
                write!(f, "{}", list.join(","))
            }
        }
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::String(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::String(v.to_string())
    }
}

impl From<Ipv4Addr> for ParamValue {
    fn from(v: Ipv4Addr) -> Self {
        ParamValue::Ipv4(vec![v])
    }
}

impl From<Vec<Ipv4Addr>> for ParamValue {
    fn from(v: Vec<Ipv4Addr>) -> Self {
        ParamValue::Ipv4(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_by_kind() {
        assert_eq!(ParamKind::Int.parse_value("p", "5").unwrap(), ParamValue::Int(5));
        assert_eq!(
            ParamKind::String.parse_value("p", "build").unwrap(),
            ParamValue::String("build".into())
        );
        assert_eq!(ParamKind::Bool.parse_value("p", "").unwrap(), ParamValue::Bool(true));
        assert_eq!(ParamKind::Bool.parse_value("p", "no").unwrap(), ParamValue::Bool(false));
        assert_eq!(
            ParamKind::Ipv4.parse_value("p", "10.0.0.1, 10.0.0.2").unwrap(),
            ParamValue::Ipv4(vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)])
        );
    }

    #[test]
    fn test_parse_value_rejects_wrong_kind() {
        assert!(ParamKind::Int.parse_value("p", "five").is_err());
        assert!(ParamKind::Bool.parse_value("p", "maybe").is_err());
        assert!(matches!(
            ParamKind::Ipv4.parse_value("p", "10.0.0"),
            Err(Error::InvalidIpv4(_))
        ));
    }

    #[test]
    fn test_json_is_untagged() {
        let json = serde_json::to_string(&ParamValue::Ipv4(vec![Ipv4Addr::new(1, 2, 3, 4)])).unwrap();
        assert_eq!(json, r#"["1.2.3.4"]"#);
        assert_eq!(serde_json::to_string(&ParamValue::Int(7)).unwrap(), "7");
    }
}
