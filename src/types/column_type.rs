//! # Column Types
//!
//! A column's type decides how string input is coerced into a cell's numeric
//! slot and which comparison a sort uses by default.
//!
//! | Type | Numeric slot | Default sort |
//! |------|--------------|--------------|
//! | `string` | none | ascii |
//! | `int` | `i64` | numeric |
//! | `double` | `f64` | numeric |
//! | `long` | `i128` | numeric |
//!
//! The lowercase names are the spelling used by the dump format.

use eyre::{bail, Result};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnType {
    #[default]
    String = 0,
    Int = 1,
    Double = 2,
    Long = 3,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Int => "int",
            ColumnType::Double => "double",
            ColumnType::Long => "long",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "string" => Ok(ColumnType::String),
            "int" => Ok(ColumnType::Int),
            "double" => Ok(ColumnType::Double),
            "long" => Ok(ColumnType::Long),
            _ => bail!("unknown column type \"{}\"", name),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnType::String)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for ty in [
            ColumnType::String,
            ColumnType::Int,
            ColumnType::Double,
            ColumnType::Long,
        ] {
            assert_eq!(ColumnType::from_name(ty.name()).unwrap(), ty);
        }
    }

    #[test]
    fn unknown_name_rejected() {
        assert!(ColumnType::from_name("float").is_err());
    }
}
