use crate::error::{DbError, Result};
use crate::fields::{Field, StringField};

// Closed enumeration of column types. `String` carries its declared width
// (payload byte capacity), configured per column rather than globally.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Type {
    Int,
    String(u32),
}

impl Type {
    // Serialized size in bytes: 4 for `Int`, `4 + width` for `String`
    // (length prefix plus the padded payload).
    pub fn len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::String(width) => *width as usize + 4,
        }
    }

    // Parses a field of this type out of the front of `bytes`.
    pub fn parse(&self, bytes: &[u8]) -> Result<Field> {
        match self {
            Type::Int => {
                let mut int_bytes = [0u8; 4];
                int_bytes.copy_from_slice(&bytes[..4]);
                Ok(Field::Int(i32::from_be_bytes(int_bytes)))
            }
            Type::String(width) => {
                let mut len_bytes = [0u8; 4];
                len_bytes.copy_from_slice(&bytes[..4]);
                let len = u32::from_be_bytes(len_bytes);
                if len > *width {
                    return Err(DbError::DbLogicError(format!(
                        "string length prefix {} exceeds declared width {}",
                        len, width
                    )));
                }
                let payload = &bytes[4..4 + len as usize];
                let value = String::from_utf8(payload.to_vec())
                    .map_err(|e| DbError::DbLogicError(e.to_string()))?;
                Ok(Field::String(StringField::new(value, *width)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trips() {
        let field = Field::Int(-7);
        let bytes = field.serialize();
        assert_eq!(Type::Int.parse(&bytes).unwrap(), field);
    }

    #[test]
    fn string_round_trips() {
        let field = Field::String(StringField::new("hello".to_string(), 16));
        let bytes = field.serialize();
        assert_eq!(Type::String(16).parse(&bytes).unwrap(), field);
    }
}
