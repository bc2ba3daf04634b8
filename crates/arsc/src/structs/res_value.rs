use winnow::binary::{le_u8, le_u16, le_u32};
use winnow::prelude::*;

use crate::structs::res_string_pool::StringPool;

/// Type of the data value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    /// The `data` is either 0 or 1, specifying this resource is either undefined or empty, respectively.
    Null = 0x00,

    /// The `data` holds a reference to another resource table entry.
    Reference = 0x01,

    /// The `data` holds an attribute resource identifier.
    Attribute = 0x02,

    /// The `data` holds an index into the containing resource table's global value string pool.
    String = 0x03,

    /// The `data` holds a single-precision floating point number.
    Float = 0x04,

    /// The `data` holds a complex number encoding a dimension value, such as "100in".
    Dimension = 0x05,

    /// The `data` holds a complex number encoding a fraction of a container.
    Fraction = 0x06,

    /// The `data` is a raw integer value of the form n..n.
    IntDec = 0x10,

    /// The `data` is a raw integer value of the form 0xn..n.
    IntHex = 0x11,

    /// The `data` is either 0 or 1, for input "false" or "true" respectively.
    IntBoolean = 0x12,

    /// The `data` is a raw integer value of the form #aarrggbb.
    IntColorArgb8 = 0x1c,

    /// The `data` is a raw integer value of the form #rrggbb.
    IntColorRgb8 = 0x1d,

    /// The `data` is a raw integer value of the form #argb.
    IntColorArgb4 = 0x1e,

    /// The `data` is a raw integer value of the form #rgb.
    IntColorRgb4 = 0x1f,

    /// Unknown type value
    Unknown(u8),
}

impl From<u8> for ValueType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ValueType::Null,
            0x01 => ValueType::Reference,
            0x02 => ValueType::Attribute,
            0x03 => ValueType::String,
            0x04 => ValueType::Float,
            0x05 => ValueType::Dimension,
            0x06 => ValueType::Fraction,
            0x10 => ValueType::IntDec,
            0x11 => ValueType::IntHex,
            0x12 => ValueType::IntBoolean,
            0x1c => ValueType::IntColorArgb8,
            0x1d => ValueType::IntColorRgb8,
            0x1e => ValueType::IntColorArgb4,
            0x1f => ValueType::IntColorRgb4,
            v => ValueType::Unknown(v),
        }
    }
}

/// Representation of a value in a resource, supplying type information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResValue {
    /// Number of bytes in this structure
    pub size: u16,

    /// Always set to 0
    pub res0: u8,

    /// Type of the data value
    pub data_type: ValueType,

    /// Data itself
    pub data: u32,
}

impl ResValue {
    const RADIX_MULTS: [f64; 4] = [0.00390625, 3.051758e-005, 1.192093e-007, 4.656613e-010];
    const DIMENSION_UNITS: [&str; 6] = ["px", "dip", "sp", "pt", "in", "mm"];
    const COMPLEX_UNIT_MASK: u32 = 0x0F;
    const FRACTION_UNITS: [&str; 2] = ["%", "%p"];

    #[inline]
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResValue> {
        (le_u16, le_u8, le_u8, le_u32)
            .map(|(size, res0, data_type, data)| ResValue {
                size,
                res0,
                data,
                data_type: ValueType::from(data_type),
            })
            .parse_next(input)
    }

    #[inline(always)]
    pub fn is_reference(&self) -> bool {
        self.data_type == ValueType::Reference
    }

    /// Render the value for diagnostics and dump output
    pub fn to_display_string(&self, string_pool: &StringPool) -> String {
        match self.data_type {
            ValueType::Reference => format!("@0x{:08x}", self.data),
            ValueType::Attribute => format!("?0x{:08x}", self.data),
            ValueType::String => string_pool
                .string_at(self.data)
                .unwrap_or_default()
                .to_owned(),
            ValueType::Float => f32::from_bits(self.data).to_string(),
            ValueType::Dimension => {
                let idx = (self.data & Self::COMPLEX_UNIT_MASK) as usize;
                let unit = Self::DIMENSION_UNITS.get(idx).unwrap_or(&"");
                format!("{}{}", self.complex_to_float(), unit)
            }
            ValueType::Fraction => {
                let idx = (self.data & Self::COMPLEX_UNIT_MASK) as usize;
                let unit = Self::FRACTION_UNITS.get(idx).unwrap_or(&"");
                format!("{}{}", self.complex_to_float() * 100f64, unit)
            }
            ValueType::IntDec => format!("{}", self.data),
            ValueType::IntHex => format!("0x{:08x}", self.data),
            ValueType::IntBoolean => {
                if self.data == 0 {
                    "false".to_owned()
                } else {
                    "true".to_owned()
                }
            }
            ValueType::IntColorArgb8
            | ValueType::IntColorRgb8
            | ValueType::IntColorArgb4
            | ValueType::IntColorRgb4 => format!("#{:08x}", self.data),
            _ => format!("<0x{:x}, type {:?}>", self.data, self.data_type),
        }
    }

    #[inline(always)]
    pub fn complex_to_float(&self) -> f64 {
        ((self.data & 0xFFFFFF00) as f64) * Self::RADIX_MULTS[((self.data >> 4) & 3) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_layout() {
        let bytes = [0x08, 0x00, 0x00, 0x01, 0x2a, 0x00, 0x00, 0x00];
        let value = ResValue::parse(&mut &bytes[..]).unwrap();

        assert_eq!(value.size, 8);
        assert_eq!(value.res0, 0);
        assert_eq!(value.data_type, ValueType::Reference);
        assert_eq!(value.data, 42);
        assert!(value.is_reference());
    }

    #[test]
    fn renders_primitives() {
        let pool = StringPool::empty();
        let boolean = ResValue {
            size: 8,
            res0: 0,
            data_type: ValueType::IntBoolean,
            data: 1,
        };
        assert_eq!(boolean.to_display_string(&pool), "true");

        let color = ResValue {
            size: 8,
            res0: 0,
            data_type: ValueType::IntColorArgb8,
            data: 0xFF00FF00,
        };
        assert_eq!(color.to_display_string(&pool), "#ff00ff00");
    }
}
