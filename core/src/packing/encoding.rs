//! Fixed-width component encoding.
//!
//! Integers are written as the low `bits` of their two's complement value;
//! callers range-check beforehand. Floats narrow to the attribute's size,
//! 16-bit floats going through [`half::f16`].

use half::f16;

use crate::layout::{Attribute, ByteOrder, ComponentType};
use crate::protocol::{AttributeValue, Components};

/// Write `width` octets of `value` into the start of `out`.
pub fn write_uint(out: &mut [u8], value: u64, width: usize, order: ByteOrder) {
    let be = value.to_be_bytes();
    let src = &be[8 - width..];
    match order {
        ByteOrder::BigEndian => out[..width].copy_from_slice(src),
        ByteOrder::LittleEndian => {
            for (dst, b) in out[..width].iter_mut().zip(src.iter().rev()) {
                *dst = *b;
            }
        }
    }
}

/// Read `width` octets from the start of `bytes` as an unsigned integer.
pub fn read_uint(bytes: &[u8], width: usize, order: ByteOrder) -> u64 {
    let bytes = &bytes[..width];
    let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    match order {
        ByteOrder::BigEndian => bytes.iter().fold(0, fold),
        ByteOrder::LittleEndian => bytes.iter().rev().fold(0, fold),
    }
}

fn float_bits(value: f64, bits: u32) -> u64 {
    match bits {
        16 => u64::from(f16::from_f64(value).to_bits()),
        32 => u64::from((value as f32).to_bits()),
        _ => value.to_bits(),
    }
}

fn float_from_bits(raw: u64, bits: u32) -> f64 {
    match bits {
        16 => f16::from_bits(raw as u16).to_f64(),
        32 => f64::from(f32::from_bits(raw as u32)),
        _ => f64::from_bits(raw),
    }
}

fn sign_extend(raw: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

/// Encode `value` into `out`, which must hold at least
/// `attribute.size_octets()` octets.
///
/// The value is assumed to have the attribute's shape.
pub fn encode_value(value: &AttributeValue, attribute: &Attribute, order: ByteOrder, out: &mut [u8]) {
    let bits = attribute.component_size_bits();
    let width = attribute.component_size_octets() as usize;
    let mut put = |index: usize, raw: u64| write_uint(&mut out[index * width..], raw, width, order);
    match value {
        AttributeValue::Signed(c) => {
            for (i, &v) in c.as_slice().iter().enumerate() {
                put(i, v as u64);
            }
        }
        AttributeValue::Unsigned(c) => {
            for (i, &v) in c.as_slice().iter().enumerate() {
                put(i, v);
            }
        }
        AttributeValue::Float(c) => {
            for (i, &v) in c.as_slice().iter().enumerate() {
                put(i, float_bits(v, bits));
            }
        }
    }
}

/// Decode one value of `attribute` from the start of `bytes`.
pub fn decode_value(bytes: &[u8], attribute: &Attribute, order: ByteOrder) -> AttributeValue {
    let bits = attribute.component_size_bits();
    let width = attribute.component_size_octets() as usize;
    let count = attribute.component_count() as usize;
    let raw = |i: usize| read_uint(&bytes[i * width..], width, order);

    match attribute.component_type() {
        ComponentType::SignedInteger => {
            let mut values = [0i64; 4];
            for (i, v) in values.iter_mut().enumerate().take(count) {
                *v = sign_extend(raw(i), bits);
            }
            AttributeValue::Signed(Components::from_array(values, count))
        }
        ComponentType::UnsignedInteger => {
            let mut values = [0u64; 4];
            for (i, v) in values.iter_mut().enumerate().take(count) {
                *v = raw(i);
            }
            AttributeValue::Unsigned(Components::from_array(values, count))
        }
        ComponentType::Float => {
            let mut values = [0f64; 4];
            for (i, v) in values.iter_mut().enumerate().take(count) {
                *v = float_from_bits(raw(i), bits);
            }
            AttributeValue::Float(Components::from_array(values, count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::AttributeName;
    use rstest::rstest;

    fn attr(ty: ComponentType, count: u32, bits: u32) -> Attribute {
        Attribute::new(AttributeName::new("a").unwrap(), ty, count, bits).unwrap()
    }

    #[rstest]
    #[case::big(ByteOrder::BigEndian, [0x12, 0x34, 0x56])]
    #[case::little(ByteOrder::LittleEndian, [0x56, 0x34, 0x12])]
    fn test_uint_byte_order(#[case] order: ByteOrder, #[case] expected: [u8; 3]) {
        let mut out = [0u8; 3];
        write_uint(&mut out, 0x123456, 3, order);
        assert_eq!(out, expected);
        assert_eq!(read_uint(&out, 3, order), 0x123456);
    }

    #[test]
    fn test_signed_sign_extension() {
        let a = attr(ComponentType::SignedInteger, 2, 8);
        let value = AttributeValue::signed(&[-1, -128]).unwrap();
        let mut out = [0u8; 2];
        encode_value(&value, &a, ByteOrder::BigEndian, &mut out);
        assert_eq!(out, [0xff, 0x80]);
        assert_eq!(decode_value(&out, &a, ByteOrder::BigEndian), value);
    }

    #[test]
    fn test_half_float() {
        let a = attr(ComponentType::Float, 1, 16);
        let value = AttributeValue::float(&[1.0]).unwrap();
        let mut out = [0u8; 2];
        encode_value(&value, &a, ByteOrder::LittleEndian, &mut out);
        assert_eq!(out, [0x00, 0x3c]);
        assert_eq!(decode_value(&out, &a, ByteOrder::LittleEndian), value);
    }

    #[test]
    fn test_float32_narrowing() {
        let a = attr(ComponentType::Float, 3, 32);
        let value = AttributeValue::float(&[0.1, -2.5, 1.0e10]).unwrap();
        let mut out = [0u8; 12];
        encode_value(&value, &a, ByteOrder::BigEndian, &mut out);
        let AttributeValue::Float(decoded) = decode_value(&out, &a, ByteOrder::BigEndian) else {
            panic!("expected float value");
        };
        assert_eq!(decoded.as_slice()[0], f64::from(0.1f32));
        assert_eq!(decoded.as_slice()[1], -2.5);
    }

    #[test]
    fn test_unsigned_64() {
        let a = attr(ComponentType::UnsignedInteger, 4, 64);
        let value = AttributeValue::unsigned(&[0, 1, u64::MAX, 1 << 40]).unwrap();
        let mut out = [0u8; 32];
        encode_value(&value, &a, ByteOrder::LittleEndian, &mut out);
        assert_eq!(decode_value(&out, &a, ByteOrder::LittleEndian), value);
    }
}
