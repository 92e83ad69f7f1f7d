//! The closed set of sample types and their typed storage.
//!
//! Signal records carry a [`SampleType`] code in their file name, numbers
//! records carry a one-byte tag per value. Both map onto the same eleven
//! primitive types.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Primitive sample type of a signal or number record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SampleType {
    Float64 = 1,
    Float32 = 2,
    Int64 = 3,
    UInt64 = 4,
    Int32 = 5,
    UInt32 = 6,
    Int16 = 7,
    UInt16 = 8,
    Int8 = 9,
    UInt8 = 10,
    Bool = 11,
}

impl SampleType {
    pub const ALL: [SampleType; 11] = [
        SampleType::Float64,
        SampleType::Float32,
        SampleType::Int64,
        SampleType::UInt64,
        SampleType::Int32,
        SampleType::UInt32,
        SampleType::Int16,
        SampleType::UInt16,
        SampleType::Int8,
        SampleType::UInt8,
        SampleType::Bool,
    ];

    /// Code used in signal record file names.
    pub fn code(self) -> &'static str {
        match self {
            SampleType::Float64 => "f64",
            SampleType::Float32 => "f32",
            SampleType::Int64 => "i64",
            SampleType::UInt64 => "u64",
            SampleType::Int32 => "i32",
            SampleType::UInt32 => "u32",
            SampleType::Int16 => "i16",
            SampleType::UInt16 => "u16",
            SampleType::Int8 => "i8",
            SampleType::UInt8 => "u8",
            SampleType::Bool => "b",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.code() == code)
    }

    /// Tag byte used in numbers records. Tag 0 is reserved as invalid.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1..=11 => Some(Self::ALL[(tag - 1) as usize]),
            _ => None,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            SampleType::Float64 | SampleType::Int64 | SampleType::UInt64 => 8,
            SampleType::Float32 | SampleType::Int32 | SampleType::UInt32 => 4,
            SampleType::Int16 | SampleType::UInt16 => 2,
            SampleType::Int8 | SampleType::UInt8 | SampleType::Bool => 1,
        }
    }
}

/// A single typed value from a numbers record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumberValue {
    Float64(f64),
    Float32(f32),
    Int64(i64),
    UInt64(u64),
    Int32(i32),
    UInt32(u32),
    Int16(i16),
    UInt16(u16),
    Int8(i8),
    UInt8(u8),
    Bool(bool),
}

impl NumberValue {
    pub fn sample_type(&self) -> SampleType {
        match self {
            NumberValue::Float64(_) => SampleType::Float64,
            NumberValue::Float32(_) => SampleType::Float32,
            NumberValue::Int64(_) => SampleType::Int64,
            NumberValue::UInt64(_) => SampleType::UInt64,
            NumberValue::Int32(_) => SampleType::Int32,
            NumberValue::UInt32(_) => SampleType::UInt32,
            NumberValue::Int16(_) => SampleType::Int16,
            NumberValue::UInt16(_) => SampleType::UInt16,
            NumberValue::Int8(_) => SampleType::Int8,
            NumberValue::UInt8(_) => SampleType::UInt8,
            NumberValue::Bool(_) => SampleType::Bool,
        }
    }

    /// Native-endian payload bytes.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        match *self {
            NumberValue::Float64(v) => v.to_ne_bytes().to_vec(),
            NumberValue::Float32(v) => v.to_ne_bytes().to_vec(),
            NumberValue::Int64(v) => v.to_ne_bytes().to_vec(),
            NumberValue::UInt64(v) => v.to_ne_bytes().to_vec(),
            NumberValue::Int32(v) => v.to_ne_bytes().to_vec(),
            NumberValue::UInt32(v) => v.to_ne_bytes().to_vec(),
            NumberValue::Int16(v) => v.to_ne_bytes().to_vec(),
            NumberValue::UInt16(v) => v.to_ne_bytes().to_vec(),
            NumberValue::Int8(v) => v.to_ne_bytes().to_vec(),
            NumberValue::UInt8(v) => vec![v],
            NumberValue::Bool(v) => vec![v as u8],
        }
    }

    /// Decodes a payload of exactly `sample_type.byte_size()` bytes.
    pub fn from_ne_bytes(sample_type: SampleType, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != sample_type.byte_size() {
            return Err(Error::UnalignedBytes {
                bytes: bytes.len(),
                sample_size: sample_type.byte_size(),
            });
        }
        macro_rules! decode {
            ($ty:ty) => {{
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_ne_bytes(raw)
            }};
        }
        Ok(match sample_type {
            SampleType::Float64 => NumberValue::Float64(decode!(f64)),
            SampleType::Float32 => NumberValue::Float32(decode!(f32)),
            SampleType::Int64 => NumberValue::Int64(decode!(i64)),
            SampleType::UInt64 => NumberValue::UInt64(decode!(u64)),
            SampleType::Int32 => NumberValue::Int32(decode!(i32)),
            SampleType::UInt32 => NumberValue::UInt32(decode!(u32)),
            SampleType::Int16 => NumberValue::Int16(decode!(i16)),
            SampleType::UInt16 => NumberValue::UInt16(decode!(u16)),
            SampleType::Int8 => NumberValue::Int8(decode!(i8)),
            SampleType::UInt8 => NumberValue::UInt8(bytes[0]),
            SampleType::Bool => NumberValue::Bool(bytes[0] != 0),
        })
    }
}

/// Typed sample storage for one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Bool(Vec<bool>),
}

/// Applies `$body` to the inner vector of every variant.
macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            SampleData::Float64($v) => $body,
            SampleData::Float32($v) => $body,
            SampleData::Int64($v) => $body,
            SampleData::UInt64($v) => $body,
            SampleData::Int32($v) => $body,
            SampleData::UInt32($v) => $body,
            SampleData::Int16($v) => $body,
            SampleData::UInt16($v) => $body,
            SampleData::Int8($v) => $body,
            SampleData::UInt8($v) => $body,
            SampleData::Bool($v) => $body,
        }
    };
}

/// Applies `$body` to the inner vectors of two values of the same variant.
macro_rules! zip_variant {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr, else $fallback:expr) => {
        match ($lhs, $rhs) {
            (SampleData::Float64($a), SampleData::Float64($b)) => $body,
            (SampleData::Float32($a), SampleData::Float32($b)) => $body,
            (SampleData::Int64($a), SampleData::Int64($b)) => $body,
            (SampleData::UInt64($a), SampleData::UInt64($b)) => $body,
            (SampleData::Int32($a), SampleData::Int32($b)) => $body,
            (SampleData::UInt32($a), SampleData::UInt32($b)) => $body,
            (SampleData::Int16($a), SampleData::Int16($b)) => $body,
            (SampleData::UInt16($a), SampleData::UInt16($b)) => $body,
            (SampleData::Int8($a), SampleData::Int8($b)) => $body,
            (SampleData::UInt8($a), SampleData::UInt8($b)) => $body,
            (SampleData::Bool($a), SampleData::Bool($b)) => $body,
            _ => $fallback,
        }
    };
}

fn check_range(offset: usize, length: usize, capacity: usize) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(Error::OutOfRange {
            offset,
            length,
            capacity,
        }),
    }
}

impl SampleData {
    /// Zero-filled storage of `len` samples.
    pub fn zeroed(sample_type: SampleType, len: usize) -> Self {
        match sample_type {
            SampleType::Float64 => SampleData::Float64(vec![0.0; len]),
            SampleType::Float32 => SampleData::Float32(vec![0.0; len]),
            SampleType::Int64 => SampleData::Int64(vec![0; len]),
            SampleType::UInt64 => SampleData::UInt64(vec![0; len]),
            SampleType::Int32 => SampleData::Int32(vec![0; len]),
            SampleType::UInt32 => SampleData::UInt32(vec![0; len]),
            SampleType::Int16 => SampleData::Int16(vec![0; len]),
            SampleType::UInt16 => SampleData::UInt16(vec![0; len]),
            SampleType::Int8 => SampleData::Int8(vec![0; len]),
            SampleType::UInt8 => SampleData::UInt8(vec![0; len]),
            SampleType::Bool => SampleData::Bool(vec![false; len]),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            SampleData::Float64(_) => SampleType::Float64,
            SampleData::Float32(_) => SampleType::Float32,
            SampleData::Int64(_) => SampleType::Int64,
            SampleData::UInt64(_) => SampleType::UInt64,
            SampleData::Int32(_) => SampleType::Int32,
            SampleData::UInt32(_) => SampleType::UInt32,
            SampleData::Int16(_) => SampleType::Int16,
            SampleData::UInt16(_) => SampleType::UInt16,
            SampleData::Int8(_) => SampleType::Int8,
            SampleData::UInt8(_) => SampleType::UInt8,
            SampleData::Bool(_) => SampleType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_size(&self) -> usize {
        self.len() * self.sample_type().byte_size()
    }

    /// Resets every sample to zero without reallocating.
    pub fn clear(&mut self) {
        each_variant!(self, v => v.iter_mut().for_each(|s| *s = Default::default()))
    }

    /// Copies `length` samples from `src[src_offset..]` into `self[dst_offset..]`.
    pub fn copy_from(
        &mut self,
        src: &SampleData,
        src_offset: usize,
        dst_offset: usize,
        length: usize,
    ) -> Result<()> {
        let expected = self.sample_type();
        let actual = src.sample_type();
        check_range(src_offset, length, src.len())?;
        check_range(dst_offset, length, self.len())?;
        zip_variant!(self, src, dst, src =>
            {
                dst[dst_offset..dst_offset + length]
                    .copy_from_slice(&src[src_offset..src_offset + length]);
                Ok(())
            },
            else Err(Error::SampleTypeMismatch { expected, actual })
        )
    }

    /// Decodes native-endian `bytes` into samples starting at `offset`.
    pub fn write_ne_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let sample_size = self.sample_type().byte_size();
        if bytes.len() % sample_size != 0 {
            return Err(Error::UnalignedBytes {
                bytes: bytes.len(),
                sample_size,
            });
        }
        let count = bytes.len() / sample_size;
        check_range(offset, count, self.len())?;

        macro_rules! decode_into {
            ($dst:expr, $ty:ty) => {{
                for (sample, chunk) in $dst[offset..offset + count]
                    .iter_mut()
                    .zip(bytes.chunks_exact(sample_size))
                {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(chunk);
                    *sample = <$ty>::from_ne_bytes(raw);
                }
            }};
        }

        match self {
            SampleData::Float64(v) => decode_into!(v, f64),
            SampleData::Float32(v) => decode_into!(v, f32),
            SampleData::Int64(v) => decode_into!(v, i64),
            SampleData::UInt64(v) => decode_into!(v, u64),
            SampleData::Int32(v) => decode_into!(v, i32),
            SampleData::UInt32(v) => decode_into!(v, u32),
            SampleData::Int16(v) => decode_into!(v, i16),
            SampleData::UInt16(v) => decode_into!(v, u16),
            SampleData::Int8(v) => decode_into!(v, i8),
            SampleData::UInt8(v) => v[offset..offset + count].copy_from_slice(bytes),
            SampleData::Bool(v) => {
                for (sample, byte) in v[offset..offset + count].iter_mut().zip(bytes) {
                    *sample = *byte != 0;
                }
            }
        }
        Ok(())
    }

    /// Native-endian bytes of every sample.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_size());
        match self {
            SampleData::UInt8(v) => bytes.extend_from_slice(v),
            SampleData::Bool(v) => bytes.extend(v.iter().map(|&b| b as u8)),
            SampleData::Float64(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
            SampleData::Float32(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
            SampleData::Int64(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
            SampleData::UInt64(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
            SampleData::Int32(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
            SampleData::UInt32(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
            SampleData::Int16(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
            SampleData::UInt16(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
            SampleData::Int8(v) => v.iter().for_each(|s| bytes.extend(s.to_ne_bytes())),
        }
        bytes
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            SampleData::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            SampleData::Float64(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for SampleData {
    fn from(v: Vec<f32>) -> Self {
        SampleData::Float32(v)
    }
}

impl From<Vec<f64>> for SampleData {
    fn from(v: Vec<f64>) -> Self {
        SampleData::Float64(v)
    }
}

impl From<Vec<i16>> for SampleData {
    fn from(v: Vec<i16>) -> Self {
        SampleData::Int16(v)
    }
}

impl From<Vec<i32>> for SampleData {
    fn from(v: Vec<i32>) -> Self {
        SampleData::Int32(v)
    }
}
