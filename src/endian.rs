//! Endian-aware reads and writes shared by the binary I/O primitives and the
//! header accessors. `ElfEndian` (from [`crate::header::ident`]) is the single
//! switch that decides byte order for every multi-byte field in the file;
//! nothing else in the crate branches on endianness directly.

use crate::header::ident::ElfEndian;

impl ElfEndian {
    /// Decodes a `T` out of `slice` at `offset`, advancing `offset` by
    /// `size_of::<T>()` when one is supplied.
    #[inline]
    pub fn read<T: EndianReader>(&self, slice: &[u8], offset: Option<&mut usize>) -> Option<T> {
        T::read_with_endian(slice, *self, offset)
    }

    /// Encodes `value` into a fresh byte vector using this endianness.
    #[inline]
    pub fn write<T: EndianWriter>(&self, value: T) -> Vec<u8> {
        value.write_with_endian(*self)
    }
}

pub trait EndianReader {
    fn read_with_endian(slice: &[u8], endian: ElfEndian, offset: Option<&mut usize>) -> Option<Self>
    where
        Self: Sized;
}

pub trait EndianWriter {
    fn write_with_endian(&self, endian: ElfEndian) -> Vec<u8>;
}

macro_rules! impl_endian_reader {
    ($ty: ty) => {
        impl EndianReader for $ty {
            fn read_with_endian(slice: &[u8], endian: ElfEndian, offset: Option<&mut usize>) -> Option<Self> {
                const SELF_SIZE: usize = core::mem::size_of::<$ty>();

                let offset_usize = offset.as_ref().map(|value| **value).unwrap_or(0);
                let slice = slice.get(offset_usize..(offset_usize + SELF_SIZE))?;
                if let Some(offset) = offset {
                    *offset += SELF_SIZE;
                }

                match endian {
                    ElfEndian::Big => Some(Self::from_be_bytes(slice.try_into().ok()?)),
                    ElfEndian::Little => Some(Self::from_le_bytes(slice.try_into().ok()?)),
                    ElfEndian::Invalid => None,
                }
            }
        }

        impl EndianWriter for $ty {
            fn write_with_endian(&self, endian: ElfEndian) -> Vec<u8> {
                match endian {
                    ElfEndian::Big | ElfEndian::Invalid => self.to_be_bytes().to_vec(),
                    ElfEndian::Little => self.to_le_bytes().to_vec(),
                }
            }
        }
    };
}

impl_endian_reader!(u16);
impl_endian_reader!(u32);
impl_endian_reader!(u64);
impl_endian_reader!(i64);
