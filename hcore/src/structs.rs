//! Fixed-width little endian record views.
//!
//! Every record is a view over some byte buffer `B` positioned at an offset.
//! With `B: AsRef<[u8]>` the view is read only, with `B: AsMut<[u8]>` the
//! setters are available as well. Setters reject any value that does not fit
//! in the field width instead of truncating it, since a bad length field
//! breaks the framing of everything that follows it.
//!
//! | Record          | Size | Fields |
//! | --------------- | ---: | ------ |
//! | [`FileHeader`]    | 4  | `metadata_len: u32` |
//! | [`PageHeader`]    | 12 | `metadata_len: u32, pack_len: u32, text_len: u32` |
//! | [`ElementHeader`] | 17 | `name: u8, text_len: u32, text_start: u32, attr_len: u32, child_len: u32` |
//! | [`Attribute`]     | 5  | `name: u8, size: u32` |
use std::fmt::Debug;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CoreError;

/// A primitive that can live inside a record.
pub trait Field: Copy {
    const BITS: u32;

    fn get(buf: &[u8]) -> Self;
    fn put(buf: &mut [u8], value: Self);
}

impl Field for u8 {
    const BITS: u32 = 8;

    fn get(buf: &[u8]) -> Self {
        buf[0]
    }

    fn put(buf: &mut [u8], value: Self) {
        buf[0] = value;
    }
}

impl Field for u32 {
    const BITS: u32 = 32;

    fn get(buf: &[u8]) -> Self {
        LittleEndian::read_u32(buf)
    }

    fn put(buf: &mut [u8], value: Self) {
        LittleEndian::write_u32(buf, value);
    }
}

/// Convert `value` into the field type, failing if it is out of range.
pub fn checked<F, V>(value: V) -> Result<F, CoreError>
where
    F: Field + TryFrom<V>,
    V: Debug + Copy,
{
    F::try_from(value).map_err(|_| CoreError::InvalidValue(format!("{:?}", value), F::BITS))
}

/// A record type with a fixed on-disk size.
pub trait Record<B>: Sized {
    const SIZE: usize;

    /// View `buf` at `off`, checking that the whole record fits.
    fn at(buf: B, off: usize) -> Result<Self, CoreError>;
}

macro_rules! record {
    (
        $(#[$meta:meta])*
        $name:ident, $size:expr, {
            $($field:ident / $setter:ident : $ty:ty = $foff:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $name<B> {
            buf: B,
            off: usize,
        }

        impl $name<()> {
            pub const SIZE: usize = $size;
        }

        impl<B: AsRef<[u8]>> Record<B> for $name<B> {
            const SIZE: usize = $size;

            fn at(buf: B, off: usize) -> Result<Self, CoreError> {
                let len = buf.as_ref().len();
                match off.checked_add($size) {
                    Some(end) if end <= len => Ok($name { buf, off }),
                    _ => Err(CoreError::OutOfBounds { off, size: $size, len }),
                }
            }
        }

        impl<B: AsRef<[u8]>> $name<B> {
            pub fn off(&self) -> usize {
                self.off
            }

            pub fn end_off(&self) -> usize {
                self.off + $size
            }

            pub fn to_bytes(&self) -> &[u8] {
                &self.buf.as_ref()[self.off..self.off + $size]
            }

            $(
                pub fn $field(&self) -> $ty {
                    <$ty as Field>::get(&self.buf.as_ref()[self.off + $foff..])
                }
            )*
        }

        impl<B: AsRef<[u8]> + AsMut<[u8]>> $name<B> {
            $(
                pub fn $setter<V>(&mut self, value: V) -> Result<(), CoreError>
                where
                    $ty: TryFrom<V>,
                    V: Debug + Copy,
                {
                    let value: $ty = checked(value)?;
                    <$ty as Field>::put(&mut self.buf.as_mut()[self.off + $foff..], value);
                    Ok(())
                }
            )*
        }
    };
}

record!(
    /// Follows the magic tag, gives the length of the file level metadata.
    FileHeader, 4, {
        metadata_len / set_metadata_len: u32 = 0,
    }
);

record!(
    /// Precedes every page: metadata, then pack stream, then text stream.
    PageHeader, 12, {
        metadata_len / set_metadata_len: u32 = 0,
        pack_len / set_pack_len: u32 = 4,
        text_len / set_text_len: u32 = 8,
    }
);

record!(
    /// One element of the pack stream, followed by `attr_len` bytes of
    /// attributes and `child_len` bytes of child elements.
    ElementHeader, 17, {
        name / set_name: u8 = 0,
        text_len / set_text_len: u32 = 1,
        text_start / set_text_start: u32 = 5,
        attr_len / set_attr_len: u32 = 9,
        child_len / set_child_len: u32 = 13,
    }
);

record!(
    /// One attribute, followed by `size` bytes of value.
    Attribute, 5, {
        name / set_name: u8 = 0,
        size / set_size: u32 = 1,
    }
);

#[cfg(test)]
mod test_structs {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(FileHeader::SIZE, 4);
        assert_eq!(PageHeader::SIZE, 12);
        assert_eq!(ElementHeader::SIZE, 17);
        assert_eq!(Attribute::SIZE, 5);
    }

    #[test]
    fn element_header_layout() {
        let mut raw = vec![0u8; ElementHeader::SIZE];
        let mut header = ElementHeader::at(&mut raw[..], 0).unwrap();
        header.set_name(7u8).unwrap();
        header.set_text_len(1u32).unwrap();
        header.set_text_start(2u32).unwrap();
        header.set_attr_len(3u32).unwrap();
        header.set_child_len(0x0102_0304u32).unwrap();

        assert_eq!(header.end_off(), 17);
        assert_eq!(
            raw,
            vec![7, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 3, 2, 1]
        );
    }

    #[test]
    fn page_header_at_offset() {
        let mut raw = vec![0xffu8; 2 + PageHeader::SIZE];
        {
            let mut header = PageHeader::at(&mut raw[..], 2).unwrap();
            header.set_metadata_len(12345usize).unwrap();
            header.set_pack_len(0usize).unwrap();
            header.set_text_len(u32::MAX).unwrap();
        }
        assert_eq!(&raw[..2], &[0xff, 0xff]);

        let header = PageHeader::at(&raw[..], 2).unwrap();
        assert_eq!(header.metadata_len(), 12345);
        assert_eq!(header.pack_len(), 0);
        assert_eq!(header.text_len(), u32::MAX);
        assert_eq!(header.to_bytes(), &raw[2..]);
    }

    #[test]
    fn negative_value() {
        let mut raw = vec![0u8; FileHeader::SIZE];
        let mut header = FileHeader::at(&mut raw[..], 0).unwrap();

        assert!(matches!(
            header.set_metadata_len(-1i64),
            Err(CoreError::InvalidValue(_, 32))
        ));
        assert_eq!(header.metadata_len(), 0);
    }

    #[test]
    fn value_past_width() {
        let mut raw = vec![0u8; ElementHeader::SIZE];
        let mut header = ElementHeader::at(&mut raw[..], 0).unwrap();

        assert!(matches!(
            header.set_text_len(1u64 << 32),
            Err(CoreError::InvalidValue(_, 32))
        ));
        assert!(matches!(
            header.set_name(256u32),
            Err(CoreError::InvalidValue(_, 8))
        ));
        assert!(matches!(
            header.set_name(-1i32),
            Err(CoreError::InvalidValue(_, 8))
        ));
        assert_eq!(raw, vec![0u8; ElementHeader::SIZE]);
    }

    #[test]
    fn out_of_bounds() {
        let raw = vec![0u8; 10];
        assert!(matches!(
            Attribute::at(&raw[..], 6),
            Err(CoreError::OutOfBounds { off: 6, size: 5, len: 10 })
        ));
        assert!(Attribute::at(&raw[..], 5).is_ok());
        assert!(Attribute::at(&raw[..], usize::MAX).is_err());
    }
}
