//! `nlattr` TLVs: header, level iterator and type-indexed table.
//!
//! [`AttrIter`] walks one nesting level; [`AttrTable`] indexes that level by
//! attribute type so that codecs can look fields up in any order.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::Result;

pub const NLA_ALIGNTO: usize = 4;

#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

pub const NLA_HDRLEN: usize = nla_align(std::mem::size_of::<NlAttr>());

pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
/// Strips the flag bits from `nla_type`.
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// `struct nlattr`. `nla_len` counts the header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    pub nla_len: u16,
    pub nla_type: u16,
}

impl NlAttr {
    pub fn new(attr_type: u16, payload_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + payload_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Type tag with the nested/byte-order flags removed.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }
}

/// Yields `(type, payload)` for each attribute at one level.
///
/// A length that is too small or runs past the buffer ends the walk; what was
/// read before it is still yielded.
pub struct AttrIter<'a> {
    rest: &'a [u8],
}

impl<'a> AttrIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { rest: data }
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let data = std::mem::take(&mut self.rest);
        let (attr, _) = NlAttr::read_from_prefix(data).ok()?;

        let len = attr.nla_len as usize;
        if !(NLA_HDRLEN..=data.len()).contains(&len) {
            tracing::debug!(len, remaining = data.len(), "malformed attribute length");
            return None;
        }

        self.rest = data.get(nla_align(len)..).unwrap_or_default();
        Some((attr.kind(), &data[NLA_HDRLEN..len]))
    }
}

/// One nesting level of attributes indexed by type.
///
/// Types above `max_type` are skipped so that attributes added by newer
/// kernels do not break older decoders. When a type repeats, the first
/// occurrence owns the slot; [`AttrTable::all`] still yields every copy.
#[derive(Debug, Clone)]
pub struct AttrTable<'a> {
    data: &'a [u8],
    slots: Vec<Option<&'a [u8]>>,
}

impl<'a> AttrTable<'a> {
    /// Index the attributes found in `data`.
    pub fn parse(data: &'a [u8], max_type: u16) -> Self {
        let mut slots = vec![None; max_type as usize + 1];
        for (kind, payload) in AttrIter::new(data) {
            match slots.get_mut(kind as usize) {
                Some(slot) => {
                    if slot.is_none() {
                        *slot = Some(payload);
                    }
                }
                None => tracing::trace!(kind, max_type, "ignoring unknown attribute"),
            }
        }
        Self { data, slots }
    }

    /// Payload of an attribute, if present.
    pub fn get(&self, attr_type: u16) -> Option<&'a [u8]> {
        self.slots.get(attr_type as usize).copied().flatten()
    }

    /// Check whether an attribute is present (any length, including zero).
    pub fn contains(&self, attr_type: u16) -> bool {
        self.get(attr_type).is_some()
    }

    /// Every payload carried under `attr_type`, in wire order.
    pub fn all(&self, attr_type: u16) -> impl Iterator<Item = &'a [u8]> + use<'a> {
        AttrIter::new(self.data)
            .filter(move |(kind, _)| *kind == attr_type)
            .map(|(_, payload)| payload)
    }

    /// Copy a fixed-size structure out of an attribute.
    ///
    /// `None` means absent, `Some(Err(Error::Truncated))` means the payload is
    /// shorter than `T`.
    pub fn read<T: FromBytes>(&self, attr_type: u16) -> Option<Result<T>> {
        self.get(attr_type).map(get::read::<T>)
    }

    /// Read a u16 attribute (native endian).
    pub fn u16(&self, attr_type: u16) -> Option<Result<u16>> {
        self.get(attr_type).map(get::u16_ne)
    }

    /// Read a u32 attribute (native endian).
    pub fn u32(&self, attr_type: u16) -> Option<Result<u32>> {
        self.get(attr_type).map(get::u32_ne)
    }

    /// Read a u64 attribute (native endian).
    pub fn u64(&self, attr_type: u16) -> Option<Result<u64>> {
        self.get(attr_type).map(get::u64_ne)
    }

    /// Read a string attribute.
    pub fn string(&self, attr_type: u16) -> Option<Result<&'a str>> {
        self.get(attr_type).map(get::string)
    }
}

/// Typed views of a single attribute payload.
pub mod get {
    use zerocopy::FromBytes;

    use super::super::error::{Error, Result};

    /// Copy a fixed-size value from the start of a payload (native endian).
    ///
    /// Bytes past `size_of::<T>()` are ignored.
    pub fn read<T: FromBytes>(data: &[u8]) -> Result<T> {
        T::read_from_prefix(data)
            .map(|(value, _)| value)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<T>(),
                actual: data.len(),
            })
    }

    pub fn u16_ne(data: &[u8]) -> Result<u16> {
        read(data)
    }

    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        read(data)
    }

    pub fn u64_ne(data: &[u8]) -> Result<u64> {
        read(data)
    }

    /// String up to the first NUL, or the whole payload if there is none.
    pub fn string(data: &[u8]) -> Result<&str> {
        let text = data.split(|&b| b == 0).next().unwrap_or_default();
        std::str::from_utf8(text)
            .map_err(|e| Error::InvalidAttribute(format!("attribute is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::error::Error;

    fn attr(kind: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = NlAttr::new(kind, payload.len()).as_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf.resize(nla_align(buf.len()), 0);
        buf
    }

    #[test]
    fn test_iter_skips_padding() {
        let mut buf = attr(1, &[0xaa]);
        buf.extend(attr(2, &7u32.to_ne_bytes()));

        let attrs: Vec<_> = AttrIter::new(&buf).collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], (1, &[0xaa][..]));
        assert_eq!(attrs[1].0, 2);
        assert_eq!(get::u32_ne(attrs[1].1).unwrap(), 7);
    }

    #[test]
    fn test_iter_stops_on_bad_length() {
        let mut buf = attr(1, &[1, 2, 3, 4]);
        // Claims 200 bytes, only 8 follow
        buf.extend_from_slice(&[200, 0, 2, 0, 0, 0, 0, 0]);

        let attrs: Vec<_> = AttrIter::new(&buf).collect();
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_nested_flag_is_stripped() {
        let buf = attr(3 | NLA_F_NESTED, &[]);
        let (kind, payload) = AttrIter::new(&buf).next().unwrap();
        assert_eq!(kind, 3);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_table_ignores_unknown_types() {
        let mut buf = attr(1, &5u16.to_ne_bytes());
        buf.extend(attr(42, &[9, 9, 9, 9]));

        let table = AttrTable::parse(&buf, 4);
        assert_eq!(table.u16(1).unwrap().unwrap(), 5);
        assert!(table.get(42).is_none());
        assert!(!table.contains(2));
    }

    #[test]
    fn test_table_first_duplicate_wins() {
        let mut buf = attr(2, &1u32.to_ne_bytes());
        buf.extend(attr(2, &2u32.to_ne_bytes()));

        let table = AttrTable::parse(&buf, 2);
        assert_eq!(table.u32(2).unwrap().unwrap(), 1);

        let all: Vec<u32> = table
            .all(2)
            .map(|p| get::u32_ne(p).unwrap())
            .collect();
        assert_eq!(all, vec![1, 2]);
    }

    #[test]
    fn test_table_flags_truncated_payload() {
        let buf = attr(1, &[1, 2]);
        let table = AttrTable::parse(&buf, 1);

        match table.u32(1) {
            Some(Err(Error::Truncated { expected, actual })) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 2);
            }
            other => panic!("expected truncated, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_length_marker_is_present() {
        let buf = attr(4, &[]);
        let table = AttrTable::parse(&buf, 6);
        assert!(table.contains(4));
        assert_eq!(table.get(4), Some(&[][..]));
    }

    #[test]
    fn test_get_string() {
        assert_eq!(get::string(b"ctinfo\0").unwrap(), "ctinfo");
        assert_eq!(get::string(b"conndscp").unwrap(), "conndscp");
    }
}
