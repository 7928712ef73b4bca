//! Minimal named-binary-tag (NBT) parser.
//!
//! Parses the big-endian tag tree embedded in auction item payloads, just
//! far enough to walk it and pull out individual named values. Not a
//! general-purpose NBT library: no serialization, no MUTF-8 edge cases
//! (strings decode lossily), no SNBT text form.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NbtError {
    #[error("truncated tag data at offset {0}")]
    Truncated(usize),
    #[error("unknown tag type {0} at offset {1}")]
    UnknownTagType(u8, usize),
    #[error("root tag is not a compound")]
    RootNotCompound,
}

/// One parsed tag payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(Vec<(String, Tag)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    /// First `Short` named `name`, depth-first.
    pub fn find_short(&self, name: &str) -> Option<i16> {
        self.find(name, |t| match t {
            Tag::Short(v) => Some(*v),
            _ => None,
        })
    }

    /// First `Byte` named `name`, depth-first.
    pub fn find_byte(&self, name: &str) -> Option<i8> {
        self.find(name, |t| match t {
            Tag::Byte(v) => Some(*v),
            _ => None,
        })
    }

    /// First `Int` named `name`, depth-first.
    pub fn find_int(&self, name: &str) -> Option<i32> {
        self.find(name, |t| match t {
            Tag::Int(v) => Some(*v),
            _ => None,
        })
    }

    /// First `String` named `name`, depth-first.
    pub fn find_string(&self, name: &str) -> Option<&str> {
        self.find(name, |t| match t {
            Tag::String(v) => Some(v.as_str()),
            _ => None,
        })
    }

    fn find<'a, T>(&'a self, name: &str, extract: fn(&'a Tag) -> Option<T>) -> Option<T> {
        match self {
            Tag::Compound(entries) => {
                for (key, value) in entries {
                    if key == name {
                        if let Some(found) = extract(value) {
                            return Some(found);
                        }
                    }
                    if let Some(found) = value.find(name, extract) {
                        return Some(found);
                    }
                }
                None
            }
            Tag::List(items) => items.iter().find_map(|item| item.find(name, extract)),
            _ => None,
        }
    }
}

/// Parse a full NBT document. The root must be a (possibly anonymous)
/// compound tag; its payload is returned.
pub fn parse(data: &[u8]) -> Result<Tag, NbtError> {
    let mut reader = Reader { data, pos: 0 };
    let tag_type = reader.u8()?;
    if tag_type != 10 {
        return Err(NbtError::RootNotCompound);
    }
    let _root_name = reader.string()?;
    read_payload(&mut reader, tag_type)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], NbtError> {
        if self.data.len() - self.pos < n {
            return Err(NbtError::Truncated(self.pos));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, NbtError> {
        Ok(self.take(1)?[0])
    }

    fn i16(&mut self) -> Result<i16, NbtError> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, NbtError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, NbtError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn f32(&mut self) -> Result<f32, NbtError> {
        Ok(f32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64, NbtError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Length-prefixed string (u16 length, bytes decoded lossily).
    fn string(&mut self) -> Result<String, NbtError> {
        let len = u16::from_be_bytes(self.take(2)?.try_into().unwrap()) as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Validated element count for arrays and lists.
    fn count(&mut self) -> Result<usize, NbtError> {
        let raw = self.i32()?;
        if raw < 0 || raw as usize > self.data.len() - self.pos {
            return Err(NbtError::Truncated(self.pos));
        }
        Ok(raw as usize)
    }
}

fn read_payload(reader: &mut Reader<'_>, tag_type: u8) -> Result<Tag, NbtError> {
    Ok(match tag_type {
        1 => Tag::Byte(reader.u8()? as i8),
        2 => Tag::Short(reader.i16()?),
        3 => Tag::Int(reader.i32()?),
        4 => Tag::Long(reader.i64()?),
        5 => Tag::Float(reader.f32()?),
        6 => Tag::Double(reader.f64()?),
        7 => {
            let len = reader.count()?;
            Tag::ByteArray(reader.take(len)?.iter().map(|b| *b as i8).collect())
        }
        8 => Tag::String(reader.string()?),
        9 => {
            let elem_type = reader.u8()?;
            let len = reader.count()?;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(read_payload(reader, elem_type)?);
            }
            Tag::List(items)
        }
        10 => {
            let mut entries = Vec::new();
            loop {
                let entry_type = reader.u8()?;
                if entry_type == 0 {
                    break;
                }
                let name = reader.string()?;
                entries.push((name, read_payload(reader, entry_type)?));
            }
            Tag::Compound(entries)
        }
        11 => {
            let len = reader.count()?;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(reader.i32()?);
            }
            Tag::IntArray(items)
        }
        12 => {
            let len = reader.count()?;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(reader.i64()?);
            }
            Tag::LongArray(items)
        }
        other => return Err(NbtError::UnknownTagType(other, reader.pos)),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
