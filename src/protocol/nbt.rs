use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};

/// Nesting depth the vanilla reader allows
const MAX_DEPTH: usize = 512;

/// NBT tag. Compounds keep their keys sorted so the same data always serializes to the same
/// bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(BTreeMap<String, Tag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn read_len<R: Read>(reader: &mut R) -> io::Result<usize> {
    let length = reader.read_i32::<BigEndian>()?;
    if length < 0 {
        return Err(invalid(format!("Negative NBT length: {}", length)));
    }
    Ok(length as usize)
}

fn read_utf<R: Read>(reader: &mut R) -> io::Result<String> {
    let length = reader.read_u16::<BigEndian>()?;
    let mut bytes = vec![0u8; length as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))
}

fn write_utf<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "NBT string longer than 65535 bytes",
        ));
    }
    writer.write_u16::<BigEndian>(bytes.len() as u16)?;
    writer.write_all(bytes)
}

impl Tag {
    pub fn get_type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    pub fn empty_compound() -> Tag {
        Tag::Compound(BTreeMap::new())
    }

    /// Reads a named tag, the layout used on disk.
    pub fn read_named<R: Read>(reader: &mut R) -> io::Result<(String, Tag)> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok((String::new(), Tag::End));
        }
        let name = read_utf(reader)?;
        let tag = Tag::read_payload(reader, type_id, 0)?;
        Ok((name, tag))
    }

    /// Reads a nameless root tag, the layout used in packets since 1.20.2.
    pub fn read_network<R: Read>(reader: &mut R) -> io::Result<Tag> {
        let type_id = reader.read_u8()?;
        Tag::read_payload(reader, type_id, 0)
    }

    fn read_payload<R: Read>(reader: &mut R, type_id: u8, depth: usize) -> io::Result<Tag> {
        if depth > MAX_DEPTH {
            return Err(invalid("NBT nested too deeply".to_owned()));
        }
        match type_id {
            0 => Ok(Tag::End),
            1 => Ok(Tag::Byte(reader.read_i8()?)),
            2 => Ok(Tag::Short(reader.read_i16::<BigEndian>()?)),
            3 => Ok(Tag::Int(reader.read_i32::<BigEndian>()?)),
            4 => Ok(Tag::Long(reader.read_i64::<BigEndian>()?)),
            5 => Ok(Tag::Float(reader.read_f32::<BigEndian>()?)),
            6 => Ok(Tag::Double(reader.read_f64::<BigEndian>()?)),
            7 => {
                let length = read_len(reader)?;
                let mut bytes = Vec::with_capacity(length.min(1024));
                reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
                if bytes.len() < length {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("Byte array of {} bytes ends after {}", length, bytes.len()),
                    ));
                }
                Ok(Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect()))
            }
            8 => Ok(Tag::String(read_utf(reader)?)),
            9 => {
                let element_type = reader.read_u8()?;
                let length = read_len(reader)?;
                // End elements take no bytes, so their count can't be checked against the input
                if element_type == 0 && length > 0 {
                    return Err(invalid(format!(
                        "List of {} elements has no element type",
                        length
                    )));
                }
                let mut list = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    list.push(Tag::read_payload(reader, element_type, depth + 1)?);
                }
                Ok(Tag::List(list))
            }
            10 => {
                let mut compound = BTreeMap::new();
                loop {
                    let entry_type = reader.read_u8()?;
                    if entry_type == 0 {
                        break;
                    }
                    let name = read_utf(reader)?;
                    let tag = Tag::read_payload(reader, entry_type, depth + 1)?;
                    compound.insert(name, tag);
                }
                Ok(Tag::Compound(compound))
            }
            11 => {
                let length = read_len(reader)?;
                let mut ints = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    ints.push(reader.read_i32::<BigEndian>()?);
                }
                Ok(Tag::IntArray(ints))
            }
            12 => {
                let length = read_len(reader)?;
                let mut longs = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    longs.push(reader.read_i64::<BigEndian>()?);
                }
                Ok(Tag::LongArray(longs))
            }
            _ => Err(invalid(format!("Invalid tag type: {}", type_id))),
        }
    }

    pub fn write_named<W: Write>(&self, writer: &mut W, name: &str) -> io::Result<()> {
        writer.write_u8(self.get_type_id())?;
        if !matches!(self, Tag::End) {
            write_utf(writer, name)?;
        }
        self.write_payload(writer)
    }

    pub fn write_network<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.get_type_id())?;
        self.write_payload(writer)
    }

    fn write_payload<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => writer.write_i8(*v),
            Tag::Short(v) => writer.write_i16::<BigEndian>(*v),
            Tag::Int(v) => writer.write_i32::<BigEndian>(*v),
            Tag::Long(v) => writer.write_i64::<BigEndian>(*v),
            Tag::Float(v) => writer.write_f32::<BigEndian>(*v),
            Tag::Double(v) => writer.write_f64::<BigEndian>(*v),
            Tag::ByteArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                let bytes: Vec<u8> = v.iter().map(|b| *b as u8).collect();
                writer.write_all(&bytes)
            }
            Tag::String(v) => write_utf(writer, v),
            Tag::List(v) => {
                let element_type = v.first().map(Tag::get_type_id).unwrap_or(0);
                if v.iter().any(|tag| tag.get_type_id() != element_type) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "NBT list elements must share one type",
                    ));
                }
                writer.write_u8(element_type)?;
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for tag in v {
                    tag.write_payload(writer)?;
                }
                Ok(())
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    tag.write_named(writer, name)?;
                }
                writer.write_u8(0)
            }
            Tag::IntArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for &i in v {
                    writer.write_i32::<BigEndian>(i)?;
                }
                Ok(())
            }
            Tag::LongArray(v) => {
                writer.write_i32::<BigEndian>(v.len() as i32)?;
                for &l in v {
                    writer.write_i64::<BigEndian>(l)?;
                }
                Ok(())
            }
        }
    }

    /// Serializes as a root tag with an empty name.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_named(&mut bytes, "")?;
        Ok(bytes)
    }

    /// Parses bytes produced by [`Tag::to_bytes`]. Trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Tag> {
        let mut reader = bytes;
        let (_, tag) = Tag::read_named(&mut reader)?;
        if !reader.is_empty() {
            return Err(invalid(format!("{} trailing bytes after NBT", reader.len())));
        }
        Ok(tag)
    }

    pub fn to_gzip_bytes(&self) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        self.write_named(&mut encoder, "")?;
        encoder.finish()
    }

    pub fn from_gzip_bytes(bytes: &[u8]) -> io::Result<Tag> {
        let mut decoder = GzDecoder::new(bytes);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;
        Tag::from_bytes(&raw)
    }

    pub fn as_compound(&self) -> Option<&BTreeMap<String, Tag>> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[i8]> {
        match self {
            Tag::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }
}
