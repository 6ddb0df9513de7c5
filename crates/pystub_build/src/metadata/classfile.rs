use thiserror::Error;

use super::index::{AccessFlags, ClassRecord, FieldRecord, MethodRecord, NestedClassRef};

const INNER_CLASSES: &str = "InnerClasses";

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("invalid UTF-8 string in constant pool: {0}")]
    Utf8Decode(#[from] std::string::FromUtf8Error),
}

/// Parses the structural parts of a class file: header, constant pool,
/// this-class, field and method tables, and the `InnerClasses` attribute.
/// Code, debug and stack-map attributes are skipped without decoding.
pub fn parse_class(bytes: &[u8]) -> Result<ClassRecord, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let constant_pool = ConstantPool::parse(&mut reader)?;

    let access = AccessFlags::new(reader.read_u2()?);
    let this_class = reader.read_u2()?;
    let _super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    reader.skip(interfaces_count as usize * 2)?;

    let fields_count = reader.read_u2()?;
    let mut fields = Vec::with_capacity(fields_count as usize);
    for _ in 0..fields_count {
        let access = AccessFlags::new(reader.read_u2()?);
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let attributes_count = reader.read_u2()?;

        fields.push(FieldRecord {
            name: constant_pool.utf8(name_index)?.to_string(),
            descriptor: constant_pool.utf8(descriptor_index)?.to_string(),
            access,
        });

        skip_attributes(&mut reader, attributes_count)?;
    }

    let methods_count = reader.read_u2()?;
    let mut methods = Vec::with_capacity(methods_count as usize);
    for _ in 0..methods_count {
        let access = AccessFlags::new(reader.read_u2()?);
        let name_index = reader.read_u2()?;
        let _descriptor_index = reader.read_u2()?;
        let attributes_count = reader.read_u2()?;

        methods.push(MethodRecord {
            name: constant_pool.utf8(name_index)?.to_string(),
            access,
        });

        skip_attributes(&mut reader, attributes_count)?;
    }

    let mut nested = Vec::new();
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let attribute_name_index = reader.read_u2()?;
        let attribute_length = reader.read_u4()? as usize;
        if constant_pool.utf8(attribute_name_index)? == INNER_CLASSES {
            let slice = reader.read_slice(attribute_length)?;
            nested.extend(parse_inner_classes(slice, &constant_pool)?);
        } else {
            reader.skip(attribute_length)?;
        }
    }

    Ok(ClassRecord {
        name: constant_pool.class_name(this_class)?,
        access,
        fields,
        methods,
        nested,
    })
}

fn parse_inner_classes(
    bytes: &[u8],
    constant_pool: &ConstantPool,
) -> Result<Vec<NestedClassRef>, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    let count = reader.read_u2()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let inner_class_index = reader.read_u2()?;
        let outer_class_index = reader.read_u2()?;
        let inner_name_index = reader.read_u2()?;
        reader.read_u2()?; // inner_class_access_flags

        let outer = match outer_class_index {
            0 => None,
            index => Some(constant_pool.class_name(index)?),
        };
        let simple_name = match inner_name_index {
            0 => None,
            index => Some(constant_pool.utf8(index)?.to_string()),
        };

        entries.push(NestedClassRef {
            name: constant_pool.class_name(inner_class_index)?,
            outer,
            simple_name,
        });
    }
    Ok(entries)
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    Constant::Utf8(decode_modified_utf8(bytes)?)
                }
                3 | 4 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                // long and double occupy two slots
                5 | 6 => {
                    reader.skip(8)?;
                    entries.push(Constant::Unusable);
                    index += 1;
                    Constant::Other
                }
                7 => {
                    let name_index = reader.read_u2()?;
                    Constant::Class { name_index }
                }
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<String, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => Ok(self.utf8(*name_index)?.to_string()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

/// Class files store strings as modified UTF-8: NUL is the two-byte
/// `C0 80`, and characters above U+FFFF are surrogate pairs encoded as two
/// three-byte sequences. Unpaired surrogates decode to U+FFFD.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String, ClassParseError> {
    if !bytes.iter().any(|byte| matches!(byte, 0xC0 | 0xED)) {
        return Ok(String::from_utf8(bytes.to_vec())?);
    }

    let mut normalized = Vec::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        let consumed = match rest {
            [] => break,
            [0xC0, 0x80, ..] => {
                normalized.push(0);
                2
            }
            [0xED, high @ 0xA0..=0xAF, high_tail, 0xED, low @ 0xB0..=0xBF, low_tail, ..] => {
                let high = surrogate(*high, *high_tail);
                let low = surrogate(*low, *low_tail);
                let code_point = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                push_char(
                    &mut normalized,
                    char::from_u32(code_point).unwrap_or(char::REPLACEMENT_CHARACTER),
                );
                6
            }
            [0xED, 0xA0..=0xBF, _, ..] => {
                push_char(&mut normalized, char::REPLACEMENT_CHARACTER);
                3
            }
            [byte, ..] => {
                normalized.push(*byte);
                1
            }
        };
        rest = &rest[consumed..];
    }
    Ok(String::from_utf8(normalized)?)
}

/// UTF-16 code unit of a three-byte `ED xx yy` sequence.
fn surrogate(second: u8, third: u8) -> u32 {
    0xD000 | (u32::from(second & 0x3F) << 6) | u32::from(third & 0x3F)
}

fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        const MAGIC: u32 = 0xCAFEBABE;
        let magic = self.read_u4()?;
        if magic != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let slice = self.read_slice(1)?;
        Ok(slice[0])
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let slice = self.read_slice(2)?;
        Ok(u16::from_be_bytes([slice[0], slice[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let slice = self.read_slice(4)?;
        Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassParseError::UnexpectedEof)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), ClassParseError> {
    for _ in 0..count {
        reader.read_u2()?; // attribute_name_index
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}
