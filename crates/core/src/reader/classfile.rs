//! Bounds-checked class-file decoder.
//!
//! Only what metadata needs is decoded: the header, the constant pool,
//! `InnerClasses`, `EnclosingMethod`, runtime annotations and annotation
//! defaults. Fields and method bodies are skipped.

use super::event::{DescriptorEvent, EventSink};
use metascan_api::AttributeValue;
use thiserror::Error;

const MAGIC: u32 = 0xCAFE_BABE;
pub const MIN_MAJOR_VERSION: u16 = 45;
pub const MAX_MAJOR_VERSION: u16 = 69;
/// Deepest element nesting accepted inside one annotation.
pub const MAX_ELEMENT_DEPTH: usize = 64;

const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
const INNER_CLASSES: &str = "InnerClasses";
const ENCLOSING_METHOD: &str = "EnclosingMethod";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("invalid modified UTF-8 string in constant pool")]
    InvalidUtf8,
    #[error("invalid element value tag {tag:#04x}")]
    InvalidElementTag { tag: u8 },
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("annotation elements nested deeper than {MAX_ELEMENT_DEPTH}")]
    NestingTooDeep,
    #[error("unbalanced event stream: {0}")]
    UnbalancedEvent(String),
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
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
                3 => Constant::Integer(reader.read_u4()? as i32),
                4 => Constant::Float(f32::from_bits(reader.read_u4()?)),
                5 | 6 => {
                    let high = reader.read_u4()? as u64;
                    let low = reader.read_u4()? as u64;
                    let bits = (high << 32) | low;
                    let constant = if tag == 5 {
                        Constant::Long(bits as i64)
                    } else {
                        Constant::Double(f64::from_bits(bits))
                    };
                    // Long and double take two slots
                    entries.push(constant);
                    index += 1;
                    Constant::Unusable
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                8 | 16 | 19 | 20 => {
                    reader.read_u2()?;
                    Constant::Other
                }
                9..=12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(DecodeError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, DecodeError> {
        self.entries
            .get(index as usize)
            .ok_or(DecodeError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, DecodeError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(DecodeError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<String, DecodeError> {
        match self.get(index)? {
            Constant::Class { name_index } => Ok(self.utf8(*name_index)?.to_string()),
            _ => Err(DecodeError::InvalidConstantIndex { index }),
        }
    }

    fn optional_class_name(&self, index: u16) -> Result<Option<String>, DecodeError> {
        if index == 0 {
            Ok(None)
        } else {
            self.class_name(index).map(Some)
        }
    }

    fn optional_utf8(&self, index: u16) -> Result<Option<String>, DecodeError> {
        if index == 0 {
            Ok(None)
        } else {
            self.utf8(index).map(|s| Some(s.to_string()))
        }
    }

    fn integer(&self, index: u16) -> Result<i32, DecodeError> {
        match self.get(index)? {
            Constant::Integer(v) => Ok(*v),
            _ => Err(DecodeError::InvalidConstantIndex { index }),
        }
    }

    fn value(&self, index: u16, tag: u8) -> Result<AttributeValue, DecodeError> {
        let value = match tag {
            b'B' => AttributeValue::Byte(self.integer(index)? as i8),
            b'C' => {
                let code = self.integer(index)? as u32;
                AttributeValue::Char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            b'S' => AttributeValue::Short(self.integer(index)? as i16),
            b'I' => AttributeValue::Int(self.integer(index)?),
            b'Z' => AttributeValue::Boolean(self.integer(index)? != 0),
            b'J' => match self.get(index)? {
                Constant::Long(v) => AttributeValue::Long(*v),
                _ => return Err(DecodeError::InvalidConstantIndex { index }),
            },
            b'F' => match self.get(index)? {
                Constant::Float(v) => AttributeValue::Float(*v),
                _ => return Err(DecodeError::InvalidConstantIndex { index }),
            },
            b'D' => match self.get(index)? {
                Constant::Double(v) => AttributeValue::Double(*v),
                _ => return Err(DecodeError::InvalidConstantIndex { index }),
            },
            b's' => AttributeValue::String(self.utf8(index)?.to_string()),
            other => return Err(DecodeError::InvalidElementTag { tag: other }),
        };
        Ok(value)
    }
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), DecodeError> {
        if self.read_u4()? != MAGIC {
            return Err(DecodeError::InvalidMagic);
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, DecodeError> {
        let value = *self.data.get(self.pos).ok_or(DecodeError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    fn read_u2(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(DecodeError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.read_slice(len).map(|_| ())
    }
}

fn skip_attributes(reader: &mut ClassReader<'_>, count: u16) -> Result<(), DecodeError> {
    for _ in 0..count {
        reader.read_u2()?; // attribute_name_index
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}

fn skip_member(reader: &mut ClassReader<'_>) -> Result<(), DecodeError> {
    reader.read_u2()?; // access_flags
    reader.read_u2()?; // name_index
    reader.read_u2()?; // descriptor_index
    let attributes_count = reader.read_u2()?;
    skip_attributes(reader, attributes_count)
}

/// Annotation-related attribute payloads of one class or method.
#[derive(Default)]
struct AnnotationAttributesData<'a> {
    visible: Option<&'a [u8]>,
    invisible: Option<&'a [u8]>,
    default_value: Option<&'a [u8]>,
}

/// Streams the metadata-relevant parts of a class file to an [`EventSink`].
pub struct ClassFileDecoder<'a> {
    reader: ClassReader<'a>,
}

impl<'a> ClassFileDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            reader: ClassReader::new(data),
        }
    }

    pub fn decode(mut self, sink: &mut dyn EventSink) -> Result<(), DecodeError> {
        let reader = &mut self.reader;
        reader.expect_magic()?;
        let minor = reader.read_u2()?;
        let major = reader.read_u2()?;
        if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major) {
            return Err(DecodeError::UnsupportedVersion { major, minor });
        }
        let pool = ConstantPool::parse(reader)?;

        let access = reader.read_u2()?;
        let name = pool.class_name(reader.read_u2()?)?;
        let super_name = pool.optional_class_name(reader.read_u2()?)?;
        let interfaces_count = reader.read_u2()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(pool.class_name(reader.read_u2()?)?);
        }

        let fields_count = reader.read_u2()?;
        for _ in 0..fields_count {
            skip_member(reader)?;
        }

        // Class attributes follow the methods, but their events come first.
        let methods_count = reader.read_u2()?;
        let methods_start = reader.pos;
        for _ in 0..methods_count {
            skip_member(reader)?;
        }

        let mut outer_class = None;
        let mut inner_classes = Vec::new();
        let mut annotations = AnnotationAttributesData::default();
        let attributes_count = reader.read_u2()?;
        for _ in 0..attributes_count {
            let attribute_name = pool.utf8(reader.read_u2()?)?;
            let length = reader.read_u4()? as usize;
            let payload = reader.read_slice(length)?;
            match attribute_name {
                ENCLOSING_METHOD => {
                    let mut sub = ClassReader::new(payload);
                    outer_class = Some(pool.class_name(sub.read_u2()?)?);
                }
                INNER_CLASSES => {
                    let mut sub = ClassReader::new(payload);
                    let count = sub.read_u2()?;
                    for _ in 0..count {
                        inner_classes.push(DescriptorEvent::InnerClass {
                            name: pool.class_name(sub.read_u2()?)?,
                            outer_name: pool.optional_class_name(sub.read_u2()?)?,
                            inner_name: pool.optional_utf8(sub.read_u2()?)?,
                            access: sub.read_u2()?,
                        });
                    }
                }
                RUNTIME_VISIBLE_ANNOTATIONS => annotations.visible = Some(payload),
                RUNTIME_INVISIBLE_ANNOTATIONS => annotations.invisible = Some(payload),
                _ => {}
            }
        }

        sink.accept(DescriptorEvent::Header {
            major,
            minor,
            access,
            name,
            super_name,
            interfaces,
        })?;
        if let Some(owner) = outer_class {
            sink.accept(DescriptorEvent::OuterClass { owner })?;
        }
        for inner in inner_classes {
            sink.accept(inner)?;
        }
        emit_annotation_attributes(&pool, &annotations, sink)?;

        reader.pos = methods_start;
        for _ in 0..methods_count {
            let access = reader.read_u2()?;
            let name = pool.utf8(reader.read_u2()?)?.to_string();
            let descriptor = pool.utf8(reader.read_u2()?)?.to_string();
            let mut method_annotations = AnnotationAttributesData::default();
            let attributes_count = reader.read_u2()?;
            for _ in 0..attributes_count {
                let attribute_name = pool.utf8(reader.read_u2()?)?;
                let length = reader.read_u4()? as usize;
                let payload = reader.read_slice(length)?;
                match attribute_name {
                    RUNTIME_VISIBLE_ANNOTATIONS => method_annotations.visible = Some(payload),
                    RUNTIME_INVISIBLE_ANNOTATIONS => method_annotations.invisible = Some(payload),
                    ANNOTATION_DEFAULT => method_annotations.default_value = Some(payload),
                    _ => {}
                }
            }

            sink.accept(DescriptorEvent::MethodStart {
                access,
                name,
                descriptor,
            })?;
            emit_annotation_attributes(&pool, &method_annotations, sink)?;
            if let Some(payload) = method_annotations.default_value {
                sink.accept(DescriptorEvent::DefaultValueStart)?;
                let mut sub = ClassReader::new(payload);
                emit_element_value(&pool, &mut sub, None, 0, sink)?;
                sink.accept(DescriptorEvent::DefaultValueEnd)?;
            }
            sink.accept(DescriptorEvent::MethodEnd)?;
        }

        sink.accept(DescriptorEvent::End)
    }
}

/// Decodes `data` into `sink`.
pub fn decode(data: &[u8], sink: &mut dyn EventSink) -> Result<(), DecodeError> {
    ClassFileDecoder::new(data).decode(sink)
}

fn emit_annotation_attributes(
    pool: &ConstantPool,
    data: &AnnotationAttributesData<'_>,
    sink: &mut dyn EventSink,
) -> Result<(), DecodeError> {
    for (payload, visible) in [(data.visible, true), (data.invisible, false)] {
        let Some(payload) = payload else { continue };
        let mut sub = ClassReader::new(payload);
        let count = sub.read_u2()?;
        for _ in 0..count {
            let type_name = descriptor_to_class_name(pool.utf8(sub.read_u2()?)?)?;
            sink.accept(DescriptorEvent::AnnotationStart { type_name, visible })?;
            emit_element_pairs(pool, &mut sub, 1, sink)?;
            sink.accept(DescriptorEvent::AnnotationEnd)?;
        }
    }
    Ok(())
}

fn emit_element_pairs(
    pool: &ConstantPool,
    reader: &mut ClassReader<'_>,
    depth: usize,
    sink: &mut dyn EventSink,
) -> Result<(), DecodeError> {
    let pairs = reader.read_u2()?;
    for _ in 0..pairs {
        let name = pool.utf8(reader.read_u2()?)?.to_string();
        emit_element_value(pool, reader, Some(name), depth, sink)?;
    }
    Ok(())
}

fn emit_element_value(
    pool: &ConstantPool,
    reader: &mut ClassReader<'_>,
    name: Option<String>,
    depth: usize,
    sink: &mut dyn EventSink,
) -> Result<(), DecodeError> {
    if depth > MAX_ELEMENT_DEPTH {
        return Err(DecodeError::NestingTooDeep);
    }
    let tag = reader.read_u1()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
            let value = pool.value(reader.read_u2()?, tag)?;
            sink.accept(DescriptorEvent::Value { name, value })
        }
        b'e' => {
            let type_name = descriptor_to_class_name(pool.utf8(reader.read_u2()?)?)?;
            let constant = pool.utf8(reader.read_u2()?)?.to_string();
            sink.accept(DescriptorEvent::Value {
                name,
                value: AttributeValue::Enum {
                    type_name,
                    constant,
                },
            })
        }
        b'c' => {
            let class_name = descriptor_to_class_name(pool.utf8(reader.read_u2()?)?)?;
            sink.accept(DescriptorEvent::Value {
                name,
                value: AttributeValue::Class(class_name),
            })
        }
        b'@' => {
            let type_name = descriptor_to_class_name(pool.utf8(reader.read_u2()?)?)?;
            sink.accept(DescriptorEvent::NestedStart { name, type_name })?;
            emit_element_pairs(pool, reader, depth + 1, sink)?;
            sink.accept(DescriptorEvent::NestedEnd)
        }
        b'[' => {
            let count = reader.read_u2()?;
            sink.accept(DescriptorEvent::ArrayStart { name })?;
            for _ in 0..count {
                emit_element_value(pool, reader, None, depth + 1, sink)?;
            }
            sink.accept(DescriptorEvent::ArrayEnd)
        }
        other => Err(DecodeError::InvalidElementTag { tag: other }),
    }
}

/// Converts a field descriptor to a binary class name:
/// `Ljava/lang/String;` -> `java.lang.String`, `[I` -> `int[]`, `V` -> `void`.
pub fn descriptor_to_class_name(descriptor: &str) -> Result<String, DecodeError> {
    let dims = descriptor.bytes().take_while(|&b| b == b'[').count();
    let element = &descriptor[dims..];
    let base = match element.as_bytes().first() {
        Some(b'L') if element.ends_with(';') && element.len() > 2 => {
            element[1..element.len() - 1].replace('/', ".")
        }
        Some(b'B') if element.len() == 1 => "byte".to_string(),
        Some(b'C') if element.len() == 1 => "char".to_string(),
        Some(b'D') if element.len() == 1 => "double".to_string(),
        Some(b'F') if element.len() == 1 => "float".to_string(),
        Some(b'I') if element.len() == 1 => "int".to_string(),
        Some(b'J') if element.len() == 1 => "long".to_string(),
        Some(b'S') if element.len() == 1 => "short".to_string(),
        Some(b'Z') if element.len() == 1 => "boolean".to_string(),
        Some(b'V') if element.len() == 1 && dims == 0 => "void".to_string(),
        _ => return Err(DecodeError::InvalidDescriptor(descriptor.to_string())),
    };
    Ok(format!("{base}{}", "[]".repeat(dims)))
}

/// Decodes the modified UTF-8 used by class-file string constants.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, DecodeError> {
    // Fast path for plain ASCII
    if bytes.iter().all(|&b| b != 0 && b < 0x80) {
        return std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8);
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            if b == 0 {
                return Err(DecodeError::InvalidUtf8);
            }
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1).ok_or(DecodeError::InvalidUtf8)?;
            if b2 & 0xC0 != 0x80 {
                return Err(DecodeError::InvalidUtf8);
            }
            units.push((((b & 0x1F) as u16) << 6) | (b2 & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1).ok_or(DecodeError::InvalidUtf8)?;
            let b3 = *bytes.get(i + 2).ok_or(DecodeError::InvalidUtf8)?;
            if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                return Err(DecodeError::InvalidUtf8);
            }
            units.push(
                (((b & 0x0F) as u16) << 12) | (((b2 & 0x3F) as u16) << 6) | (b3 & 0x3F) as u16,
            );
            i += 3;
        } else {
            return Err(DecodeError::InvalidUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| DecodeError::InvalidUtf8)
}
