//! Binary serialisation of compiled modules (`.mdc`).
//!
//! Layout (all multi-byte payload fields little-endian; the magic number
//! is written big-endian so the file starts with `BE BE CA FE`):
//!
//! ```text
//! magic u32 | version u16 | flags u16 | module_type u8
//! name_len u16, name bytes
//! string_count u32, each: len u32 + bytes
//! const_count u16, each: tag u8 + payload
//! global_count u16, each: name_idx u32 + const_idx u16
//! main chunk
//! function_count u16, then chunks
//! chunk = arity u8 | locals u16 | code_len u32 | code
//!         | lineinfo_len u32 | runs of (len u32, line u32, column u32)
//! ```

use thiserror::Error;

use crate::bytecode::chunk::{Chunk, LineRun};
use crate::bytecode::module::{BytecodeModule, GlobalSymbol, PoolConstant, StringTable};

/// File magic, written big-endian.
pub const MAGIC: u32 = 0xBEBE_CAFE;
/// Supported format version.
pub const FORMAT_VERSION: u16 = 0x0001;
/// Flag bit: payload fields are little-endian.
pub const FLAG_LITTLE_ENDIAN: u16 = 0x0001;

const TAG_EMPTY: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_STRING_REF: u8 = 3;
const TAG_FUNCTION_REF: u8 = 4;

/// Serialisation/deserialisation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Input ended before a required field.
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),
    /// The file does not start with the module magic.
    #[error("invalid magic number {found:#010x}")]
    BadMagic {
        /// The magic actually present.
        found: u32,
    },
    /// The format version is not supported.
    #[error("unsupported format version {0:#06x}")]
    UnsupportedVersion(u16),
    /// An unknown constant tag was read.
    #[error("unknown constant tag {0:#04x}")]
    BadConstantTag(u8),
    /// A string payload is not valid UTF-8.
    #[error("string entry {0} is not valid UTF-8")]
    InvalidUtf8(u32),
    /// A cross-table reference does not resolve.
    #[error("{what} index {index} is out of range")]
    IndexOutOfRange {
        /// Referencing field.
        what: &'static str,
        /// Offending index.
        index: u32,
    },
    /// A table exceeds its width-imposed size limit.
    #[error("{0} does not fit the format's size field")]
    TooLarge(&'static str),
    /// Trailing bytes after a complete module.
    #[error("trailing bytes after the module payload")]
    TrailingBytes,
}

/// Serialises a module to bytes.
pub fn encode_module(module: &BytecodeModule) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&module.flags.to_le_bytes());
    out.push(module.module_type);

    let name = module.name.as_bytes();
    let name_len =
        u16::try_from(name.len()).map_err(|_| EncodeError::TooLarge("module name"))?;
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(name);

    let string_count =
        u32::try_from(module.strings.len()).map_err(|_| EncodeError::TooLarge("string table"))?;
    out.extend_from_slice(&string_count.to_le_bytes());
    for text in module.strings.iter() {
        let len =
            u32::try_from(text.len()).map_err(|_| EncodeError::TooLarge("string entry"))?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(text.as_bytes());
    }

    let const_count =
        u16::try_from(module.constants.len()).map_err(|_| EncodeError::TooLarge("constant pool"))?;
    out.extend_from_slice(&const_count.to_le_bytes());
    for constant in &module.constants {
        match constant {
            PoolConstant::Empty => out.push(TAG_EMPTY),
            PoolConstant::Int(value) => {
                out.push(TAG_INT);
                out.extend_from_slice(&value.to_le_bytes());
            }
            PoolConstant::Float(value) => {
                out.push(TAG_FLOAT);
                out.extend_from_slice(&value.to_bits().to_le_bytes());
            }
            PoolConstant::Str(index) => {
                out.push(TAG_STRING_REF);
                out.extend_from_slice(&index.to_le_bytes());
            }
            PoolConstant::Function(index) => {
                out.push(TAG_FUNCTION_REF);
                out.extend_from_slice(&index.to_le_bytes());
            }
        }
    }

    let global_count =
        u16::try_from(module.globals.len()).map_err(|_| EncodeError::TooLarge("symbol table"))?;
    out.extend_from_slice(&global_count.to_le_bytes());
    for symbol in &module.globals {
        out.extend_from_slice(&symbol.name.to_le_bytes());
        out.extend_from_slice(&symbol.constant.to_le_bytes());
    }

    encode_chunk(&module.main, &mut out)?;

    let function_count =
        u16::try_from(module.functions.len()).map_err(|_| EncodeError::TooLarge("function list"))?;
    out.extend_from_slice(&function_count.to_le_bytes());
    for chunk in &module.functions {
        encode_chunk(chunk, &mut out)?;
    }

    Ok(out)
}

fn encode_chunk(chunk: &Chunk, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    out.push(chunk.arity);
    out.extend_from_slice(&chunk.locals.to_le_bytes());
    let code_len =
        u32::try_from(chunk.code.len()).map_err(|_| EncodeError::TooLarge("chunk code"))?;
    out.extend_from_slice(&code_len.to_le_bytes());
    out.extend_from_slice(&chunk.code);
    let lineinfo_len = u32::try_from(chunk.line_info.len() * 12)
        .map_err(|_| EncodeError::TooLarge("line info"))?;
    out.extend_from_slice(&lineinfo_len.to_le_bytes());
    for run in &chunk.line_info {
        out.extend_from_slice(&run.len.to_le_bytes());
        out.extend_from_slice(&run.line.to_le_bytes());
        out.extend_from_slice(&run.column.to_le_bytes());
    }
    Ok(())
}

/// Deserialises a module, validating magic, version, tags, and indices.
pub fn decode_module(bytes: &[u8]) -> Result<BytecodeModule, EncodeError> {
    let mut reader = Reader::new(bytes);

    let magic = reader.u32_be("magic")?;
    if magic != MAGIC {
        return Err(EncodeError::BadMagic { found: magic });
    }
    let version = reader.u16("version")?;
    if version != FORMAT_VERSION {
        return Err(EncodeError::UnsupportedVersion(version));
    }
    let flags = reader.u16("flags")?;
    let module_type = reader.u8("module type")?;

    let name_len = reader.u16("name length")? as usize;
    let name_bytes = reader.bytes(name_len, "module name")?;
    let name = String::from_utf8(name_bytes.to_vec())
        .map_err(|_| EncodeError::InvalidUtf8(u32::MAX))?;

    let string_count = reader.u32("string count")?;
    let mut strings = StringTable::new();
    for index in 0..string_count {
        let len = reader.u32("string length")? as usize;
        let payload = reader.bytes(len, "string payload")?;
        let text =
            std::str::from_utf8(payload).map_err(|_| EncodeError::InvalidUtf8(index))?;
        strings.intern(text);
    }

    let const_count = reader.u16("constant count")?;
    let mut constants = Vec::with_capacity(const_count as usize);
    for _ in 0..const_count {
        let tag = reader.u8("constant tag")?;
        let constant = match tag {
            TAG_EMPTY => PoolConstant::Empty,
            TAG_INT => PoolConstant::Int(reader.i64("int constant")?),
            TAG_FLOAT => PoolConstant::Float(f64::from_bits(reader.u64("float constant")?)),
            TAG_STRING_REF => {
                let index = reader.u32("string reference")?;
                if index as usize >= strings.len() {
                    return Err(EncodeError::IndexOutOfRange {
                        what: "string reference",
                        index,
                    });
                }
                PoolConstant::Str(index)
            }
            TAG_FUNCTION_REF => PoolConstant::Function(reader.u16("function reference")?),
            other => return Err(EncodeError::BadConstantTag(other)),
        };
        constants.push(constant);
    }

    let global_count = reader.u16("global count")?;
    let mut globals = Vec::with_capacity(global_count as usize);
    for _ in 0..global_count {
        let name = reader.u32("global name index")?;
        if name as usize >= strings.len() {
            return Err(EncodeError::IndexOutOfRange {
                what: "global name",
                index: name,
            });
        }
        let constant = reader.u16("global constant index")?;
        if constant as usize >= constants.len() {
            return Err(EncodeError::IndexOutOfRange {
                what: "global constant",
                index: constant as u32,
            });
        }
        globals.push(GlobalSymbol { name, constant });
    }

    let main = decode_chunk(&mut reader)?;

    let function_count = reader.u16("function count")?;
    let mut functions = Vec::with_capacity(function_count as usize);
    for _ in 0..function_count {
        functions.push(decode_chunk(&mut reader)?);
    }

    // Function references must land inside the decoded chunk list.
    for constant in &constants {
        if let PoolConstant::Function(index) = constant {
            if *index as usize >= functions.len() {
                return Err(EncodeError::IndexOutOfRange {
                    what: "function reference",
                    index: *index as u32,
                });
            }
        }
    }

    if !reader.is_empty() {
        return Err(EncodeError::TrailingBytes);
    }

    Ok(BytecodeModule {
        name,
        flags,
        module_type,
        strings,
        constants,
        globals,
        main,
        functions,
    })
}

fn decode_chunk(reader: &mut Reader<'_>) -> Result<Chunk, EncodeError> {
    let arity = reader.u8("chunk arity")?;
    let locals = reader.u16("chunk locals")?;
    let code_len = reader.u32("code length")? as usize;
    let code = reader.bytes(code_len, "chunk code")?.to_vec();
    let lineinfo_len = reader.u32("line info length")? as usize;
    if lineinfo_len % 12 != 0 {
        return Err(EncodeError::UnexpectedEof("line info run"));
    }
    let mut line_info = Vec::with_capacity(lineinfo_len / 12);
    for _ in 0..lineinfo_len / 12 {
        let len = reader.u32("line run length")?;
        let line = reader.u32("line run line")?;
        let column = reader.u32("line run column")?;
        line_info.push(LineRun { len, line, column });
    }
    Ok(Chunk {
        arity,
        locals,
        code,
        line_info,
    })
}

struct Reader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn is_empty(&self) -> bool {
        self.at >= self.bytes.len()
    }

    fn bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], EncodeError> {
        let end = self
            .at
            .checked_add(len)
            .ok_or(EncodeError::UnexpectedEof(what))?;
        if end > self.bytes.len() {
            return Err(EncodeError::UnexpectedEof(what));
        }
        let slice = &self.bytes[self.at..end];
        self.at = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, EncodeError> {
        Ok(self.bytes(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, EncodeError> {
        let raw = self.bytes(2, what)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, EncodeError> {
        let raw = self.bytes(4, what)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn u32_be(&mut self, what: &'static str) -> Result<u32, EncodeError> {
        let raw = self.bytes(4, what)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, EncodeError> {
        let raw = self.bytes(8, what)?;
        let mut buffer = [0u8; 8];
        buffer.copy_from_slice(raw);
        Ok(u64::from_le_bytes(buffer))
    }

    fn i64(&mut self, what: &'static str) -> Result<i64, EncodeError> {
        Ok(self.u64(what)? as i64)
    }
}
