//! Binary encoding of compiled units.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic "SUNT" | u16 version | str unit_name | u16 method_count
//!   method*: str name | u16 flags | u32 code_len | code[code_len]
//! u64 checksum (XXH3-64 of every preceding byte)
//! ```
//!
//! Strings are a `u16` byte length followed by UTF-8. Instructions are an
//! opcode byte: `0xB1` return, `0xB8` followed by a string call target, and any
//! other opcode followed by a `u8` operand length and the operand bytes.
//!
//! `code_len` and the checksum are derived: [`encode`] always recomputes them,
//! so a unit whose instruction lists were edited in memory comes out valid.
//! The layout is canonical, which makes `encode(decode(b)) == b`.

use stasis_common::Checksum;

use crate::error::UnitError;
use crate::instruction::{Instruction, OP_CALL, OP_RETURN};
use crate::unit::{CompiledMethod, CompiledUnit};

/// Magic bytes at the start of every encoded unit.
pub const UNIT_MAGIC: [u8; 4] = *b"SUNT";

/// The only format version this codec reads and writes.
pub const UNIT_FORMAT_VERSION: u16 = 1;

const CHECKSUM_LEN: usize = 8;

/// Decodes unit bytes into a [`CompiledUnit`].
pub fn decode(bytes: &[u8]) -> Result<CompiledUnit, UnitError> {
    let mut header = Reader::new(bytes, 0, bytes.len());
    let magic: [u8; 4] = header.take_array()?;
    if magic != UNIT_MAGIC {
        return Err(UnitError::BadMagic { found: magic });
    }
    let version = header.u16()?;
    if version != UNIT_FORMAT_VERSION {
        return Err(UnitError::UnsupportedVersion { found: version });
    }

    if bytes.len() < header.pos + CHECKSUM_LEN {
        return Err(UnitError::Truncated {
            offset: header.pos,
            needed: CHECKSUM_LEN,
        });
    }
    let body_end = bytes.len() - CHECKSUM_LEN;
    let mut trailer = Reader::new(bytes, body_end, bytes.len());
    let stored = Checksum::from_raw(trailer.u64()?);
    let computed = Checksum::of(&bytes[..body_end]);
    if stored != computed {
        return Err(UnitError::ChecksumMismatch {
            stored: stored.to_string(),
            computed: computed.to_string(),
        });
    }

    let mut r = Reader::new(bytes, header.pos, body_end);
    let name = r.string()?;
    let method_count = r.u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        methods.push(decode_method(&mut r)?);
    }
    if r.remaining() != 0 {
        return Err(UnitError::TrailingBytes {
            count: r.remaining(),
        });
    }

    Ok(CompiledUnit { name, methods })
}

fn decode_method(r: &mut Reader<'_>) -> Result<CompiledMethod, UnitError> {
    let name = r.string()?;
    let flags = r.u16()?;
    let code_len = r.u32()? as usize;
    let code_start = r.pos;
    r.take(code_len)?;

    let mut code = Reader::new(r.bytes, code_start, code_start + code_len);
    let mut instructions = Vec::new();
    while code.remaining() > 0 {
        instructions.push(decode_instruction(&mut code)?);
    }

    Ok(CompiledMethod {
        name,
        flags,
        instructions,
    })
}

fn decode_instruction(r: &mut Reader<'_>) -> Result<Instruction, UnitError> {
    let opcode = r.u8()?;
    Ok(match opcode {
        OP_RETURN => Instruction::Return,
        OP_CALL => Instruction::Call { target: r.string()? },
        _ => {
            let len = r.u8()? as usize;
            Instruction::Opaque {
                opcode,
                operands: r.take(len)?.to_vec(),
            }
        }
    })
}

/// Encodes a [`CompiledUnit`] to bytes, recomputing code lengths and the checksum.
pub fn encode(unit: &CompiledUnit) -> Result<Vec<u8>, UnitError> {
    let mut w = Writer::default();
    w.bytes(&UNIT_MAGIC);
    w.u16(UNIT_FORMAT_VERSION);
    w.string("unit name", &unit.name)?;
    let count = u16::try_from(unit.methods.len()).map_err(|_| UnitError::TooManyMethods {
        count: unit.methods.len(),
    })?;
    w.u16(count);

    for method in &unit.methods {
        w.string("method name", &method.name)?;
        w.u16(method.flags);
        let code = encode_code(method)?;
        let code_len = u32::try_from(code.len()).map_err(|_| UnitError::CodeTooLarge {
            method: method.name.clone(),
            len: code.len(),
        })?;
        w.u32(code_len);
        w.bytes(&code);
    }

    let checksum = Checksum::of(&w.buf);
    w.bytes(&checksum.to_le_bytes());
    Ok(w.buf)
}

fn encode_code(method: &CompiledMethod) -> Result<Vec<u8>, UnitError> {
    let mut w = Writer::default();
    for insn in &method.instructions {
        match insn {
            Instruction::Return => w.u8(OP_RETURN),
            Instruction::Call { target } => {
                if target.is_empty() {
                    return Err(UnitError::EmptyCallTarget {
                        method: method.name.clone(),
                    });
                }
                w.u8(OP_CALL);
                w.string("call target", target)?;
            }
            Instruction::Opaque { opcode, operands } => {
                if *opcode == OP_RETURN || *opcode == OP_CALL {
                    return Err(UnitError::ReservedOpcode {
                        method: method.name.clone(),
                        opcode: *opcode,
                    });
                }
                let len = u8::try_from(operands.len()).map_err(|_| UnitError::OperandsTooLong {
                    method: method.name.clone(),
                    len: operands.len(),
                })?;
                w.u8(*opcode);
                w.u8(len);
                w.bytes(operands);
            }
        }
    }
    Ok(w.buf)
}

/// Bounds-checked cursor over `bytes[pos..end]`.
///
/// Offsets in errors are absolute positions in `bytes`.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], pos: usize, end: usize) -> Self {
        Self { bytes, pos, end }
    }

    fn remaining(&self) -> usize {
        self.end - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], UnitError> {
        if self.remaining() < n {
            return Err(UnitError::Truncated {
                offset: self.pos,
                needed: n,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], UnitError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, UnitError> {
        Ok(self.take_array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, UnitError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    fn u32(&mut self) -> Result<u32, UnitError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    fn u64(&mut self) -> Result<u64, UnitError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    fn string(&mut self) -> Result<String, UnitError> {
        let len = self.u16()? as usize;
        let offset = self.pos;
        let raw = self.take(len)?;
        std::str::from_utf8(raw)
            .map(str::to_string)
            .map_err(|_| UnitError::InvalidUtf8 { offset })
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn string(&mut self, what: &'static str, s: &str) -> Result<(), UnitError> {
        let len = u16::try_from(s.len()).map_err(|_| UnitError::StringTooLong {
            what,
            len: s.len(),
        })?;
        self.u16(len);
        self.bytes(s.as_bytes());
        Ok(())
    }
}
