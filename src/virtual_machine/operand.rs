//! Variable-length operand encoding.
//!
//! Every inline operand starts with a control byte:
//!
//! - bit 7 ([`REG_PTR`]): the operand names a memory cell; the effective
//!   source value is `io[value]`
//! - bit 6 ([`SHORT_VAL`]): the value is the low 6 bits of the control byte
//!   itself and no further bytes follow
//! - bits 5..0: when `SHORT_VAL` is clear, the number of little-endian value
//!   bytes that follow
//!
//! Absolute code addresses (the targets of `JMP`, `JT`, `JF`, `CALL`) are the
//! exception: their control byte is omitted and the decoder behaves as if it
//! were `0x02`, a plain 2-byte little-endian value. This is what bounds
//! programs at 65,536 bytes.
//!
//! The encode direction is the canonical inverse of the decoder: values up to
//! 63 take the short form, anything larger the minimal byte count. It is the
//! contract any assembler has to meet for disassembly round-trips to be
//! byte-exact.

use crate::virtual_machine::errors::MachineError;

/// Control-byte flag marking the operand as a memory index.
pub const REG_PTR: u8 = 0x80;
/// Control-byte flag selecting the 6-bit short form.
pub const SHORT_VAL: u8 = 0x40;
/// Mask of the control byte's value/width bits; also the largest short value.
pub const MAX_SHORT_VAL: u8 = 0x3F;
/// Width of a bare jump operand in bytes.
pub const JUMP_BYTES: usize = 2;

/// A decoded inline operand: the raw value plus the indirection flag.
///
/// Whether indirection is *applied* (source operands) or the raw value is
/// used as a memory index directly (destination operands) is decided by the
/// consumer, not here.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Operand {
    /// Raw decoded value, zero-extended to 64 bits.
    pub value: u64,
    /// True when the control byte carried [`REG_PTR`].
    pub indirect: bool,
}

/// Decodes one inline operand at `pc`.
///
/// Returns the operand and the number of bytes consumed (control byte plus
/// value bytes). Value bytes beyond the eighth are consumed but do not
/// contribute to the value.
pub fn decode(code: &[u8], pc: usize) -> Result<(Operand, usize), MachineError> {
    let control = *code
        .get(pc)
        .ok_or(MachineError::OutOfCode { offset: pc })?;
    let indirect = control & REG_PTR != 0;

    if control & SHORT_VAL != 0 {
        let value = u64::from(control & MAX_SHORT_VAL);
        return Ok((Operand { value, indirect }, 1));
    }

    let width = usize::from(control & MAX_SHORT_VAL);
    let bytes = code
        .get(pc + 1..pc + 1 + width)
        .ok_or(MachineError::OutOfCode { offset: pc + 1 })?;

    let mut value = 0u64;
    for (i, byte) in bytes.iter().take(8).enumerate() {
        value |= u64::from(*byte) << (8 * i);
    }

    Ok((Operand { value, indirect }, 1 + width))
}

/// Decodes a bare 2-byte little-endian jump operand at `pc`.
///
/// Returns the absolute code address and the number of bytes consumed
/// (always [`JUMP_BYTES`]). No indirection applies to jump operands.
pub fn decode_jump(code: &[u8], pc: usize) -> Result<(u64, usize), MachineError> {
    let bytes = code
        .get(pc..pc + JUMP_BYTES)
        .ok_or(MachineError::OutOfCode { offset: pc })?;
    let addr = u64::from(u16::from_le_bytes([bytes[0], bytes[1]]));
    Ok((addr, JUMP_BYTES))
}

/// Encodes one inline operand in canonical form.
///
/// Values up to [`MAX_SHORT_VAL`] use the short form; larger values emit a
/// width control byte followed by the minimal little-endian byte count.
pub fn encode(out: &mut Vec<u8>, value: u64, indirect: bool) {
    let flag = if indirect { REG_PTR } else { 0 };

    if value <= u64::from(MAX_SHORT_VAL) {
        out.push(flag | SHORT_VAL | value as u8);
        return;
    }

    let width = value_width(value);
    out.push(flag | width as u8);
    out.extend_from_slice(&value.to_le_bytes()[..width]);
}

/// Encodes a jump operand: exactly 2 little-endian bytes, no control byte.
pub fn encode_jump(out: &mut Vec<u8>, target: u64) -> Result<(), MachineError> {
    let addr = u16::try_from(target).map_err(|_| MachineError::JumpOutOfRange { target })?;
    out.extend_from_slice(&addr.to_le_bytes());
    Ok(())
}

/// Returns the minimal number of little-endian bytes representing `value`.
fn value_width(value: u64) -> usize {
    (8 - value.leading_zeros() as usize / 8).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: u64, indirect: bool) -> (Operand, usize, usize) {
        let mut buf = Vec::new();
        encode(&mut buf, value, indirect);
        let encoded_len = buf.len();
        let (op, consumed) = decode(&buf, 0).unwrap();
        (op, consumed, encoded_len)
    }

    #[test]
    fn short_form_boundary() {
        let (op, consumed, len) = roundtrip(63, false);
        assert_eq!(op, Operand { value: 63, indirect: false });
        assert_eq!((consumed, len), (1, 1));

        let (op, consumed, len) = roundtrip(64, false);
        assert_eq!(op.value, 64);
        assert_eq!((consumed, len), (2, 2));
    }

    #[test]
    fn indirect_flag_survives_both_forms() {
        let (op, _, _) = roundtrip(3, true);
        assert!(op.indirect);
        assert_eq!(op.value, 3);

        let (op, _, _) = roundtrip(500, true);
        assert!(op.indirect);
        assert_eq!(op.value, 500);
    }

    #[test]
    fn wide_values_use_minimal_width() {
        assert_eq!(roundtrip(0x100, false).2, 3);
        assert_eq!(roundtrip(0xFFFF, false).2, 3);
        assert_eq!(roundtrip(0x1_0000, false).2, 4);
        assert_eq!(roundtrip(u64::MAX, false).2, 9);
        let (op, _, _) = roundtrip(u64::MAX, false);
        assert_eq!(op.value, u64::MAX);
    }

    #[test]
    fn short_control_byte_layout() {
        let mut buf = Vec::new();
        encode(&mut buf, 42, false);
        assert_eq!(buf, [SHORT_VAL | 42]);

        buf.clear();
        encode(&mut buf, 3, true);
        assert_eq!(buf, [REG_PTR | SHORT_VAL | 3]);
    }

    #[test]
    fn zero_width_control_byte_decodes_to_zero() {
        // A width of 0 with SHORT_VAL clear is a legal encoding of 0.
        let (op, consumed) = decode(&[0x00], 0).unwrap();
        assert_eq!(op.value, 0);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn oversized_width_ignores_high_bytes() {
        // 10 declared value bytes: only the first 8 contribute.
        let mut buf = vec![10u8];
        buf.extend_from_slice(&[0xFF; 10]);
        let (op, consumed) = decode(&buf, 0).unwrap();
        assert_eq!(op.value, u64::MAX);
        assert_eq!(consumed, 11);
    }

    #[test]
    fn truncated_operand_errors() {
        assert_eq!(
            decode(&[], 0),
            Err(MachineError::OutOfCode { offset: 0 })
        );
        // Control byte promises 4 value bytes, only 1 present.
        assert_eq!(
            decode(&[0x04, 0xAA], 0),
            Err(MachineError::OutOfCode { offset: 1 })
        );
    }

    #[test]
    fn jump_operand_roundtrip_and_bounds() {
        let mut buf = Vec::new();
        encode_jump(&mut buf, 0xABCD).unwrap();
        assert_eq!(buf, [0xCD, 0xAB]);
        let (addr, consumed) = decode_jump(&buf, 0).unwrap();
        assert_eq!(addr, 0xABCD);
        assert_eq!(consumed, JUMP_BYTES);

        assert_eq!(
            encode_jump(&mut buf, 0x1_0000),
            Err(MachineError::JumpOutOfRange { target: 0x1_0000 })
        );
        assert_eq!(
            decode_jump(&[0x01], 0),
            Err(MachineError::OutOfCode { offset: 0 })
        );
    }
}
