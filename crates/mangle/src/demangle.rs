//! Decoding half of the mangling scheme.

use thiserror::Error;
use zhc_abi::{AbiValue, BigInt, Kernel, KernelConfig, Overload, OverloadError, PointerSize, Signedness};

/// Error demangling a mangled `AbiValue`/`Overload`/`KernelConfig` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemangleError {
    /// The input ended where a tag byte or further data was expected.
    #[error("mangled name ended unexpectedly")]
    UnexpectedEnd,
    /// A tag byte did not match any known `AbiValue` variant.
    #[error("unrecognized tag byte {0:?}")]
    InvalidTag(char),
    /// A decimal field contained no digits, or overflowed its target width.
    #[error("invalid or out-of-range decimal field")]
    InvalidDecimal,
    /// A `const_int` token was not terminated by `p` or `n`.
    #[error("unterminated constant integer")]
    UnterminatedConstInt,
    /// The kernel-name length prefix did not match the available bytes.
    #[error("kernel name length prefix out of bounds")]
    InvalidNameLength,
    /// An overload exceeded the maximum argument count while demangling.
    #[error("overload exceeded maximum argument count")]
    TooManyArgs,
}

impl From<OverloadError> for DemangleError {
    fn from(_: OverloadError) -> Self {
        Self::TooManyArgs
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn next_char(&mut self) -> Result<char, DemangleError> {
        let c = self.remaining().chars().next().ok_or(DemangleError::UnexpectedEnd)?;
        self.pos += c.len_utf8();
        Ok(c)
    }

    fn expect_char(&mut self, expected: char) -> Result<(), DemangleError> {
        let c = self.next_char()?;
        if c == expected {
            Ok(())
        } else {
            Err(DemangleError::InvalidTag(c))
        }
    }

    /// Consumes a run of ASCII decimal digits and parses it as a `u64`.
    fn take_decimal(&mut self) -> Result<u64, DemangleError> {
        let rest = self.remaining();
        let digit_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digit_len == 0 {
            return Err(DemangleError::InvalidDecimal);
        }
        let digits = &rest[..digit_len];
        self.pos += digit_len;
        digits.parse::<u64>().map_err(|_| DemangleError::InvalidDecimal)
    }

    fn take_decimal_as<T>(&mut self) -> Result<T, DemangleError>
    where
        T: TryFrom<u64>,
    {
        let value = self.take_decimal()?;
        T::try_from(value).map_err(|_| DemangleError::InvalidDecimal)
    }

    /// Consumes hex digits up to (but not including) the next `p`/`n` sign
    /// terminator.
    fn take_const_int_hex(&mut self) -> Result<&'a str, DemangleError> {
        let rest = self.remaining();
        let hex_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if hex_len == 0 {
            return Err(DemangleError::UnterminatedConstInt);
        }
        let hex = &rest[..hex_len];
        self.pos += hex_len;
        Ok(hex)
    }
}

/// Decodes one [`AbiValue`] from the front of `input`, returning the decoded
/// value and the unconsumed remainder.
///
/// # Errors
///
/// Returns [`DemangleError`] if `input` does not begin with a well-formed
/// `AbiValue` encoding.
pub fn demangle_value(input: &str) -> Result<(AbiValue, &str), DemangleError> {
    let mut cur = Cursor::new(input);
    let value = parse_value(&mut cur)?;
    Ok((value, cur.remaining()))
}

/// Decodes an [`Overload`] from the front of `input`.
///
/// # Errors
///
/// Returns [`DemangleError`] if the argument count or any argument fails to
/// decode.
pub fn demangle_overload(input: &str) -> Result<(Overload, &str), DemangleError> {
    let mut cur = Cursor::new(input);
    let overload = parse_overload(&mut cur)?;
    Ok((overload, cur.remaining()))
}

/// Decodes a full [`KernelConfig`] from `input`, which must be consumed
/// exactly to its end.
///
/// # Errors
///
/// Returns [`DemangleError`] if the kernel-name length prefix, name, or
/// overload fail to decode, or if trailing bytes remain afterward.
pub fn demangle_config(input: &str) -> Result<KernelConfig, DemangleError> {
    let mut cur = Cursor::new(input);
    let name_len: usize = cur.take_decimal_as()?;
    cur.expect_char('_')?;
    let rest = cur.remaining();
    if name_len > rest.len() || !rest.is_char_boundary(name_len) {
        return Err(DemangleError::InvalidNameLength);
    }
    let name = &rest[..name_len];
    cur.pos += name_len;
    let overload = parse_overload(&mut cur)?;
    if !cur.remaining().is_empty() {
        return Err(DemangleError::InvalidDecimal);
    }
    Ok(KernelConfig::new(Kernel::new(name), overload))
}

fn parse_overload(cur: &mut Cursor<'_>) -> Result<Overload, DemangleError> {
    let count = cur.take_decimal()? as usize;
    let mut args = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        args.push(parse_value(cur)?);
    }
    Ok(Overload::new(args)?)
}

fn parse_value(cur: &mut Cursor<'_>) -> Result<AbiValue, DemangleError> {
    let tag = cur.next_char()?;
    match tag {
        'i' => Ok(AbiValue::Int { signedness: Signedness::Signed, bits: cur.take_decimal_as()? }),
        'u' => Ok(AbiValue::Int { signedness: Signedness::Unsigned, bits: cur.take_decimal_as()? }),
        'f' => Ok(AbiValue::Float { bits: cur.take_decimal_as()? }),
        'b' => Ok(AbiValue::Bool),
        'a' => {
            let len = cur.take_decimal()?;
            let child = parse_value(cur)?;
            Ok(AbiValue::Array { len, child: Box::new(child) })
        }
        'p' | 'P' | 'S' => {
            let size = match tag {
                'p' => PointerSize::One,
                'P' => PointerSize::Many,
                _ => PointerSize::Slice,
            };
            let mutability = cur.next_char()?;
            let is_const = match mutability {
                'c' => true,
                'm' => false,
                other => return Err(DemangleError::InvalidTag(other)),
            };
            let alignment = cur.take_decimal_as()?;
            let child = parse_value(cur)?;
            Ok(AbiValue::Pointer { size, is_const, alignment, child: Box::new(child) })
        }
        'I' => {
            let hex = cur.take_const_int_hex()?;
            let sign = cur.next_char()?;
            let negative = match sign {
                'p' => false,
                'n' => true,
                other => return Err(DemangleError::InvalidTag(other)),
            };
            let magnitude = decode_hex(hex)?;
            Ok(AbiValue::ConstantInt(BigInt::from_be_bytes(negative, &magnitude)))
        }
        'T' => Ok(AbiValue::ConstantBool(true)),
        'F' => Ok(AbiValue::ConstantBool(false)),
        'r' => {
            let child = parse_value(cur)?;
            Ok(AbiValue::TypedRuntimeValue(Box::new(child)))
        }
        other => Err(DemangleError::InvalidTag(other)),
    }
}

/// Decodes a hex string in the mangler's "unpadded leading byte, two-digit
/// subsequent bytes" format back into big-endian magnitude bytes.
fn decode_hex(hex: &str) -> Result<Vec<u8>, DemangleError> {
    if hex == "0" {
        return Ok(Vec::new());
    }
    let mut bytes = Vec::with_capacity(hex.len().div_ceil(2));
    let first_width = if hex.len() % 2 == 0 { 2 } else { 1 };
    let (head, tail) = hex.split_at(first_width);
    bytes.push(u8::from_str_radix(head, 16).map_err(|_| DemangleError::InvalidDecimal)?);
    for chunk in tail.as_bytes().chunks(2) {
        let s = std::str::from_utf8(chunk).map_err(|_| DemangleError::InvalidDecimal)?;
        bytes.push(u8::from_str_radix(s, 16).map_err(|_| DemangleError::InvalidDecimal)?);
    }
    Ok(bytes)
}
