// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! `printf`-style output shim.
//!
//! Text is rendered into a fixed 1024-byte buffer and handed to the host in a
//! single `trap_print` call. One byte of the buffer is reserved for the
//! terminator, so at most 1023 bytes of text survive. Anything past that is
//! dropped and the buffer is flagged as truncated.
//!
//! Supported directives: `%s`, `%d`, `%i`, `%u`, `%x`, `%X`, `%c` and `%%`,
//! with the `-` and `0` flags and a decimal minimum width. A directive with
//! no matching argument, or with an argument of the wrong kind, is copied to
//! the output verbatim.

use std::fmt::{self, Write};

use tracing::warn;
use vm_sample_abi::{Syscalls, TrapResult};

pub const PRINT_BUFFER_SIZE: usize = 1024;

/// Longest text `PrintBuffer` keeps.
pub const PRINT_TEXT_MAX: usize = PRINT_BUFFER_SIZE - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'a> {
    Str(&'a str),
    Int(i32),
    Char(u8),
}

/// Bounded, stack-allocated text buffer.
#[derive(Clone)]
pub struct PrintBuffer {
    bytes: [u8; PRINT_BUFFER_SIZE],
    len: usize,
    truncated: bool,
}

impl Default for PrintBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrintBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrintBuffer")
            .field("text", &String::from_utf8_lossy(self.as_bytes()))
            .field("truncated", &self.truncated)
            .finish()
    }
}

impl PrintBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0; PRINT_BUFFER_SIZE],
            len: 0,
            truncated: false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Appends as much of `data` as fits and drops the rest.
    pub fn push(&mut self, data: &[u8]) {
        let room = PRINT_TEXT_MAX - self.len;
        let n = data.len().min(room);
        self.bytes[self.len..self.len + n].copy_from_slice(&data[..n]);
        self.len += n;
        if n < data.len() {
            self.truncated = true;
        }
    }

    fn push_repeat(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            if self.len == PRINT_TEXT_MAX {
                self.truncated = true;
                return;
            }
            self.bytes[self.len] = byte;
            self.len += 1;
        }
    }
}

impl Write for PrintBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s.as_bytes());
        Ok(())
    }
}

/// Scratch space for a single rendered number.
struct NumText {
    bytes: [u8; 16],
    len: usize,
}

impl NumText {
    fn render(args: fmt::Arguments<'_>) -> Self {
        let mut out = Self {
            bytes: [0; 16],
            len: 0,
        };
        // Every integer rendering fits in 16 bytes.
        let _ = out.write_fmt(args);
        out
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Write for NumText {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.bytes.len() {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Spec {
    left: bool,
    zero: bool,
    width: usize,
}

enum Field<'a> {
    Text(&'a [u8]),
    Number(NumText),
    Byte(u8),
}

impl Field<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Field::Text(t) => *t,
            Field::Number(n) => n.as_bytes(),
            Field::Byte(b) => std::slice::from_ref(b),
        }
    }
}

fn convert<'a>(conversion: u8, arg: Arg<'a>) -> Option<Field<'a>> {
    let field = match (conversion, arg) {
        (b's', Arg::Str(s)) => Field::Text(s.as_bytes()),
        (b's', Arg::Int(i)) => Field::Number(NumText::render(format_args!("{i}"))),
        (b's', Arg::Char(c)) => Field::Byte(c),
        (b'd' | b'i', Arg::Int(i)) => Field::Number(NumText::render(format_args!("{i}"))),
        (b'd' | b'i', Arg::Char(c)) => Field::Number(NumText::render(format_args!("{c}"))),
        (b'u', Arg::Int(i)) => Field::Number(NumText::render(format_args!("{}", i as u32))),
        (b'x', Arg::Int(i)) => Field::Number(NumText::render(format_args!("{:x}", i as u32))),
        (b'X', Arg::Int(i)) => Field::Number(NumText::render(format_args!("{:X}", i as u32))),
        (b'c', Arg::Char(c)) => Field::Byte(c),
        (b'c', Arg::Int(i)) => Field::Byte(i as u8),
        _ => return None,
    };
    Some(field)
}

fn emit(out: &mut PrintBuffer, spec: Spec, field: &Field<'_>) {
    let body = field.bytes();
    let pad = spec.width.saturating_sub(body.len());

    if spec.left {
        out.push(body);
        out.push_repeat(b' ', pad);
    } else if spec.zero && matches!(field, Field::Number(_)) {
        let digits = match body.split_first() {
            Some((b'-', rest)) => {
                out.push(b"-");
                rest
            }
            _ => body,
        };
        out.push_repeat(b'0', pad);
        out.push(digits);
    } else {
        out.push_repeat(b' ', pad);
        out.push(body);
    }
}

/// Renders `fmt` with `args` into `out`.
pub fn format_into(out: &mut PrintBuffer, fmt: &str, args: &[Arg<'_>]) {
    let src = fmt.as_bytes();
    let mut args = args.iter().copied();
    let mut i = 0;

    while i < src.len() {
        let Some(offset) = src[i..].iter().position(|&b| b == b'%') else {
            out.push(&src[i..]);
            break;
        };
        out.push(&src[i..i + offset]);

        let start = i + offset;
        let mut pos = start + 1;
        let mut spec = Spec::default();

        while let Some(&flag) = src.get(pos) {
            match flag {
                b'-' => spec.left = true,
                b'0' => spec.zero = true,
                _ => break,
            }
            pos += 1;
        }
        while let Some(digit) = src.get(pos).filter(|b| b.is_ascii_digit()) {
            spec.width = spec
                .width
                .saturating_mul(10)
                .saturating_add(usize::from(digit - b'0'))
                .min(PRINT_BUFFER_SIZE);
            pos += 1;
        }

        let Some(&conversion) = src.get(pos) else {
            out.push(&src[start..]);
            break;
        };
        let directive = &src[start..=pos];
        i = pos + 1;

        if conversion == b'%' {
            out.push(b"%");
            continue;
        }
        if !matches!(conversion, b's' | b'd' | b'i' | b'u' | b'x' | b'X' | b'c') {
            out.push(directive);
            continue;
        }

        match args.next().and_then(|arg| convert(conversion, arg)) {
            Some(field) => emit(out, spec, &field),
            None => out.push(directive),
        }
    }
}

/// Renders `fmt` and forwards the text to the host in one trap call.
pub fn printf(host: &mut dyn Syscalls, fmt: &str, args: &[Arg<'_>]) -> TrapResult<()> {
    let mut text = PrintBuffer::new();
    format_into(&mut text, fmt, args);

    if text.truncated() {
        warn!(
            kept = text.len(),
            limit = PRINT_TEXT_MAX,
            "printf output truncated"
        );
    }

    host.trap_print(text.as_bytes())
}
