// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Sums the byte values of a NUL-terminated sequence. Scanning stops at the
/// first NUL or at the end of the slice, whichever comes first.
///
/// Bytes are taken as unsigned and the sum wraps on `i32` overflow.
pub fn test_case(text: &[u8]) -> i32 {
    text.iter()
        .take_while(|&&b| b != 0)
        .fold(0i32, |sum, &b| sum.wrapping_add(i32::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_template_sum() {
        // 72 + 101 + 108 + 108 + 111 + 32 + 37 + 115 + 10
        assert_eq!(test_case(b"Hello %s\n"), 694);
    }

    #[test]
    fn test_sums_template_not_rendered_text() {
        assert_ne!(test_case(b"Hello World\n"), test_case(b"Hello %s\n"));
    }

    #[test]
    fn test_stops_at_nul() {
        assert_eq!(test_case(b"AB\0CD"), 65 + 66);
        assert_eq!(test_case(b"\0Hello"), 0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(test_case(b""), 0);
    }

    #[test]
    fn test_high_bytes_are_unsigned() {
        assert_eq!(test_case(&[0xFF, 0x01]), 256);
    }

    #[test]
    fn test_repeated_calls_agree() {
        let input = b"Hello %s\n";
        let first = test_case(input);
        let second = test_case(input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_wraps_on_overflow() {
        // 0xFF * n exceeds i32::MAX once n > 8_421_504.
        let input = vec![0xFFu8; 8_421_505];
        let expected = (0xFFi64 * 8_421_505) as i32;
        assert_eq!(test_case(&input), expected);
        assert!(test_case(&input) < 0);
    }
}
