//! Base ESC/POS command set.
//!
//! Byte-exact builders for the text-formatting and control commands shared by
//! every supported dialect. Each function returns the complete command bytes;
//! callers concatenate them into a job buffer.

use caixa_core::Alignment;

/// ESC (0x1B) command prefix.
pub const ESC: u8 = 0x1B;

/// GS (0x1D) command prefix.
pub const GS: u8 = 0x1D;

/// Line feed.
pub const LF: u8 = 0x0A;

/// Initialize printer: `ESC @`.
///
/// Clears the print buffer and resets modes to power-on defaults.
pub fn initialize() -> Vec<u8> {
    vec![ESC, 0x40]
}

/// Select justification: `ESC a n` (0 = left, 1 = center, 2 = right).
pub fn align(alignment: Alignment) -> Vec<u8> {
    let n = match alignment {
        Alignment::Left => 0,
        Alignment::Center => 1,
        Alignment::Right => 2,
    };
    vec![ESC, 0x61, n]
}

/// Turn emphasized (bold) mode on or off: `ESC E n`.
pub fn bold(on: bool) -> Vec<u8> {
    vec![ESC, 0x45, on as u8]
}

/// Turn underline mode on or off: `ESC - n`.
pub fn underline(on: bool) -> Vec<u8> {
    vec![ESC, 0x2D, on as u8]
}

/// Select character size: `GS ! n`.
///
/// High nibble is the width multiplier minus one, low nibble the height
/// multiplier minus one. Multipliers outside 1-8 are clamped.
pub fn char_size(width_mult: u8, height_mult: u8) -> Vec<u8> {
    let w = width_mult.clamp(1, 8) - 1;
    let h = height_mult.clamp(1, 8) - 1;
    vec![GS, 0x21, (w << 4) | h]
}

/// Select character font: `ESC M n` (0 = Font A, 1 = Font B).
pub fn font(n: u8) -> Vec<u8> {
    vec![ESC, 0x4D, n & 0x01]
}

/// Print and feed `n` lines: `ESC d n`.
pub fn feed(n: u8) -> Vec<u8> {
    vec![ESC, 0x64, n]
}

/// Select character code table: `ESC t n`.
pub fn codepage(n: u8) -> Vec<u8> {
    vec![ESC, 0x74, n]
}

/// Paper cut: `GS V 65 0` (full) or `GS V 66 0` (partial).
pub fn cut(partial: bool) -> Vec<u8> {
    let m = if partial { 0x42 } else { 0x41 };
    vec![GS, 0x56, m, 0x00]
}

/// Generate a cash-drawer kick pulse: `ESC p m t1 t2`.
///
/// `pin` selects connector pin 2 (0) or pin 5 (1); `on_time` and `off_time`
/// are in ~2 ms units. The conventional 50 ms pulse is `t1 = t2 = 25`.
pub fn drawer_pulse(pin: u8, on_time: u8, off_time: u8) -> Vec<u8> {
    vec![ESC, 0x70, pin & 0x01, on_time, off_time]
}

/// Real-time status request: `DLE EOT n` (1 = printer, 2 = offline cause,
/// 3 = error cause, 4 = paper sensor).
///
/// Only serial printers answer this reliably; USB responses are best-effort.
pub fn status_request(n: u8) -> Vec<u8> {
    vec![0x10, 0x04, n]
}

/// Offline bit in the `DLE EOT 1` response byte.
pub const STATUS_OFFLINE_BIT: u8 = 0x08;

/// A line of text followed by a line feed.
///
/// The value is emitted as raw bytes; text is expected to already be in the
/// printer's selected code page (receipt content is resolved upstream).
pub fn text_line(value: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.len() + 1);
    buf.extend_from_slice(value.as_bytes());
    buf.push(LF);
    buf
}

/// A separator line filling `columns` characters with `fill`, plus a feed.
pub fn separator(fill: char, columns: usize) -> Vec<u8> {
    let mut buf = String::new();
    for _ in 0..columns {
        buf.push(fill);
    }
    text_line(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_initialize() {
        assert_eq!(initialize(), vec![0x1B, 0x40]);
    }

    #[rstest]
    #[case(Alignment::Left, 0)]
    #[case(Alignment::Center, 1)]
    #[case(Alignment::Right, 2)]
    fn test_align(#[case] alignment: Alignment, #[case] n: u8) {
        assert_eq!(align(alignment), vec![0x1B, 0x61, n]);
    }

    #[test]
    fn test_cut_variants() {
        assert_eq!(cut(true), vec![0x1D, 0x56, 0x42, 0x00]);
        assert_eq!(cut(false), vec![0x1D, 0x56, 0x41, 0x00]);
    }

    #[test]
    fn test_drawer_pulse_default_timing() {
        assert_eq!(drawer_pulse(0, 25, 25), vec![0x1B, 0x70, 0x00, 0x19, 0x19]);
    }

    #[test]
    fn test_drawer_pulse_pin_masked() {
        // Pin byte only selects pin 2 or pin 5.
        assert_eq!(drawer_pulse(7, 25, 25)[2], 0x01);
    }

    #[test]
    fn test_char_size_nibbles() {
        assert_eq!(char_size(1, 1), vec![0x1D, 0x21, 0x00]);
        assert_eq!(char_size(2, 2), vec![0x1D, 0x21, 0x11]);
        assert_eq!(char_size(2, 1), vec![0x1D, 0x21, 0x10]);
        // Clamped above 8x.
        assert_eq!(char_size(9, 9), vec![0x1D, 0x21, 0x77]);
    }

    #[test]
    fn test_bold_underline() {
        assert_eq!(bold(true), vec![0x1B, 0x45, 0x01]);
        assert_eq!(bold(false), vec![0x1B, 0x45, 0x00]);
        assert_eq!(underline(true), vec![0x1B, 0x2D, 0x01]);
    }

    #[test]
    fn test_status_request() {
        assert_eq!(status_request(1), vec![0x10, 0x04, 0x01]);
    }

    #[test]
    fn test_text_line_appends_lf() {
        assert_eq!(text_line("abc"), b"abc\n");
    }

    #[test]
    fn test_separator() {
        let bytes = separator('-', 4);
        assert_eq!(bytes, b"----\n");
    }
}
