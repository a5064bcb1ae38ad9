//! Printed barcode sizes.
//!
//! ZPL barcode commands take a module width and a height but no total width,
//! so the width an element occupies on paper has to be derived from the
//! symbol structure.

use qrcode::{EcLevel, QrCode};

use crate::element::BarcodeKind;

/// Modules in an EAN-13 symbol including both quiet zones.
pub const EAN13_MODULES: i32 = 105;

const CODE128_QUIET: i32 = 10;
const CODE128_START: i32 = 11;
const CODE128_PER_CHAR: i32 = 11;
const CODE128_STOP: i32 = 13;

pub fn ean13_width_dots(module_width_dots: i32) -> i32 {
    EAN13_MODULES.saturating_mul(module_width_dots.max(1))
}

/// Estimated Code 128 module count for a payload of `data_len` characters.
///
/// Assumes one symbol character per input character (subset B). Subset C
/// packs digit pairs and would be narrower, so this overestimates numeric
/// payloads.
pub fn code128_modules(data_len: usize) -> i32 {
    let data_len = i32::try_from(data_len).unwrap_or(i32::MAX / CODE128_PER_CHAR);
    let fixed = CODE128_QUIET + CODE128_START + CODE128_STOP + CODE128_QUIET;
    data_len.saturating_mul(CODE128_PER_CHAR).saturating_add(fixed)
}

pub fn code128_width_dots(data: &str, module_width_dots: i32) -> i32 {
    code128_modules(data.chars().count()).saturating_mul(module_width_dots.max(1))
}

/// Side length in dots of the QR symbol `^BQ` draws for `data`.
///
/// Uses error correction level Q, the printer default. Returns `None` when
/// the payload does not fit any QR version.
pub fn qr_symbol_width_dots(data: &str, magnification: i32) -> Option<i32> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::Q).ok()?;
    let modules = i32::try_from(code.width()).ok()?;
    Some(modules.saturating_mul(magnification.max(1)))
}

/// Width in dots the printer will actually draw.
///
/// QR codes report the configured width; the symbol scales with
/// magnification rather than module width.
pub fn real_width_dots(
    kind: BarcodeKind,
    data: &str,
    module_width_dots: i32,
    configured_width_dots: i32,
) -> i32 {
    match kind {
        BarcodeKind::Ean13 => ean13_width_dots(module_width_dots),
        BarcodeKind::Code128 => code128_width_dots(data, module_width_dots),
        BarcodeKind::QrCode => configured_width_dots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ean13_is_fixed_width() {
        assert_eq!(ean13_width_dots(2), 210);
        assert_eq!(ean13_width_dots(4), 2 * ean13_width_dots(2));
        assert_eq!(
            real_width_dots(BarcodeKind::Ean13, "5901234123457", 3, 0),
            real_width_dots(BarcodeKind::Ean13, "", 3, 0)
        );
    }

    #[test]
    fn code128_model() {
        assert_eq!(code128_modules(0), 44);
        assert_eq!(code128_modules(5), 99);
        assert_eq!(code128_width_dots("ABCDE", 2), 198);
    }

    #[test]
    fn code128_grows_with_payload() {
        let mut previous = code128_width_dots("", 2);
        for len in 1..40 {
            let width = code128_width_dots(&"X".repeat(len), 2);
            assert!(width > previous);
            previous = width;
        }
    }

    #[test]
    fn code128_counts_characters_not_bytes() {
        assert_eq!(code128_width_dots("ÄÖÜ", 1), code128_width_dots("AOU", 1));
    }

    #[test]
    fn module_width_scales_linearly() {
        for kind in [BarcodeKind::Ean13, BarcodeKind::Code128] {
            let narrow = real_width_dots(kind, "12345", 2, 0);
            let wide = real_width_dots(kind, "12345", 4, 0);
            assert_eq!(wide, 2 * narrow);
        }
    }

    #[test]
    fn non_positive_module_width_counts_as_one() {
        assert_eq!(ean13_width_dots(0), ean13_width_dots(1));
        assert_eq!(code128_width_dots("A", -3), code128_width_dots("A", 1));
    }

    #[test]
    fn huge_module_width_saturates() {
        assert_eq!(ean13_width_dots(i32::MAX), i32::MAX);
        assert_eq!(code128_width_dots("ABC", i32::MAX), i32::MAX);
        assert_eq!(qr_symbol_width_dots("hello", i32::MAX), Some(i32::MAX));
        assert_eq!(code128_modules(usize::MAX), i32::MAX);
    }

    #[test]
    fn qr_uses_configured_width() {
        assert_eq!(real_width_dots(BarcodeKind::QrCode, "hello", 2, 160), 160);
    }

    #[test]
    fn qr_symbol_scales_with_magnification() {
        // "hello" fits a version 1 symbol (21 modules) at level Q
        assert_eq!(qr_symbol_width_dots("hello", 1), Some(21));
        assert_eq!(qr_symbol_width_dots("hello", 3), Some(63));
    }

    #[test]
    fn qr_overflow_is_none() {
        assert_eq!(qr_symbol_width_dots(&"x".repeat(5000), 3), None);
    }
}
