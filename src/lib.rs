//! ZPL Label Generator
//!
//! This crate turns a label design (text, barcodes, shapes and images placed
//! in millimeters) into a ZPL program for Zebra compatible printers.
//!
//! # Example
//!
//! ```rust
//! use zpl_label::{BarcodeElement, BarcodeKind, Generator, LabelConfig, TextElement};
//!
//! let config = LabelConfig::new(50.0, 30.0, 203).unwrap();
//! let elements = vec![
//!     TextElement::new(2.0, 2.0, "Price").font_size(25).into(),
//!     BarcodeElement::new(2.0, 10.0, BarcodeKind::Ean13, "5901234123457", 30.0, 12.0).into(),
//! ];
//! let label = Generator::new(config).generate(&elements);
//!
//! assert!(label.zpl.starts_with("^XA^CI28^PW400^LL240"));
//! assert!(label.zpl.ends_with("^XZ"));
//! ```

mod element;
mod emit;
mod error;
mod font;
mod generator;
mod graphic;
mod metrics;
mod template;
mod units;

pub use crate::{
    element::{
        BarcodeElement, BarcodeKind, CircleElement, Element, ElementConfig, ElementKind,
        ImageElement, LineElement, RectangleElement, Shape, ShapeColor, TextElement,
        CIRCLE_TOLERANCE_MM,
    },
    emit::{Diagonal, EmitOptions, LineDirection, LineGeometry},
    error::{EmitError, Error},
    font::{FontSpec, ZplFont},
    generator::{generate, Diagnostic, GeneratedLabel, Generator, LabelConfig},
    graphic::{encode_image, Dithering, GraphicField},
    metrics::{
        code128_modules, code128_width_dots, ean13_width_dots, qr_symbol_width_dots,
        real_width_dots, EAN13_MODULES,
    },
    template::{GridSettings, LabelTemplate, LoadReport, TemplateLabelConfig, TEMPLATE_VERSION},
    units::{dots_to_mm, dots_to_points, mm_to_dots, points_to_dots, DisplayUnit},
};

/// Per-element ZPL fragment functions.
pub mod commands {
    pub use crate::emit::{barcode, circle, element, image, line, rectangle, text};
}

/// Type alias for packed 1-bit bitmap rows.
///
/// Each inner `Vec<u8>` represents a single row of pixels, with 8 pixels
/// packed into each byte, most significant bit first. A set bit prints black.
pub type Matrix = Vec<Vec<u8>>;

/// Resolution of the reference 8 dots/mm printers.
pub const DEFAULT_DPI: u32 = 203;

pub const MM_PER_INCH: f64 = 25.4;

pub const POINTS_PER_INCH: f64 = 72.0;
