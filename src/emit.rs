//! ZPL fragments for single elements.
//!
//! Each function turns one element into a self-contained command sequence
//! starting with `^FO` and ending with `^FS`. Nothing here keeps state; the
//! same element and options always give the same bytes.

use log::debug;

use crate::{
    element::{
        BarcodeElement, BarcodeKind, CircleElement, Element, ImageElement, LineElement,
        RectangleElement, Shape, TextElement,
    },
    error::EmitError,
    graphic::{self, Dithering},
    units::mm_to_dots,
};

/// Text width heuristic for underlines, in glyph heights per character.
const UNDERLINE_CHAR_WIDTH: f64 = 0.6;
/// Gap between the text cell and its underline, in dots.
const UNDERLINE_GAP: i32 = 2;
/// Range `^BQ` accepts for the magnification factor.
const QR_MAGNIFICATION_MIN: i32 = 1;
const QR_MAGNIFICATION_MAX: i32 = 10;
/// Width factor emulating bold with the scalable font.
const BOLD_WIDTH_FACTOR: f64 = 1.5;

/// Parameters that apply to every element of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    pub dpi: u32,
    pub dithering: Dithering,
    /// Use ZPL ASCII compression for `^GFA` data.
    pub compress: bool,
}

impl EmitOptions {
    pub fn new(dpi: u32) -> Self {
        EmitOptions {
            dpi,
            dithering: Dithering::default(),
            compress: false,
        }
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self::new(crate::DEFAULT_DPI)
    }
}

pub fn element(element: &Element, options: &EmitOptions) -> Result<String, EmitError> {
    match element {
        Element::Text(e) => text(e, options.dpi),
        Element::Barcode(e) => barcode(e, options.dpi),
        Element::Shape(Shape::Rectangle(e)) => rectangle(e, options.dpi),
        Element::Shape(Shape::Circle(e)) => circle(e, options.dpi),
        Element::Shape(Shape::Line(e)) => line(e, options.dpi),
        Element::Image(e) => image(e, options),
    }
}

fn origin(x_mm: f64, y_mm: f64, dpi: u32) -> String {
    format!("^FO{},{}", mm_to_dots(x_mm, dpi), mm_to_dots(y_mm, dpi))
}

fn scale(dots: i32, factor: f64) -> i32 {
    (f64::from(dots) * factor).round_ties_even() as i32
}

/// `^FO` `^A` `^FD`, plus a one-dot `^GB` bar when underlined.
pub fn text(e: &TextElement, dpi: u32) -> Result<String, EmitError> {
    if e.font_size <= 0 {
        return Err(EmitError::InvalidSize { what: "Text" });
    }
    let x = mm_to_dots(e.config.x_mm, dpi);
    let y = mm_to_dots(e.config.y_mm, dpi);
    let height = e.font_size;
    // Bitmap fonts have fixed cells; only font 0 can be widened.
    let width = if e.bold && e.font.is_scalable() {
        scale(height, BOLD_WIDTH_FACTOR)
    } else {
        height
    };
    let content = e.content();

    let mut zpl = format!(
        "^FO{},{}^A{}N,{},{}^FD{}^FS",
        x,
        y,
        e.font.code(),
        height,
        width,
        content
    );

    if e.underline {
        let chars = content.chars().count() as i32;
        let length = scale(chars.saturating_mul(height), UNDERLINE_CHAR_WIDTH);
        if length > 0 {
            let bar_y = y
                .checked_add(height)
                .and_then(|v| v.checked_add(UNDERLINE_GAP))
                .ok_or(EmitError::InvalidSize { what: "Text" })?;
            zpl.push_str(&format!("^FO{},{}^GB{},1,1^FS", x, bar_y, length));
        }
    }
    Ok(zpl)
}

pub fn barcode(e: &BarcodeElement, dpi: u32) -> Result<String, EmitError> {
    let height = mm_to_dots(e.height_mm, dpi);
    if height == 0 && e.kind != BarcodeKind::QrCode {
        return Err(EmitError::InvalidSize { what: "Barcode" });
    }
    let interpretation = if e.show_text { 'Y' } else { 'N' };
    let module_width = e.module_width.max(1);

    let command = match e.kind {
        BarcodeKind::Ean13 => format!("^BY{}^BEN,{},{},N", module_width, height, interpretation),
        BarcodeKind::Code128 => format!(
            "^BY{}^BCN,{},{},N,N",
            module_width, height, interpretation
        ),
        BarcodeKind::QrCode => format!(
            "^BQN,2,{}",
            e.magnification.clamp(QR_MAGNIFICATION_MIN, QR_MAGNIFICATION_MAX)
        ),
    };

    Ok(format!(
        "{}{}^FD{}^FS",
        origin(e.config.x_mm, e.config.y_mm, dpi),
        command,
        e.content()
    ))
}

fn border(thickness_mm: f64, dpi: u32) -> i32 {
    mm_to_dots(thickness_mm, dpi).max(1)
}

pub fn rectangle(e: &RectangleElement, dpi: u32) -> Result<String, EmitError> {
    let width = mm_to_dots(e.width_mm, dpi);
    let height = mm_to_dots(e.height_mm, dpi);
    if width == 0 || height == 0 {
        return Err(EmitError::InvalidSize { what: "Rectangle" });
    }
    let thickness = if e.fill {
        height
    } else {
        border(e.border_thickness_mm, dpi)
    };

    Ok(format!(
        "{}^GB{},{},{},{},0^FS",
        origin(e.config.x_mm, e.config.y_mm, dpi),
        width,
        height,
        thickness,
        e.color.code()
    ))
}

/// `^GC` when width and height agree, `^GE` otherwise.
pub fn circle(e: &CircleElement, dpi: u32) -> Result<String, EmitError> {
    let width = mm_to_dots(e.width_mm, dpi);
    let height = mm_to_dots(e.height_mm, dpi);
    let color = e.color.code();

    let command = if e.is_circle() {
        if width == 0 {
            return Err(EmitError::InvalidSize { what: "Circle" });
        }
        let thickness = if e.fill {
            width
        } else {
            border(e.border_thickness_mm, dpi)
        };
        format!("^GC{},{},{}", width, thickness, color)
    } else {
        if width == 0 || height == 0 {
            return Err(EmitError::InvalidSize { what: "Ellipse" });
        }
        let thickness = if e.fill {
            height
        } else {
            border(e.border_thickness_mm, dpi)
        };
        format!("^GE{},{},{},{}", width, height, thickness, color)
    };

    Ok(format!(
        "{}{}^FS",
        origin(e.config.x_mm, e.config.y_mm, dpi),
        command
    ))
}

/// Lean of a diagonal line as `^GD` names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagonal {
    /// Rises to the right, `/`.
    Right,
    /// Falls to the right, `\`.
    Left,
}

impl Diagonal {
    pub fn code(&self) -> char {
        match self {
            Self::Right => 'R',
            Self::Left => 'L',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    Horizontal,
    Vertical,
    Diagonal(Diagonal),
}

/// A line resolved to dot space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineGeometry {
    /// Top-left corner of the bounding box.
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub thickness: i32,
    pub direction: LineDirection,
}

impl LineGeometry {
    pub fn new(e: &LineElement, dpi: u32) -> Result<Self, EmitError> {
        let x1 = mm_to_dots(e.config.x_mm, dpi);
        let y1 = mm_to_dots(e.config.y_mm, dpi);
        let x2 = mm_to_dots(e.x2_mm, dpi);
        let y2 = mm_to_dots(e.y2_mm, dpi);
        let dx = i64::from(x2) - i64::from(x1);
        let dy = i64::from(y2) - i64::from(y1);

        let direction = match (dx, dy) {
            (0, 0) => return Err(EmitError::DegenerateLine),
            (_, 0) => LineDirection::Horizontal,
            (0, _) => LineDirection::Vertical,
            // Screen y grows downwards: opposite signs rise to the right.
            _ if dx * dy < 0 => LineDirection::Diagonal(Diagonal::Right),
            _ => LineDirection::Diagonal(Diagonal::Left),
        };

        Ok(LineGeometry {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
            thickness: border(e.thickness_mm, dpi),
            direction,
        })
    }
}

pub fn line(e: &LineElement, dpi: u32) -> Result<String, EmitError> {
    let g = LineGeometry::new(e, dpi)?;
    let color = e.color.code();

    let command = match g.direction {
        LineDirection::Horizontal => {
            format!("^GB{},{},{},{},0", g.width, g.thickness, g.thickness, color)
        }
        LineDirection::Vertical => {
            format!("^GB{},{},{},{},0", g.thickness, g.height, g.thickness, color)
        }
        LineDirection::Diagonal(lean) => format!(
            "^GD{},{},{},{},{}",
            g.width,
            g.height,
            g.thickness,
            color,
            lean.code()
        ),
    };

    Ok(format!("^FO{},{}{}^FS", g.x, g.y, command))
}

/// `^GFA` with both byte counts set to the uncompressed payload size.
pub fn image(e: &ImageElement, options: &EmitOptions) -> Result<String, EmitError> {
    if !e.has_source() {
        return Err(EmitError::NoImageSource);
    }
    let width = mm_to_dots(e.width_mm, options.dpi) as u32;
    let height = mm_to_dots(e.height_mm, options.dpi) as u32;

    let source = graphic::load_source(e.image_data.as_deref(), e.image_path.as_deref())?;
    let field = graphic::encode_image(&source, width, height, options.dithering)?;
    let data = if options.compress {
        field.compressed_hex_data()
    } else {
        field.hex_data()
    };
    debug!(
        "image {}x{} dots: {} bytes, {} data characters",
        width,
        height,
        field.total_bytes(),
        data.len()
    );

    Ok(format!(
        "{}^GFA,{},{},{},{}^FS",
        origin(e.config.x_mm, e.config.y_mm, options.dpi),
        field.total_bytes(),
        field.total_bytes(),
        field.bytes_per_row(),
        data
    ))
}
