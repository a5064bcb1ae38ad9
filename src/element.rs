//! Label elements.
//!
//! Elements are plain data: positions and sizes in millimeters, fonts and
//! barcode parameters in printer units. They serialize to the flat JSON maps
//! used by saved templates, with a `"type"` discriminator in front.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::Error, font::ZplFont, metrics, units};

/// Position shared by every element.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementConfig {
    #[serde(rename = "x")]
    pub x_mm: f64,
    #[serde(rename = "y")]
    pub y_mm: f64,
    /// Rotation set in the editor. ZPL output is always drawn unrotated.
    #[serde(rename = "rotation", default, deserialize_with = "whole_degrees")]
    pub rotation_deg: i32,
}

/// Rotation was saved as a float by some editor versions.
fn whole_degrees<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let degrees = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(degrees.round().rem_euclid(360.0) as i32)
}

impl ElementConfig {
    pub fn new(x_mm: f64, y_mm: f64) -> Self {
        ElementConfig {
            x_mm,
            y_mm,
            rotation_deg: 0,
        }
    }
}

/// Discriminator stored under `"type"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Text,
    Barcode,
    Rectangle,
    Circle,
    Line,
    Image,
}

impl ElementKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Barcode => "barcode",
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Line => "line",
            Self::Image => "image",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "barcode" => Some(Self::Barcode),
            "rectangle" => Some(Self::Rectangle),
            "circle" => Some(Self::Circle),
            "line" => Some(Self::Line),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarcodeKind {
    #[serde(rename = "EAN13", alias = "ean13")]
    Ean13,
    #[serde(rename = "CODE128", alias = "code128")]
    Code128,
    #[serde(rename = "QRCODE", alias = "qrcode", alias = "QR", alias = "qr")]
    QrCode,
}

/// Ink color for shapes. White draws over black for reverse effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeColor {
    #[default]
    #[serde(alias = "B")]
    Black,
    #[serde(alias = "W")]
    White,
}

impl ShapeColor {
    /// Single-letter ZPL color parameter.
    pub fn code(&self) -> char {
        match self {
            Self::Black => 'B',
            Self::White => 'W',
        }
    }
}

fn default_font_size() -> i32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_module_width() -> i32 {
    2
}

fn default_magnification() -> i32 {
    3
}

fn default_thickness() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    #[serde(flatten)]
    pub config: ElementConfig,
    #[serde(default)]
    pub text: String,
    /// Glyph height in dots.
    #[serde(default = "default_font_size")]
    pub font_size: i32,
    #[serde(default)]
    pub font: ZplFont,
    #[serde(default)]
    pub data_field: Option<String>,
    #[serde(default)]
    pub bold: bool,
    /// Kept for the editor; ZPL has no italic.
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
}

impl TextElement {
    pub fn new(x_mm: f64, y_mm: f64, text: impl Into<String>) -> Self {
        TextElement {
            config: ElementConfig::new(x_mm, y_mm),
            text: text.into(),
            font_size: default_font_size(),
            font: ZplFont::default(),
            data_field: None,
            bold: false,
            italic: false,
            underline: false,
        }
    }

    pub fn font_size(self, font_size: i32) -> Self {
        TextElement { font_size, ..self }
    }

    pub fn font(self, font: ZplFont) -> Self {
        TextElement { font, ..self }
    }

    pub fn data_field(self, field: impl Into<String>) -> Self {
        TextElement {
            data_field: Some(field.into()),
            ..self
        }
    }

    pub fn bold(self, bold: bool) -> Self {
        TextElement { bold, ..self }
    }

    pub fn underline(self, underline: bool) -> Self {
        TextElement { underline, ..self }
    }

    /// The field data printed: the bound data field if any, else the text.
    pub fn content(&self) -> &str {
        self.data_field
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarcodeElement {
    #[serde(flatten)]
    pub config: ElementConfig,
    #[serde(rename = "barcode_type")]
    pub kind: BarcodeKind,
    #[serde(default)]
    pub data: String,
    /// Placeholder width on the canvas; see [`BarcodeElement::real_size_mm`].
    #[serde(rename = "width")]
    pub width_mm: f64,
    #[serde(rename = "height")]
    pub height_mm: f64,
    #[serde(default)]
    pub data_field: Option<String>,
    #[serde(default = "default_true")]
    pub show_text: bool,
    #[serde(default = "default_module_width")]
    pub module_width: i32,
    /// QR only.
    #[serde(default = "default_magnification")]
    pub magnification: i32,
}

impl BarcodeElement {
    pub fn new(
        x_mm: f64,
        y_mm: f64,
        kind: BarcodeKind,
        data: impl Into<String>,
        width_mm: f64,
        height_mm: f64,
    ) -> Self {
        BarcodeElement {
            config: ElementConfig::new(x_mm, y_mm),
            kind,
            data: data.into(),
            width_mm,
            height_mm,
            data_field: None,
            show_text: true,
            module_width: default_module_width(),
            magnification: default_magnification(),
        }
    }

    pub fn module_width(self, module_width: i32) -> Self {
        BarcodeElement {
            module_width,
            ..self
        }
    }

    pub fn magnification(self, magnification: i32) -> Self {
        BarcodeElement {
            magnification,
            ..self
        }
    }

    pub fn data_field(self, field: impl Into<String>) -> Self {
        BarcodeElement {
            data_field: Some(field.into()),
            ..self
        }
    }

    pub fn show_text(self, show_text: bool) -> Self {
        BarcodeElement { show_text, ..self }
    }

    pub fn content(&self) -> &str {
        self.data_field
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(&self.data)
    }

    /// Width the printer will draw, in dots.
    pub fn real_width_dots(&self, dpi: u32) -> i32 {
        metrics::real_width_dots(
            self.kind,
            self.content(),
            self.module_width,
            units::mm_to_dots(self.width_mm, dpi),
        )
    }

    /// Printed `(width, height)` in millimeters. Height is always the
    /// configured height.
    pub fn real_size_mm(&self, dpi: u32) -> (f64, f64) {
        let width = match self.kind {
            BarcodeKind::QrCode => self.width_mm,
            _ => units::dots_to_mm(self.real_width_dots(dpi), dpi),
        };
        (width, self.height_mm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleElement {
    #[serde(flatten)]
    pub config: ElementConfig,
    #[serde(rename = "width")]
    pub width_mm: f64,
    #[serde(rename = "height")]
    pub height_mm: f64,
    #[serde(default)]
    pub fill: bool,
    #[serde(rename = "border_thickness", default = "default_thickness")]
    pub border_thickness_mm: f64,
    #[serde(default)]
    pub color: ShapeColor,
}

impl RectangleElement {
    pub fn new(x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64) -> Self {
        RectangleElement {
            config: ElementConfig::new(x_mm, y_mm),
            width_mm,
            height_mm,
            fill: false,
            border_thickness_mm: default_thickness(),
            color: ShapeColor::default(),
        }
    }

    pub fn fill(self, fill: bool) -> Self {
        RectangleElement { fill, ..self }
    }

    pub fn border_thickness(self, border_thickness_mm: f64) -> Self {
        RectangleElement {
            border_thickness_mm,
            ..self
        }
    }

    pub fn color(self, color: ShapeColor) -> Self {
        RectangleElement { color, ..self }
    }
}

/// Tolerance below which an ellipse is drawn as a circle.
pub const CIRCLE_TOLERANCE_MM: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleElement {
    #[serde(flatten)]
    pub config: ElementConfig,
    #[serde(rename = "width")]
    pub width_mm: f64,
    #[serde(rename = "height")]
    pub height_mm: f64,
    #[serde(default)]
    pub fill: bool,
    #[serde(rename = "border_thickness", default = "default_thickness")]
    pub border_thickness_mm: f64,
    #[serde(default)]
    pub color: ShapeColor,
}

impl CircleElement {
    pub fn new(x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64) -> Self {
        CircleElement {
            config: ElementConfig::new(x_mm, y_mm),
            width_mm,
            height_mm,
            fill: false,
            border_thickness_mm: default_thickness(),
            color: ShapeColor::default(),
        }
    }

    pub fn fill(self, fill: bool) -> Self {
        CircleElement { fill, ..self }
    }

    pub fn border_thickness(self, border_thickness_mm: f64) -> Self {
        CircleElement {
            border_thickness_mm,
            ..self
        }
    }

    pub fn color(self, color: ShapeColor) -> Self {
        CircleElement { color, ..self }
    }

    /// Width and height agree within [`CIRCLE_TOLERANCE_MM`]; the diameter
    /// is then the width.
    pub fn is_circle(&self) -> bool {
        (self.width_mm - self.height_mm).abs() < CIRCLE_TOLERANCE_MM
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineElement {
    /// Start point.
    #[serde(flatten)]
    pub config: ElementConfig,
    #[serde(rename = "x2")]
    pub x2_mm: f64,
    #[serde(rename = "y2")]
    pub y2_mm: f64,
    #[serde(rename = "thickness", default = "default_thickness")]
    pub thickness_mm: f64,
    #[serde(default)]
    pub color: ShapeColor,
}

impl LineElement {
    pub fn new(x_mm: f64, y_mm: f64, x2_mm: f64, y2_mm: f64) -> Self {
        LineElement {
            config: ElementConfig::new(x_mm, y_mm),
            x2_mm,
            y2_mm,
            thickness_mm: default_thickness(),
            color: ShapeColor::default(),
        }
    }

    pub fn thickness(self, thickness_mm: f64) -> Self {
        LineElement {
            thickness_mm,
            ..self
        }
    }

    pub fn color(self, color: ShapeColor) -> Self {
        LineElement { color, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    #[serde(flatten)]
    pub config: ElementConfig,
    #[serde(rename = "width")]
    pub width_mm: f64,
    #[serde(rename = "height")]
    pub height_mm: f64,
    /// Encoded image file bytes (PNG, JPEG, ...), base64 in JSON.
    #[serde(default, with = "base64_data")]
    pub image_data: Option<Vec<u8>>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl ImageElement {
    pub fn from_bytes(x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64, data: Vec<u8>) -> Self {
        ImageElement {
            config: ElementConfig::new(x_mm, y_mm),
            width_mm,
            height_mm,
            image_data: Some(data),
            image_path: None,
        }
    }

    pub fn from_path(
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
        path: impl Into<String>,
    ) -> Self {
        ImageElement {
            config: ElementConfig::new(x_mm, y_mm),
            width_mm,
            height_mm,
            image_data: None,
            image_path: Some(path.into()),
        }
    }

    pub fn has_source(&self) -> bool {
        self.image_data.as_ref().map_or(false, |d| !d.is_empty())
            || self.image_path.as_ref().map_or(false, |p| !p.is_empty())
    }
}

mod base64_data {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(data) => serializer.serialize_some(&STANDARD.encode(data)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        let encoded = match encoded {
            Some(s) => s,
            None => return Ok(None),
        };
        // Accept data URLs as pasted from a browser.
        let payload = match encoded.find(";base64,") {
            Some(i) if encoded.starts_with("data:") => &encoded[i + 8..],
            _ => encoded.as_str(),
        };
        let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        if payload.is_empty() {
            return Ok(None);
        }
        STANDARD.decode(payload).map(Some).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rectangle(RectangleElement),
    Circle(CircleElement),
    Line(LineElement),
}

/// Anything that can be placed on a label.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text(TextElement),
    Barcode(BarcodeElement),
    Shape(Shape),
    Image(ImageElement),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Text(_) => ElementKind::Text,
            Self::Barcode(_) => ElementKind::Barcode,
            Self::Shape(Shape::Rectangle(_)) => ElementKind::Rectangle,
            Self::Shape(Shape::Circle(_)) => ElementKind::Circle,
            Self::Shape(Shape::Line(_)) => ElementKind::Line,
            Self::Image(_) => ElementKind::Image,
        }
    }

    pub fn config(&self) -> &ElementConfig {
        match self {
            Self::Text(e) => &e.config,
            Self::Barcode(e) => &e.config,
            Self::Shape(Shape::Rectangle(e)) => &e.config,
            Self::Shape(Shape::Circle(e)) => &e.config,
            Self::Shape(Shape::Line(e)) => &e.config,
            Self::Image(e) => &e.config,
        }
    }

    /// Serialize to a flat map with `"type"` as the first key.
    pub fn to_map(&self) -> Result<Map<String, Value>, Error> {
        let body = match self {
            Self::Text(e) => serde_json::to_value(e)?,
            Self::Barcode(e) => serde_json::to_value(e)?,
            Self::Shape(Shape::Rectangle(e)) => serde_json::to_value(e)?,
            Self::Shape(Shape::Circle(e)) => serde_json::to_value(e)?,
            Self::Shape(Shape::Line(e)) => serde_json::to_value(e)?,
            Self::Image(e) => serde_json::to_value(e)?,
        };

        let mut map = Map::new();
        map.insert(
            "type".to_string(),
            Value::String(self.kind().type_name().to_string()),
        );
        if let Value::Object(fields) = body {
            map.extend(fields);
        }
        Ok(map)
    }

    /// Deserialize from a map produced by [`Element::to_map`] or an older
    /// saved template. Optional keys take their defaults.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, Error> {
        let type_name = match map.get("type") {
            Some(Value::String(name)) => name.as_str(),
            Some(other) => return Err(Error::UnknownElementType(other.to_string())),
            None => return Err(Error::MissingType),
        };
        let kind = ElementKind::from_type_name(type_name).ok_or_else(|| {
            warn!("Unknown element type {:?}", type_name);
            Error::UnknownElementType(type_name.to_string())
        })?;

        let value = Value::Object(map.clone());
        let element = match kind {
            ElementKind::Text => Self::Text(serde_json::from_value(value)?),
            ElementKind::Barcode => Self::Barcode(serde_json::from_value(value)?),
            ElementKind::Rectangle => Self::Shape(Shape::Rectangle(serde_json::from_value(value)?)),
            ElementKind::Circle => Self::Shape(Shape::Circle(serde_json::from_value(value)?)),
            ElementKind::Line => Self::Shape(Shape::Line(serde_json::from_value(value)?)),
            ElementKind::Image => Self::Image(serde_json::from_value(value)?),
        };
        Ok(element)
    }

    /// Like [`Element::from_map`] for any JSON value; non-objects have no type.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(Error::MissingType),
        }
    }
}

impl From<TextElement> for Element {
    fn from(e: TextElement) -> Self {
        Self::Text(e)
    }
}

impl From<BarcodeElement> for Element {
    fn from(e: BarcodeElement) -> Self {
        Self::Barcode(e)
    }
}

impl From<RectangleElement> for Element {
    fn from(e: RectangleElement) -> Self {
        Self::Shape(Shape::Rectangle(e))
    }
}

impl From<CircleElement> for Element {
    fn from(e: CircleElement) -> Self {
        Self::Shape(Shape::Circle(e))
    }
}

impl From<LineElement> for Element {
    fn from(e: LineElement) -> Self {
        Self::Shape(Shape::Line(e))
    }
}

impl From<ImageElement> for Element {
    fn from(e: ImageElement) -> Self {
        Self::Image(e)
    }
}
