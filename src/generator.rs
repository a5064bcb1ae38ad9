use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    element::{Element, ElementKind},
    emit::{self, EmitOptions},
    error::Error,
    graphic::Dithering,
    units::mm_to_dots,
    DEFAULT_DPI,
};

/// Physical label size and printer resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    pub width_mm: f64,
    pub height_mm: f64,
    pub dpi: u32,
}

impl LabelConfig {
    /// Create a validated configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use zpl_label::LabelConfig;
    ///
    /// let config = LabelConfig::new(28.0, 28.0, 203).unwrap();
    /// assert_eq!(config.width_dots(), 224);
    /// assert!(LabelConfig::new(28.0, 0.0, 203).is_err());
    /// ```
    pub fn new(width_mm: f64, height_mm: f64, dpi: u32) -> Result<Self, Error> {
        let config = LabelConfig {
            width_mm,
            height_mm,
            dpi,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.dpi == 0 {
            return Err(Error::InvalidConfig("dpi must be positive".to_string()));
        }
        for (name, value) in [("width_mm", self.width_mm), ("height_mm", self.height_mm)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn width_dots(&self) -> i32 {
        mm_to_dots(self.width_mm, self.dpi)
    }

    pub fn height_dots(&self) -> i32 {
        mm_to_dots(self.height_mm, self.dpi)
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            width_mm: 100.0,
            height_mm: 50.0,
            dpi: DEFAULT_DPI,
        }
    }
}

/// An element that was left out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Position in the input element list.
    pub index: usize,
    pub element: ElementKind,
    /// Short tag from [`EmitError::kind`](crate::EmitError::kind).
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLabel {
    pub zpl: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl GeneratedLabel {
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Builds a complete `^XA`..`^XZ` program from a list of elements.
///
/// Elements are drawn in input order, so later elements print over earlier
/// ones. An element that cannot be printed is dropped with a diagnostic; it
/// never fails the whole label.
///
/// # Example
///
/// ```
/// use zpl_label::{Generator, LabelConfig, TextElement};
///
/// let config = LabelConfig::new(28.0, 28.0, 203).unwrap();
/// let label = Generator::new(config)
///     .substitutions([("NAME", "World")])
///     .generate(&[TextElement::new(10.0, 10.0, "Hi")
///         .data_field("{{NAME}}")
///         .font_size(20)
///         .into()]);
///
/// assert!(label.zpl.contains("^FDWorld^FS"));
/// ```
#[derive(Debug, Clone)]
pub struct Generator {
    config: LabelConfig,
    substitutions: BTreeMap<String, String>,
    dithering: Dithering,
    compress: bool,
}

impl Generator {
    pub fn new(config: LabelConfig) -> Self {
        Generator {
            config,
            substitutions: BTreeMap::new(),
            dithering: Dithering::default(),
            compress: false,
        }
    }

    /// Values for `{{KEY}}` placeholders.
    pub fn substitutions<I, K, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut substitutions = self.substitutions;
        substitutions.extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        Generator {
            substitutions,
            ..self
        }
    }

    pub fn dithering(self, dithering: Dithering) -> Self {
        Generator { dithering, ..self }
    }

    /// Compress image data with ZPL ASCII compression.
    pub fn compress(self, flag: bool) -> Self {
        Generator {
            compress: flag,
            ..self
        }
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    fn options(&self) -> EmitOptions {
        EmitOptions {
            dpi: self.config.dpi,
            dithering: self.dithering,
            compress: self.compress,
        }
    }

    fn header(&self) -> String {
        format!(
            "^XA^CI28^PW{}^LL{}",
            self.config.width_dots(),
            self.config.height_dots()
        )
    }

    /// Replace every `{{KEY}}` in the fragment, whether or not an element
    /// declared it as its data field.
    fn substitute(&self, mut fragment: String) -> String {
        for (key, value) in &self.substitutions {
            let placeholder = format!("{{{{{}}}}}", key);
            if fragment.contains(&placeholder) {
                fragment = fragment.replace(&placeholder, value);
            }
        }
        fragment
    }

    pub fn generate(&self, elements: &[Element]) -> GeneratedLabel {
        if let Err(err) = self.config.validate() {
            warn!("Generating with an unusable label size: {}", err);
        }
        let options = self.options();
        let mut lines = Vec::with_capacity(elements.len() + 2);
        let mut diagnostics = Vec::new();

        lines.push(self.header());

        for (index, element) in elements.iter().enumerate() {
            match emit::element(element, &options) {
                Ok(fragment) => {
                    debug!(
                        "element {} ({}): {} bytes",
                        index,
                        element.kind().type_name(),
                        fragment.len()
                    );
                    lines.push(self.substitute(fragment));
                }
                Err(err) => {
                    warn!(
                        "Skipping {} element {}: {}",
                        element.kind().type_name(),
                        index,
                        err
                    );
                    diagnostics.push(Diagnostic {
                        index,
                        element: element.kind(),
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
        }

        lines.push("^XZ".to_string());

        GeneratedLabel {
            zpl: lines.join("\n"),
            diagnostics,
        }
    }

    /// Same as [`Generator::generate`], dropping the diagnostics.
    pub fn generate_zpl(&self, elements: &[Element]) -> String {
        self.generate(elements).zpl
    }
}

/// Generate a label in one call.
pub fn generate(
    elements: &[Element],
    config: &LabelConfig,
    substitutions: Option<&HashMap<String, String>>,
) -> String {
    let mut generator = Generator::new(*config);
    if let Some(values) = substitutions {
        generator = generator.substitutions(values.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    generator.generate_zpl(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{
        BarcodeElement, BarcodeKind, ImageElement, LineElement, RectangleElement, TextElement,
    };

    fn config() -> LabelConfig {
        LabelConfig::new(28.0, 28.0, 203).unwrap()
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(LabelConfig::new(0.0, 10.0, 203).is_err());
        assert!(LabelConfig::new(10.0, -1.0, 203).is_err());
        assert!(LabelConfig::new(f64::NAN, 10.0, 203).is_err());
        assert!(matches!(
            LabelConfig::new(10.0, 10.0, 0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(LabelConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_label() {
        let zpl = Generator::new(config()).generate_zpl(&[]);
        assert_eq!(zpl, "^XA^CI28^PW224^LL224\n^XZ");
    }

    #[test]
    fn single_text_element() {
        let elements = vec![TextElement::new(10.0, 10.0, "Hi").font_size(20).into()];
        let zpl = generate(&elements, &config(), None);
        assert!(zpl.starts_with("^XA^CI28^PW224^LL224"));
        assert!(zpl.contains("^FO80,80"));
        assert!(zpl.contains("^A0N,20,20"));
        assert!(zpl.contains("^FDHi^FS"));
        assert!(zpl.ends_with("^XZ"));
    }

    #[test]
    fn placeholders_are_substituted() {
        let elements = vec![
            BarcodeElement::new(1.0, 1.0, BarcodeKind::Code128, "", 20.0, 8.0)
                .data_field("{{CODE}}")
                .into(),
            TextElement::new(1.0, 12.0, "Code: {{CODE}}").into(),
        ];
        let mut values = HashMap::new();
        values.insert("CODE".to_string(), "ABC123".to_string());

        let zpl = generate(&elements, &config(), Some(&values));
        assert!(zpl.contains("^FDABC123^FS"));
        assert!(zpl.contains("^FDCode: ABC123^FS"));
        assert!(!zpl.contains("{{CODE}}"));
    }

    #[test]
    fn unknown_placeholders_stay() {
        let elements = vec![TextElement::new(0.0, 0.0, "{{A}} {{B}}").into()];
        let zpl = Generator::new(config())
            .substitutions([("A", "1")])
            .generate_zpl(&elements);
        assert!(zpl.contains("^FD1 {{B}}^FS"));
    }

    #[test]
    fn elements_keep_input_order() {
        let elements: Vec<Element> = vec![
            RectangleElement::new(0.0, 0.0, 20.0, 20.0).fill(true).into(),
            TextElement::new(2.0, 2.0, "over").into(),
            LineElement::new(0.0, 25.0, 28.0, 25.0).into(),
        ];
        let zpl = Generator::new(config()).generate_zpl(&elements);
        let lines: Vec<&str> = zpl.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("^GB"));
        assert!(lines[2].contains("^FDover^FS"));
        assert!(lines[3].contains("^GB224,4,4,B,0"));
    }

    #[test]
    fn bad_elements_degrade_to_diagnostics() {
        let elements: Vec<Element> = vec![
            TextElement::new(1.0, 1.0, "before").into(),
            ImageElement::from_path(0.0, 0.0, 5.0, 5.0, "/no/such/logo.png").into(),
            LineElement::new(3.0, 3.0, 3.0, 3.0).into(),
            ImageElement::from_bytes(0.0, 0.0, 5.0, 5.0, b"garbage".to_vec()).into(),
            TextElement::new(1.0, 5.0, "after").into(),
            TextElement::new(1.0, 1.0, "x")
                .font_size(i32::MAX)
                .underline(true)
                .into(),
        ];
        let label = Generator::new(config()).generate(&elements);

        assert!(!label.is_complete());
        let skipped: Vec<(usize, &str)> = label
            .diagnostics
            .iter()
            .map(|d| (d.index, d.kind))
            .collect();
        assert_eq!(
            skipped,
            vec![
                (1, "image_read"),
                (2, "degenerate_line"),
                (3, "image_decode"),
                (5, "invalid_size")
            ]
        );
        assert_eq!(label.diagnostics[1].element, ElementKind::Line);

        assert!(label.zpl.contains("^FDbefore^FS"));
        assert!(label.zpl.contains("^FDafter^FS"));
        assert!(!label.zpl.contains("^GFA"));
        assert_eq!(label.zpl.lines().count(), 4);
    }

    #[test]
    fn unvalidated_config_still_generates() {
        let config = LabelConfig {
            width_mm: 0.0,
            height_mm: 10.0,
            dpi: 0,
        };
        assert!(config.validate().is_err());
        let elements = vec![TextElement::new(1.0, 1.0, "x").into()];
        let label = Generator::new(config).generate(&elements);
        assert!(label.is_complete());
        assert_eq!(label.zpl, "^XA^CI28^PW0^LL0\n^FO0,0^A0N,30,30^FDx^FS\n^XZ");
    }

    #[test]
    fn header_follows_resolution() {
        let config = LabelConfig::new(25.4, 50.8, 300).unwrap();
        let zpl = Generator::new(config).generate_zpl(&[]);
        assert!(zpl.starts_with("^XA^CI28^PW300^LL600\n"));
    }
}
