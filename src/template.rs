//! Saved label documents.
//!
//! A template is the JSON file the editor writes: label settings, an ordered
//! element list and free-form metadata. Loading is forgiving: elements that
//! cannot be read are skipped and reported, the rest of the label survives.

use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    element::Element,
    error::Error,
    generator::{GeneratedLabel, Generator, LabelConfig},
    units::DisplayUnit,
    DEFAULT_DPI,
};

pub const TEMPLATE_VERSION: &str = "1.0";

fn default_dpi() -> u32 {
    DEFAULT_DPI
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub size_mm: f64,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub snap: bool,
}

/// `label_config` section of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLabelConfig {
    pub width_mm: f64,
    pub height_mm: f64,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default)]
    pub display_unit: DisplayUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridSettings>,
}

impl From<LabelConfig> for TemplateLabelConfig {
    fn from(config: LabelConfig) -> Self {
        TemplateLabelConfig {
            width_mm: config.width_mm,
            height_mm: config.height_mm,
            dpi: config.dpi,
            display_unit: DisplayUnit::default(),
            grid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelTemplate {
    pub name: String,
    pub version: String,
    pub created_at: String,
    pub updated_at: String,
    pub label_config: TemplateLabelConfig,
    pub elements: Vec<Element>,
    pub metadata: Map<String, Value>,
}

/// Elements dropped while loading, by position and reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub skipped: Vec<(usize, String)>,
}

/// On-disk layout; elements stay raw so one bad entry cannot fail the file.
#[derive(Serialize, Deserialize)]
struct RawTemplate {
    #[serde(default)]
    name: String,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
    label_config: TemplateLabelConfig,
    #[serde(default)]
    elements: Vec<Value>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

fn default_version() -> String {
    TEMPLATE_VERSION.to_string()
}

impl LabelTemplate {
    pub fn new(name: impl Into<String>, config: LabelConfig, elements: Vec<Element>) -> Self {
        LabelTemplate {
            name: name.into(),
            version: default_version(),
            created_at: String::new(),
            updated_at: String::new(),
            label_config: config.into(),
            elements,
            metadata: Map::new(),
        }
    }

    /// Parse a template, skipping elements that cannot be read.
    pub fn from_json(json: &str) -> Result<(Self, LoadReport), Error> {
        let raw: RawTemplate = serde_json::from_str(json)?;
        let mut report = LoadReport::default();
        let mut elements = Vec::with_capacity(raw.elements.len());

        for (index, value) in raw.elements.iter().enumerate() {
            match Element::from_value(value) {
                Ok(element) => elements.push(element),
                Err(err) => {
                    warn!("Skipping element {} of {:?}: {}", index, raw.name, err);
                    report.skipped.push((index, err.to_string()));
                }
            }
        }

        let template = LabelTemplate {
            name: raw.name,
            version: raw.version,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            label_config: raw.label_config,
            elements,
            metadata: raw.metadata,
        };
        Ok((template, report))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let elements = self
            .elements
            .iter()
            .map(|e| e.to_map().map(Value::Object))
            .collect::<Result<Vec<_>, _>>()?;

        let raw = RawTemplate {
            name: self.name.clone(),
            version: self.version.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            label_config: self.label_config.clone(),
            elements,
            metadata: self.metadata.clone(),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<(Self, LoadReport), Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let (template, report) = Self::from_json(&json)?;
        info!(
            "Loaded template {:?} from {:?}: {} elements, {} skipped",
            template.name,
            path,
            template.elements.len(),
            report.skipped.len()
        );
        Ok((template, report))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Validated label configuration for generation.
    pub fn label_config(&self) -> Result<LabelConfig, Error> {
        LabelConfig::new(
            self.label_config.width_mm,
            self.label_config.height_mm,
            self.label_config.dpi,
        )
    }

    pub fn generate(
        &self,
        substitutions: Option<&HashMap<String, String>>,
    ) -> Result<GeneratedLabel, Error> {
        let mut generator = Generator::new(self.label_config()?);
        if let Some(values) = substitutions {
            generator =
                generator.substitutions(values.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(generator.generate(&self.elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, TextElement};

    const SAVED: &str = r#"{
        "name": "Shelf label",
        "version": "1.0",
        "created_at": "2024-03-01T10:00:00",
        "updated_at": "2024-03-02T09:30:00",
        "label_config": {
            "width_mm": 50,
            "height_mm": 30,
            "dpi": 203,
            "display_unit": "mm",
            "grid": { "size_mm": 1.0, "visible": true, "snap": true }
        },
        "elements": [
            { "type": "text", "x": 2, "y": 2, "text": "Price", "font_size": 25, "font": "0" },
            { "type": "hologram", "x": 1, "y": 1 },
            { "type": "barcode", "x": 2, "y": 10, "barcode_type": "EAN13",
              "data": "5901234123457", "width": 30, "height": 12 },
            { "x": 5, "y": 5 },
            { "type": "text", "text": "no position" },
            { "type": "line", "x": 0, "y": 28, "x2": 50, "y2": 28, "thickness": 0.3, "rotation": 90.0 }
        ],
        "metadata": { "author": "store-12" }
    }"#;

    #[test]
    fn load_skips_bad_elements() {
        let (template, report) = LabelTemplate::from_json(SAVED).unwrap();
        assert_eq!(template.name, "Shelf label");
        assert_eq!(template.elements.len(), 3);
        let kinds: Vec<_> = template.elements.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![ElementKind::Text, ElementKind::Barcode, ElementKind::Line]
        );
        assert_eq!(template.elements[2].config().rotation_deg, 90);

        let skipped: Vec<usize> = report.skipped.iter().map(|(i, _)| *i).collect();
        assert_eq!(skipped, vec![1, 3, 4]);
        assert!(report.skipped[0].1.contains("hologram"));

        assert_eq!(template.label_config.grid.map(|g| g.snap), Some(true));
        assert_eq!(template.metadata["author"], "store-12");
    }

    #[test]
    fn unknown_display_unit_defaults_to_mm() {
        let json = r#"{ "label_config": { "width_mm": 40, "height_mm": 20, "display_unit": "cubits" } }"#;
        let (template, _) = LabelTemplate::from_json(json).unwrap();
        assert_eq!(template.label_config.display_unit, DisplayUnit::Millimeters);
        assert_eq!(template.label_config.dpi, 203);
        assert_eq!(template.version, TEMPLATE_VERSION);
        assert!(template.elements.is_empty());
    }

    #[test]
    fn missing_label_config_is_an_error() {
        let err = LabelTemplate::from_json(r#"{ "name": "x", "elements": [] }"#).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn json_round_trip() {
        let (template, _) = LabelTemplate::from_json(SAVED).unwrap();
        let (again, report) = LabelTemplate::from_json(&template.to_json().unwrap()).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(again, template);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.json");

        let config = LabelConfig::new(40.0, 20.0, 300).unwrap();
        let template = LabelTemplate::new(
            "Name tag",
            config,
            vec![TextElement::new(1.0, 1.0, "{{NAME}}").into()],
        );
        template.save(&path).unwrap();

        let (loaded, report) = LabelTemplate::load(&path).unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(loaded, template);
        assert_eq!(loaded.label_config().unwrap(), config);
    }

    #[test]
    fn generate_from_template() {
        let (template, _) = LabelTemplate::from_json(SAVED).unwrap();
        let label = template.generate(None).unwrap();
        assert!(label.is_complete());
        assert!(label.zpl.starts_with("^XA^CI28^PW400^LL240\n"));
        assert!(label.zpl.contains("^BEN,96,Y,N^FD5901234123457^FS"));
        assert!(label.zpl.ends_with("\n^XZ"));
    }

    #[test]
    fn invalid_template_size_fails_generation() {
        let json = r#"{ "label_config": { "width_mm": 0, "height_mm": 20 } }"#;
        let (template, _) = LabelTemplate::from_json(json).unwrap();
        assert!(matches!(template.generate(None), Err(Error::InvalidConfig(_))));
    }
}
