use log::warn;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Resident ZPL fonts.
///
/// Font `0` is the scalable CG Triumvirate font; `A` to `H` are bitmap fonts
/// that only scale in whole multiples of their base cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ZplFont {
    #[default]
    Scalable,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSpec {
    pub code: char,
    pub display_name: &'static str,
    pub scalable: bool,
    /// Cell width in dots at 203 dpi.
    pub base_width: u32,
    /// Cell height in dots at 203 dpi.
    pub base_height: u32,
}

impl ZplFont {
    pub const ALL: [ZplFont; 9] = [
        Self::Scalable,
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
    ];

    pub fn spec(&self) -> FontSpec {
        match self {
            Self::Scalable => FontSpec {
                code: '0',
                display_name: "Font 0 (Scalable)",
                scalable: true,
                base_width: 12,
                base_height: 15,
            },
            Self::A => FontSpec {
                code: 'A',
                display_name: "Font A (9x5)",
                scalable: false,
                base_width: 5,
                base_height: 9,
            },
            Self::B => FontSpec {
                code: 'B',
                display_name: "Font B (11x7)",
                scalable: false,
                base_width: 7,
                base_height: 11,
            },
            Self::C => FontSpec {
                code: 'C',
                display_name: "Font C (18x10)",
                scalable: false,
                base_width: 10,
                base_height: 18,
            },
            Self::D => FontSpec {
                code: 'D',
                display_name: "Font D (18x10)",
                scalable: false,
                base_width: 10,
                base_height: 18,
            },
            Self::E => FontSpec {
                code: 'E',
                display_name: "Font E (28x15)",
                scalable: false,
                base_width: 15,
                base_height: 28,
            },
            Self::F => FontSpec {
                code: 'F',
                display_name: "Font F (26x13)",
                scalable: false,
                base_width: 13,
                base_height: 26,
            },
            Self::G => FontSpec {
                code: 'G',
                display_name: "Font G (60x40)",
                scalable: false,
                base_width: 40,
                base_height: 60,
            },
            Self::H => FontSpec {
                code: 'H',
                display_name: "Font H (21x13)",
                scalable: false,
                base_width: 13,
                base_height: 21,
            },
        }
    }

    pub fn code(&self) -> char {
        self.spec().code
    }

    pub fn is_scalable(&self) -> bool {
        self.spec().scalable
    }

    pub fn from_code(code: char) -> Option<Self> {
        let code = code.to_ascii_uppercase();
        Self::ALL.iter().copied().find(|font| font.code() == code)
    }

    /// Look up a font by its code string, falling back to the scalable font.
    ///
    /// Older documents stored font names or nothing at all, so anything that
    /// is not exactly one known code character maps to `0`.
    pub fn parse_or_default(code: &str) -> Self {
        let mut chars = code.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_code(c).unwrap_or_else(|| {
                warn!("Unknown font code {:?}, using scalable font 0", code);
                Self::Scalable
            }),
            _ => {
                warn!("Unknown font code {:?}, using scalable font 0", code);
                Self::Scalable
            }
        }
    }
}

impl Serialize for ZplFont {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; 4];
        serializer.serialize_str(self.code().encode_utf8(&mut buf))
    }
}

impl<'de> Deserialize<'de> for ZplFont {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Accept anything: numbers (font 0 saved as an integer) and nulls included.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(code) => Self::parse_or_default(&code),
            serde_json::Value::Number(n) => Self::parse_or_default(&n.to_string()),
            _ => Self::Scalable,
        })
    }
}
