//! Receipt / print-job model.
//!
//! A [`Receipt`] is the already-rendered content a collaborator hands to a
//! printer driver: an ordered list of sections, each an ordered list of typed
//! content items. Template rendering happens upstream; this model carries only
//! resolved values. A receipt is consumed once by a driver and discarded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Horizontal alignment of printed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Character style flags for a text item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    pub underline: bool,

    #[serde(default)]
    pub double_width: bool,

    #[serde(default)]
    pub double_height: bool,
}

impl TextStyle {
    /// Plain text, no emphasis.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Bold text.
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    /// Double width and height (receipt headers).
    pub fn title() -> Self {
        Self {
            bold: true,
            double_width: true,
            double_height: true,
            underline: false,
        }
    }
}

/// Style of a horizontal separator line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Blank,
}

/// Barcode symbology, by logical name.
///
/// The protocol layer maps each symbology to the numeric id of the printer
/// dialect in use; this enum is the transport-independent name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symbology {
    UpcA,
    UpcE,
    Ean13,
    Ean8,
    Code39,
    Itf,
    Codabar,
    Code93,
    Code128,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::Ean13 => "EAN13",
            Self::Ean8 => "EAN8",
            Self::Code39 => "CODE39",
            Self::Itf => "ITF",
            Self::Codabar => "CODABAR",
            Self::Code93 => "CODE93",
            Self::Code128 => "CODE128",
        };
        write!(f, "{s}")
    }
}

/// One typed item inside a receipt section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentItem {
    /// A line of text.
    Text {
        value: String,
        #[serde(default)]
        align: Alignment,
        #[serde(default)]
        style: TextStyle,
    },

    /// A horizontal separator line.
    Line {
        #[serde(default)]
        style: LineStyle,
    },

    /// A printed barcode.
    Barcode {
        value: String,
        symbology: Symbology,
    },

    /// A printed QR code.
    QrCode {
        value: String,
        /// Module size in dots (1-16).
        size: u8,
    },

    /// A raster image loaded from a file path.
    Image { path: String },
}

impl ContentItem {
    /// Plain left-aligned text.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
            align: Alignment::Left,
            style: TextStyle::plain(),
        }
    }

    /// Centered text with a style.
    pub fn centered(value: impl Into<String>, style: TextStyle) -> Self {
        Self::Text {
            value: value.into(),
            align: Alignment::Center,
            style,
        }
    }
}

/// An ordered group of content items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    pub items: Vec<ContentItem>,
}

impl Section {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }
}

/// Print priority, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// A complete print job for one printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Target printer id (a `PeripheralConfig.id`).
    pub printer_id: String,

    #[serde(default)]
    pub priority: Priority,

    pub sections: Vec<Section>,
}

impl Receipt {
    /// Create a receipt for a printer with the given sections.
    pub fn new(printer_id: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            printer_id: printer_id.into(),
            priority: Priority::Normal,
            sections,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Total number of content items across all sections.
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_item_count() {
        let receipt = Receipt::new(
            "printer-1",
            vec![
                Section::new(vec![
                    ContentItem::centered("LOJA EXEMPLO", TextStyle::title()),
                    ContentItem::Line {
                        style: LineStyle::Dashed,
                    },
                ]),
                Section::new(vec![ContentItem::text("1x Cafe ............ R$ 5,00")]),
            ],
        );
        assert_eq!(receipt.item_count(), 3);
        assert_eq!(receipt.priority, Priority::Normal);
    }

    #[test]
    fn test_content_item_serde_tagging() {
        let item = ContentItem::Barcode {
            value: "7891000315507".to_string(),
            symbology: Symbology::Ean13,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"kind\":\"barcode\""));
        assert!(json.contains("\"EAN13\""));
        let back: ContentItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }
}
