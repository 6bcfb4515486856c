// src/marking.rs
//
// Marking records and the delimited text codec shared by layout files
// and the grid editor state.
//
// Format: ten comma-joined fields, text first, font last. Records written
// before font support existed carry nine fields; the tenth defaults. The
// text field is NOT escaped: a comma inside it shifts every following
// field and the record no longer decodes to what was saved. Long-standing
// file-format limitation, asserted by the tests below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fonts the device firmware ships.
pub const FONT_CHOICES: &[&str] = &["F1", "F2", "F3"];

/// Font used when a record or a new item does not name one.
pub const DEFAULT_FONT: &str = "F1";

/// A layout: cell index (`y * columns + x`) to marking record.
/// BTreeMap so payload generation and file output are deterministic in
/// key order.
pub type Layout = BTreeMap<u32, MarkingItem>;

/// One placed text annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkingItem {
    /// Text content to mark.
    pub text: String,
    /// X position in grid cells.
    pub x: i32,
    /// Y position in grid cells.
    pub y: i32,
    /// Marking stroke height.
    pub height: i32,
    /// Rotation in degrees, [0, 360).
    pub angle: f32,
    /// Character spacing.
    pub spacing: f32,
    /// Width scale in percent.
    pub width_percentage: f32,
    /// Marking force, [0, 99].
    pub force: i32,
    /// Marking quality, [1, 99].
    pub quality: i32,
    /// Font identifier, one of `FONT_CHOICES`.
    pub font: String,
}

impl MarkingItem {
    /// New item with numeric domains sanitized. The editor always creates
    /// and updates items through here; struct literals bypass the clamps.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        text: String,
        x: i32,
        y: i32,
        height: i32,
        angle: f32,
        spacing: f32,
        width_percentage: f32,
        force: i32,
        quality: i32,
        font: String,
    ) -> Self {
        Self {
            text,
            x,
            y,
            height,
            angle,
            spacing,
            width_percentage,
            force,
            quality,
            font,
        }
        .sanitized()
    }

    /// Re-apply the domain clamps after an edit.
    pub fn sanitized(mut self) -> Self {
        self.angle = normalize_angle(self.angle);
        self.force = self.force.clamp(0, 99);
        self.quality = self.quality.clamp(1, 99);
        self
    }

    /// Cell index for the item's coordinates on a grid of `columns`.
    pub fn cell_index(&self, columns: u32) -> u32 {
        self.y as u32 * columns + self.x as u32
    }

    /// Ten comma-joined fields in fixed order.
    pub fn encode(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{}",
            self.text,
            self.x,
            self.y,
            self.height,
            format_float(self.angle),
            format_float(self.spacing),
            format_float(self.width_percentage),
            self.force,
            self.quality,
            self.font
        )
    }

    /// Parse a record line. Fewer than nine fields or an unparseable
    /// numeric field is a `MalformedRecord`; a missing font field decodes
    /// as `DEFAULT_FONT` so pre-font files keep loading.
    pub fn decode(line: &str) -> Result<Self, MalformedRecord> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 9 {
            return Err(MalformedRecord::new(line, "fewer than 9 fields"));
        }

        Ok(Self {
            text: parts[0].to_string(),
            x: parse_field(line, parts[1], "x")?,
            y: parse_field(line, parts[2], "y")?,
            height: parse_field(line, parts[3], "height")?,
            angle: parse_field(line, parts[4], "angle")?,
            spacing: parse_field(line, parts[5], "spacing")?,
            width_percentage: parse_field(line, parts[6], "width")?,
            force: parse_field(line, parts[7], "force")?,
            quality: parse_field(line, parts[8], "quality")?,
            font: parts
                .get(9)
                .map(|s| s.to_string())
                .unwrap_or_else(|| DEFAULT_FONT.to_string()),
        })
    }
}

/// A persisted record line that could not be decoded. Loaders skip the
/// line and keep the rest of the file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MalformedRecord {
    pub line: String,
    pub reason: String,
}

impl MalformedRecord {
    fn new(line: &str, reason: impl Into<String>) -> Self {
        Self {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed marking record ({}): {}", self.reason, self.line)
    }
}

impl std::error::Error for MalformedRecord {}

/// Normalize an angle into [0, 360).
pub fn normalize_angle(angle: f32) -> f32 {
    angle.rem_euclid(360.0)
}

/// Float form used by the record and wire formats: shortest decimal, but
/// whole values keep one decimal place (60 -> "60.0"). The firmware and
/// old layout files both expect a period decimal point; Rust formatting
/// never localises, which is exactly what the device needs.
pub(crate) fn format_float(value: f32) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn parse_field<T: std::str::FromStr>(
    line: &str,
    value: &str,
    field: &str,
) -> Result<T, MalformedRecord> {
    value
        .trim()
        .parse()
        .map_err(|_| MalformedRecord::new(line, format!("bad {}: {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MarkingItem {
        MarkingItem::new(
            "SN-2041".to_string(),
            12,
            3,
            5,
            90.0,
            0.5,
            60.0,
            50,
            80,
            "F2".to_string(),
        )
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let item = sample();
        let encoded = item.encode();
        assert_eq!(encoded, "SN-2041,12,3,5,90.0,0.5,60.0,50,80,F2");
        assert_eq!(MarkingItem::decode(&encoded).unwrap(), item);
    }

    #[test]
    fn test_decode_without_font_uses_default() {
        let item = MarkingItem::decode("Batch 7,1,2,20,50.0,0.0,0.0,99,1").unwrap();
        assert_eq!(item.font, DEFAULT_FONT);
        assert_eq!(item.text, "Batch 7");
        assert_eq!(item.height, 20);
    }

    #[test]
    fn test_decode_too_few_fields() {
        let err = MarkingItem::decode("Hello,1,2").unwrap_err();
        assert!(err.reason.contains("fewer than 9"));
    }

    #[test]
    fn test_decode_bad_numeric_field() {
        let err = MarkingItem::decode("Hello,1,two,5,0.0,0.0,60.0,50,99,F1").unwrap_err();
        assert!(err.reason.contains("bad y"));
    }

    // Known format limitation: a comma inside the text shifts every field.
    #[test]
    fn test_comma_in_text_corrupts_record() {
        let mut item = sample();
        item.text = "A,B".to_string();
        let encoded = item.encode();
        let survived = match MarkingItem::decode(&encoded) {
            Ok(decoded) => decoded == item,
            Err(_) => false,
        };
        assert!(!survived);
    }

    #[test]
    fn test_new_clamps_domains() {
        let item = MarkingItem::new(
            "T".to_string(),
            0,
            0,
            5,
            0.0,
            0.0,
            60.0,
            120,
            0,
            DEFAULT_FONT.to_string(),
        );
        assert_eq!(item.force, 99);
        assert_eq!(item.quality, 1);
    }

    #[test]
    fn test_angle_normalized() {
        assert_eq!(normalize_angle(450.0), 90.0);
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(MarkingItem::new(
            "T".to_string(),
            0,
            0,
            5,
            360.0,
            0.0,
            60.0,
            50,
            99,
            DEFAULT_FONT.to_string(),
        )
        .angle, 0.0);
    }

    #[test]
    fn test_format_float_keeps_one_decimal_on_whole_values() {
        assert_eq!(format_float(60.0), "60.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(45.5), "45.5");
        assert_eq!(format_float(-4.0), "-4.0");
    }

    #[test]
    fn test_cell_index() {
        let item = sample();
        assert_eq!(item.cell_index(60), 3 * 60 + 12);
    }

    #[test]
    fn test_default_font_is_a_choice() {
        assert!(FONT_CHOICES.contains(&DEFAULT_FONT));
    }
}
