// src/io/mb3/codec.rs
//
// Payload construction for the MB3 file-write protocol.
//
// The device ingests a marking file: a fixed serial/config preamble
// followed by one TEXT line per marking, every line CRLF-terminated. The
// firmware parses a fixed numeric format with a period decimal point, no
// matter what locale the operator's machine runs.

use once_cell::sync::Lazy;

use crate::marking::{format_float, Layout, MarkingItem};

/// Device TCP port. The MB3 listens on the telnet port.
pub const DEVICE_PORT: u16 = 23;

/// Fixed serial/config preamble understood by the device firmware. Sent
/// verbatim, never interpreted on this side.
pub const SERIAL_HEADER: &str = "//#Serial,0,1000,001,1,1,MAX,8:30,E,0,1000,001,1,1,MAX,8:30,E,0,1000,001,1,1,MAX,8:30,E\r\n";

/// Target path on the device filesystem.
pub const DEVICE_FILE_PATH: &str = "1:FILE/000.txt";

/// Status query command.
pub const STATUS_COMMAND: &str = "@inf\r\n";

/// One TEXT line for a marking record, no terminator.
pub fn text_line(item: &MarkingItem) -> String {
    format!(
        "TEXT,{},H{},W{},x{:.3},y{:.3},A{},p{:.3},f{},s{},\"{}\"",
        item.font,
        item.height,
        format_float(item.width_percentage),
        item.x as f32,
        item.y as f32,
        format_float(item.angle),
        item.spacing,
        item.force,
        item.quality,
        item.text
    )
}

/// Full marking payload for a layout: the serial header, one TEXT line
/// per item in cell-index order, CRLF after every line. An empty layout
/// still carries the trailing CRLF after the header; files on devices in
/// the field were written that way and the firmware tolerates it.
pub fn build_payload(layout: &Layout) -> String {
    let lines: Vec<String> = layout.values().map(text_line).collect();
    format!("{}{}\r\n", SERIAL_HEADER, lines.join("\r\n"))
}

/// Payload byte length as eight zero-padded lowercase hex digits, the
/// length prefix the `@f_wfile` announcement carries.
pub fn hex_length(payload: &str) -> String {
    hex::encode((payload.len() as u32).to_be_bytes())
}

/// File-write announcement for a payload of the given exact byte length.
pub fn file_write_command(payload: &str) -> String {
    format!("@f_wfile{}\"{}\"\r\n", hex_length(payload), DEVICE_FILE_PATH)
}

/// Fixed connectivity-test payload: one known-good marking line the
/// device will accept on any firmware. Used when the operator asks for a
/// transmission test without a layout.
pub static TEST_PAYLOAD: Lazy<String> = Lazy::new(|| {
    format!(
        "{}TEXT,F1,H10.0,W60,x0.000,y10.000,A0.00,p8.000,f0,s50,\"0123456789\"\r\n",
        SERIAL_HEADER
    )
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marking::Layout;

    // Bypasses the sanitizing constructor on purpose: historical files
    // carry quality=100 records and the wire format passes them through.
    fn item(text: &str, x: i32, y: i32) -> MarkingItem {
        MarkingItem {
            text: text.to_string(),
            x,
            y,
            height: 5,
            angle: 0.0,
            spacing: 0.0,
            width_percentage: 60.0,
            force: 50,
            quality: 100,
            font: "F1".to_string(),
        }
    }

    #[test]
    fn test_text_line_exact_format() {
        assert_eq!(
            text_line(&item("AB", 0, 0)),
            "TEXT,F1,H5,W60.0,x0.000,y0.000,A0.0,p0.000,f50,s100,\"AB\""
        );
    }

    #[test]
    fn test_single_item_payload_exact() {
        let mut layout = Layout::new();
        layout.insert(0, item("AB", 0, 0));
        assert_eq!(
            build_payload(&layout),
            format!(
                "{}TEXT,F1,H5,W60.0,x0.000,y0.000,A0.0,p0.000,f50,s100,\"AB\"\r\n",
                SERIAL_HEADER
            )
        );
    }

    #[test]
    fn test_payload_shape() {
        let mut layout = Layout::new();
        layout.insert(0, item("AB", 0, 0));
        layout.insert(61, item("CD", 1, 1));
        let payload = build_payload(&layout);

        assert!(payload.starts_with(SERIAL_HEADER));
        assert_eq!(payload.matches("TEXT,").count(), 2);
        assert!(payload.ends_with("\r\n"));
        // Every line CRLF-terminated: header + 2 items.
        assert_eq!(payload.matches("\r\n").count(), 3);
    }

    #[test]
    fn test_payload_orders_by_cell_index() {
        let mut layout = Layout::new();
        layout.insert(120, item("SECOND", 0, 2));
        layout.insert(5, item("FIRST", 5, 0));
        let payload = build_payload(&layout);
        let first = payload.find("FIRST").unwrap();
        let second = payload.find("SECOND").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_empty_layout_payload() {
        let payload = build_payload(&Layout::new());
        assert_eq!(payload, format!("{}\r\n", SERIAL_HEADER));
    }

    #[test]
    fn test_hex_length_zero_padded_lowercase() {
        assert_eq!(hex_length("abc"), "00000003");
        let payload = "x".repeat(0x1b3);
        assert_eq!(hex_length(&payload), "000001b3");
    }

    #[test]
    fn test_hex_length_matches_payload_bytes() {
        let mut layout = Layout::new();
        layout.insert(0, item("AB", 0, 0));
        let payload = build_payload(&layout);
        let declared = u32::from_str_radix(&hex_length(&payload), 16).unwrap();
        assert_eq!(declared as usize, payload.len());
    }

    #[test]
    fn test_file_write_command() {
        let payload = "x".repeat(0x5b);
        assert_eq!(
            file_write_command(&payload),
            "@f_wfile0000005b\"1:FILE/000.txt\"\r\n"
        );
    }

    #[test]
    fn test_test_payload_fixed_line() {
        assert!(TEST_PAYLOAD.starts_with(SERIAL_HEADER));
        assert!(TEST_PAYLOAD.ends_with("TEXT,F1,H10.0,W60,x0.000,y10.000,A0.00,p8.000,f0,s50,\"0123456789\"\r\n"));
    }
}
