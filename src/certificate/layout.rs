//! Page geometry. All offsets are PDF points measured down from the top edge
//! unless noted; `y` helpers convert them to PDF's bottom-up coordinates.

use super::CertificateKind;

/// A4 width in points.
pub const PAGE_WIDTH: f32 = 595.28;
/// A4 height in points.
pub const PAGE_HEIGHT: f32 = 841.89;

pub const MARGIN_LEFT: f32 = 50.0;

pub const WATERMARK_WIDTH: f32 = 300.0;
pub const WATERMARK_HEIGHT: f32 = 180.0;
/// Fill alpha of the centred watermark, out of 255.
pub const WATERMARK_ALPHA: u8 = 100;
pub const CORNER_LOGO_SIZE: f32 = 50.0;

pub const TRACKING_OFFSET: f32 = 50.0;
pub const HEADER_OFFSET: f32 = 50.0;
pub const INTRO_LINE_OFFSET: f32 = 140.0;

/// Top of the boilerplate frame.
pub const PARAGRAPH_TOP_OFFSET: f32 = 160.0;
/// Bottom of the boilerplate frame.
pub const PARAGRAPH_BOTTOM_OFFSET: f32 = 220.0;
pub const PARAGRAPH_LEADING: f32 = 12.0;

pub const FIELD_SPACING: f32 = 20.0;
/// Footer baseline, measured from the bottom edge.
pub const FOOTER_BASELINE: f32 = 50.0;

pub const HEADER_SIZE: f32 = 14.0;
pub const TITLE_SIZE: f32 = 16.0;
pub const BODY_SIZE: f32 = 10.0;

pub const HEADER_TEXT: &str = "GOVERNMENT OF KERALA";
pub const FOOTER_TEXT: &str = "NB: This certificate is for demonstration purposes.";

/// Convert an offset from the top edge to a PDF y coordinate.
pub fn y(offset_from_top: f32) -> f32 {
    PAGE_HEIGHT - offset_from_top
}

/// Title baseline offset for a kind.
pub fn title_offset(kind: CertificateKind) -> f32 {
    match kind {
        CertificateKind::Birth | CertificateKind::Death => 120.0,
        CertificateKind::Income | CertificateKind::Land => 70.0,
    }
}

/// Offset of the first field line for a kind.
pub fn field_base_offset(kind: CertificateKind) -> f32 {
    match kind {
        CertificateKind::Birth | CertificateKind::Death => 300.0,
        CertificateKind::Income | CertificateKind::Land => 200.0,
    }
}

/// Baseline y of the `index`-th field line.
pub fn field_y(kind: CertificateKind, index: usize) -> f32 {
    y(field_base_offset(kind) + index as f32 * FIELD_SPACING)
}

/// Frame available to the boilerplate paragraph.
pub fn paragraph_frame() -> Frame {
    Frame {
        x: MARGIN_LEFT,
        width: PAGE_WIDTH - 2.0 * MARGIN_LEFT,
        top: y(PARAGRAPH_TOP_OFFSET),
        bottom: y(PARAGRAPH_BOTTOM_OFFSET),
    }
}

/// Axis-aligned text frame in PDF coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub width: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Frame {
    /// Number of lines of the given leading whose baselines fit in the frame.
    pub fn line_capacity(&self, font_size: f32, leading: f32) -> usize {
        let usable = self.top - self.bottom - font_size;
        if usable < 0.0 {
            return 0;
        }
        (usable / leading).floor() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_per_kind_group() {
        assert_eq!(title_offset(CertificateKind::Birth), 120.0);
        assert_eq!(title_offset(CertificateKind::Death), 120.0);
        assert_eq!(title_offset(CertificateKind::Income), 70.0);
        assert_eq!(title_offset(CertificateKind::Land), 70.0);

        assert_eq!(field_base_offset(CertificateKind::Birth), 300.0);
        assert_eq!(field_base_offset(CertificateKind::Death), 300.0);
        assert_eq!(field_base_offset(CertificateKind::Income), 200.0);
        assert_eq!(field_base_offset(CertificateKind::Land), 200.0);
    }

    #[test]
    fn test_field_lines_step_down() {
        let first = field_y(CertificateKind::Land, 0);
        let second = field_y(CertificateKind::Land, 1);
        assert_eq!(first, PAGE_HEIGHT - 200.0);
        assert_eq!(first - second, FIELD_SPACING);
    }

    #[test]
    fn test_fields_clear_the_boilerplate_frame() {
        let frame = paragraph_frame();
        assert!(field_y(CertificateKind::Birth, 0) < frame.bottom);
        assert!(field_y(CertificateKind::Income, 0) > FOOTER_BASELINE);
    }

    #[test]
    fn test_frame_line_capacity() {
        let frame = paragraph_frame();
        // 60pt frame, 10pt text, 12pt leading
        assert_eq!(frame.line_capacity(BODY_SIZE, PARAGRAPH_LEADING), 5);
        let tiny = Frame {
            x: 0.0,
            width: 100.0,
            top: 5.0,
            bottom: 0.0,
        };
        assert_eq!(tiny.line_capacity(BODY_SIZE, PARAGRAPH_LEADING), 0);
    }
}
