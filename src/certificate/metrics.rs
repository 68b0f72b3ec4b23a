//! Helvetica metrics and WinAnsi text encoding for the standard Type1 fonts.

/// Advance widths (1/1000 em) for WinAnsi codes 32..=126.
const HELVETICA_WIDTHS: &[u16] = &[
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: &[u16] = &[
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const FALLBACK_WIDTH: u16 = 556;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    /// Name under which the font is registered in the page resources.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }

    fn widths(&self) -> &'static [u16] {
        match self {
            Font::Regular => HELVETICA_WIDTHS,
            Font::Bold => HELVETICA_BOLD_WIDTHS,
        }
    }

    fn glyph_width(&self, code: u8) -> u16 {
        code.checked_sub(32)
            .and_then(|i| self.widths().get(i as usize))
            .copied()
            .unwrap_or(FALLBACK_WIDTH)
    }

    /// Width in points of `text` set at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|code| u32::from(self.glyph_width(code)))
            .sum();
        units as f32 * size / 1000.0
    }
}

/// Encode text as WinAnsi bytes. Control characters become spaces and
/// characters outside the encoding become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            ' '..='~' => ch as u8,
            '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            c if c.is_control() => b' ',
            _ => b'?',
        })
        .collect()
}

/// A wrapped line of a justified paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphLine {
    pub text: String,
    /// Extra space added to each inter-word gap (the PDF `Tw` operand).
    pub word_spacing: f32,
}

/// Greedy word wrap to `width`, justifying every line but the last.
pub fn justify(text: &str, font: Font, size: f32, width: f32) -> Vec<ParagraphLine> {
    let space = font.text_width(" ", size);
    let mut lines: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = font.text_width(word, size);
        let needed = if current.is_empty() {
            word_width
        } else {
            current_width + space + word_width
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = word_width;
        } else {
            current_width = needed;
        }
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let last = lines.len().saturating_sub(1);
    lines
        .into_iter()
        .enumerate()
        .map(|(i, words)| {
            let text = words.join(" ");
            let gaps = words.len().saturating_sub(1);
            let word_spacing = if i == last || gaps == 0 {
                0.0
            } else {
                ((width - font.text_width(&text, size)) / gaps as f32).max(0.0)
            };
            ParagraphLine { text, word_spacing }
        })
        .collect()
}
