//! Draws a certificate onto a single A4 page.
//!
//! The PDF object graph is assembled directly with `lopdf`: two standard
//! Type1 fonts, the letterhead as an image XObject, one ExtGState for the
//! translucent watermark and one content stream.

use std::fs;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use rand::Rng;
use thiserror::Error;

use super::layout::{self, Frame};
use super::metrics::{encode_win_ansi, justify, Font};
use super::{CertificateTemplate, FilledField};

pub const TRACKING_MIN: u32 = 100_000;
pub const TRACKING_MAX: u32 = 999_999;

/// Letterheads larger than this are downscaled before embedding.
const LETTERHEAD_MAX_PIXELS: u32 = 1200;

const WATERMARK_STATE: &str = "GS1";
const LETTERHEAD_XOBJECT: &str = "Im1";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to read letterhead image {}: {source}", .path.display())]
    LetterheadIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode letterhead image {}: {source}", .path.display())]
    LetterheadDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode PDF: {0}")]
    Encode(String),
}

/// A finished certificate.
#[derive(Debug, Clone)]
pub struct RenderedCertificate {
    pub pdf: Vec<u8>,
    pub tracking_number: u32,
}

/// Stateless apart from the letterhead location, which is re-read on every
/// render so a replaced image takes effect without a restart.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    letterhead: PathBuf,
}

impl Synthesizer {
    pub fn new(letterhead: impl Into<PathBuf>) -> Self {
        Self {
            letterhead: letterhead.into(),
        }
    }

    /// Render with a fresh random tracking number.
    pub fn render(
        &self,
        template: Option<&CertificateTemplate>,
        fields: &[FilledField],
    ) -> Result<RenderedCertificate, RenderError> {
        let tracking_number = rand::thread_rng().gen_range(TRACKING_MIN..=TRACKING_MAX);
        self.render_with_tracking(template, fields, tracking_number)
    }

    /// Render with a caller-chosen tracking number.
    ///
    /// A `None` template yields the letterhead, tracking number, header and
    /// footer only.
    pub fn render_with_tracking(
        &self,
        template: Option<&CertificateTemplate>,
        fields: &[FilledField],
        tracking_number: u32,
    ) -> Result<RenderedCertificate, RenderError> {
        let letterhead = Letterhead::load(&self.letterhead)?;

        let mut page = PageBuilder::default();
        page.letterhead();
        page.text(
            Font::Bold,
            10.0,
            layout::MARGIN_LEFT,
            layout::y(layout::TRACKING_OFFSET),
            &format!("KEYNO: {tracking_number}"),
        );
        page.centered(
            Font::Bold,
            layout::HEADER_SIZE,
            layout::y(layout::HEADER_OFFSET),
            layout::HEADER_TEXT,
        );

        if let Some(template) = template {
            page.centered(
                Font::Bold,
                layout::TITLE_SIZE,
                layout::y(layout::title_offset(template.kind)),
                template.title,
            );
            if let Some(paragraph) = &template.boilerplate {
                page.justified(paragraph, layout::paragraph_frame());
            }
            if let Some(intro) = template.intro_line {
                page.text(
                    Font::Regular,
                    layout::BODY_SIZE,
                    layout::MARGIN_LEFT,
                    layout::y(layout::INTRO_LINE_OFFSET),
                    intro,
                );
            }
            for (i, field) in fields.iter().enumerate() {
                page.text(
                    Font::Regular,
                    layout::BODY_SIZE,
                    layout::MARGIN_LEFT,
                    layout::field_y(template.kind, i),
                    &field.line(),
                );
            }
        }

        page.text(
            Font::Regular,
            layout::BODY_SIZE,
            layout::MARGIN_LEFT,
            layout::FOOTER_BASELINE,
            layout::FOOTER_TEXT,
        );

        let title = template.map(|t| t.title).unwrap_or("CERTIFICATE");
        let pdf = assemble(page.finish(), &letterhead, title)?;
        Ok(RenderedCertificate {
            pdf,
            tracking_number,
        })
    }
}

/// Decoded letterhead pixels, split into colour and alpha planes.
struct Letterhead {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl Letterhead {
    fn load(path: &Path) -> Result<Self, RenderError> {
        let bytes = fs::read(path).map_err(|source| RenderError::LetterheadIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut image =
            image::load_from_memory(&bytes).map_err(|source| RenderError::LetterheadDecode {
                path: path.to_path_buf(),
                source,
            })?;
        let (width, height) = image.dimensions();
        if width > LETTERHEAD_MAX_PIXELS || height > LETTERHEAD_MAX_PIXELS {
            image = image.thumbnail(LETTERHEAD_MAX_PIXELS, LETTERHEAD_MAX_PIXELS);
        }

        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        let alpha = alpha.iter().any(|&a| a < u8::MAX).then_some(alpha);

        Ok(Self {
            width,
            height,
            rgb,
            alpha,
        })
    }

    fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if let Some(alpha) = &self.alpha {
            let smask_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => self.width as i64,
                    "Height" => self.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha.clone(),
            ));
            dict.set("SMask", smask_id);
        }
        doc.add_object(Stream::new(dict, self.rgb.clone()))
    }
}

/// Accumulates the content stream operations of the page.
#[derive(Default)]
struct PageBuilder {
    operations: Vec<Operation>,
}

impl PageBuilder {
    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn image(&mut self, x: f32, y: f32, width: f32, height: f32, translucent: bool) {
        self.op("q", vec![]);
        if translucent {
            self.op("gs", vec![WATERMARK_STATE.into()]);
        }
        self.op(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        );
        self.op("Do", vec![LETTERHEAD_XOBJECT.into()]);
        self.op("Q", vec![]);
    }

    fn letterhead(&mut self) {
        self.image(
            (layout::PAGE_WIDTH - layout::WATERMARK_WIDTH) / 2.0,
            (layout::PAGE_HEIGHT - layout::WATERMARK_HEIGHT) / 2.0,
            layout::WATERMARK_WIDTH,
            layout::WATERMARK_HEIGHT,
            true,
        );
        self.image(
            layout::MARGIN_LEFT,
            layout::y(layout::CORNER_LOGO_SIZE + layout::TRACKING_OFFSET),
            layout::CORNER_LOGO_SIZE,
            layout::CORNER_LOGO_SIZE,
            false,
        );
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.op("BT", vec![]);
        self.op("Tf", vec![font.resource_name().into(), size.into()]);
        self.op("Td", vec![x.into(), y.into()]);
        self.op("Tj", vec![Object::string_literal(encode_win_ansi(text))]);
        self.op("ET", vec![]);
    }

    fn centered(&mut self, font: Font, size: f32, y: f32, text: &str) {
        let x = (layout::PAGE_WIDTH - font.text_width(text, size)) / 2.0;
        self.text(font, size, x, y, text);
    }

    fn justified(&mut self, paragraph: &str, frame: Frame) {
        let font = Font::Regular;
        let size = layout::BODY_SIZE;
        let lines = justify(paragraph, font, size, frame.width);
        let capacity = frame.line_capacity(size, layout::PARAGRAPH_LEADING);
        if lines.len() > capacity {
            log::warn!(
                "Paragraph needs {} lines but the frame holds {}; truncating",
                lines.len(),
                capacity
            );
        }

        // Tw is graphics state, so q/Q keeps it from leaking into later text
        self.op("q", vec![]);
        for (i, line) in lines.iter().take(capacity).enumerate() {
            let baseline = frame.top - size - i as f32 * layout::PARAGRAPH_LEADING;
            self.op("BT", vec![]);
            self.op("Tf", vec![font.resource_name().into(), size.into()]);
            self.op("Tw", vec![line.word_spacing.into()]);
            self.op("Td", vec![frame.x.into(), baseline.into()]);
            self.op("Tj", vec![Object::string_literal(encode_win_ansi(&line.text))]);
            self.op("ET", vec![]);
        }
        self.op("Q", vec![]);
    }

    fn finish(self) -> Vec<Operation> {
        self.operations
    }
}

fn font_object(font: Font) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn assemble(
    operations: Vec<Operation>,
    letterhead: &Letterhead,
    title: &str,
) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_object(Font::Regular));
    let bold_id = doc.add_object(font_object(Font::Bold));
    let image_id = letterhead.embed(&mut doc);
    let alpha = f32::from(layout::WATERMARK_ALPHA) / 255.0;

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource_name() => regular_id,
            Font::Bold.resource_name() => bold_id,
        },
        "XObject" => dictionary! {
            LETTERHEAD_XOBJECT => image_id,
        },
        "ExtGState" => dictionary! {
            WATERMARK_STATE => dictionary! {
                "Type" => "ExtGState",
                "ca" => alpha,
                "CA" => alpha,
            },
        },
    });

    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), layout::PAGE_WIDTH.into(), layout::PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_win_ansi(title)),
        "Producer" => Object::string_literal(concat!("citizen-certificate-server ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Info", info_id);

    doc.compress();
    let mut pdf = Vec::new();
    doc.save_to(&mut pdf)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(pdf)
}
