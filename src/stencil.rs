//! Stencil renderbuffer attachments and their format metadata.

use crate::interface::RenderbufferId;

/// Internal format of a stencil renderbuffer candidate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum StencilFormatKind {
    /// `GL_STENCIL_INDEX8`.
    Stencil8,
    /// `GL_STENCIL_INDEX16`.
    Stencil16,
    /// `GL_DEPTH24_STENCIL8` (packed depth-stencil).
    Depth24Stencil8,
    /// Unsized `GL_STENCIL_INDEX`; the driver picks the bit depth, which has
    /// to be queried back after the first successful attach.
    UnsizedIndex,
}

/// A stencil format together with its (possibly not-yet-known) bit depths.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StencilFormat {
    /// The internal format used for renderbuffer storage.
    pub kind: StencilFormatKind,
    /// Stencil bits, `None` until queried for unsized formats.
    pub stencil_bits: Option<u32>,
    /// Total bits per sample including packed depth, `None` until known.
    pub total_bits: Option<u32>,
    /// Whether the format packs depth and stencil into one attachment.
    pub packed: bool,
}

impl StencilFormat {
    /// The format metadata for a sized candidate.
    #[must_use]
    pub fn sized(kind: StencilFormatKind) -> Self {
        match kind {
            StencilFormatKind::Stencil8 => Self {
                kind,
                stencil_bits: Some(8),
                total_bits: Some(8),
                packed: false,
            },
            StencilFormatKind::Stencil16 => Self {
                kind,
                stencil_bits: Some(16),
                total_bits: Some(16),
                packed: false,
            },
            StencilFormatKind::Depth24Stencil8 => Self {
                kind,
                stencil_bits: Some(8),
                total_bits: Some(32),
                packed: true,
            },
            StencilFormatKind::UnsizedIndex => Self {
                kind,
                stencil_bits: None,
                total_bits: None,
                packed: false,
            },
        }
    }
}

/// A renderbuffer sized and formatted for use as a stencil attachment.
///
/// `renderbuffer == None` is legal only for a wrapped (externally owned)
/// stencil buffer whose bit depth is still tracked for allocation decisions.
#[derive(Debug)]
pub struct StencilBuffer {
    /// The owned renderbuffer object, if any.
    pub renderbuffer: Option<RenderbufferId>,
    /// Whether the renderbuffer is owned by external code (never deleted
    /// here).
    pub wrapped: bool,
    /// Storage width in pixels.
    pub width: i32,
    /// Storage height in pixels.
    pub height: i32,
    /// Sample count; 0 means single-sampled.
    pub sample_count: u32,
    /// Format metadata; bit depths may be filled in after first attach.
    pub format: StencilFormat,
}

impl StencilBuffer {
    /// Stencil bits per sample, 0 while unknown.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.format.stencil_bits.unwrap_or(0)
    }

    /// Approximate GPU footprint of the attachment.
    ///
    /// Uses 64-bit intermediates so large multisampled surfaces don't
    /// overflow.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        let samples = u64::from(self.sample_count.max(1));
        let total_bits = u64::from(self.format.total_bits.unwrap_or(0));
        self.width as u64 * self.height as u64 * total_bits * samples / 8
    }
}
