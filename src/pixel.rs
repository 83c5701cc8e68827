//! Pixel configurations understood by the device.

/// Pixel format of a texture, render target, or client-memory pixel
/// rectangle.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum PixelConfig {
    /// 32-bit RGBA, 8 bits per channel.
    Rgba8888,
    /// 32-bit BGRA, 8 bits per channel. Upload support depends on the
    /// platform's BGRA capability.
    Bgra8888,
    /// 16-bit 5-6-5 RGB.
    Rgb565,
    /// 16-bit 4-4-4-4 RGBA.
    Rgba4444,
    /// 8-bit single-channel alpha.
    Alpha8,
    /// ETC1-compressed RGB. Not renderable, not readable back, not
    /// updatable after creation.
    Etc1,
}

impl PixelConfig {
    /// Bytes per pixel, or `None` for compressed configs where the question
    /// has no per-pixel answer.
    #[must_use]
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Rgba8888 | Self::Bgra8888 => Some(4),
            Self::Rgb565 | Self::Rgba4444 => Some(2),
            Self::Alpha8 => Some(1),
            Self::Etc1 => None,
        }
    }

    /// Whether this is a block-compressed config.
    #[must_use]
    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Etc1)
    }

    /// Size in bytes of a compressed image of the given dimensions.
    ///
    /// ETC1 packs 4x4 texel blocks into 8 bytes.
    #[must_use]
    pub fn compressed_size(self, width: i32, height: i32) -> Option<usize> {
        match self {
            Self::Etc1 => {
                let blocks_x = (width as i64 + 3) / 4;
                let blocks_y = (height as i64 + 3) / 4;
                usize::try_from(blocks_x * blocks_y * 8).ok()
            }
            _ => None,
        }
    }

    /// Whether only the alpha channel carries data (drives the sampling
    /// swizzle).
    #[must_use]
    pub fn is_alpha_only(self) -> bool {
        matches!(self, Self::Alpha8)
    }
}
