//! Rectangle types for the two coordinate systems this layer straddles:
//! client rectangles are top-down (row 0 at the top), GL device rectangles
//! are bottom-up (origin at the window's bottom-left).

/// Vertical origin of a surface.
///
/// Render targets are kept in GL's bottom-up orientation so external code can
/// draw into them without flipping; plain textures are top-down to match
/// client pixel uploads.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SurfaceOrigin {
    /// Row 0 is the top row (client convention).
    TopLeft,
    /// Row 0 is the bottom row (GL convention).
    BottomLeft,
}

/// An integer rectangle in top-down client coordinates.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge (top-down).
    pub top: i32,
    /// Width; non-positive means empty.
    pub width: i32,
    /// Height; non-positive means empty.
    pub height: i32,
}

impl Rect {
    /// Rectangle at the origin with the given size.
    #[must_use]
    pub fn from_wh(width: i32, height: i32) -> Self {
        Self { left: 0, top: 0, width, height }
    }

    /// Rectangle from position and size.
    #[must_use]
    pub fn from_xywh(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    /// Whether the rectangle contains no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Exclusive right edge.
    #[must_use]
    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    /// Exclusive bottom edge (top-down).
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    /// Intersection with `other`, or `None` if they don't overlap.
    #[must_use]
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if left < right && top < bottom {
            Some(Rect { left, top, width: right - left, height: bottom - top })
        } else {
            None
        }
    }

    /// Smallest rectangle containing both `self` and `other`. An empty
    /// operand contributes nothing.
    #[must_use]
    pub fn join(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect { left, top, width: right - left, height: bottom - top }
    }

    /// Whether `other` lies entirely within `self`.
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left <= other.left
            && self.top <= other.top
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }
}

/// An integer rectangle in GL device coordinates: `left`/`bottom` measured
/// from the window's bottom-left corner. Used for viewports, scissors, blits
/// and `ReadPixels`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct GlRect {
    /// Left edge.
    pub left: i32,
    /// Bottom edge (bottom-up).
    pub bottom: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl GlRect {
    /// Rectangle at the device origin with the given size.
    #[must_use]
    pub fn from_wh(width: i32, height: i32) -> Self {
        Self { left: 0, bottom: 0, width, height }
    }

    /// Convert a client rectangle expressed relative to a surface into
    /// device coordinates within that surface's viewport.
    ///
    /// Top-down surfaces store client row 0 at device row 0, so their rects
    /// pass through unflipped; bottom-up surfaces store client row 0 at the
    /// device top, so their rects flip across the viewport height.
    #[must_use]
    pub fn relative_to(viewport: GlRect, rect: Rect, origin: SurfaceOrigin) -> Self {
        let bottom = match origin {
            SurfaceOrigin::TopLeft => viewport.bottom + rect.top,
            SurfaceOrigin::BottomLeft => {
                viewport.bottom + (viewport.height - rect.top - rect.height)
            }
        };
        Self {
            left: viewport.left + rect.left,
            bottom,
            width: rect.width,
            height: rect.height,
        }
    }

    /// Whether `other` lies entirely within `self`.
    #[must_use]
    pub fn contains(&self, other: &GlRect) -> bool {
        self.left <= other.left
            && self.bottom <= other.bottom
            && self.left + self.width >= other.left + other.width
            && self.bottom + self.height >= other.bottom + other.height
    }
}
