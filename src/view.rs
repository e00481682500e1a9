//! Rounded shadow decoration for views, rendered with tiny-skia

use image::RgbaImage;
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, Path, PathBuilder, Pattern, Pixmap, SpreadMode,
    Transform,
};

/// Control point factor approximating a quarter circle with a cubic bezier
const BEZIER_K: f32 = 0.552_284_8;

/// Number of stacked layers used to approximate the shadow blur
const SHADOW_LAYERS: u32 = 8;

/// Static shadow + fully rounded corner style, applied once when a view is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedShadow {
    /// Dark gray
    pub shadow_color: [u8; 3],
    pub shadow_radius: f32,
    pub shadow_opacity: f32,
    pub corner_radius: f32,
}

impl RoundedShadow {
    pub const SHADOW_COLOR: [u8; 3] = [85, 85, 85];
    pub const SHADOW_RADIUS: f32 = 15.0;
    pub const SHADOW_OPACITY: f32 = 0.75;

    /// Style for a view of the given height: corners rounded by half the height
    pub fn for_view(height: f32) -> Self {
        Self {
            shadow_color: Self::SHADOW_COLOR,
            shadow_radius: Self::SHADOW_RADIUS,
            shadow_opacity: Self::SHADOW_OPACITY,
            corner_radius: height / 2.0,
        }
    }

    /// Same shadow with a fixed corner radius
    pub fn with_corner_radius(self, corner_radius: f32) -> Self {
        Self {
            corner_radius,
            ..self
        }
    }

    /// Margin added on every side of a rendered view to fit the shadow
    pub fn margin(&self) -> u32 {
        self.shadow_radius.ceil().max(0.0) as u32
    }

    /// Render `img` clipped to the rounded shape on top of its shadow
    ///
    /// The result is larger than `img` by `margin()` on every side.
    pub fn render(&self, img: &RgbaImage) -> Option<RgbaImage> {
        let margin = self.margin();
        let (w, h) = (img.width(), img.height());
        let mut canvas = Pixmap::new(w + 2 * margin, h + 2 * margin)?;
        let source = pixmap_from_image(img)?;

        let (x, y) = (margin as f32, margin as f32);
        let (fw, fh) = (w as f32, h as f32);
        let radius = self.corner_radius.clamp(0.0, fw.min(fh) / 2.0);

        // Stack progressively smaller shapes so the shadow fades outward
        let [r, g, b] = self.shadow_color;
        let layer_alpha = self.shadow_opacity / SHADOW_LAYERS as f32;
        for layer in 0..SHADOW_LAYERS {
            let spread = self.shadow_radius * (1.0 - layer as f32 / SHADOW_LAYERS as f32);
            let Some(path) = rounded_rect_path(
                x - spread,
                y - spread,
                fw + 2.0 * spread,
                fh + 2.0 * spread,
                radius + spread,
            ) else {
                continue;
            };
            let mut paint = Paint::default();
            paint.set_color(Color::from_rgba8(r, g, b, (layer_alpha * 255.0).round() as u8));
            paint.anti_alias = true;
            canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }

        let path = rounded_rect_path(x, y, fw, fh, radius)?;
        let paint = Paint {
            shader: Pattern::new(
                source.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Nearest,
                1.0,
                Transform::from_translate(x, y),
            ),
            anti_alias: true,
            ..Default::default()
        };
        canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

        Some(image_from_pixmap(&canvas))
    }
}

/// Rounded rectangle built from lines and quarter-circle cubics
fn rounded_rect_path(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Option<Path> {
    let r = radius.clamp(0.0, w.min(h) / 2.0);
    let k = r * BEZIER_K;
    let (right, bottom) = (x + w, y + h);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    pb.close();
    pb.finish()
}

/// Premultiply an RgbaImage into a Pixmap
fn pixmap_from_image(img: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(img.width(), img.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(img.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Demultiply a Pixmap back into an RgbaImage
fn image_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    img
}
