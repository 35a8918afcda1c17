use palette::Srgba;

/// The color emitted for one evaluation, `[r, g, b, a]`.
///
/// Channels are conventionally within `0.0..=1.0` but nothing here clamps them. Only the
/// conversion into 8-bit pixels does.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color4(pub [f32; 4]);

impl Color4 {
    /// Emitted when the dispatcher itself is probed.
    pub const PROBE: Color4 = Color4([1.0, 0.0, 0.0, 1.0]);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color4([r, g, b, a])
    }

    pub fn r(self) -> f32 {
        self.0[0]
    }

    pub fn g(self) -> f32 {
        self.0[1]
    }

    pub fn b(self) -> f32 {
        self.0[2]
    }

    pub fn a(self) -> f32 {
        self.0[3]
    }

    pub fn rgb(self) -> [f32; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Quantize into an 8-bit pixel, saturating out-of-range channels.
    pub fn to_rgba8(self) -> image::Rgba<u8> {
        let [r, g, b, a] = self.0;
        let quantized: Srgba<u8> = Srgba::new(r, g, b, a).into_format();
        image::Rgba([quantized.red, quantized.green, quantized.blue, quantized.alpha])
    }
}

impl From<[f32; 4]> for Color4 {
    fn from(value: [f32; 4]) -> Self {
        Color4(value)
    }
}

impl From<Color4> for [f32; 4] {
    fn from(value: Color4) -> Self {
        value.0
    }
}
