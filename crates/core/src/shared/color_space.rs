/// An RGBA colour with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

/// How colour components are interpreted before quantising to 8 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorModel {
    /// Components are already device values; quantised linearly.
    DeviceRgb,
    /// Components are linear light; encoded with the sRGB transfer curve.
    LinearRgb,
}

const LUT_SIZE: usize = 4096;

/// Converts [`Color`]s to premultiplied BGRA bytes.
///
/// Building the lookup table is the expensive part, so a surface stream
/// builds one colour space up front and shares it across every frame.
#[derive(Debug)]
pub struct ColorSpace {
    model: ColorModel,
    lut: Vec<u8>,
}

impl ColorSpace {
    pub fn new(model: ColorModel) -> Self {
        let lut = (0..LUT_SIZE)
            .map(|i| {
                let c = i as f64 / (LUT_SIZE - 1) as f64;
                let encoded = match model {
                    ColorModel::DeviceRgb => c,
                    ColorModel::LinearRgb => srgb_encode(c),
                };
                (encoded * 255.0).round() as u8
            })
            .collect();
        Self { model, lut }
    }

    pub fn device_rgb() -> Self {
        Self::new(ColorModel::DeviceRgb)
    }

    pub fn linear_rgb() -> Self {
        Self::new(ColorModel::LinearRgb)
    }

    pub fn model(&self) -> ColorModel {
        self.model
    }

    /// Quantises one colour component (alpha excluded).
    pub fn encode_component(&self, component: f64) -> u8 {
        let c = if component.is_nan() {
            0.0
        } else {
            component.clamp(0.0, 1.0)
        };
        self.lut[(c * (LUT_SIZE - 1) as f64).round() as usize]
    }

    /// Returns `[b, g, r, a]` with colour channels premultiplied by alpha.
    pub fn to_premultiplied_bgra(&self, color: Color) -> [u8; 4] {
        let alpha = if color.alpha.is_nan() {
            0.0
        } else {
            color.alpha.clamp(0.0, 1.0)
        };
        let premultiply = |c: f64| (self.encode_component(c) as f64 * alpha).round() as u8;
        [
            premultiply(color.blue),
            premultiply(color.green),
            premultiply(color.red),
            (alpha * 255.0).round() as u8,
        ]
    }
}

fn srgb_encode(linear: f64) -> f64 {
    if linear <= 0.003_130_8 {
        linear * 12.92
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}
