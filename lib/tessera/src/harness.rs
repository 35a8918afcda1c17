//! Support for a host test harness: inverting encodings, rendering and comparing images.
use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};

use crate::catalog::{Catalog, CatalogError};
use crate::color::Color4;
use crate::dispatch::{evaluate, Selector};
use crate::param::Encoding;

/// The lanes recovered from an emitted color.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub selector: Selector,
    pub encoding: Encoding,
    pub lanes: Vec<f32>,
}

/// A disagreement between an emitted color and the catalog.
#[derive(Clone, Debug, PartialEq)]
pub enum Mismatch {
    /// The alpha channel of a fired case was not exactly one.
    Alpha { selector: Selector, found: f32 },
    /// A channel that carries no lane of the selector was not exactly zero.
    Stray {
        selector: Selector,
        channel: usize,
        found: f32,
    },
    /// A boolean lane decoded to something other than exactly `0.0` or `1.0`.
    NotUnit { selector: Selector, lane: usize, found: f32 },
    /// A lane decoded to a different value than the stored one.
    Lane {
        selector: Selector,
        lane: usize,
        expected: f32,
        found: f32,
    },
    /// The probe case did not produce the probe color.
    Probe { found: Color4 },
    Catalog(CatalogError),
}

/// Per-channel comparison of two images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageComparison {
    /// The largest absolute channel difference that is not an outlier.
    pub tolerance: u8,
    /// How many outlying channels are allowed.
    pub max_outliers: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComparisonReport {
    pub outliers: usize,
    pub max_difference: u8,
    pub is_alpha_different: bool,
}

/// Absolute per-channel differences between two images of the same size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Difference {
    width: u32,
    height: u32,
    /// RGBA quadruples, row by row.
    data: Vec<u8>,
    is_alpha_different: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComparisonError {
    Size {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    Outliers {
        /// The position of the failed check.
        check: usize,
        max_outliers: usize,
        report: ComparisonReport,
        difference: Difference,
    },
    /// Every check was filtered out, nothing was compared.
    NoChecks,
}

impl core::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Mismatch::Alpha { selector, found } => {
                write!(f, "{selector:?}: alpha is {found}, expected 1")
            }
            Mismatch::Stray {
                selector,
                channel,
                found,
            } => write!(f, "{selector:?}: unused channel {channel} is {found}, expected 0"),
            Mismatch::NotUnit {
                selector,
                lane,
                found,
            } => write!(f, "{selector:?}: lane {lane} is {found}, not a boolean"),
            Mismatch::Lane {
                selector,
                lane,
                expected,
                found,
            } => write!(f, "{selector:?}: lane {lane} decoded to {found}, expected {expected}"),
            Mismatch::Probe { found } => write!(f, "probe emitted {:?}", found.0),
            Mismatch::Catalog(err) => write!(f, "{err}"),
        }
    }
}

impl core::error::Error for Mismatch {}

impl From<CatalogError> for Mismatch {
    fn from(err: CatalogError) -> Self {
        Mismatch::Catalog(err)
    }
}

impl core::fmt::Display for ComparisonError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ComparisonError::Size { expected, actual } => write!(
                f,
                "image is not the right size. Expected = {}x{}, actual = {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
            ComparisonError::Outliers {
                check,
                max_outliers,
                report,
                ..
            } => write!(
                f,
                "check {check} failed: number of outliers ({}) is bigger than allowed limit of \
                {max_outliers}. Max difference is {}",
                report.outliers, report.max_difference
            ),
            ComparisonError::NoChecks => write!(f, "no checks executed"),
        }
    }
}

impl core::error::Error for ComparisonError {}

/// Invert the encoding of `selector` on an emitted color.
///
/// Returns `None` for the probe, which carries no parameter.
pub fn decode(selector: Selector, color: Color4) -> Option<Decoded> {
    let encoding = selector.encoding()?;
    let lanes = selector
        .channels()
        .iter()
        .map(|&channel| encoding.decode(color.0[channel]))
        .collect();

    Some(Decoded {
        selector,
        encoding,
        lanes,
    })
}

/// The stored lanes that `selector` is expected to carry, before encoding.
pub fn expected(selector: Selector, catalog: &Catalog) -> Result<Option<Vec<f32>>, CatalogError> {
    let Some((name, tag)) = selector.parameter() else {
        return Ok(None);
    };

    let value = catalog.get_typed(name, tag)?;
    let count = selector.channels().len();
    Ok(Some(value.components()[..count].to_vec()))
}

/// The complete color a correct host emits for `selector`.
///
/// Channels without a lane are zero, alpha is one.
pub fn expected_color(selector: Selector, catalog: &Catalog) -> Result<Color4, CatalogError> {
    let (Some(encoding), Some(lanes)) = (selector.encoding(), expected(selector, catalog)?) else {
        return Ok(Color4::PROBE);
    };

    let mut color = Color4::new(0.0, 0.0, 0.0, 1.0);
    for (&channel, &lane) in selector.channels().iter().zip(&lanes) {
        color.0[channel] = encoding.encode(lane);
    }

    Ok(color)
}

/// Check an emitted color against the catalog, lanes within `epsilon`.
///
/// Alpha must be exactly one and every channel that carries no lane exactly zero. Boolean lanes
/// must be exactly `0.0` or `1.0` regardless of `epsilon`. A NaN never matches.
pub fn verify(
    selector: Selector,
    catalog: &Catalog,
    color: Color4,
    epsilon: f32,
) -> Result<(), Mismatch> {
    if color.a() != 1.0 {
        return Err(Mismatch::Alpha {
            selector,
            found: color.a(),
        });
    }

    let (Some(decoded), Some(stored)) = (decode(selector, color), expected(selector, catalog)?)
    else {
        return if color == Color4::PROBE {
            Ok(())
        } else {
            Err(Mismatch::Probe { found: color })
        };
    };

    let routed = selector.channels();
    for (channel, &found) in color.rgb().iter().enumerate() {
        if !routed.contains(&channel) && found != 0.0 {
            return Err(Mismatch::Stray {
                selector,
                channel,
                found,
            });
        }
    }

    if decoded.encoding == Encoding::Unit {
        for (lane, &found) in decoded.lanes.iter().enumerate() {
            if found != 0.0 && found != 1.0 {
                return Err(Mismatch::NotUnit {
                    selector,
                    lane,
                    found,
                });
            }
        }
    }

    for (lane, (&found, &expected)) in decoded.lanes.iter().zip(&stored).enumerate() {
        let close = (found - expected).abs() <= epsilon;
        if !close {
            return Err(Mismatch::Lane {
                selector,
                lane,
                expected,
                found,
            });
        }
    }

    Ok(())
}

/// Render the uniform output of `selector` into an image of the given size.
pub fn render(
    selector: i32,
    catalog: &Catalog,
    width: u32,
    height: u32,
) -> Result<Option<RgbaImage>, CatalogError> {
    let Some(color) = evaluate(selector, catalog)? else {
        log::debug!("Selector {selector} fires no case, nothing rendered");
        return Ok(None);
    };

    Ok(Some(solid(color, width, height)))
}

/// An image filled with a single color.
pub fn solid(color: Color4, width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color.to_rgba8())
}

fn calc_difference(lhs: u8, rhs: u8) -> u8 {
    lhs.abs_diff(rhs)
}

impl Difference {
    pub fn between(actual: &RgbaImage, expected: &RgbaImage) -> Result<Self, ComparisonError> {
        if actual.dimensions() != expected.dimensions() {
            return Err(ComparisonError::Size {
                expected: expected.dimensions(),
                actual: actual.dimensions(),
            });
        }

        let mut is_alpha_different = false;
        let data = expected
            .pixels()
            .zip(actual.pixels())
            .flat_map(|(e, a)| {
                is_alpha_different |= e.0[3] != a.0[3];
                [
                    calc_difference(e.0[0], a.0[0]),
                    calc_difference(e.0[1], a.0[1]),
                    calc_difference(e.0[2], a.0[2]),
                    calc_difference(e.0[3], a.0[3]),
                ]
            })
            .collect();

        let (width, height) = actual.dimensions();
        Ok(Difference {
            width,
            height,
            data,
            is_alpha_different,
        })
    }

    pub fn is_alpha_different(&self) -> bool {
        self.is_alpha_different
    }

    /// The number of channels whose difference exceeds `tolerance`.
    pub fn outliers(&self, tolerance: u8) -> usize {
        self.data.iter().filter(|&&d| d > tolerance).count()
    }

    pub fn max_difference(&self) -> u8 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    fn at(&self, x: u32, y: u32) -> &[u8] {
        let start = (y as usize * self.width as usize + x as usize) * 4;
        &self.data[start..start + 4]
    }

    /// The color channel differences as an image.
    pub fn color_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let d = self.at(x, y);
            Rgb([d[0], d[1], d[2]])
        })
    }

    /// The alpha differences as an image, if any alpha differs at all.
    pub fn alpha_image(&self) -> Option<GrayImage> {
        if !self.is_alpha_different {
            return None;
        }

        Some(GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([self.at(x, y)[3]])
        }))
    }

    fn report(&self, tolerance: u8) -> ComparisonReport {
        ComparisonReport {
            outliers: self.outliers(tolerance),
            max_difference: self.max_difference(),
            is_alpha_different: self.is_alpha_different,
        }
    }
}

impl ImageComparison {
    pub fn test(
        &self,
        actual: &RgbaImage,
        expected: &RgbaImage,
    ) -> Result<ComparisonReport, ComparisonError> {
        let difference = Difference::between(actual, expected)?;
        self.check(0, &difference)
    }

    /// Run every check in order, failing on the first one that does not hold.
    pub fn test_all(
        checks: &[ImageComparison],
        actual: &RgbaImage,
        expected: &RgbaImage,
    ) -> Result<Vec<ComparisonReport>, ComparisonError> {
        if checks.is_empty() {
            return Err(ComparisonError::NoChecks);
        }

        let difference = Difference::between(actual, expected)?;
        checks
            .iter()
            .enumerate()
            .map(|(i, check)| check.check(i, &difference))
            .collect()
    }

    fn check(
        &self,
        i: usize,
        difference: &Difference,
    ) -> Result<ComparisonReport, ComparisonError> {
        let report = difference.report(self.tolerance);

        if report.outliers <= self.max_outliers {
            log::debug!(
                "Check {i} succeeded: {} outliers found, max difference {}",
                report.outliers,
                report.max_difference
            );
            Ok(report)
        } else {
            Err(ComparisonError::Outliers {
                check: i,
                max_outliers: self.max_outliers,
                report,
                difference: difference.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{TypeTag, Value};

    #[test]
    fn decode_scaled_and_passthrough() {
        let color = Color4::new(0.0, 0.5, 0.25, 1.0);
        let numeric = decode(Selector::Int2, color).unwrap();
        assert_eq!(numeric.lanes, [128.0, 64.0]);

        let pixel = decode(Selector::Pixel2, color).unwrap();
        assert_eq!(pixel.encoding, Encoding::Passthrough);
        assert_eq!(pixel.lanes, [0.5, 0.25]);

        assert_eq!(decode(Selector::Probe, color), None);
    }

    #[test]
    fn verify_rejects_intermediate_boolean() {
        let mut catalog = Catalog::new();
        catalog
            .declare("pBool", TypeTag::Bool, Value::Bool(true))
            .unwrap();

        let ok = Color4::new(0.0, 1.0, 0.0, 1.0);
        assert_eq!(verify(Selector::Bool, &catalog, ok, 0.1), Ok(()));

        let fuzzy = Color4::new(0.0, 0.95, 0.0, 1.0);
        assert!(matches!(
            verify(Selector::Bool, &catalog, fuzzy, 0.1),
            Err(Mismatch::NotUnit { lane: 0, .. })
        ));
    }

    #[test]
    fn verify_reports_lane() {
        let mut catalog = Catalog::new();
        catalog
            .declare("pFloat3", TypeTag::Float3, Value::Float3([1.0, 2.0, 3.0]))
            .unwrap();

        let wrong = Color4::new(1.0 / 256.0, 3.0 / 256.0, 3.0 / 256.0, 1.0);
        assert_eq!(
            verify(Selector::Float3, &catalog, wrong, 1e-4),
            Err(Mismatch::Lane {
                selector: Selector::Float3,
                lane: 1,
                expected: 2.0,
                found: 3.0,
            })
        );
    }

    #[test]
    fn verify_probe_and_alpha() {
        let catalog = Catalog::new();
        assert_eq!(verify(Selector::Probe, &catalog, Color4::PROBE, 0.0), Ok(()));
        assert!(matches!(
            verify(Selector::Probe, &catalog, Color4::new(1.0, 0.0, 0.0, 0.5), 0.0),
            Err(Mismatch::Alpha { .. })
        ));
        assert!(matches!(
            verify(Selector::Probe, &catalog, Color4::new(0.0, 1.0, 0.0, 1.0), 0.0),
            Err(Mismatch::Probe { .. })
        ));
    }

    #[test]
    fn verify_rejects_stray_channels() {
        let mut catalog = Catalog::new();
        catalog.declare("pInt", TypeTag::Int, Value::Int(128)).unwrap();
        catalog
            .declare("pInt2", TypeTag::Int2, Value::Int2([128, 64]))
            .unwrap();

        let clean = Color4::new(0.0, 0.5, 0.0, 1.0);
        assert_eq!(verify(Selector::Int, &catalog, clean, 0.0), Ok(()));
        assert_eq!(expected_color(Selector::Int, &catalog), Ok(clean));

        let noisy = Color4::new(0.9, 0.5, 0.7, 1.0);
        assert_eq!(
            verify(Selector::Int, &catalog, noisy, 0.0),
            Err(Mismatch::Stray {
                selector: Selector::Int,
                channel: 0,
                found: 0.9,
            })
        );

        // Pairs leave only red unused.
        let pair = Color4::new(0.25, 0.5, 0.25, 1.0);
        assert!(matches!(
            verify(Selector::Int2, &catalog, pair, 0.0),
            Err(Mismatch::Stray { channel: 0, .. })
        ));
        assert_eq!(
            verify(Selector::Int2, &catalog, Color4::new(0.0, 0.5, 0.25, 1.0), 0.0),
            Ok(())
        );
    }

    #[test]
    fn verify_rejects_nan() {
        let mut catalog = Catalog::new();
        catalog
            .declare("pPixel1", TypeTag::Pixel1, Value::Pixel1(1.0))
            .unwrap();
        catalog
            .declare("pFloat", TypeTag::Float, Value::Float(128.0))
            .unwrap();

        let nan = Color4::new(0.0, f32::NAN, 0.0, 1.0);
        assert!(matches!(
            verify(Selector::Pixel1, &catalog, nan, 0.0),
            Err(Mismatch::Lane { lane: 0, .. })
        ));
        assert!(matches!(
            verify(Selector::Float, &catalog, nan, 1.0),
            Err(Mismatch::Lane { lane: 0, .. })
        ));
        assert!(matches!(
            verify(Selector::Float, &catalog, Color4::new(f32::NAN, 0.5, 0.0, 1.0), 0.0),
            Err(Mismatch::Stray { channel: 0, .. })
        ));
    }

    #[test]
    fn comparison_counts_outliers() {
        let expected = solid(Color4::new(0.0, 0.0, 0.0, 1.0), 2, 2);
        let mut actual = expected.clone();
        actual.put_pixel(1, 1, image::Rgba([10, 3, 0, 255]));

        let strict = ImageComparison::default();
        let err = strict.test(&actual, &expected).unwrap_err();
        let ComparisonError::Outliers { report, .. } = &err else {
            panic!("{err:?}");
        };
        assert_eq!(
            *report,
            ComparisonReport {
                outliers: 2,
                max_difference: 10,
                is_alpha_different: false,
            }
        );

        let lenient = ImageComparison {
            tolerance: 3,
            max_outliers: 1,
        };
        assert_eq!(lenient.test(&actual, &expected).unwrap().outliers, 1);
    }

    #[test]
    fn difference_images() {
        let expected = solid(Color4::new(0.0, 0.0, 0.0, 1.0), 2, 1);
        let mut actual = expected.clone();
        actual.put_pixel(1, 0, image::Rgba([10, 3, 0, 255]));

        let difference = Difference::between(&actual, &expected).unwrap();
        let color = difference.color_image();
        assert_eq!(color.dimensions(), (2, 1));
        assert_eq!(color.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(color.get_pixel(1, 0).0, [10, 3, 0]);
        assert_eq!(difference.alpha_image(), None);

        actual.put_pixel(0, 0, image::Rgba([0, 0, 0, 200]));
        let difference = Difference::between(&actual, &expected).unwrap();
        assert!(difference.is_alpha_different());
        let alpha = difference.alpha_image().unwrap();
        assert_eq!(alpha.get_pixel(0, 0).0, [55]);
        assert_eq!(alpha.get_pixel(1, 0).0, [0]);
    }

    #[test]
    fn every_check_must_hold() {
        let expected = solid(Color4::new(0.0, 0.0, 0.0, 1.0), 2, 2);
        let mut actual = expected.clone();
        actual.put_pixel(0, 0, image::Rgba([4, 0, 0, 255]));
        actual.put_pixel(1, 1, image::Rgba([40, 0, 0, 255]));

        let checks = [
            ImageComparison {
                tolerance: 50,
                max_outliers: 0,
            },
            ImageComparison {
                tolerance: 5,
                max_outliers: 0,
            },
        ];
        let err = ImageComparison::test_all(&checks, &actual, &expected).unwrap_err();
        assert!(matches!(err, ComparisonError::Outliers { check: 1, .. }));

        let reports = ImageComparison::test_all(&checks[..1], &actual, &expected).unwrap();
        assert_eq!(reports.len(), 1);

        assert_eq!(
            ImageComparison::test_all(&[], &actual, &expected),
            Err(ComparisonError::NoChecks)
        );
    }

    #[test]
    fn comparison_checks_size() {
        let a = solid(Color4::PROBE, 1, 1);
        let b = solid(Color4::PROBE, 2, 1);
        assert!(matches!(
            ImageComparison::default().test(&a, &b),
            Err(ComparisonError::Size { .. })
        ));
    }
}
