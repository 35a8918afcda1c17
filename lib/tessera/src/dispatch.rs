//! Routing a selector to the encoding of one parameter.
//!
//! Evaluation is a pure function of the selector and the catalog. The output is spatially
//! uniform, so one evaluation stands for every pixel of a render.
use crate::catalog::{Catalog, CatalogError};
use crate::color::Color4;
use crate::param::{Encoding, TypeTag, Value};

/// The name of the int parameter holding the selector, for kernels that read it themselves.
pub const SELECTOR_PARAMETER: &str = "selector";

/// The closed set of reference cases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Selector {
    /// No parameter, only checks that the kernel runs.
    Probe = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    Pixel1 = 4,
    Float2 = 5,
    Float3 = 6,
    Float4 = 7,
    Bool2 = 8,
    Bool3 = 9,
    Bool4 = 10,
    Int2 = 11,
    Int3 = 12,
    Int4 = 13,
    Pixel2 = 14,
    Pixel3 = 15,
    Pixel4 = 16,
    Float2x2 = 17,
    Float3x3 = 18,
    Float4x4 = 19,
}

impl Selector {
    #[rustfmt::skip]
    pub const ALL: [Selector; 20] = [
        Selector::Probe,
        Selector::Bool, Selector::Int, Selector::Float, Selector::Pixel1,
        Selector::Float2, Selector::Float3, Selector::Float4,
        Selector::Bool2, Selector::Bool3, Selector::Bool4,
        Selector::Int2, Selector::Int3, Selector::Int4,
        Selector::Pixel2, Selector::Pixel3, Selector::Pixel4,
        Selector::Float2x2, Selector::Float3x3, Selector::Float4x4,
    ];

    /// Outside `0..=19` no case fires.
    pub fn from_index(index: i32) -> Option<Self> {
        let index = usize::try_from(index).ok()?;
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    /// The parameter read by this case and the type it must be declared with.
    pub fn parameter(self) -> Option<(&'static str, TypeTag)> {
        use Selector as S;
        use TypeTag as T;
        Some(match self {
            S::Probe => return None,
            S::Bool => ("pBool", T::Bool),
            S::Int => ("pInt", T::Int),
            S::Float => ("pFloat", T::Float),
            S::Pixel1 => ("pPixel1", T::Pixel1),
            S::Float2 => ("pFloat2", T::Float2),
            S::Float3 => ("pFloat3", T::Float3),
            S::Float4 => ("pFloat4", T::Float4),
            S::Bool2 => ("pBool2", T::Bool2),
            S::Bool3 => ("pBool3", T::Bool3),
            S::Bool4 => ("pBool4", T::Bool4),
            S::Int2 => ("pInt2", T::Int2),
            S::Int3 => ("pInt3", T::Int3),
            S::Int4 => ("pInt4", T::Int4),
            S::Pixel2 => ("pPixel2", T::Pixel2),
            S::Pixel3 => ("pPixel3", T::Pixel3),
            S::Pixel4 => ("pPixel4", T::Pixel4),
            S::Float2x2 => ("pFloat2x2", T::Float2x2),
            S::Float3x3 => ("pFloat3x3", T::Float3x3),
            S::Float4x4 => ("pFloat4x4", T::Float4x4),
        })
    }

    pub fn encoding(self) -> Option<Encoding> {
        let (_, tag) = self.parameter()?;
        Some(tag.family().encoding())
    }

    /// Which channels carry a lane, in lane order.
    ///
    /// A single lane goes to green, two lanes to green and blue, more to red, green and blue.
    /// Lanes past the third are never encoded.
    pub fn channels(self) -> &'static [usize] {
        match self.parameter() {
            None => &[],
            Some((_, tag)) => match tag.arity() {
                1 => &[1],
                2 => &[1, 2],
                _ => &[0, 1, 2],
            },
        }
    }
}

impl From<Selector> for i32 {
    fn from(selector: Selector) -> i32 {
        selector.index()
    }
}

/// Compute the color for `selector`, or `None` if no case fires.
///
/// Fails only when the catalog does not declare the routed parameter with the expected type.
pub fn evaluate(selector: i32, catalog: &Catalog) -> Result<Option<Color4>, CatalogError> {
    let Some(selector) = Selector::from_index(selector) else {
        return Ok(None);
    };

    let Some((name, tag)) = selector.parameter() else {
        return Ok(Some(Color4::PROBE));
    };

    let value = catalog.get_typed(name, tag)?;
    Ok(Some(encode(selector, value)))
}

/// Like [`evaluate`], but writes into `out` and leaves it untouched when no case fires.
///
/// Returns whether a case fired.
pub fn evaluate_into(
    selector: i32,
    catalog: &Catalog,
    out: &mut Color4,
) -> Result<bool, CatalogError> {
    match evaluate(selector, catalog)? {
        Some(color) => {
            *out = color;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Evaluate with the selector taken from the catalog's own [`SELECTOR_PARAMETER`].
pub fn evaluate_selected(catalog: &Catalog) -> Result<Option<Color4>, CatalogError> {
    match catalog.get_typed(SELECTOR_PARAMETER, TypeTag::Int)? {
        Value::Int(selector) => evaluate(*selector, catalog),
        other => Err(CatalogError::TypeMismatch {
            name: SELECTOR_PARAMETER.to_owned(),
            expected: TypeTag::Int,
            found: other.type_tag(),
        }),
    }
}

fn encode(selector: Selector, value: &Value) -> Color4 {
    let encoding = value.type_tag().family().encoding();
    let lanes = value.components();

    let mut color = Color4::new(0.0, 0.0, 0.0, 1.0);
    for (&channel, &lane) in selector.channels().iter().zip(lanes.iter()) {
        color.0[channel] = encoding.encode(lane);
    }

    color
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with(name: &str, value: Value) -> Catalog {
        let mut catalog = Catalog::new();
        catalog.declare(name, value.type_tag(), value).unwrap();
        catalog
    }

    #[test]
    fn indices_round_trip() {
        for (i, selector) in Selector::ALL.into_iter().enumerate() {
            assert_eq!(selector.index(), i as i32);
            assert_eq!(Selector::from_index(i as i32), Some(selector));
        }
        assert_eq!(Selector::from_index(-1), None);
        assert_eq!(Selector::from_index(20), None);
    }

    #[test]
    fn probe_fires_on_empty_catalog() {
        let catalog = Catalog::new();
        assert_eq!(evaluate(0, &catalog), Ok(Some(Color4::PROBE)));
    }

    #[test]
    fn unmapped_selector_leaves_output() {
        let catalog = Catalog::new();
        let mut out = Color4::new(0.25, 0.25, 0.25, 0.25);
        assert_eq!(evaluate_into(42, &catalog, &mut out), Ok(false));
        assert_eq!(out, Color4::new(0.25, 0.25, 0.25, 0.25));
        assert_eq!(evaluate(-7, &catalog), Ok(None));
    }

    #[test]
    fn scalar_goes_to_green() {
        let catalog = catalog_with("pInt", Value::Int(128));
        assert_eq!(
            evaluate(2, &catalog),
            Ok(Some(Color4::new(0.0, 0.5, 0.0, 1.0)))
        );
    }

    #[test]
    fn pairs_go_to_green_and_blue() {
        let catalog = catalog_with("pPixel2", Value::Pixel2([0.25, 0.75]));
        assert_eq!(
            evaluate(Selector::Pixel2.index(), &catalog),
            Ok(Some(Color4::new(0.0, 0.25, 0.75, 1.0)))
        );
    }

    #[test]
    fn fourth_component_is_dropped() {
        let catalog = catalog_with("pBool4", Value::Bool4([true, false, true, false]));
        let color = evaluate(Selector::Bool4.index(), &catalog).unwrap().unwrap();
        assert_eq!(color, Color4::new(1.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn small_matrix_reads_into_second_row() {
        let catalog = catalog_with("pFloat2x2", Value::Float2x2([[32.0, 64.0], [128.0, 256.0]]));
        let color = evaluate(Selector::Float2x2.index(), &catalog).unwrap().unwrap();
        assert_eq!(color, Color4::new(0.125, 0.25, 0.5, 1.0));
    }

    #[test]
    fn wrong_declaration_is_reported() {
        let catalog = catalog_with("pInt", Value::Float(128.0));
        assert!(matches!(
            evaluate(Selector::Int.index(), &catalog),
            Err(CatalogError::TypeMismatch { .. })
        ));
        assert_eq!(
            evaluate(Selector::Float.index(), &catalog),
            Err(CatalogError::UnknownParameter("pFloat".into()))
        );
    }

    #[test]
    fn selector_from_catalog() {
        let mut catalog = catalog_with("pFloat", Value::Float(64.0));
        catalog
            .declare(SELECTOR_PARAMETER, TypeTag::Int, Value::Int(3))
            .unwrap();
        assert_eq!(
            evaluate_selected(&catalog),
            Ok(Some(Color4::new(0.0, 0.25, 0.0, 1.0)))
        );

        catalog.set(SELECTOR_PARAMETER, Value::Int(99)).unwrap();
        assert_eq!(evaluate_selected(&catalog), Ok(None));
    }
}
