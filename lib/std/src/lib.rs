//! The reference fixture: one parameter of every supported type, with its declared default.
use tessera::{Catalog, CatalogError, TypeTag, Value, SELECTOR_PARAMETER};

/// One row of the default-value table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Declaration {
    pub name: &'static str,
    pub tag: TypeTag,
    pub default: Value,
}

const fn decl(name: &'static str, tag: TypeTag, default: Value) -> Declaration {
    Declaration { name, tag, default }
}

/// Numeric defaults sit at 128 so they encode near one half, apart from the `0.0`/`1.0` of
/// booleans and pixels.
#[rustfmt::skip]
pub const DECLARATIONS: [Declaration; 20] = [
    decl(SELECTOR_PARAMETER, TypeTag::Int, Value::Int(0)),
    decl("pBool", TypeTag::Bool, Value::Bool(true)),
    decl("pInt", TypeTag::Int, Value::Int(128)),
    decl("pFloat", TypeTag::Float, Value::Float(128.0)),
    decl("pPixel1", TypeTag::Pixel1, Value::Pixel1(1.0)),
    decl("pFloat2", TypeTag::Float2, Value::Float2([128.0; 2])),
    decl("pFloat3", TypeTag::Float3, Value::Float3([128.0; 3])),
    decl("pFloat4", TypeTag::Float4, Value::Float4([128.0; 4])),
    decl("pBool2", TypeTag::Bool2, Value::Bool2([true; 2])),
    decl("pBool3", TypeTag::Bool3, Value::Bool3([true; 3])),
    decl("pBool4", TypeTag::Bool4, Value::Bool4([true; 4])),
    decl("pInt2", TypeTag::Int2, Value::Int2([128; 2])),
    decl("pInt3", TypeTag::Int3, Value::Int3([128; 3])),
    decl("pInt4", TypeTag::Int4, Value::Int4([128; 4])),
    decl("pPixel2", TypeTag::Pixel2, Value::Pixel2([1.0; 2])),
    decl("pPixel3", TypeTag::Pixel3, Value::Pixel3([1.0; 3])),
    decl("pPixel4", TypeTag::Pixel4, Value::Pixel4([1.0; 4])),
    decl("pFloat2x2", TypeTag::Float2x2, Value::Float2x2([[128.0; 2]; 2])),
    decl("pFloat3x3", TypeTag::Float3x3, Value::Float3x3([[128.0; 3]; 3])),
    decl("pFloat4x4", TypeTag::Float4x4, Value::Float4x4([[128.0; 4]; 4])),
];

/// Build a fresh catalog from [`DECLARATIONS`], validating every default against its type.
pub fn reference_catalog() -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::new();
    for Declaration { name, tag, default } in DECLARATIONS {
        catalog.declare(name, tag, default)?;
    }

    log::debug!("Built reference catalog with {} parameters", catalog.len());
    Ok(catalog)
}

/// A shared reference catalog at its defaults, built on first use.
pub fn from_included() -> Result<&'static Catalog, CatalogError> {
    static INSTANCE: std::sync::OnceLock<Result<Catalog, CatalogError>> =
        std::sync::OnceLock::new();
    INSTANCE
        .get_or_init(reference_catalog)
        .as_ref()
        .map_err(Clone::clone)
}
