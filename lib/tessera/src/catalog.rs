//! The registry of declared parameters.
//!
//! The catalog is pure data. It checks shapes on every write but never encodes anything, that is
//! left to [`crate::dispatch`].
use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

use crate::param::{TypeTag, Value};

new_key_type! {
    /// A stable handle to a declared parameter.
    pub struct ParamKey;
}

/// One declared parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    tag: TypeTag,
    default: Value,
    current: Value,
}

/// An ordered registry of uniquely named, typed parameters.
///
/// Cloning yields an independent snapshot, which is the way to evaluate while another party keeps
/// overriding values.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    params: SlotMap<ParamKey, Parameter>,
    by_name: HashMap<String, ParamKey>,
    /// Declaration order.
    order: Vec<ParamKey>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CatalogError {
    /// A name was declared twice.
    DuplicateParameter(String),
    /// A value or an expected type disagrees with the declared type.
    TypeMismatch {
        name: String,
        expected: TypeTag,
        found: TypeTag,
    },
    /// The name was never declared.
    UnknownParameter(String),
}

impl core::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            CatalogError::DuplicateParameter(name) => {
                write!(f, "parameter `{name}` is declared more than once")
            }
            CatalogError::TypeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "parameter `{name}` is declared as {expected} but was used as {found}"
            ),
            CatalogError::UnknownParameter(name) => write!(f, "no parameter named `{name}`"),
        }
    }
}

impl core::error::Error for CatalogError {}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn value(&self) -> &Value {
        &self.current
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Register a parameter, with its current value starting at `default`.
    ///
    /// The default must already have the declared shape.
    pub fn declare(
        &mut self,
        name: &str,
        tag: TypeTag,
        default: Value,
    ) -> Result<ParamKey, CatalogError> {
        if self.by_name.contains_key(name) {
            return Err(CatalogError::DuplicateParameter(name.to_owned()));
        }

        Self::check(name, tag, default.type_tag())?;

        let key = self.params.insert(Parameter {
            name: name.to_owned(),
            tag,
            default,
            current: default,
        });

        self.by_name.insert(name.to_owned(), key);
        self.order.push(key);
        log::trace!("Declared parameter {name}: {tag}");

        Ok(key)
    }

    pub fn key(&self, name: &str) -> Result<ParamKey, CatalogError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CatalogError::UnknownParameter(name.to_owned()))
    }

    pub fn parameter(&self, name: &str) -> Result<&Parameter, CatalogError> {
        let key = self.key(name)?;
        self.params
            .get(key)
            .ok_or_else(|| CatalogError::UnknownParameter(name.to_owned()))
    }

    /// Look up a parameter by a handle returned from [`Catalog::declare`].
    pub fn by_key(&self, key: ParamKey) -> Option<&Parameter> {
        self.params.get(key)
    }

    /// The current value of a parameter.
    pub fn get(&self, name: &str) -> Result<&Value, CatalogError> {
        Ok(&self.parameter(name)?.current)
    }

    /// The current value, provided the caller expects the declared type.
    pub fn get_typed(&self, name: &str, expected: TypeTag) -> Result<&Value, CatalogError> {
        let param = self.parameter(name)?;
        Self::check(name, param.tag, expected)?;
        Ok(&param.current)
    }

    pub fn type_of(&self, name: &str) -> Result<TypeTag, CatalogError> {
        Ok(self.parameter(name)?.tag)
    }

    pub fn default_of(&self, name: &str) -> Result<&Value, CatalogError> {
        Ok(&self.parameter(name)?.default)
    }

    /// Override the current value. No conversion between types is attempted.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), CatalogError> {
        let key = self.key(name)?;
        let param = self
            .params
            .get_mut(key)
            .ok_or_else(|| CatalogError::UnknownParameter(name.to_owned()))?;

        Self::check(name, param.tag, value.type_tag())?;
        log::debug!("Setting {name} = {value:?}");
        param.current = value;
        Ok(())
    }

    /// Restore a single parameter to its declared default.
    pub fn reset(&mut self, name: &str) -> Result<(), CatalogError> {
        let key = self.key(name)?;
        let param = self
            .params
            .get_mut(key)
            .ok_or_else(|| CatalogError::UnknownParameter(name.to_owned()))?;

        param.current = param.default;
        Ok(())
    }

    pub fn reset_all(&mut self) {
        for param in self.params.values_mut() {
            param.current = param.default;
        }
    }

    /// All parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> + '_ {
        self.order.iter().filter_map(|&key| self.params.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn check(name: &str, declared: TypeTag, found: TypeTag) -> Result<(), CatalogError> {
        if declared == found {
            Ok(())
        } else {
            Err(CatalogError::TypeMismatch {
                name: name.to_owned(),
                expected: declared,
                found,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .declare("pInt", TypeTag::Int, Value::Int(128))
            .unwrap();
        catalog
            .declare("pFloat3", TypeTag::Float3, Value::Float3([128.0; 3]))
            .unwrap();
        catalog
    }

    #[test]
    fn current_starts_at_default() {
        let catalog = sample();
        assert_eq!(catalog.get("pInt"), Ok(&Value::Int(128)));
        assert_eq!(catalog.default_of("pFloat3"), catalog.get("pFloat3"));
    }

    #[test]
    fn duplicate_is_rejected() {
        let mut catalog = sample();
        let err = catalog
            .declare("pInt", TypeTag::Float, Value::Float(1.0))
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateParameter("pInt".into()));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn default_must_match_declaration() {
        let mut catalog = Catalog::new();
        let err = catalog
            .declare("pFloat2", TypeTag::Float2, Value::Float3([0.0; 3]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::TypeMismatch { .. }));
        assert!(catalog.is_empty());
    }

    #[test]
    fn set_rejects_other_types() {
        let mut catalog = sample();
        let err = catalog.set("pInt", Value::Float(3.0)).unwrap_err();
        assert_eq!(
            err,
            CatalogError::TypeMismatch {
                name: "pInt".into(),
                expected: TypeTag::Int,
                found: TypeTag::Float,
            }
        );
        assert_eq!(catalog.get("pInt"), Ok(&Value::Int(128)));
    }

    #[test]
    fn typed_get_checks_expectation() {
        let catalog = sample();
        assert!(catalog.get_typed("pFloat3", TypeTag::Float3).is_ok());
        assert!(matches!(
            catalog.get_typed("pFloat3", TypeTag::Pixel3),
            Err(CatalogError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn unknown_names() {
        let mut catalog = sample();
        let unknown = CatalogError::UnknownParameter("pNope".into());
        assert_eq!(catalog.get("pNope").unwrap_err(), unknown);
        assert_eq!(catalog.set("pNope", Value::Int(0)).unwrap_err(), unknown);
        assert_eq!(catalog.reset("pNope").unwrap_err(), unknown);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut catalog = sample();
        catalog.set("pInt", Value::Int(7)).unwrap();
        catalog.set("pFloat3", Value::Float3([1.0, 2.0, 3.0])).unwrap();

        catalog.reset("pInt").unwrap();
        assert_eq!(catalog.get("pInt"), Ok(&Value::Int(128)));
        assert_eq!(catalog.get("pFloat3"), Ok(&Value::Float3([1.0, 2.0, 3.0])));

        catalog.reset_all();
        assert_eq!(catalog.get("pFloat3"), Ok(&Value::Float3([128.0; 3])));
    }

    #[test]
    fn iteration_follows_declaration() {
        let mut catalog = sample();
        catalog.declare("a", TypeTag::Bool, Value::Bool(true)).unwrap();
        let names: Vec<_> = catalog.iter().map(Parameter::name).collect();
        assert_eq!(names, ["pInt", "pFloat3", "a"]);
    }

    #[test]
    fn keys_stay_valid() {
        let mut catalog = sample();
        let key = catalog
            .declare("pBool", TypeTag::Bool, Value::Bool(true))
            .unwrap();
        assert_eq!(catalog.key("pBool"), Ok(key));

        catalog.set("pBool", Value::Bool(false)).unwrap();
        let param = catalog.by_key(key).unwrap();
        assert_eq!(param.name(), "pBool");
        assert_eq!(param.value(), &Value::Bool(false));
        assert_eq!(param.default_value(), &Value::Bool(true));

        // A key of another catalog does not resolve here.
        assert_eq!(Catalog::new().by_key(key), None);
    }

    #[test]
    fn snapshot_is_independent() {
        let mut catalog = sample();
        let snapshot = catalog.clone();
        catalog.set("pInt", Value::Int(1)).unwrap();
        assert_eq!(snapshot.get("pInt"), Ok(&Value::Int(128)));
    }
}
