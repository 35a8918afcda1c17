use serde::Deserialize;
use tessera::{TypeTag, Value};

/// A parameter value as written in the options, before its declared type is known.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<RawValue>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConversionError {
    /// The number of components (or rows) differs from the declared type.
    Arity {
        tag: TypeTag,
        expected: usize,
        found: usize,
    },
    /// A component is of the wrong kind, e.g. an integer where a float is declared.
    Kind { tag: TypeTag, found: &'static str },
    /// An integer does not fit into 32 bits.
    OutOfRange(i64),
    /// A finite float overflows single precision.
    FloatOutOfRange(f64),
}

impl core::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ConversionError::Arity {
                tag,
                expected,
                found,
            } => write!(f, "{tag} needs {expected} components, found {found}"),
            ConversionError::Kind { tag, found } => {
                write!(f, "{tag} can not hold a component of kind {found}")
            }
            ConversionError::OutOfRange(i) => write!(f, "{i} does not fit an int"),
            ConversionError::FloatOutOfRange(x) => write!(f, "{x} does not fit a float"),
        }
    }
}

impl core::error::Error for ConversionError {}

impl RawValue {
    fn kind(&self) -> &'static str {
        match self {
            RawValue::Bool(_) => "bool",
            RawValue::Int(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::List(_) => "list",
        }
    }

    /// Convert into a value of exactly the declared type.
    ///
    /// Scalars are written bare, vectors as one list, matrices as a list of rows. No component is
    /// converted between kinds.
    pub fn to_value(&self, tag: TypeTag) -> Result<Value, ConversionError> {
        use TypeTag as T;
        Ok(match tag {
            T::Bool => Value::Bool(self.boolean(tag)?),
            T::Int => Value::Int(self.int(tag)?),
            T::Float => Value::Float(self.float(tag)?),
            T::Pixel1 => Value::Pixel1(self.float(tag)?),
            T::Pixel2 => Value::Pixel2(self.vector(tag, Self::float)?),
            T::Pixel3 => Value::Pixel3(self.vector(tag, Self::float)?),
            T::Pixel4 => Value::Pixel4(self.vector(tag, Self::float)?),
            T::Float2 => Value::Float2(self.vector(tag, Self::float)?),
            T::Float3 => Value::Float3(self.vector(tag, Self::float)?),
            T::Float4 => Value::Float4(self.vector(tag, Self::float)?),
            T::Bool2 => Value::Bool2(self.vector(tag, Self::boolean)?),
            T::Bool3 => Value::Bool3(self.vector(tag, Self::boolean)?),
            T::Bool4 => Value::Bool4(self.vector(tag, Self::boolean)?),
            T::Int2 => Value::Int2(self.vector(tag, Self::int)?),
            T::Int3 => Value::Int3(self.vector(tag, Self::int)?),
            T::Int4 => Value::Int4(self.vector(tag, Self::int)?),
            T::Float2x2 => Value::Float2x2(self.matrix(tag)?),
            T::Float3x3 => Value::Float3x3(self.matrix(tag)?),
            T::Float4x4 => Value::Float4x4(self.matrix(tag)?),
        })
    }

    fn mismatch(&self, tag: TypeTag) -> ConversionError {
        ConversionError::Kind {
            tag,
            found: self.kind(),
        }
    }

    fn boolean(&self, tag: TypeTag) -> Result<bool, ConversionError> {
        match self {
            RawValue::Bool(b) => Ok(*b),
            other => Err(other.mismatch(tag)),
        }
    }

    fn int(&self, tag: TypeTag) -> Result<i32, ConversionError> {
        match self {
            RawValue::Int(i) => i32::try_from(*i).map_err(|_| ConversionError::OutOfRange(*i)),
            other => Err(other.mismatch(tag)),
        }
    }

    fn float(&self, tag: TypeTag) -> Result<f32, ConversionError> {
        match self {
            RawValue::Float(x) => {
                let narrow = *x as f32;
                if x.is_finite() && !narrow.is_finite() {
                    return Err(ConversionError::FloatOutOfRange(*x));
                }
                Ok(narrow)
            }
            other => Err(other.mismatch(tag)),
        }
    }

    fn list(&self, tag: TypeTag, len: usize) -> Result<&[RawValue], ConversionError> {
        match self {
            RawValue::List(items) if items.len() == len => Ok(items),
            RawValue::List(items) => Err(ConversionError::Arity {
                tag,
                expected: len,
                found: items.len(),
            }),
            other => Err(other.mismatch(tag)),
        }
    }

    fn vector<T: Copy + Default, const N: usize>(
        &self,
        tag: TypeTag,
        component: fn(&RawValue, TypeTag) -> Result<T, ConversionError>,
    ) -> Result<[T; N], ConversionError> {
        let items = self.list(tag, N)?;
        let mut out = [T::default(); N];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = component(item, tag)?;
        }
        Ok(out)
    }

    fn matrix<const N: usize>(&self, tag: TypeTag) -> Result<[[f32; N]; N], ConversionError> {
        let rows = self.list(tag, N)?;
        let mut out = [[0.0; N]; N];
        for (slot, row) in out.iter_mut().zip(rows) {
            *slot = row.vector(tag, Self::float)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> RawValue {
        #[derive(Deserialize)]
        struct Wrapper {
            v: RawValue,
        }
        toml::from_str::<Wrapper>(text).unwrap().v
    }

    #[test]
    fn scalars() {
        assert_eq!(parse("v = 128").to_value(TypeTag::Int), Ok(Value::Int(128)));
        assert_eq!(parse("v = 0.5").to_value(TypeTag::Pixel1), Ok(Value::Pixel1(0.5)));
        assert_eq!(parse("v = false").to_value(TypeTag::Bool), Ok(Value::Bool(false)));
    }

    #[test]
    fn no_coercion() {
        assert_eq!(
            parse("v = 128").to_value(TypeTag::Float),
            Err(ConversionError::Kind {
                tag: TypeTag::Float,
                found: "integer",
            })
        );
        assert!(parse("v = 1.0").to_value(TypeTag::Int).is_err());
        assert!(parse("v = 1").to_value(TypeTag::Bool).is_err());
        assert!(parse("v = [true, 1]").to_value(TypeTag::Bool2).is_err());
    }

    #[test]
    fn vectors_need_exact_arity() {
        assert_eq!(
            parse("v = [1, 2, 3]").to_value(TypeTag::Int3),
            Ok(Value::Int3([1, 2, 3]))
        );
        assert_eq!(
            parse("v = [1, 2]").to_value(TypeTag::Int3),
            Err(ConversionError::Arity {
                tag: TypeTag::Int3,
                expected: 3,
                found: 2,
            })
        );
        assert!(parse("v = 1").to_value(TypeTag::Int2).is_err());
    }

    #[test]
    fn matrices_are_rows() {
        assert_eq!(
            parse("v = [[1.0, 2.0], [3.0, 4.0]]").to_value(TypeTag::Float2x2),
            Ok(Value::Float2x2([[1.0, 2.0], [3.0, 4.0]]))
        );
        // A ragged row is rejected.
        assert!(matches!(
            parse("v = [[1.0, 2.0], [3.0]]").to_value(TypeTag::Float2x2),
            Err(ConversionError::Arity { found: 1, .. })
        ));
        // A flat list is not a matrix.
        assert!(parse("v = [1.0, 2.0, 3.0, 4.0]")
            .to_value(TypeTag::Float2x2)
            .is_err());
    }

    #[test]
    fn int_range() {
        assert_eq!(
            parse("v = 4294967296").to_value(TypeTag::Int),
            Err(ConversionError::OutOfRange(4_294_967_296))
        );
    }

    #[test]
    fn float_range() {
        assert_eq!(
            parse("v = 1e300").to_value(TypeTag::Float),
            Err(ConversionError::FloatOutOfRange(1e300))
        );
        assert_eq!(
            parse("v = [0.5, -1e39]").to_value(TypeTag::Pixel2),
            Err(ConversionError::FloatOutOfRange(-1e39))
        );
        assert_eq!(
            parse("v = 3.4e38").to_value(TypeTag::Float),
            Ok(Value::Float(3.4e38))
        );
        // Infinity is written as such and kept.
        assert_eq!(
            parse("v = inf").to_value(TypeTag::Float),
            Ok(Value::Float(f32::INFINITY))
        );
    }
}
