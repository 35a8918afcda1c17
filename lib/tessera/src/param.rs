//! The closed set of parameter shapes a kernel may declare.
//!
//! Every shape is one variant of [`TypeTag`] and carries its payload in [`Value`] as a fixed-size
//! array. A value can not be ragged: the arity is part of the type.
use core::fmt;

/// The declared type of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    Pixel1,
    Pixel2,
    Pixel3,
    Pixel4,
    Float2,
    Float3,
    Float4,
    Bool2,
    Bool3,
    Bool4,
    Int2,
    Int3,
    Int4,
    Float2x2,
    Float3x3,
    Float4x4,
}

/// The component semantics of a type, independent of its arity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Bool,
    Int,
    Float,
    /// Color channels, already normalized to the unit range.
    Pixel,
}

/// How the lanes of a value are written into color channels.
///
/// All encodings are invertible; [`Encoding::decode`] recovers the stored lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Booleans, written as exactly `0.0` or `1.0`.
    Unit,
    /// Raw numbers, divided by [`Encoding::SCALE`].
    Scaled,
    /// Pixel channels, written as-is.
    Passthrough,
}

/// A parameter value whose shape is fixed by its variant.
///
/// Matrices are indexed `[row][col]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Pixel1(f32),
    Pixel2([f32; 2]),
    Pixel3([f32; 3]),
    Pixel4([f32; 4]),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Bool2([bool; 2]),
    Bool3([bool; 3]),
    Bool4([bool; 4]),
    Int2([i32; 2]),
    Int3([i32; 3]),
    Int4([i32; 4]),
    Float2x2([[f32; 2]; 2]),
    Float3x3([[f32; 3]; 3]),
    Float4x4([[f32; 4]; 4]),
}

/// The components of a value, flattened row-major into float lanes.
///
/// At most 16 lanes are ever needed (a 4x4 matrix).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lanes {
    data: [f32; 16],
    len: usize,
}

impl TypeTag {
    pub const ALL: [TypeTag; 19] = [
        TypeTag::Bool,
        TypeTag::Int,
        TypeTag::Float,
        TypeTag::Pixel1,
        TypeTag::Pixel2,
        TypeTag::Pixel3,
        TypeTag::Pixel4,
        TypeTag::Float2,
        TypeTag::Float3,
        TypeTag::Float4,
        TypeTag::Bool2,
        TypeTag::Bool3,
        TypeTag::Bool4,
        TypeTag::Int2,
        TypeTag::Int3,
        TypeTag::Int4,
        TypeTag::Float2x2,
        TypeTag::Float3x3,
        TypeTag::Float4x4,
    ];

    pub fn family(self) -> Family {
        use TypeTag as T;
        match self {
            T::Bool | T::Bool2 | T::Bool3 | T::Bool4 => Family::Bool,
            T::Int | T::Int2 | T::Int3 | T::Int4 => Family::Int,
            T::Pixel1 | T::Pixel2 | T::Pixel3 | T::Pixel4 => Family::Pixel,
            T::Float
            | T::Float2
            | T::Float3
            | T::Float4
            | T::Float2x2
            | T::Float3x3
            | T::Float4x4 => Family::Float,
        }
    }

    /// The side length of the vector or matrix, 1 for scalars.
    pub fn order(self) -> usize {
        use TypeTag as T;
        match self {
            T::Bool | T::Int | T::Float | T::Pixel1 => 1,
            T::Pixel2 | T::Float2 | T::Bool2 | T::Int2 | T::Float2x2 => 2,
            T::Pixel3 | T::Float3 | T::Bool3 | T::Int3 | T::Float3x3 => 3,
            T::Pixel4 | T::Float4 | T::Bool4 | T::Int4 | T::Float4x4 => 4,
        }
    }

    /// The total number of components.
    pub fn arity(self) -> usize {
        if self.is_matrix() {
            self.order() * self.order()
        } else {
            self.order()
        }
    }

    pub fn is_matrix(self) -> bool {
        matches!(
            self,
            TypeTag::Float2x2 | TypeTag::Float3x3 | TypeTag::Float4x4
        )
    }

    /// The spelling of the type in kernel source.
    pub fn name(self) -> &'static str {
        use TypeTag as T;
        match self {
            T::Bool => "bool",
            T::Int => "int",
            T::Float => "float",
            T::Pixel1 => "pixel1",
            T::Pixel2 => "pixel2",
            T::Pixel3 => "pixel3",
            T::Pixel4 => "pixel4",
            T::Float2 => "float2",
            T::Float3 => "float3",
            T::Float4 => "float4",
            T::Bool2 => "bool2",
            T::Bool3 => "bool3",
            T::Bool4 => "bool4",
            T::Int2 => "int2",
            T::Int3 => "int3",
            T::Int4 => "int4",
            T::Float2x2 => "float2x2",
            T::Float3x3 => "float3x3",
            T::Float4x4 => "float4x4",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TypeTag::ALL.into_iter().find(|tag| tag.name() == name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Family {
    pub fn encoding(self) -> Encoding {
        match self {
            Family::Bool => Encoding::Unit,
            Family::Int | Family::Float => Encoding::Scaled,
            Family::Pixel => Encoding::Passthrough,
        }
    }
}

impl Encoding {
    /// The divisor for raw numbers. Defaults of 128 land at one half.
    pub const SCALE: f32 = 256.0;

    pub fn encode(self, lane: f32) -> f32 {
        match self {
            Encoding::Unit | Encoding::Passthrough => lane,
            Encoding::Scaled => lane / Self::SCALE,
        }
    }

    pub fn decode(self, channel: f32) -> f32 {
        match self {
            Encoding::Unit | Encoding::Passthrough => channel,
            Encoding::Scaled => channel * Self::SCALE,
        }
    }
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        use TypeTag as T;
        match self {
            Value::Bool(_) => T::Bool,
            Value::Int(_) => T::Int,
            Value::Float(_) => T::Float,
            Value::Pixel1(_) => T::Pixel1,
            Value::Pixel2(_) => T::Pixel2,
            Value::Pixel3(_) => T::Pixel3,
            Value::Pixel4(_) => T::Pixel4,
            Value::Float2(_) => T::Float2,
            Value::Float3(_) => T::Float3,
            Value::Float4(_) => T::Float4,
            Value::Bool2(_) => T::Bool2,
            Value::Bool3(_) => T::Bool3,
            Value::Bool4(_) => T::Bool4,
            Value::Int2(_) => T::Int2,
            Value::Int3(_) => T::Int3,
            Value::Int4(_) => T::Int4,
            Value::Float2x2(_) => T::Float2x2,
            Value::Float3x3(_) => T::Float3x3,
            Value::Float4x4(_) => T::Float4x4,
        }
    }

    /// Flatten into float lanes, matrices row by row.
    ///
    /// Booleans become `0.0` or `1.0`. Integers convert exactly within the 24-bit mantissa.
    pub fn components(&self) -> Lanes {
        fn unit(b: bool) -> f32 {
            if b {
                1.0
            } else {
                0.0
            }
        }

        let mut lanes = Lanes::default();
        match self {
            Value::Bool(b) => lanes.push(unit(*b)),
            Value::Int(i) => lanes.push(*i as f32),
            Value::Float(x) | Value::Pixel1(x) => lanes.push(*x),
            Value::Pixel2(v) | Value::Float2(v) => lanes.extend(v.iter().copied()),
            Value::Pixel3(v) | Value::Float3(v) => lanes.extend(v.iter().copied()),
            Value::Pixel4(v) | Value::Float4(v) => lanes.extend(v.iter().copied()),
            Value::Bool2(v) => lanes.extend(v.iter().copied().map(unit)),
            Value::Bool3(v) => lanes.extend(v.iter().copied().map(unit)),
            Value::Bool4(v) => lanes.extend(v.iter().copied().map(unit)),
            Value::Int2(v) => lanes.extend(v.iter().map(|&i| i as f32)),
            Value::Int3(v) => lanes.extend(v.iter().map(|&i| i as f32)),
            Value::Int4(v) => lanes.extend(v.iter().map(|&i| i as f32)),
            Value::Float2x2(m) => lanes.extend(m.iter().flatten().copied()),
            Value::Float3x3(m) => lanes.extend(m.iter().flatten().copied()),
            Value::Float4x4(m) => lanes.extend(m.iter().flatten().copied()),
        }
        lanes
    }
}

impl Lanes {
    fn push(&mut self, lane: f32) {
        self.data[self.len] = lane;
        self.len += 1;
    }

    fn extend(&mut self, lanes: impl IntoIterator<Item = f32>) {
        for lane in lanes {
            self.push(lane);
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for Lanes {
    fn default() -> Self {
        Lanes {
            data: [0.0; 16],
            len: 0,
        }
    }
}

impl core::ops::Deref for Lanes {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        self.as_slice()
    }
}
