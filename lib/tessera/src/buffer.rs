//! Marshalling the catalog into a uniform block, as handed to an executing kernel.
//!
//! The layout follows std140: scalars align to 4 bytes, two-component vectors to 8, wider vectors
//! and matrix rows to 16. Matrices are stored row-major with one 16-byte slot per row. Booleans
//! occupy a full `u32`.
use core::ops::Range;

use crate::catalog::Catalog;
use crate::param::Value;

/// A range of bytes within a shared buffer, written by one packing operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferInitContent {
    range: Range<usize>,
}

/// Appends data to a buffer, tracking the start of the block.
pub struct BufferInitContentBuilder<'buf> {
    buffer: &'buf mut Vec<u8>,
    start: usize,
}

/// Where one parameter was placed in the packed block, relative to its start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

impl BufferInitContent {
    /// Append a single run of plain data.
    pub fn new<T: bytemuck::Pod>(buffer: &mut Vec<u8>, data: &[T]) -> Self {
        let mut builder = Self::builder(buffer);
        builder.extend_from_pods(data);
        builder.build()
    }

    pub fn builder(buffer: &mut Vec<u8>) -> BufferInitContentBuilder<'_> {
        let start = buffer.len();
        BufferInitContentBuilder { buffer, start }
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// The written bytes, given the buffer they were written to.
    pub fn as_slice<'buf>(&self, buffer: &'buf [u8]) -> &'buf [u8] {
        &buffer[self.range.clone()]
    }
}

impl BufferInitContentBuilder<'_> {
    pub fn extend_from_pods<T: bytemuck::Pod>(&mut self, data: &[T]) {
        self.buffer.extend_from_slice(bytemuck::cast_slice(data));
    }

    /// Pad with zeroes until the block offset is a multiple of `1 << exponent`.
    pub fn align_by_exponent(&mut self, exponent: u16) {
        let align = 1usize << exponent;
        let offset = self.offset();
        let padded = offset.next_multiple_of(align);
        self.buffer.resize(self.start + padded, 0);
    }

    /// The current write position, relative to the block start.
    pub fn offset(&self) -> usize {
        self.buffer.len() - self.start
    }

    pub fn build(self) -> BufferInitContent {
        BufferInitContent {
            range: self.start..self.buffer.len(),
        }
    }
}

impl Value {
    /// The base alignment as a power of two.
    fn std140_alignment(&self) -> u16 {
        match self.type_tag().order() {
            1 => 2,
            2 if !self.type_tag().is_matrix() => 3,
            _ => 4,
        }
    }

    fn write_std140(&self, content: &mut BufferInitContentBuilder) {
        fn bits(v: &[bool]) -> Vec<u32> {
            v.iter().map(|&b| u32::from(b)).collect()
        }

        fn rows<const N: usize>(content: &mut BufferInitContentBuilder, m: &[[f32; N]; N]) {
            for row in m {
                content.align_by_exponent(4);
                content.extend_from_pods(row);
            }
            content.align_by_exponent(4);
        }

        content.align_by_exponent(self.std140_alignment());
        match self {
            Value::Bool(b) => content.extend_from_pods(&[u32::from(*b)]),
            Value::Int(i) => content.extend_from_pods(&[*i]),
            Value::Float(x) | Value::Pixel1(x) => content.extend_from_pods(&[*x]),
            Value::Pixel2(v) | Value::Float2(v) => content.extend_from_pods(v),
            Value::Pixel3(v) | Value::Float3(v) => content.extend_from_pods(v),
            Value::Pixel4(v) | Value::Float4(v) => content.extend_from_pods(v),
            Value::Bool2(v) => content.extend_from_pods(&bits(v)[..]),
            Value::Bool3(v) => content.extend_from_pods(&bits(v)[..]),
            Value::Bool4(v) => content.extend_from_pods(&bits(v)[..]),
            Value::Int2(v) => content.extend_from_pods(v),
            Value::Int3(v) => content.extend_from_pods(v),
            Value::Int4(v) => content.extend_from_pods(v),
            Value::Float2x2(m) => rows(content, m),
            Value::Float3x3(m) => rows(content, m),
            Value::Float4x4(m) => rows(content, m),
        }
    }
}

impl Catalog {
    /// Pack the current values of all parameters, in declaration order.
    pub fn binary_data(&self, buffer: &mut Vec<u8>) -> (BufferInitContent, Vec<UniformSlot>) {
        let mut content = BufferInitContent::builder(buffer);
        let mut slots = Vec::with_capacity(self.len());

        for param in self.iter() {
            content.align_by_exponent(param.value().std140_alignment());
            let offset = content.offset();
            param.value().write_std140(&mut content);

            slots.push(UniformSlot {
                name: param.name().to_owned(),
                offset,
                size: content.offset() - offset,
            });
        }

        content.align_by_exponent(4);
        let content = content.build();
        log::trace!("Packed {} parameters into {} bytes", slots.len(), content.len());
        (content, slots)
    }
}
