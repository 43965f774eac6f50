//! Typed accessor reading
//!
//! Decodes accessor elements from resolved buffer bytes, honouring byte
//! stride, the normalization flag and sparse overrides.

use super::error::AccessorError;
use super::{Accessor, ComponentType, Document};

/// Strided window over the bytes of one buffer view
struct ElementCursor<'a> {
    accessor: usize,
    bytes: &'a [u8],
    offset: usize,
    stride: usize,
    component_type: ComponentType,
}

impl<'a> ElementCursor<'a> {
    fn new(
        document: &'a Document,
        accessor: usize,
        view: usize,
        offset: usize,
        component_type: ComponentType,
        components: usize,
    ) -> Result<Self, AccessorError> {
        if component_type == ComponentType::Invalid {
            return Err(AccessorError::UnsupportedComponentType { accessor, component_type });
        }
        let bytes = document
            .buffer_view_bytes(view)
            .ok_or(AccessorError::MissingData { accessor })?;
        let packed = component_type.size() * components;
        let stride = document
            .buffer_views
            .get(view)
            .and_then(|v| v.byte_stride)
            .unwrap_or(packed);

        Ok(Self {
            accessor,
            bytes,
            offset,
            stride,
            component_type,
        })
    }

    /// Raw bytes of one component
    fn component(&self, element: usize, component: usize) -> Result<&'a [u8], AccessorError> {
        let size = self.component_type.size();
        let start = self.offset + element * self.stride + component * size;
        self.bytes
            .get(start..start + size)
            .ok_or(AccessorError::OutOfBounds {
                accessor: self.accessor,
                offset: start,
                length: size,
                available: self.bytes.len(),
            })
    }

    fn read_f32(&self, element: usize, component: usize, normalized: bool) -> Result<f32, AccessorError> {
        let raw = self.component(element, component)?;
        Ok(decode_f32(raw, self.component_type, normalized))
    }

    fn read_u32(&self, element: usize) -> Result<u32, AccessorError> {
        let raw = self.component(element, 0)?;
        match self.component_type {
            ComponentType::UnsignedByte => Ok(u32::from(raw[0])),
            ComponentType::UnsignedShort => Ok(u32::from(u16::from_le_bytes([raw[0], raw[1]]))),
            ComponentType::UnsignedInt => Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
            component_type => Err(AccessorError::UnsupportedComponentType {
                accessor: self.accessor,
                component_type,
            }),
        }
    }
}

/// Decode one little-endian component; `raw` holds exactly one component
fn decode_f32(raw: &[u8], component_type: ComponentType, normalized: bool) -> f32 {
    match component_type {
        ComponentType::Float => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        ComponentType::Byte => {
            let v = f32::from(raw[0] as i8);
            if normalized { (v / 127.0).max(-1.0) } else { v }
        }
        ComponentType::UnsignedByte => {
            let v = f32::from(raw[0]);
            if normalized { v / 255.0 } else { v }
        }
        ComponentType::Short => {
            let v = f32::from(i16::from_le_bytes([raw[0], raw[1]]));
            if normalized { (v / 32767.0).max(-1.0) } else { v }
        }
        ComponentType::UnsignedShort => {
            let v = f32::from(u16::from_le_bytes([raw[0], raw[1]]));
            if normalized { v / 65535.0 } else { v }
        }
        ComponentType::UnsignedInt => {
            let v = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f32;
            if normalized { v / u32::MAX as f32 } else { v }
        }
        ComponentType::Invalid => 0.0,
    }
}

impl Document {
    fn accessor_at(&self, index: usize) -> Result<&Accessor, AccessorError> {
        self.accessors.get(index).ok_or(AccessorError::UnknownAccessor {
            index,
            count: self.accessors.len(),
        })
    }

    /// Read every element of an accessor as floats
    ///
    /// Returns `count * components` values in element order. An accessor without
    /// a buffer view reads as zeros before sparse overrides are applied.
    ///
    /// # Errors
    /// Fails when the payload is unresolved, an element lies outside its view, the
    /// component type is invalid, or the values cannot be allocated.
    pub fn read_accessor(&self, index: usize) -> Result<Vec<f32>, AccessorError> {
        let accessor = self.accessor_at(index)?;
        let components = accessor.kind.components();
        let mut values = Vec::new();
        match accessor.count.checked_mul(components) {
            Some(len) if values.try_reserve_exact(len).is_ok() => values.resize(len, 0.0),
            _ => {
                return Err(AccessorError::TooLarge {
                    accessor: index,
                    count: accessor.count,
                })
            }
        }

        if let Some(view) = accessor.buffer_view {
            let cursor = ElementCursor::new(
                self,
                index,
                view,
                accessor.byte_offset,
                accessor.component_type,
                components,
            )?;
            for (element, chunk) in values.chunks_exact_mut(components).enumerate() {
                for (component, value) in chunk.iter_mut().enumerate() {
                    *value = cursor.read_f32(element, component, accessor.normalized)?;
                }
            }
        } else if accessor.component_type == ComponentType::Invalid {
            return Err(AccessorError::UnsupportedComponentType {
                accessor: index,
                component_type: accessor.component_type,
            });
        }

        if let Some(sparse) = &accessor.sparse {
            let indices = ElementCursor::new(
                self,
                index,
                sparse.indices.buffer_view,
                sparse.indices.byte_offset,
                sparse.indices.component_type,
                1,
            )?;
            let replacements = ElementCursor::new(
                self,
                index,
                sparse.values.buffer_view,
                sparse.values.byte_offset,
                accessor.component_type,
                components,
            )?;

            for k in 0..sparse.count {
                let target = indices.read_u32(k)? as usize;
                let slot = values
                    .get_mut(target * components..(target + 1) * components)
                    .ok_or(AccessorError::OutOfBounds {
                        accessor: index,
                        offset: target,
                        length: 1,
                        available: accessor.count,
                    })?;
                for (component, value) in slot.iter_mut().enumerate() {
                    *value = replacements.read_f32(k, component, accessor.normalized)?;
                }
            }
        }

        Ok(values)
    }

    /// Read an index accessor as `u32` values
    ///
    /// # Errors
    /// Fails like [`Document::read_accessor`], and for component types other
    /// than unsigned 8/16/32-bit integers.
    pub fn read_indices(&self, index: usize) -> Result<Vec<u32>, AccessorError> {
        let accessor = self.accessor_at(index)?;
        if !accessor.component_type.is_index_type() {
            return Err(AccessorError::UnsupportedComponentType {
                accessor: index,
                component_type: accessor.component_type,
            });
        }
        if accessor.buffer_view.is_none() || accessor.sparse.is_some() {
            // Unsigned 32-bit values are exact in f32 only up to 2^24
            return Ok(self.read_accessor(index)?.into_iter().map(|v| v as u32).collect());
        }

        let view = accessor.buffer_view.ok_or(AccessorError::MissingData { accessor: index })?;
        let cursor = ElementCursor::new(self, index, view, accessor.byte_offset, accessor.component_type, 1)?;
        (0..accessor.count).map(|element| cursor.read_u32(element)).collect()
    }
}
