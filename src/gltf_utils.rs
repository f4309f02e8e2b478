use glam::{Mat4, Quat, Vec3};

use crate::error::{BakeError, Result};

/// Rest pose of a node as (translation, rotation, scale).
pub fn transform_to_trs(transform: gltf::scene::Transform) -> (Vec3, Quat, Vec3) {
    match transform {
        gltf::scene::Transform::Matrix { matrix } => {
            let (scale, rotation, translation) =
                Mat4::from_cols_array_2d(&matrix).to_scale_rotation_translation();
            (translation, rotation, scale)
        }
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => (
            Vec3::from(translation),
            Quat::from_xyzw(rotation[0], rotation[1], rotation[2], rotation[3]),
            Vec3::from(scale),
        ),
    }
}

fn accessor_error(accessor: &gltf::Accessor, reason: impl Into<String>) -> BakeError {
    BakeError::Accessor {
        index: accessor.index(),
        reason: reason.into(),
    }
}

fn copy_element(
    accessor: &gltf::Accessor,
    src_buffer: &[u8],
    src: usize,
    dst: &mut [u8],
) -> Result<()> {
    let elem = src_buffer
        .get(src..src + dst.len())
        .ok_or_else(|| accessor_error(accessor, "element lies outside its buffer"))?;
    dst.copy_from_slice(elem);
    Ok(())
}

fn read_sparse_index(
    accessor: &gltf::Accessor,
    index_type: gltf::accessor::sparse::IndexType,
    buffer: &[u8],
    start: usize,
) -> Result<usize> {
    let bytes = |len: usize| {
        buffer
            .get(start..start + len)
            .ok_or_else(|| accessor_error(accessor, "sparse index lies outside its buffer"))
    };
    let index = match index_type {
        gltf::accessor::sparse::IndexType::U8 => bytes(1)?[0] as usize,
        gltf::accessor::sparse::IndexType::U16 => {
            bytemuck::pod_read_unaligned::<u16>(bytes(2)?) as usize
        }
        gltf::accessor::sparse::IndexType::U32 => {
            bytemuck::pod_read_unaligned::<u32>(bytes(4)?) as usize
        }
        #[allow(unreachable_patterns)]
        _ => return Err(accessor_error(accessor, "unsupported sparse index type")),
    };
    Ok(index)
}

/// Tightly packed element bytes of an accessor, with strides removed and
/// sparse substitutions applied.
fn read_accessor_data(accessor: &gltf::Accessor, buffers: &[gltf::buffer::Data]) -> Result<Vec<u8>> {
    let count = accessor.count();
    let elem_size = accessor.size();

    let mut data = vec![0u8; count * elem_size];

    if let Some(view) = accessor.view() {
        let buffer = &buffers[view.buffer().index()].0;
        let stride = view.stride().unwrap_or(elem_size);
        let base = view.offset() + accessor.offset();

        for i in 0..count {
            let dst = i * elem_size;
            copy_element(accessor, buffer, base + i * stride, &mut data[dst..dst + elem_size])?;
        }
    } else if accessor.sparse().is_none() {
        return Err(accessor_error(accessor, "no buffer view and not sparse"));
    }

    if let Some(sparse) = accessor.sparse() {
        let indices = sparse.indices();
        let indices_view = indices.view();
        let indices_buffer = &buffers[indices_view.buffer().index()].0;
        let indices_offset = indices_view.offset() + indices.offset();
        let index_size = match indices.index_type() {
            gltf::accessor::sparse::IndexType::U8 => 1,
            gltf::accessor::sparse::IndexType::U16 => 2,
            gltf::accessor::sparse::IndexType::U32 => 4,
            #[allow(unreachable_patterns)]
            _ => return Err(accessor_error(accessor, "unsupported sparse index type")),
        };
        let indices_stride = indices_view.stride().unwrap_or(index_size);

        let values = sparse.values();
        let values_view = values.view();
        let values_buffer = &buffers[values_view.buffer().index()].0;
        let values_offset = values_view.offset() + values.offset();
        let values_stride = values_view.stride().unwrap_or(elem_size);

        for i in 0..sparse.count() {
            let index = read_sparse_index(
                accessor,
                indices.index_type(),
                indices_buffer,
                indices_offset + i * indices_stride,
            )?;
            if index >= count {
                return Err(accessor_error(accessor, "sparse index out of range"));
            }
            let dst = index * elem_size;
            copy_element(
                accessor,
                values_buffer,
                values_offset + i * values_stride,
                &mut data[dst..dst + elem_size],
            )?;
        }
    }

    Ok(data)
}

fn read_f32_elements<const N: usize>(
    accessor: &gltf::Accessor,
    buffers: &[gltf::buffer::Data],
    dimensions: gltf::accessor::Dimensions,
) -> Result<Vec<[f32; N]>> {
    if accessor.data_type() != gltf::accessor::DataType::F32 {
        return Err(accessor_error(
            accessor,
            format!("expected f32 components, found {:?}", accessor.data_type()),
        ));
    }
    if accessor.dimensions() != dimensions {
        return Err(accessor_error(
            accessor,
            format!("expected {:?}, found {:?}", dimensions, accessor.dimensions()),
        ));
    }

    let data = read_accessor_data(accessor, buffers)?;
    Ok(data
        .chunks_exact(N * 4)
        .map(|elem| {
            let mut out = [0f32; N];
            for (value, bytes) in out.iter_mut().zip(elem.chunks_exact(4)) {
                *value = bytemuck::pod_read_unaligned::<f32>(bytes);
            }
            out
        })
        .collect())
}

pub fn readf32(accessor: &gltf::Accessor, buffers: &[gltf::buffer::Data]) -> Result<Vec<f32>> {
    Ok(read_f32_elements::<1>(accessor, buffers, gltf::accessor::Dimensions::Scalar)?
        .into_iter()
        .map(|[v]| v)
        .collect())
}

pub fn read3f32(accessor: &gltf::Accessor, buffers: &[gltf::buffer::Data]) -> Result<Vec<[f32; 3]>> {
    read_f32_elements::<3>(accessor, buffers, gltf::accessor::Dimensions::Vec3)
}

pub fn read4f32(accessor: &gltf::Accessor, buffers: &[gltf::buffer::Data]) -> Result<Vec<[f32; 4]>> {
    read_f32_elements::<4>(accessor, buffers, gltf::accessor::Dimensions::Vec4)
}

/// Column-major, as stored in glTF.
pub fn read_mat4(accessor: &gltf::Accessor, buffers: &[gltf::buffer::Data]) -> Result<Vec<Mat4>> {
    Ok(read_f32_elements::<16>(accessor, buffers, gltf::accessor::Dimensions::Mat4)?
        .iter()
        .map(Mat4::from_cols_array)
        .collect())
}

pub fn read_index_buffer(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Result<Vec<u32>> {
    let Some(accessor) = primitive.indices() else {
        log::debug!(
            "primitive {} has no index buffer, generating a sequential one",
            primitive.index()
        );
        let count = primitive
            .get(&gltf::Semantic::Positions)
            .map_or(0, |positions| positions.count());
        return Ok((0..count as u32).collect());
    };
    if accessor.dimensions() != gltf::accessor::Dimensions::Scalar {
        return Err(accessor_error(&accessor, "index accessor is not scalar"));
    }

    let data = read_accessor_data(&accessor, buffers)?;
    let indices = match accessor.data_type() {
        gltf::accessor::DataType::U8 => data.iter().map(|i| *i as u32).collect(),
        gltf::accessor::DataType::U16 => data
            .chunks_exact(2)
            .map(|bytes| bytemuck::pod_read_unaligned::<u16>(bytes) as u32)
            .collect(),
        gltf::accessor::DataType::U32 => data
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<u32>)
            .collect(),
        other => {
            return Err(accessor_error(
                &accessor,
                format!("unsupported index type {:?}", other),
            ))
        }
    };
    Ok(indices)
}

pub fn read_position_buffer(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<[f32; 3]>> {
    match primitive.get(&gltf::Semantic::Positions) {
        Some(accessor) => read3f32(&accessor, buffers),
        None => {
            log::warn!("primitive {} is missing the POSITION attribute", primitive.index());
            Ok(vec![])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_transform_decomposes_to_trs() {
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::IDENTITY,
            Vec3::new(1.0, 2.0, 3.0),
        );
        let (t, r, s) = transform_to_trs(gltf::scene::Transform::Matrix {
            matrix: matrix.to_cols_array_2d(),
        });
        assert!(t.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
        assert!(r.abs_diff_eq(Quat::IDENTITY, 1e-6));
        assert!(s.abs_diff_eq(Vec3::splat(2.0), 1e-6));
    }

    #[test]
    fn decomposed_transform_keeps_components() {
        let (t, r, s) = transform_to_trs(gltf::scene::Transform::Decomposed {
            translation: [0.0, 1.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
        });
        assert_eq!(t, Vec3::Y);
        assert_eq!(r, Quat::IDENTITY);
        assert_eq!(s, Vec3::ONE);
    }
}
