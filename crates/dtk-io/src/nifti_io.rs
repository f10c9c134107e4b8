use anyhow::{bail, Context, Result};
use burn::tensor::backend::Backend;
use dtk_core::image::{ImageGeometry, VectorImage};
use dtk_core::spatial::{Direction3, Point3, Spacing3, Vector3};
use nalgebra::SMatrix;
use ndarray::{ArrayD, IxDyn};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// NIfTI intent code for displacement/velocity vectors.
pub const INTENT_VECTOR: i16 = 1007;
/// NIfTI intent code for symmetric matrices.
pub const INTENT_SYMMATRIX: i16 = 1005;

/// Image geometry described by a NIfTI header.
///
/// The sform is preferred, then the qform, then plain `pixdim` scaling.
pub fn geometry_from_header(header: &NiftiHeader) -> Result<ImageGeometry> {
    let affine = if header.sform_code > 0 {
        [header.srow_x, header.srow_y, header.srow_z]
    } else if header.qform_code > 0 {
        let b = header.quatern_b;
        let c = header.quatern_c;
        let d = header.quatern_d;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();

        let qfac = if header.pixdim[0] == 0.0 { 1.0 } else { header.pixdim[0] };

        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3] * qfac;

        [
            [
                (a * a + b * b - c * c - d * d) * dx,
                (2.0 * b * c - 2.0 * a * d) * dy,
                (2.0 * b * d + 2.0 * a * c) * dz,
                header.quatern_x,
            ],
            [
                (2.0 * b * c + 2.0 * a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                (2.0 * c * d - 2.0 * a * b) * dz,
                header.quatern_y,
            ],
            [
                (2.0 * b * d - 2.0 * a * c) * dx,
                (2.0 * c * d + 2.0 * a * b) * dy,
                (a * a + d * d - c * c - b * b) * dz,
                header.quatern_z,
            ],
        ]
    } else {
        [
            [header.pixdim[1], 0.0, 0.0, 0.0],
            [0.0, header.pixdim[2], 0.0, 0.0],
            [0.0, 0.0, header.pixdim[3], 0.0],
        ]
    };

    let origin = Point3::new(affine[0][3] as f64, affine[1][3] as f64, affine[2][3] as f64);

    let axes = [Vector3::x(), Vector3::y(), Vector3::z()];
    let mut spacing = Spacing3::zeros();
    let mut columns = [Vector3::zeros(); 3];
    for axis in 0..3 {
        let column = Vector3::new(
            affine[0][axis] as f64,
            affine[1][axis] as f64,
            affine[2][axis] as f64,
        );
        let norm = column.norm();
        spacing[axis] = if norm > 1e-9 { norm } else { 1.0 };
        columns[axis] = if norm > 1e-9 { column / norm } else { axes[axis] };
    }
    let direction: Direction3 = SMatrix::<f64, 3, 3>::from_columns(&columns);

    let dim = header.dim;
    if dim[0] < 3 {
        bail!("Expected at least 3 spatial dimensions, found {}", dim[0]);
    }
    let size = [dim[1] as usize, dim[2] as usize, dim[3] as usize];

    ImageGeometry::new(size, origin, spacing, direction).context("Invalid NIfTI geometry")
}

/// Header describing `geometry`, with an sform and no qform.
pub fn header_from_geometry(geometry: &ImageGeometry, intent_code: i16) -> NiftiHeader {
    let mut header = NiftiHeader::default();
    let spacing = geometry.spacing();
    let origin = geometry.origin();
    let matrix = geometry.direction() * SMatrix::<f64, 3, 3>::from_diagonal(spacing);

    header.pixdim[1] = spacing.x as f32;
    header.pixdim[2] = spacing.y as f32;
    header.pixdim[3] = spacing.z as f32;
    header.sform_code = 1;
    header.qform_code = 0;
    let row = |r: usize| {
        [
            matrix[(r, 0)] as f32,
            matrix[(r, 1)] as f32,
            matrix[(r, 2)] as f32,
            origin[r] as f32,
        ]
    };
    header.srow_x = row(0);
    header.srow_y = row(1);
    header.srow_z = row(2);
    header.intent_code = intent_code;
    header
}

/// Read only the geometry of a NIfTI file.
pub fn read_geometry<P: AsRef<Path>>(path: P) -> Result<ImageGeometry> {
    let path = path.as_ref();
    let header = NiftiHeader::from_file(path)
        .with_context(|| format!("Failed to read NIfTI header {}", path.display()))?;
    geometry_from_header(&header)
}

/// Read a multi-component NIfTI image.
///
/// Accepts 4-D `[X, Y, Z, C]` volumes and 5-D `[X, Y, Z, 1, C]` volumes (the
/// layout used for vector and tensor intents). The result is `[Z, Y, X, C]`.
pub fn read_vector_image<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> Result<VectorImage<B>> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let geometry = geometry_from_header(obj.header())?;

    let volume = obj
        .into_volume()
        .into_ndarray::<f64>()
        .context("Failed to convert volume to ndarray")?;

    let shape = volume.shape().to_vec();
    let components = match shape.len() {
        4 => shape[3],
        5 if shape[3] == 1 => shape[4],
        _ => bail!("Expected a 4-D or 5-D vector image, found shape {:?}", shape),
    };
    let [nx, ny, nz] = geometry.size();
    if shape[..3] != [nx, ny, nz] {
        bail!("Volume shape {:?} disagrees with header dimensions", shape);
    }

    let mut values = Vec::with_capacity(nx * ny * nz * components);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                for c in 0..components {
                    let value = if shape.len() == 4 {
                        volume[&[x, y, z, c][..]]
                    } else {
                        volume[&[x, y, z, 0, c][..]]
                    };
                    values.push(value);
                }
            }
        }
    }

    Ok(VectorImage::from_components(values, components, geometry, device)?)
}

/// Write a multi-component image as a 5-D `[X, Y, Z, 1, C]` float64 NIfTI
/// volume.
pub fn write_vector_image<B: Backend, P: AsRef<Path>>(
    path: P,
    image: &VectorImage<B>,
    intent_code: i16,
) -> Result<()> {
    use nifti::writer::WriterOptions;

    let path = path.as_ref();
    let geometry = image.geometry();
    let [nx, ny, nz] = geometry.size();
    let components = image.components();
    let values = image.to_components();

    let array = ArrayD::from_shape_fn(IxDyn(&[nx, ny, nz, 1, components]), |index| {
        let voxel = geometry.linear_index([index[0], index[1], index[2]]);
        values[voxel * components + index[4]]
    });

    let header = header_from_geometry(geometry, intent_code);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .map_err(|e| anyhow::anyhow!("Failed to write NIfTI file {}: {}", path.display(), e))?;

    Ok(())
}
