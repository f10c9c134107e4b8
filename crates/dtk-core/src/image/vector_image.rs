//! Multi-component image stored in a burn tensor.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use crate::error::{DtkError, Result};
use crate::image::{ImageGeometry, TensorField, VectorField, VoxelGrid};
use crate::spatial::Vector3;
use crate::tensor::SpdTensor;

/// Vector-valued image with physical metadata.
///
/// The data tensor is shaped `[Z, Y, X, C]` where `C` is the number of
/// components per voxel (3 for vector fields, 6 for symmetric tensors).
///
/// # Examples
/// ```rust
/// use dtk_core::image::{ImageGeometry, VectorImage};
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f64>;
///
/// let device = Default::default();
/// let geometry = ImageGeometry::with_size([4, 3, 2]).unwrap();
/// let image = VectorImage::<Backend>::zeros(geometry, 6, &device);
/// assert_eq!(image.data().dims(), [2, 3, 4, 6]);
/// ```
#[derive(Debug, Clone)]
pub struct VectorImage<B: Backend> {
    data: Tensor<B, 4>,
    geometry: ImageGeometry,
}

impl<B: Backend> VectorImage<B> {
    /// Wrap a `[Z, Y, X, C]` tensor.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the spatial dimensions disagree with
    /// the geometry.
    pub fn new(data: Tensor<B, 4>, geometry: ImageGeometry) -> Result<Self> {
        let dims = data.dims();
        let [nz, ny, nx] = geometry.shape_zyx();
        if dims[0] != nz || dims[1] != ny || dims[2] != nx || dims[3] == 0 {
            return Err(DtkError::ShapeMismatch {
                expected: format!("[{nz}, {ny}, {nx}, C]"),
                actual: format!("{:?}", dims),
            });
        }
        Ok(Self { data, geometry })
    }

    /// Image with every component set to zero.
    pub fn zeros(geometry: ImageGeometry, components: usize, device: &B::Device) -> Self {
        let [nz, ny, nx] = geometry.shape_zyx();
        let data = Tensor::zeros([nz, ny, nx, components], device);
        Self { data, geometry }
    }

    /// Build from interleaved component values, voxel-major.
    pub fn from_components(
        values: Vec<f64>,
        components: usize,
        geometry: ImageGeometry,
        device: &B::Device,
    ) -> Result<Self> {
        let [nz, ny, nx] = geometry.shape_zyx();
        let expected = nz * ny * nx * components;
        if components == 0 || values.len() != expected {
            return Err(DtkError::ShapeMismatch {
                expected: format!("{expected} values"),
                actual: format!("{} values", values.len()),
            });
        }
        let data = TensorData::new(values, Shape::new([nz, ny, nx, components]))
            .convert::<B::FloatElem>();
        Ok(Self {
            data: Tensor::from_data(data, device),
            geometry,
        })
    }

    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    pub fn into_data(self) -> Tensor<B, 4> {
        self.data
    }

    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    pub fn components(&self) -> usize {
        self.data.dims()[3]
    }

    /// Interleaved component values, voxel-major, as `f64`.
    pub fn to_components(&self) -> Vec<f64> {
        self.data.to_data().iter::<f64>().collect()
    }

    fn expect_components(&self, components: usize) -> Result<()> {
        if self.components() != components {
            return Err(DtkError::ShapeMismatch {
                expected: format!("{components} components"),
                actual: format!("{} components", self.components()),
            });
        }
        Ok(())
    }
}

impl VectorField {
    /// Read a 3-component image into a host vector field.
    pub fn from_image<B: Backend>(image: &VectorImage<B>) -> Result<Self> {
        image.expect_components(3)?;
        let voxels = image
            .to_components()
            .chunks_exact(3)
            .map(|c| Vector3::new(c[0], c[1], c[2]))
            .collect();
        VoxelGrid::new(image.geometry().clone(), voxels)
    }

    pub fn to_image<B: Backend>(&self, device: &B::Device) -> Result<VectorImage<B>> {
        let values = self
            .voxels()
            .iter()
            .flat_map(|v| [v.x, v.y, v.z])
            .collect();
        VectorImage::from_components(values, 3, self.geometry().clone(), device)
    }
}

impl TensorField {
    /// Read a 6-component image into a host tensor field.
    ///
    /// All-zero voxels become background.
    pub fn from_image<B: Backend>(image: &VectorImage<B>) -> Result<TensorField> {
        image.expect_components(6)?;
        let voxels = image
            .to_components()
            .chunks_exact(6)
            .map(|c| {
                let tensor = SpdTensor([c[0], c[1], c[2], c[3], c[4], c[5]]);
                (!tensor.is_zero()).then_some(tensor)
            })
            .collect();
        VoxelGrid::new(image.geometry().clone(), voxels)
    }

    /// Background voxels are written as zero tensors.
    pub fn to_image<B: Backend>(&self, device: &B::Device) -> Result<VectorImage<B>> {
        let values = self
            .voxels()
            .iter()
            .flat_map(|v| v.map(|t| t.0).unwrap_or([0.0; 6]))
            .collect();
        VectorImage::from_components(values, 6, self.geometry().clone(), device)
    }
}
