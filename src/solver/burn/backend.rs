//! Backend abstraction and host transfer helpers.

use burn::prelude::*;
use burn::tensor::TensorData;

use super::error::BurnError;

/// Burn backends the block solver can run on.
pub trait SweBackend: Backend {
    /// Get the default device for this backend.
    fn default_device() -> Self::Device;
}

#[cfg(feature = "burn-ndarray")]
impl SweBackend for burn_ndarray::NdArray<f64> {
    fn default_device() -> Self::Device {
        burn_ndarray::NdArrayDevice::Cpu
    }
}

#[cfg(feature = "burn-wgpu")]
impl SweBackend for burn_wgpu::Wgpu {
    fn default_device() -> Self::Device {
        burn_wgpu::WgpuDevice::default()
    }
}

#[cfg(feature = "burn-cuda")]
impl SweBackend for burn_cuda::Cuda {
    fn default_device() -> Self::Device {
        burn_cuda::CudaDevice::default()
    }
}

/// Upload a row-major host buffer as a 2D tensor.
pub fn tensor_from_slice<B: Backend>(
    data: &[f64],
    shape: [usize; 2],
    device: &B::Device,
) -> Result<Tensor<B, 2>, BurnError> {
    if data.len() != shape[0] * shape[1] {
        return Err(BurnError::dimension_mismatch(
            format!("{} values for shape {:?}", shape[0] * shape[1], shape),
            format!("{} values", data.len()),
        ));
    }
    let data = TensorData::new(data.to_vec(), shape.to_vec()).convert::<B::FloatElem>();
    Ok(Tensor::from_data(data, device))
}

/// Download a tensor to a row-major host buffer.
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f64>, BurnError> {
    tensor
        .into_data()
        .convert::<f64>()
        .to_vec::<f64>()
        .map_err(|e| BurnError::DataTransfer(format!("{:?}", e)))
}

/// Download a single-element tensor.
pub fn tensor_to_scalar<B: Backend>(tensor: Tensor<B, 1>) -> Result<f64, BurnError> {
    tensor_to_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| BurnError::DataTransfer("empty reduction result".into()))
}
