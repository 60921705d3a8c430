use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

use crate::config::ModelConfig;
use crate::inference::model::{Classifier, InferenceError, ModelLoadError};
use crate::inference::preprocess::ImageTensor;

/// TorchScript classifier. Forward passes are serialized through the mutex.
pub struct TorchClassifier {
    module: Mutex<CModule>,
    device: Device,
    apply_softmax: bool,
}

impl TorchClassifier {
    pub fn load(config: &ModelConfig) -> Result<Self, ModelLoadError> {
        let device = Device::cuda_if_available();
        let mut module = CModule::load_on_device(&config.path, device)
            .map_err(|e| ModelLoadError::Backend(e.to_string()))?;
        module.set_eval();
        log::info!("TorchScript module loaded on {:?}", device);

        Ok(Self {
            module: Mutex::new(module),
            device,
            apply_softmax: config.apply_softmax,
        })
    }
}

impl Classifier for TorchClassifier {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let (batch, height, width, channels) = input.dim();
        let data = input
            .as_slice()
            .ok_or_else(|| InferenceError::Model("input tensor is not contiguous".into()))?;
        let tensor = Tensor::from_slice(data)
            .view([batch as i64, height as i64, width as i64, channels as i64])
            .to_device(self.device);

        let module = self
            .module
            .lock()
            .map_err(|_| InferenceError::Model("model lock poisoned".into()))?;
        let output = tch::no_grad(|| module.forward_ts(&[tensor]))
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        let output = if self.apply_softmax {
            output.softmax(-1, Kind::Float)
        } else {
            output
        };
        let output = output.to_kind(Kind::Float).to_device(Device::Cpu).view([-1]);

        Vec::<f32>::try_from(&output).map_err(|e| InferenceError::Model(e.to_string()))
    }
}
