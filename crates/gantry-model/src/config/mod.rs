mod deploy;
pub use deploy::{
    DeployConfig, EndpointConfig, ScalerPolicy, TemplateConfig, VerifyConfig, VolumeConfig,
};
