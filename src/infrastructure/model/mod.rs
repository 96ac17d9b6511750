mod http_weight_fetcher;
mod nvidia_smi_probe;

pub use http_weight_fetcher::HttpWeightFetcher;
pub use nvidia_smi_probe::{NvidiaSmiProbe, StaticDeviceProbe};
