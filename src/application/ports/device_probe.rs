use async_trait::async_trait;

#[async_trait]
pub trait DeviceProbe: Send + Sync {
    async fn cuda_available(&self) -> bool;
}
