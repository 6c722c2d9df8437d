//! Loaded-model cache keyed by device.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use crate::config::Device;
use crate::error::{SpeechError, SpeechResult};

/// A model resident in the inference service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelHandle {
    pub model_id: String,
    pub device: Device,
}

/// Loads each device's model at most once.
///
/// Concurrent callers for the same device wait on a single load. A failed
/// load leaves the slot empty so the next caller tries again.
#[derive(Debug, Default)]
pub struct ModelCache {
    slots: Mutex<HashMap<Device, Arc<OnceCell<ModelHandle>>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load<F, Fut>(&self, device: Device, load: F) -> SpeechResult<ModelHandle>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SpeechResult<ModelHandle>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(device).or_default().clone()
        };

        let handle = slot
            .get_or_try_init(|| async {
                let handle = load().await?;
                info!(device = %device, model_id = %handle.model_id, "Speech model loaded");
                Ok::<_, SpeechError>(handle)
            })
            .await?;
        Ok(handle.clone())
    }

    pub async fn get(&self, device: Device) -> Option<ModelHandle> {
        let slots = self.slots.lock().await;
        slots.get(&device).and_then(|slot| slot.get().cloned())
    }

    /// Forget a device's model, e.g. after the service restarted.
    pub async fn evict(&self, device: Device) {
        self.slots.lock().await.remove(&device);
    }
}
