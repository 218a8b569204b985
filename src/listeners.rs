//! Event listeners for desktop platforms.
//!
//! Mobile plugins get `addPluginListener` support from the native side. On
//! desktop the webview registers an IPC channel here instead, and the bridge
//! pushes shared content through it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tauri::ipc::Channel;
use tauri::State;

use crate::bridge::Notifier;
use crate::models::SharedContent;
use crate::{Error, Result};

type ChannelMap = HashMap<u32, Channel<serde_json::Value>>;
type ListenerMap = HashMap<String, ChannelMap>;

/// Channels registered per event name.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<RwLock<ListenerMap>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, event: String, channel: Channel<serde_json::Value>) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|e| Error::NativeApi(format!("Failed to acquire write lock: {e}")))?;
        guard.entry(event).or_default().insert(channel.id(), channel);
        Ok(())
    }

    pub fn remove(&self, event: &str, channel_id: u32) -> Result<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|e| Error::NativeApi(format!("Failed to acquire write lock: {e}")))?;
        if let Some(channels) = guard.get_mut(event) {
            channels.remove(&channel_id);
            if channels.is_empty() {
                guard.remove(event);
            }
        }
        Ok(())
    }

    pub fn count(&self, event: &str) -> usize {
        self.inner
            .read()
            .map(|guard| guard.get(event).map_or(0, HashMap::len))
            .unwrap_or(0)
    }
}

impl Notifier for Listeners {
    fn notify(&self, event: &str, content: &SharedContent) -> Result<usize> {
        let value = serde_json::to_value(content)?;
        let guard = self
            .inner
            .read()
            .map_err(|e| Error::NativeApi(format!("Failed to acquire read lock: {e}")))?;
        let mut reached = 0;
        for channel in guard.get(event).into_iter().flat_map(HashMap::values) {
            match channel.send(value.clone()) {
                Ok(()) => reached += 1,
                Err(e) => log::warn!("failed to deliver {event} to channel {}: {e}", channel.id()),
            }
        }
        Ok(reached)
    }
}

#[tauri::command]
pub(crate) fn register_listener(
    listeners: State<'_, Listeners>,
    event: String,
    handler: Channel<serde_json::Value>,
) -> Result<()> {
    listeners.register(event, handler)
}

#[tauri::command]
pub(crate) fn remove_listener(
    listeners: State<'_, Listeners>,
    event: String,
    channel_id: u32,
) -> Result<()> {
    listeners.remove(&event, channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tauri::ipc::InvokeResponseBody;

    fn recording_channel(sink: Arc<Mutex<Vec<String>>>) -> Channel<serde_json::Value> {
        Channel::new(move |body| {
            if let InvokeResponseBody::Json(json) = body {
                sink.lock().unwrap().push(json);
            }
            Ok(())
        })
    }

    #[test]
    fn registered_channels_receive_content() {
        let listeners = Listeners::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        listeners
            .register("sharedContent".into(), recording_channel(received.clone()))
            .unwrap();

        let reached = listeners
            .notify("sharedContent", &SharedContent::text("hi"))
            .unwrap();
        assert_eq!(reached, 1);
        let reached = listeners.notify("otherEvent", &SharedContent::text("no")).unwrap();
        assert_eq!(reached, 0);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "text", "text": "hi" }));
    }

    #[test]
    fn removed_channels_stop_receiving() {
        let listeners = Listeners::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let channel = recording_channel(received.clone());
        let id = channel.id();
        listeners.register("sharedContent".into(), channel).unwrap();
        assert_eq!(listeners.count("sharedContent"), 1);

        listeners.remove("sharedContent", id).unwrap();
        assert_eq!(listeners.count("sharedContent"), 0);
        listeners
            .notify("sharedContent", &SharedContent::text("late"))
            .unwrap();
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn notify_without_listeners_reaches_nobody() {
        let listeners = Listeners::new();
        let reached = listeners
            .notify("sharedContent", &SharedContent::text("nobody"))
            .unwrap();
        assert_eq!(reached, 0);
    }
}
