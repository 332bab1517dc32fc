//! File-backed inter-agent message channels.
//!
//! Two JSON documents under a configurable directory hold all channel
//! state: `channels.json` (pending queues, listener counts, activity
//! timestamps) and `history.json` (bounded per-channel history). Both are
//! read under shared locks and written under exclusive locks held across
//! the whole read-modify-write, the same "load whole doc, mutate, write
//! whole doc" discipline as `sa_sessions::store::SessionStore::flush`,
//! using the same `fs2` advisory locking the teacher already reaches for
//! in its OAuth token store and PID file.

use std::collections::{HashMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use hub_domain::config::ChannelsConfig;
use hub_domain::entities::{Channel, Message};
use hub_domain::error::{Error, Result};
use hub_domain::trace::TraceEvent;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// On-disk record for one channel's live queue, stored in `channels.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ChannelRecord {
    pending: VecDeque<Message>,
    listener_count: u32,
    last_activity: Option<DateTime<Utc>>,
}

type ChannelsDoc = HashMap<String, ChannelRecord>;
type HistoryDoc = HashMap<String, VecDeque<Message>>;

/// Outcome of a `listen()` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenOutcome {
    Message(Message),
    Timeout,
}

/// File-backed hub for named inter-agent channels.
///
/// Holds no in-process cache of channel state — every operation is a
/// read-modify-write against the two on-disk documents, per the
/// concurrency model's "no in-process cache" rule for channel files.
pub struct ChannelHub {
    channels_path: PathBuf,
    history_path: PathBuf,
    history_capacity: usize,
    poll_interval: Duration,
}

impl ChannelHub {
    pub fn new(config: &ChannelsConfig) -> Self {
        Self {
            channels_path: config.channels_path.clone(),
            history_path: config.history_path.clone(),
            history_capacity: config.history_capacity,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Low-level document I/O
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Load a document under an exclusive lock, run `f` against it, then
    /// write the (possibly mutated) document back before releasing the
    /// lock on drop. Corrupt JSON is treated as empty state and rebuilt
    /// from the next write, per the channel subsystem's failure semantics.
    fn mutate<T, R>(path: &Path, f: impl FnOnce(&mut T) -> R) -> Result<R>
    where
        T: Default + Serialize + DeserializeOwned,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(Error::Io)?;
        file.lock_exclusive()
            .map_err(|e| Error::Channel(format!("locking {}: {e}", path.display())))?;

        let mut raw = String::new();
        file.read_to_string(&mut raw).map_err(Error::Io)?;
        let mut doc: T = if raw.trim().is_empty() {
            T::default()
        } else {
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "corrupt channel document, rebuilding");
                T::default()
            })
        };

        let result = f(&mut doc);

        let json = serde_json::to_string_pretty(&doc).map_err(Error::Json)?;
        file.seek(SeekFrom::Start(0)).map_err(Error::Io)?;
        file.set_len(0).map_err(Error::Io)?;
        file.write_all(json.as_bytes()).map_err(Error::Io)?;
        file.flush().map_err(Error::Io)?;
        // Exclusive lock releases when `file` drops here.
        Ok(result)
    }

    /// Read a document under a shared lock, for operations that never mutate.
    fn read_shared<T: Default + DeserializeOwned>(path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        let mut file = File::open(path).map_err(Error::Io)?;
        file.lock_shared()
            .map_err(|e| Error::Channel(format!("locking {}: {e}", path.display())))?;
        let mut raw = String::new();
        file.read_to_string(&mut raw).map_err(Error::Io)?;
        FileExt::unlock(&file)
            .map_err(|e| Error::Channel(format!("unlocking {}: {e}", path.display())))?;
        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "corrupt channel document, treating as empty");
            T::default()
        }))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Operations (spec.md §4.9)
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn send(
        &self,
        channel: &str,
        content: serde_json::Value,
        metadata: serde_json::Value,
        sender_id: &str,
    ) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            content,
            sender_instance_id: sender_id.to_string(),
            timestamp: Utc::now(),
            in_reply_to: None,
            metadata,
        };

        let channels_path = self.channels_path.clone();
        let message_clone = message.clone();
        Self::mutate::<ChannelsDoc, _>(&channels_path, |doc| {
            let record = doc.entry(channel.to_string()).or_default();
            record.pending.push_back(message_clone.clone());
            record.last_activity = Some(message_clone.timestamp);
        })?;

        let capacity = self.history_capacity;
        let message_clone = message.clone();
        Self::mutate::<HistoryDoc, _>(&self.history_path, |doc| {
            let history = doc.entry(channel.to_string()).or_default();
            history.push_back(message_clone);
            while history.len() > capacity {
                history.pop_front();
            }
        })?;

        TraceEvent::ChannelMessageSent {
            channel: channel.to_string(),
            sender: sender_id.to_string(),
            message_id: message.id.to_string(),
        }
        .emit();

        Ok(message)
    }

    fn try_pop(&self, channel: &str) -> Result<Option<Message>> {
        Self::mutate::<ChannelsDoc, _>(&self.channels_path, |doc| {
            doc.entry(channel.to_string())
                .or_default()
                .pending
                .pop_front()
        })
    }

    fn increment_listener(&self, channel: &str) -> Result<()> {
        Self::mutate::<ChannelsDoc, _>(&self.channels_path, |doc| {
            doc.entry(channel.to_string()).or_default().listener_count += 1;
        })
    }

    fn decrement_listener(&self, channel: &str) -> Result<()> {
        Self::mutate::<ChannelsDoc, _>(&self.channels_path, |doc| {
            if let Some(record) = doc.get_mut(channel) {
                record.listener_count = record.listener_count.saturating_sub(1);
            }
        })
    }

    /// Poll `pending` at the configured interval until a message arrives or
    /// `timeout` elapses. The listener count is incremented for the
    /// duration of the call and always decremented on return, mirroring a
    /// `finally` block — best-effort: a crash mid-listen may leave the
    /// count over-reported until `cleanup()` reclaims the channel.
    pub async fn listen(&self, channel: &str, timeout: Duration) -> Result<ListenOutcome> {
        self.increment_listener(channel)?;

        TraceEvent::ChannelListenerAttached {
            channel: channel.to_string(),
            listener: "anonymous".to_string(),
        }
        .emit();

        let deadline = Instant::now() + timeout;
        let outcome = loop {
            if let Some(message) = self.try_pop(channel)? {
                break Ok(ListenOutcome::Message(message));
            }
            if Instant::now() >= deadline {
                break Ok(ListenOutcome::Timeout);
            }
            tokio::time::sleep(self.poll_interval).await;
        };

        if let Err(e) = self.decrement_listener(channel) {
            tracing::warn!(channel, error = %e, "failed to decrement listener count");
        }

        outcome
    }

    pub fn history(&self, channel: &str, limit: usize) -> Result<Vec<Message>> {
        let doc: HistoryDoc = Self::read_shared(&self.history_path)?;
        let history = doc.get(channel).cloned().unwrap_or_default();
        let skip = history.len().saturating_sub(limit);
        Ok(history.into_iter().skip(skip).collect())
    }

    /// Empties both pending and history; the channel record itself survives
    /// so a subsequent `send` finds an existing (empty) entry rather than
    /// fabricating a brand new one with a reset listener count.
    pub fn clear(&self, channel: &str) -> Result<()> {
        Self::mutate::<ChannelsDoc, _>(&self.channels_path, |doc| {
            if let Some(record) = doc.get_mut(channel) {
                record.pending.clear();
            }
        })?;
        Self::mutate::<HistoryDoc, _>(&self.history_path, |doc| {
            doc.insert(channel.to_string(), VecDeque::new());
        })?;
        Ok(())
    }

    pub fn active_channels(&self) -> Result<Vec<Channel>> {
        let channels: ChannelsDoc = Self::read_shared(&self.channels_path)?;
        let history: HistoryDoc = Self::read_shared(&self.history_path)?;

        let mut names: Vec<&String> = channels.keys().collect();
        for name in history.keys() {
            if !channels.contains_key(name) {
                names.push(name);
            }
        }

        Ok(names
            .into_iter()
            .map(|name| {
                let record = channels.get(name).cloned().unwrap_or_default();
                Channel {
                    name: name.clone(),
                    pending: record.pending,
                    history: history.get(name).cloned().unwrap_or_default(),
                    listener_count: record.listener_count,
                    last_activity: record.last_activity,
                }
            })
            .collect())
    }

    pub async fn send_with_reply(
        &self,
        channel: &str,
        content: serde_json::Value,
        metadata: serde_json::Value,
        sender_id: &str,
        reply_timeout: Duration,
    ) -> Result<ListenOutcome> {
        let message = self.send(channel, content, metadata, sender_id)?;
        let reply_channel = format!("{channel}:reply:{}", message.id);
        self.listen(&reply_channel, reply_timeout).await
    }

    pub fn send_reply(
        &self,
        original_message_id: Uuid,
        reply_channel: &str,
        content: serde_json::Value,
        sender_id: &str,
    ) -> Result<Message> {
        let channel = format!("{reply_channel}:reply:{original_message_id}");
        self.send(&channel, content, serde_json::json!({}), sender_id)
    }

    /// Remove channels whose `last_activity` is older than `inactive_hours`
    /// and that have no active listeners. Returns the number removed.
    pub fn cleanup(&self, inactive_hours: i64) -> Result<usize> {
        let threshold = Utc::now() - chrono::Duration::hours(inactive_hours);
        let stale: Vec<String> = Self::mutate::<ChannelsDoc, _>(&self.channels_path, |doc| {
            let stale: Vec<String> = doc
                .iter()
                .filter(|(_, record)| {
                    record.listener_count == 0
                        && record.last_activity.map(|t| t < threshold).unwrap_or(true)
                })
                .map(|(name, _)| name.clone())
                .collect();
            for name in &stale {
                doc.remove(name);
            }
            stale
        })?;

        if !stale.is_empty() {
            Self::mutate::<HistoryDoc, _>(&self.history_path, |doc| {
                for name in &stale {
                    doc.remove(name);
                }
            })?;
        }

        Ok(stale.len())
    }
}
