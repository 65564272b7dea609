use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::event::{EventKind, ModifyKind, RemoveKind};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use crate::space::FocusSpace;

/// 監控焦點空間檔案變更時可能回傳的錯誤。 / Error type for focus-space file monitoring.
#[derive(Debug, Error)]
pub enum SpaceMonitorError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
    #[error("monitor channel disconnected")]
    ChannelDisconnected,
}

/// 監控到的事件種類。 / Classifies observed file system changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceFileEventKind {
    Modified,
    Removed,
    Created,
    Renamed { from: PathBuf, to: PathBuf },
    Other,
}

/// 檔案事件的詳細資料。 / File event payload with resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceFileEvent {
    pub path: PathBuf,
    pub kind: SpaceFileEventKind,
}

/// 封裝 `notify` 監視器，追蹤焦點空間內的真實檔案。 / Thin wrapper around `notify` tracking the real files behind entries.
pub struct SpaceMonitor {
    watcher: RecommendedWatcher,
    rx: Receiver<SpaceFileEvent>,
}

impl SpaceMonitor {
    /// 建立新的監視器實例。 / Creates a new monitor instance.
    pub fn new() -> Result<Self, SpaceMonitorError> {
        let (tx, rx) = mpsc::channel();
        let watcher = RecommendedWatcher::new(
            move |res| {
                if let Ok(event) = res {
                    if let Some(mapped) = map_event(event) {
                        let _ = tx.send(mapped);
                    }
                }
            },
            Config::default(),
        )?;

        Ok(Self { watcher, rx })
    }

    /// 開始監看指定路徑。 / Starts watching the provided path.
    pub fn watch(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), SpaceMonitorError> {
        self.watcher
            .watch(path.as_ref(), RecursiveMode::NonRecursive)
            .map_err(SpaceMonitorError::from)
    }

    /// 停止監看指定路徑。 / Stops watching the provided path.
    pub fn unwatch(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), SpaceMonitorError> {
        self.watcher
            .unwatch(path.as_ref())
            .map_err(SpaceMonitorError::from)
    }

    /// 嘗試取得下一個事件（非阻塞）。 / Attempts to fetch the next event without blocking.
    pub fn try_next(&self) -> Option<SpaceFileEvent> {
        self.rx.try_recv().ok()
    }

    /// 在期限內等待事件，逾時回傳 `None`。 / Waits for an event until the timeout, returning `None` on timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<SpaceFileEvent>, SpaceMonitorError> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(SpaceMonitorError::ChannelDisconnected)
            }
        }
    }

    /// 在去抖動時間窗內收集一批事件；沒有事件時立即回傳空集合。
    /// Collects a burst of events inside a debounce window; returns an empty
    /// batch immediately when nothing is pending.
    pub fn drain_batch(&self, window: Duration, max: usize) -> Vec<SpaceFileEvent> {
        let Ok(first) = self.rx.try_recv() else {
            return Vec::new();
        };
        let deadline = Instant::now() + window;
        let mut batch = vec![first];
        while batch.len() < max {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(event) => batch.push(event),
                Err(_) => break,
            }
        }
        batch
    }
}

fn map_event(event: notify::Event) -> Option<SpaceFileEvent> {
    if event.paths.is_empty() {
        return None;
    }

    let primary = event.paths[0].clone();
    let kind = match event.kind {
        EventKind::Modify(ModifyKind::Name(_)) if event.paths.len() >= 2 => {
            let to = event.paths[1].clone();
            SpaceFileEventKind::Renamed {
                from: primary.clone(),
                to,
            }
        }
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Metadata(_)) => {
            SpaceFileEventKind::Modified
        }
        EventKind::Modify(ModifyKind::Any) => SpaceFileEventKind::Modified,
        EventKind::Create(_) => SpaceFileEventKind::Created,
        EventKind::Remove(RemoveKind::File)
        | EventKind::Remove(RemoveKind::Folder)
        | EventKind::Remove(RemoveKind::Any) => SpaceFileEventKind::Removed,
        _ => SpaceFileEventKind::Other,
    };

    let mut path = primary;
    if let SpaceFileEventKind::Renamed { to, .. } = &kind {
        path = to.clone();
    }

    Some(SpaceFileEvent { path, kind })
}

/// Applies external file-system changes to the space through its public
/// surface only: deletions drop every matching entry, renames relocate them.
/// Returns the number of entries touched.
/// 將外部檔案變更套用到焦點空間：刪除會移除條目、更名會改寫定位。
pub fn reconcile(space: &mut FocusSpace, events: &[SpaceFileEvent]) -> usize {
    let mut touched = 0;
    for event in events {
        match &event.kind {
            SpaceFileEventKind::Removed => {
                // editors emit remove events mid-save; only drop entries
                // whose file is really gone
                if !event.path.exists() {
                    touched += space.remove_by_locator(&event.path);
                }
            }
            SpaceFileEventKind::Renamed { from, to } => {
                touched += space.relocate(from, to);
            }
            SpaceFileEventKind::Modified
            | SpaceFileEventKind::Created
            | SpaceFileEventKind::Other => {}
        }
    }
    touched
}
