use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "cli")]
use indicatif::{ProgressBar, ProgressStyle};

/// 逐筆翻譯進度：每筆記錄一行 debug 日誌，CLI 下另顯示進度條
pub struct RecordProgress {
    position: AtomicUsize,
    total: usize,
    #[cfg(feature = "cli")]
    bar: Option<ProgressBar>,
}

impl RecordProgress {
    /// `start` 為續傳起點，進度條從該位置開始
    pub fn new(start: usize, total: usize, visible: bool) -> Self {
        #[cfg(not(feature = "cli"))]
        let _ = visible;

        Self {
            position: AtomicUsize::new(start),
            total,
            #[cfg(feature = "cli")]
            bar: visible.then(|| progress_bar(start, total)),
        }
    }

    /// 一筆記錄翻譯完成，返回新的位置
    pub fn record_done(&self) -> usize {
        let position = self.position.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!("Translated record {}/{}", position, self.total);

        #[cfg(feature = "cli")]
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
        position
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finish(&self) {
        #[cfg(feature = "cli")]
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// 出錯時保留進度條停在當下位置
    pub fn abandon(&self) {
        #[cfg(feature = "cli")]
        if let Some(bar) = &self.bar {
            bar.abandon();
        }
    }
}

#[cfg(feature = "cli")]
fn progress_bar(start: usize, total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({percent}%) {msg} {eta}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style.progress_chars("█▓▒░"));
    bar.set_position(start as u64);
    bar.set_message("Translating dataset");
    bar
}
