use crate::domain::ports::TranslationService;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// 單次欄位翻譯的重試與限速參數
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub rate_limit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            rate_limit_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// 測試用：不等待
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_delay: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Empty,
    Translated(String),
    /// 所有嘗試都失敗，保留原文
    Fallback(String),
}

impl TranslationOutcome {
    pub fn into_text(self) -> String {
        match self {
            TranslationOutcome::Empty => String::new(),
            TranslationOutcome::Translated(text) | TranslationOutcome::Fallback(text) => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TranslationOutcome::Fallback(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslatorStats {
    pub attempts: usize,
    pub translated: usize,
    pub fallbacks: usize,
    pub skipped_empty: usize,
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicUsize,
    translated: AtomicUsize,
    fallbacks: AtomicUsize,
    skipped_empty: AtomicUsize,
}

/// 包裝一次翻譯服務呼叫：有上限的重試、重試間隔、成功後限速。
///
/// 失敗永遠不會穿過這一層；所有嘗試失敗時返回原文並記錄 warning，
/// 讓單一欄位的問題不會中止整批工作。
pub struct FieldTranslator<T: TranslationService> {
    service: T,
    policy: RetryPolicy,
    counters: Counters,
}

impl<T: TranslationService> FieldTranslator<T> {
    pub fn new(service: T, policy: RetryPolicy) -> Self {
        Self {
            service,
            policy,
            counters: Counters::default(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn service(&self) -> &T {
        &self.service
    }

    pub async fn translate(&self, text: &str) -> String {
        self.translate_outcome(text).await.into_text()
    }

    pub async fn translate_outcome(&self, text: &str) -> TranslationOutcome {
        if text.is_empty() {
            self.counters.skipped_empty.fetch_add(1, Ordering::Relaxed);
            return TranslationOutcome::Empty;
        }

        let attempts = self.policy.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            self.counters.attempts.fetch_add(1, Ordering::Relaxed);

            match self.service.translate(text).await {
                Ok(translated) => {
                    self.counters.translated.fetch_add(1, Ordering::Relaxed);
                    if !self.policy.rate_limit_delay.is_zero() {
                        tokio::time::sleep(self.policy.rate_limit_delay).await;
                    }
                    return TranslationOutcome::Translated(translated);
                }
                Err(e) => {
                    tracing::debug!(
                        "Translation attempt {}/{} failed: {}",
                        attempt,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                    if attempt < attempts && !self.policy.retry_delay.is_zero() {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            "⚠️ Failed to translate after {} attempts, keeping original: {}... Error: {}",
            attempts,
            preview(text, 50),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        );
        TranslationOutcome::Fallback(text.to_string())
    }

    pub fn stats(&self) -> TranslatorStats {
        TranslatorStats {
            attempts: self.counters.attempts.load(Ordering::Relaxed),
            translated: self.counters.translated.load(Ordering::Relaxed),
            fallbacks: self.counters.fallbacks.load(Ordering::Relaxed),
            skipped_empty: self.counters.skipped_empty.load(Ordering::Relaxed),
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
