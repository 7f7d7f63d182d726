#[cfg(feature = "cli")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::Instant;
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// 每個階段結束時記錄本行程的 CPU 與記憶體用量
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    // 停用或取不到 PID 時為 None
    process: Option<ProcessSampler>,
    started: Instant,
}

#[cfg(feature = "cli")]
struct ProcessSampler {
    pid: Pid,
    system: Mutex<System>,
    peak_memory_mb: AtomicU64,
}

#[cfg(feature = "cli")]
struct Sample {
    cpu_usage: f32,
    memory_mb: u64,
    peak_memory_mb: u64,
}

#[cfg(feature = "cli")]
impl ProcessSampler {
    fn current() -> Option<Self> {
        match sysinfo::get_current_pid() {
            Ok(pid) => Some(Self {
                pid,
                system: Mutex::new(System::new()),
                peak_memory_mb: AtomicU64::new(0),
            }),
            Err(e) => {
                tracing::warn!("System monitoring unavailable: {}", e);
                None
            }
        }
    }

    fn sample(&self) -> Option<Sample> {
        let mut system = self.system.lock().ok()?;
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = system.process(self.pid)?;

        let memory_mb = process.memory() / 1024 / 1024;
        let peak = self.peak_memory_mb.fetch_max(memory_mb, Ordering::Relaxed);
        Some(Sample {
            cpu_usage: process.cpu_usage(),
            memory_mb,
            peak_memory_mb: peak.max(memory_mb),
        })
    }
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let process = if enabled { ProcessSampler::current() } else { None };
        if let Some(sampler) = &process {
            // 先取一次樣本，之後的 CPU 使用率才有基準
            let _ = sampler.sample();
        }
        Self {
            process,
            started: Instant::now(),
        }
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(sample) = self.process.as_ref().and_then(ProcessSampler::sample) {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                sample.cpu_usage,
                sample.memory_mb,
                sample.peak_memory_mb,
                self.started.elapsed()
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(sample) = self.process.as_ref().and_then(ProcessSampler::sample) {
            tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                self.started.elapsed(),
                sample.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.process.is_some()
    }
}

// 非 CLI 環境提供空實現
#[cfg(not(feature = "cli"))]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
