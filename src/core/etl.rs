use crate::core::Pipeline;
use crate::utils::error::{EtlError, Result};
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};

/// `Start → Seeding → Running → Completed`；任何非終止狀態出錯都進入 `Failed`。
/// 發布屬於 `Running`，只有發布成功才進入 `Completed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Seeding,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub location: String,
    pub total_records: usize,
    pub resumed_from: usize,
    pub translated_this_run: usize,
    pub fallback_fields: usize,
    pub failed_checkpoints: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
    history: Vec<PipelineState>,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
            history: vec![PipelineState::Start],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineState::Start)
    }

    /// 本次執行經過的所有狀態，依序
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!("State: {:?} → {:?}", self.state(), next);
        self.history.push(next);
    }

    pub async fn run(&mut self) -> Result<RunReport> {
        if self.state() != PipelineState::Start {
            return Err(EtlError::ProcessingError {
                message: format!("engine cannot run from state {:?}", self.state()),
            });
        }

        tracing::info!("🚀 Starting translation run");
        let started_at = Utc::now();

        match self.run_phases(started_at).await {
            Ok(report) => {
                self.monitor.log_final_stats();
                Ok(report)
            }
            Err(e) => {
                tracing::error!(
                    "❌ Run failed in state {:?}: {} (Category: {:?}, Severity: {:?})",
                    self.state(),
                    e,
                    e.category(),
                    e.severity()
                );
                self.transition(PipelineState::Failed);
                self.monitor.log_final_stats();
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self, started_at: DateTime<Utc>) -> Result<RunReport> {
        // Start: 取得來源集合
        tracing::info!("Extracting records...");
        let records = self.pipeline.extract().await?;
        let total_records = records.len();
        self.monitor.log_stats("Extract");

        self.transition(PipelineState::Seeding);
        let job = self.pipeline.seed(records).await?;

        self.transition(PipelineState::Running);
        tracing::info!(
            "Translating records {}..{} of {}",
            job.index(),
            job.total(),
            job.total()
        );
        let result = self.pipeline.transform(job).await?;
        self.monitor.log_stats("Transform");

        let resumed_from = result.resumed_from;
        let translated_this_run = result.translated_this_run;
        let fallback_fields = result.fallback_fields;
        let failed_checkpoints = result.failed_checkpoints;

        tracing::info!("Publishing {} records...", result.processed_records.len());
        let location = self.pipeline.load(result).await?;
        self.monitor.log_stats("Load");
        self.transition(PipelineState::Completed);

        if failed_checkpoints > 0 {
            tracing::error!(
                "❌ {} checkpoint writes failed during this run; an interruption would have lost progress",
                failed_checkpoints
            );
        }
        tracing::info!("✅ Published to {}", location);

        Ok(RunReport {
            location,
            total_records,
            resumed_from,
            translated_this_run,
            fallback_fields,
            failed_checkpoints,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Record, TransformResult, TranslationJob};
    use async_trait::async_trait;
    use serde_json::json;

    enum FailAt {
        Nowhere,
        Extract,
        Transform,
        Load,
    }

    struct ScriptedPipeline {
        fail_at: FailAt,
    }

    fn failure(phase: &str) -> EtlError {
        EtlError::ProcessingError {
            message: format!("{} failed", phase),
        }
    }

    #[async_trait]
    impl Pipeline for ScriptedPipeline {
        async fn extract(&self) -> Result<Vec<Record>> {
            if matches!(self.fail_at, FailAt::Extract) {
                return Err(EtlError::SourceError {
                    message: "401 Unauthorized".to_string(),
                });
            }
            Ok(vec![Record::from_value(json!({"question": "Q"}))?])
        }

        async fn seed(&self, records: Vec<Record>) -> Result<TranslationJob> {
            Ok(TranslationJob::new(records, 10))
        }

        async fn transform(&self, job: TranslationJob) -> Result<TransformResult> {
            if matches!(self.fail_at, FailAt::Transform) {
                return Err(failure("transform"));
            }
            Ok(TransformResult {
                processed_records: job.into_translated(),
                description: String::new(),
                resumed_from: 0,
                translated_this_run: 1,
                fallback_fields: 0,
                failed_checkpoints: 0,
            })
        }

        async fn load(&self, _result: TransformResult) -> Result<String> {
            if matches!(self.fail_at, FailAt::Load) {
                return Err(failure("load"));
            }
            Ok("memory://out".to_string())
        }
    }

    #[tokio::test]
    async fn test_successful_run_ends_completed() {
        let mut engine = EtlEngine::new(ScriptedPipeline {
            fail_at: FailAt::Nowhere,
        });

        let report = engine.run().await.unwrap();

        assert_eq!(engine.state(), PipelineState::Completed);
        assert_eq!(
            engine.history(),
            &[
                PipelineState::Start,
                PipelineState::Seeding,
                PipelineState::Running,
                PipelineState::Completed
            ]
        );
        assert_eq!(report.location, "memory://out");
        assert_eq!(report.total_records, 1);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn test_failures_in_any_phase_end_failed() {
        for fail_at in [FailAt::Extract, FailAt::Transform, FailAt::Load] {
            let mut engine = EtlEngine::new(ScriptedPipeline { fail_at });
            assert!(engine.run().await.is_err());
            assert_eq!(engine.state(), PipelineState::Failed);
        }
    }

    #[tokio::test]
    async fn test_publish_failure_never_reaches_completed() {
        let mut engine = EtlEngine::new(ScriptedPipeline {
            fail_at: FailAt::Load,
        });
        assert!(engine.run().await.is_err());

        assert_eq!(
            engine.history(),
            &[
                PipelineState::Start,
                PipelineState::Seeding,
                PipelineState::Running,
                PipelineState::Failed
            ]
        );
        assert!(!engine.history().contains(&PipelineState::Completed));
    }

    #[tokio::test]
    async fn test_failed_engine_cannot_run_again() {
        let mut engine = EtlEngine::new(ScriptedPipeline {
            fail_at: FailAt::Extract,
        });
        assert!(engine.run().await.is_err());

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, EtlError::ProcessingError { .. }));
        assert_eq!(engine.state(), PipelineState::Failed);
    }
}
