use crate::core::checkpoint::CheckpointManager;
use crate::core::dataset_card::{create_dataset_description, CardInfo};
use crate::core::mapper::StructuralMapper;
use crate::domain::model::{PublishRequest, Record, TransformResult, TranslationJob};
use crate::domain::ports::{DatasetSink, DatasetSource, Pipeline, Storage, TranslationService};
use crate::utils::error::Result;
use crate::utils::progress::RecordProgress;
use chrono::Utc;

#[derive(Debug, Clone)]
pub struct PublishTarget {
    pub repo_name: String,
    pub private: bool,
    pub commit_message: String,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub checkpoint_interval: usize,
    /// 是否在終端顯示逐筆進度條
    pub show_progress: bool,
    pub publish: PublishTarget,
    pub card: CardInfo,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            checkpoint_interval: 100,
            show_progress: false,
            publish: PublishTarget {
                repo_name: "bengali-morehopqa".to_string(),
                private: false,
                commit_message: "Add Bengali translation of MoreHopQA".to_string(),
            },
            card: CardInfo::default(),
        }
    }
}

/// 斷點續傳的翻譯 pipeline：extract → seed → transform → load
pub struct TranslationPipeline<T, Src, Snk, S>
where
    T: TranslationService,
    Src: DatasetSource,
    Snk: DatasetSink,
    S: Storage,
{
    source: Src,
    sink: Snk,
    mapper: StructuralMapper<T>,
    checkpoints: CheckpointManager<S>,
    settings: PipelineSettings,
}

impl<T, Src, Snk, S> TranslationPipeline<T, Src, Snk, S>
where
    T: TranslationService,
    Src: DatasetSource,
    Snk: DatasetSink,
    S: Storage,
{
    pub fn new(
        source: Src,
        sink: Snk,
        mapper: StructuralMapper<T>,
        checkpoints: CheckpointManager<S>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            sink,
            mapper,
            checkpoints,
            settings,
        }
    }

    pub fn mapper(&self) -> &StructuralMapper<T> {
        &self.mapper
    }

    pub fn sink(&self) -> &Snk {
        &self.sink
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
}

#[async_trait::async_trait]
impl<T, Src, Snk, S> Pipeline for TranslationPipeline<T, Src, Snk, S>
where
    T: TranslationService,
    Src: DatasetSource,
    Snk: DatasetSink,
    S: Storage,
{
    async fn extract(&self) -> Result<Vec<Record>> {
        let records = self.source.fetch().await?;
        tracing::info!("📥 Source returned {} records", records.len());
        Ok(records)
    }

    async fn seed(&self, records: Vec<Record>) -> Result<TranslationJob> {
        let interval = self.settings.checkpoint_interval;

        match self.checkpoints.load().await? {
            Some(checkpoint) => {
                let index = checkpoint.index();
                let job = TranslationJob::resume(records, checkpoint, interval)?;
                if job.is_complete() {
                    tracing::info!(
                        "✅ Checkpoint {} already covers all {} records",
                        index,
                        job.total()
                    );
                } else {
                    tracing::info!("🔁 Resuming from record {}/{}", index, job.total());
                }
                Ok(job)
            }
            None => {
                tracing::info!(
                    "🆕 No checkpoint found in '{}', starting from record 0",
                    self.checkpoints.dir()
                );
                Ok(TranslationJob::new(records, interval))
            }
        }
    }

    async fn transform(&self, job: TranslationJob) -> Result<TransformResult> {
        let mut job = job;
        let resumed_from = job.index();
        let fallbacks_before = self.mapper.fallback_fields();
        let mut failed_checkpoints = 0;
        let progress = RecordProgress::new(resumed_from, job.total(), self.settings.show_progress);

        while let Some(record) = job.next_record() {
            let index = job.index();
            let translated = match self.mapper.map(record).await {
                Ok(translated) => translated,
                Err(e) => {
                    progress.abandon();
                    let e = e.at_record(index);
                    tracing::error!("❌ Aborting at record {}: {}", index, e);
                    return Err(e);
                }
            };

            let at_checkpoint = job.advance(translated);
            progress.record_done();

            if at_checkpoint {
                tracing::info!("Progress: {}/{} records translated", job.index(), job.total());
                // 寫入失敗不中止工作，但必須以 error 級別顯示
                if let Err(e) = self.checkpoints.save(&job).await {
                    failed_checkpoints += 1;
                    tracing::error!(
                        "❌ Checkpoint at record {} could not be written, continuing in memory only: {}",
                        job.index(),
                        e
                    );
                }
            }
        }

        progress.finish();

        let translated_this_run = job.index() - resumed_from;
        let fallback_fields = self.mapper.fallback_fields() - fallbacks_before;
        let processed_records = job.into_translated();
        let description = create_dataset_description(
            &self.settings.card,
            processed_records.len(),
            Utc::now(),
        );

        if fallback_fields > 0 {
            tracing::warn!(
                "⚠️ {} fields kept their original text after exhausting retries",
                fallback_fields
            );
        }

        Ok(TransformResult {
            processed_records,
            description,
            resumed_from,
            translated_this_run,
            fallback_fields,
            failed_checkpoints,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let target = &self.settings.publish;
        let request = PublishRequest {
            repo_name: target.repo_name.clone(),
            private: target.private,
            commit_message: target.commit_message.clone(),
            description: Some(result.description),
        };

        self.sink.publish(&result.processed_records, &request).await
    }
}
