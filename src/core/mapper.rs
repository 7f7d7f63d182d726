use crate::core::translator::{FieldTranslator, TranslationOutcome};
use crate::domain::model::{json_type_name, Record};
use crate::domain::ports::TranslationService;
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    ScalarText,
    ContextStructure,
    DecompositionList,
    Verbatim,
}

/// 每個已知欄位的處理方式；不在表內的欄位一律原樣複製
pub const TRANSFORM_TABLE: &[(&str, TransformKind)] = &[
    ("question", TransformKind::ScalarText),
    ("answer", TransformKind::ScalarText),
    ("previous_question", TransformKind::ScalarText),
    ("previous_answer", TransformKind::ScalarText),
    ("question_on_last_hop", TransformKind::ScalarText),
    ("context", TransformKind::ContextStructure),
    ("question_decomposition", TransformKind::DecompositionList),
    ("answer_type", TransformKind::Verbatim),
    ("previous_answer_type", TransformKind::Verbatim),
    ("no_of_hops", TransformKind::Verbatim),
    ("reasoning_type", TransformKind::Verbatim),
];

pub const CONTEXT_TITLE: &str = "title";
pub const CONTEXT_PARAGRAPHS: &str = "paragraphs";

pub const DECOMPOSITION_ID: &str = "sub_id";
pub const DECOMPOSITION_TEXT_FIELDS: [&str; 3] = ["question", "answer", "paragraph_support_title"];

pub fn transform_kind(field: &str) -> TransformKind {
    TRANSFORM_TABLE
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
        .unwrap_or(TransformKind::Verbatim)
}

/// 依 transform table 走訪一筆記錄，所有副作用都經由 [`FieldTranslator`]
pub struct StructuralMapper<T: TranslationService> {
    translator: FieldTranslator<T>,
    fallback_fields: AtomicUsize,
}

impl<T: TranslationService> StructuralMapper<T> {
    pub fn new(translator: FieldTranslator<T>) -> Self {
        Self {
            translator,
            fallback_fields: AtomicUsize::new(0),
        }
    }

    pub fn translator(&self) -> &FieldTranslator<T> {
        &self.translator
    }

    /// 因翻譯失敗而保留原文的欄位數
    pub fn fallback_fields(&self) -> usize {
        self.fallback_fields.load(Ordering::Relaxed)
    }

    pub async fn map(&self, record: &Record) -> Result<Record> {
        let mut output = Map::with_capacity(record.len());

        for (key, value) in &record.data {
            let mapped = match transform_kind(key) {
                TransformKind::ScalarText => self.map_text(key, value).await?,
                TransformKind::ContextStructure => self.map_context(key, value).await?,
                TransformKind::DecompositionList => self.map_decomposition(key, value).await?,
                TransformKind::Verbatim => value.clone(),
            };
            output.insert(key.clone(), mapped);
        }

        Ok(Record::new(output))
    }

    async fn map_text(&self, field: &str, value: &Value) -> Result<Value> {
        let text = match value {
            Value::String(s) => s.as_str(),
            Value::Null => "",
            other => {
                return Err(EtlError::schema(
                    field,
                    format!("expected text, found {}", json_type_name(other)),
                ))
            }
        };

        let outcome = self.translator.translate_outcome(text).await;
        if outcome.is_fallback() {
            self.fallback_fields.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Value::String(outcome.into_text()))
    }

    async fn map_context(&self, field: &str, value: &Value) -> Result<Value> {
        let context = value.as_object().ok_or_else(|| {
            EtlError::schema(
                field,
                format!("expected an object, found {}", json_type_name(value)),
            )
        })?;

        let title = context
            .get(CONTEXT_TITLE)
            .ok_or_else(|| EtlError::schema(field, "missing key 'title'"))?;
        let paragraphs = context
            .get(CONTEXT_PARAGRAPHS)
            .ok_or_else(|| EtlError::schema(field, "missing key 'paragraphs'"))?;
        let paragraphs = paragraphs.as_array().ok_or_else(|| {
            EtlError::schema(
                format!("{}.{}", field, CONTEXT_PARAGRAPHS),
                format!("expected an array, found {}", json_type_name(paragraphs)),
            )
        })?;

        let title_field = format!("{}.{}", field, CONTEXT_TITLE);
        let translated_title = self.map_text(&title_field, title).await?;

        let mut translated_paragraphs = Vec::with_capacity(paragraphs.len());
        for (i, paragraph) in paragraphs.iter().enumerate() {
            let paragraph_field = format!("{}.{}[{}]", field, CONTEXT_PARAGRAPHS, i);
            translated_paragraphs.push(self.map_text(&paragraph_field, paragraph).await?);
        }

        // 其餘鍵維持原位置與原值
        let mut output = Map::with_capacity(context.len());
        for (key, value) in context {
            let mapped = match key.as_str() {
                CONTEXT_TITLE => translated_title.clone(),
                CONTEXT_PARAGRAPHS => Value::Array(std::mem::take(&mut translated_paragraphs)),
                _ => value.clone(),
            };
            output.insert(key.clone(), mapped);
        }
        Ok(Value::Object(output))
    }

    async fn map_decomposition(&self, field: &str, value: &Value) -> Result<Value> {
        let items = value.as_array().ok_or_else(|| {
            EtlError::schema(
                field,
                format!("expected an array, found {}", json_type_name(value)),
            )
        })?;

        let mut output = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let item_field = format!("{}[{}]", field, i);
            let item = item.as_object().ok_or_else(|| {
                EtlError::schema(
                    item_field.as_str(),
                    format!("expected an object, found {}", json_type_name(item)),
                )
            })?;

            if !item.contains_key(DECOMPOSITION_ID) {
                return Err(EtlError::schema(item_field, "missing key 'sub_id'"));
            }
            for key in DECOMPOSITION_TEXT_FIELDS {
                if !item.contains_key(key) {
                    return Err(EtlError::schema(
                        item_field,
                        format!("missing key '{}'", key),
                    ));
                }
            }

            let mut translated = Map::with_capacity(item.len());
            for (key, value) in item {
                let mapped = if DECOMPOSITION_TEXT_FIELDS.contains(&key.as_str()) {
                    self.map_text(&format!("{}.{}", item_field, key), value).await?
                } else {
                    value.clone()
                };
                translated.insert(key.clone(), mapped);
            }
            output.push(Value::Object(translated));
        }

        Ok(Value::Array(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::translator::RetryPolicy;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    const METADATA_FIELDS: [&str; 4] = [
        "answer_type",
        "previous_answer_type",
        "no_of_hops",
        "reasoning_type",
    ];

    /// 查表翻譯；表外文字加上 "bn:" 前綴，並記錄所有呼叫
    #[derive(Clone, Default)]
    struct DictionaryService {
        entries: HashMap<String, String>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl DictionaryService {
        fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                entries: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                seen: Arc::default(),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TranslationService for DictionaryService {
        async fn translate(&self, text: &str) -> Result<String> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self
                .entries
                .get(text)
                .cloned()
                .unwrap_or_else(|| format!("bn:{}", text)))
        }
    }

    struct FailingService;

    #[async_trait]
    impl TranslationService for FailingService {
        async fn translate(&self, _text: &str) -> Result<String> {
            Err(EtlError::TranslationError {
                message: "quota exceeded".to_string(),
            })
        }
    }

    fn mapper<T: TranslationService>(service: T) -> StructuralMapper<T> {
        StructuralMapper::new(FieldTranslator::new(service, RetryPolicy::immediate(3)))
    }

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    fn full_record() -> Record {
        record(json!({
            "question": "What is the age of the king?",
            "answer": "42",
            "context": {
                "title": "King",
                "paragraphs": ["The king was born in 1982.", "He rules the land."]
            },
            "previous_question": "Who is king?",
            "previous_answer": "Bob",
            "question_decomposition": [
                {"sub_id": "q1", "question": "X", "answer": "Y", "paragraph_support_title": "Z"},
                {"sub_id": 2, "question": "X2", "answer": "Y2", "paragraph_support_title": "Z2"}
            ],
            "question_on_last_hop": "How old is Bob?",
            "answer_type": "number",
            "previous_answer_type": "person",
            "no_of_hops": 3,
            "reasoning_type": ["bridge", "arithmetic"]
        }))
    }

    #[test]
    fn test_transform_table_covers_known_schema() {
        let names: Vec<&str> = TRANSFORM_TABLE.iter().map(|(name, _)| *name).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len(), "duplicate entries in table");

        for key in full_record().keys() {
            assert!(unique.contains(key.as_str()), "field '{}' missing from table", key);
        }
        for field in METADATA_FIELDS {
            assert_eq!(transform_kind(field), TransformKind::Verbatim);
        }
        assert_eq!(transform_kind("context"), TransformKind::ContextStructure);
        assert_eq!(
            transform_kind("question_decomposition"),
            TransformKind::DecompositionList
        );
        assert_eq!(transform_kind("some_new_field"), TransformKind::Verbatim);
    }

    #[tokio::test]
    async fn test_scalar_scenario() {
        let service = DictionaryService::with(&[("Who is king?", "কে রাজা?"), ("Bob", "ববি")]);
        let mapper = mapper(service);

        let input = record(json!({"question": "Who is king?", "answer": "Bob", "no_of_hops": 2}));
        let output = mapper.map(&input).await.unwrap();

        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"question": "কে রাজা?", "answer": "ববি", "no_of_hops": 2})
        );
    }

    #[tokio::test]
    async fn test_keys_order_and_metadata_preserved() {
        let mapper = mapper(DictionaryService::default());
        let input = full_record();

        let output = mapper.map(&input).await.unwrap();

        let in_keys: Vec<&String> = input.keys().collect();
        let out_keys: Vec<&String> = output.keys().collect();
        assert_eq!(in_keys, out_keys);
        for field in METADATA_FIELDS {
            assert_eq!(input.get(field), output.get(field));
        }
    }

    #[tokio::test]
    async fn test_context_structure_translated_in_place() {
        let mapper = mapper(DictionaryService::default());
        let output = mapper.map(&full_record()).await.unwrap();

        assert_eq!(
            output.get("context").unwrap(),
            &json!({
                "title": "bn:King",
                "paragraphs": ["bn:The king was born in 1982.", "bn:He rules the land."]
            })
        );
    }

    #[tokio::test]
    async fn test_decomposition_scenario() {
        let service = DictionaryService::default();
        let mapper = mapper(service.clone());
        let output = mapper.map(&full_record()).await.unwrap();

        assert_eq!(
            output.get("question_decomposition").unwrap(),
            &json!([
                {"sub_id": "q1", "question": "bn:X", "answer": "bn:Y", "paragraph_support_title": "bn:Z"},
                {"sub_id": 2, "question": "bn:X2", "answer": "bn:Y2", "paragraph_support_title": "bn:Z2"}
            ])
        );
        assert!(!service.seen().contains(&"q1".to_string()));
    }

    #[tokio::test]
    async fn test_fields_translated_one_at_a_time_in_record_order() {
        let service = DictionaryService::default();
        let mapper = mapper(service.clone());
        let input = record(json!({
            "answer": "A",
            "context": {"title": "T", "paragraphs": ["P1", "P2"]},
            "question": "Q"
        }));

        mapper.map(&input).await.unwrap();

        assert_eq!(service.seen(), vec!["A", "T", "P1", "P2", "Q"]);
    }

    #[tokio::test]
    async fn test_unknown_fields_copied_verbatim() {
        let service = DictionaryService::default();
        let mapper = mapper(service.clone());
        let input = record(json!({"question": "Q", "id": "5a8b57f25542995d1e6f1371", "extra": {"nested": "text"}}));

        let output = mapper.map(&input).await.unwrap();

        assert_eq!(output.get("id"), input.get("id"));
        assert_eq!(output.get("extra"), input.get("extra"));
        assert_eq!(service.seen(), vec!["Q"]);
    }

    #[tokio::test]
    async fn test_null_and_empty_text_become_empty_without_calls() {
        let service = DictionaryService::default();
        let mapper = mapper(service.clone());
        let input = record(json!({"question": "", "previous_answer": null}));

        let output = mapper.map(&input).await.unwrap();

        assert_eq!(output.get("question"), Some(&json!("")));
        assert_eq!(output.get("previous_answer"), Some(&json!("")));
        assert!(service.seen().is_empty());
    }

    #[tokio::test]
    async fn test_failed_translation_keeps_original_and_counts() {
        let mapper = mapper(FailingService);
        let input = record(json!({"question": "Who is king?", "context": {"title": "King", "paragraphs": ["P"]}}));

        let output = mapper.map(&input).await.unwrap();

        assert_eq!(output, input);
        assert_eq!(mapper.fallback_fields(), 3);
    }

    #[tokio::test]
    async fn test_context_missing_title_is_schema_violation() {
        let mapper = mapper(DictionaryService::default());
        let input = record(json!({"context": {"paragraphs": ["P"]}}));

        let err = mapper.map(&input).await.unwrap_err();

        match err {
            EtlError::SchemaViolation { field, reason, .. } => {
                assert_eq!(field, "context");
                assert!(reason.contains("title"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decomposition_item_missing_key_is_schema_violation() {
        let mapper = mapper(DictionaryService::default());
        let input = record(json!({
            "question_decomposition": [{"sub_id": "q1", "question": "X", "answer": "Y"}]
        }));

        let err = mapper.map(&input).await.unwrap_err();

        match err {
            EtlError::SchemaViolation { field, reason, .. } => {
                assert_eq!(field, "question_decomposition[0]");
                assert!(reason.contains("paragraph_support_title"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scalar_with_wrong_type_is_schema_violation() {
        let mapper = mapper(DictionaryService::default());
        let input = record(json!({"answer": 42}));

        assert!(matches!(
            mapper.map(&input).await,
            Err(EtlError::SchemaViolation { .. })
        ));
    }
}
