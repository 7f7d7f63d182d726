use crate::core::mapper::{TransformKind, TRANSFORM_TABLE};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct CardInfo {
    pub language_name: String,
    pub language_code: String,
    pub source_dataset: String,
    pub translator_name: String,
}

impl Default for CardInfo {
    fn default() -> Self {
        Self {
            language_name: "Bengali".to_string(),
            language_code: "bn".to_string(),
            source_dataset: "alabnii/morehopqa".to_string(),
            translator_name: "Google Translate".to_string(),
        }
    }
}

fn field_note(field: &str) -> &'static str {
    match field {
        "question" => "The main question",
        "answer" => "The answer",
        "context" => "Supporting context (title and paragraphs)",
        "previous_question" => "Previous related question",
        "previous_answer" => "Previous answer",
        "question_decomposition" => "Decomposed sub-questions and answers (`sub_id` kept)",
        "question_on_last_hop" => "Final hop question",
        _ => "",
    }
}

/// 產生發布用的 dataset card（README.md）
pub fn create_dataset_description(
    info: &CardInfo,
    record_count: usize,
    generated_at: DateTime<Utc>,
) -> String {
    let mut card = String::new();

    card.push_str(&format!(
        "---\nlanguage:\n- {}\ntask_categories:\n- question-answering\n---\n\n",
        info.language_code
    ));
    card.push_str(&format!("# {} MoreHopQA Dataset\n\n", info.language_name));
    card.push_str(&format!(
        "This is a {lang} translation of the MoreHopQA dataset. The original dataset contains \
         multi-hop questions and answers, which have been automatically translated to {lang} \
         using {translator}.\n\n",
        lang = info.language_name,
        translator = info.translator_name
    ));

    card.push_str("## Dataset Structure\n");
    for (field, kind) in TRANSFORM_TABLE {
        if *kind != TransformKind::Verbatim {
            card.push_str(&format!(
                "- {}: {} in {}\n",
                field,
                field_note(field),
                info.language_name
            ));
        }
    }

    card.push_str("\n## Fields Maintained from Original Dataset\n");
    for (field, kind) in TRANSFORM_TABLE {
        if *kind == TransformKind::Verbatim {
            card.push_str(&format!("- {}\n", field));
        }
    }

    card.push_str(&format!(
        "\n## Statistics\n- records: {}\n- generated: {}\n\nOriginal dataset: {}\n",
        record_count,
        generated_at.format("%Y-%m-%d"),
        info.source_dataset
    ));
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_card_lists_translated_and_kept_fields() {
        let generated_at = Utc.with_ymd_and_hms(2024, 11, 2, 0, 0, 0).unwrap();
        let card = create_dataset_description(&CardInfo::default(), 1118, generated_at);

        assert!(card.starts_with("---\nlanguage:\n- bn\n"));
        assert!(card.contains("# Bengali MoreHopQA Dataset"));
        assert!(card.contains("- question_decomposition: Decomposed sub-questions"));
        assert!(card.contains("## Fields Maintained from Original Dataset\n- answer_type\n"));
        assert!(card.contains("- reasoning_type\n"));
        assert!(card.contains("- records: 1118"));
        assert!(card.contains("- generated: 2024-11-02"));
        assert!(card.ends_with("Original dataset: alabnii/morehopqa\n"));
    }
}
