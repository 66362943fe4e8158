use crate::EntityAnnotation;
use crate::model::{AggregationStrategy, ModelError, TokenClassifier};

/// Tag biomedical entities in the full normalized text.
///
/// Annotations come back in the order the model emits them. Nothing is
/// filtered: no length guard and no score threshold.
pub fn tag_entities(
    model: &dyn TokenClassifier,
    text: &str,
) -> Result<Vec<EntityAnnotation>, ModelError> {
    let entities = model.classify(text, AggregationStrategy::Simple)?;
    tracing::debug!(count = entities.len(), "tagged entities");
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        output: Vec<EntityAnnotation>,
        seen: Mutex<Vec<(String, AggregationStrategy)>>,
    }

    impl TokenClassifier for Canned {
        fn classify(
            &self,
            text: &str,
            aggregation: AggregationStrategy,
        ) -> Result<Vec<EntityAnnotation>, ModelError> {
            self.seen.lock().unwrap().push((text.to_string(), aggregation));
            Ok(self.output.clone())
        }
    }

    #[test]
    fn passes_annotations_through_in_order() {
        let output = vec![
            EntityAnnotation::new("Sign_symptom", "fever", 0.99),
            EntityAnnotation::new("Disease_disorder", "Type 2 Diabetes", 0.01),
            EntityAnnotation::new("Medication", "metformin", 0.5),
            EntityAnnotation::new("Sign_symptom", "fever", 0.0),
        ];
        let model = Canned {
            output: output.clone(),
            seen: Mutex::new(Vec::new()),
        };

        let tagged = tag_entities(&model, "whatever").unwrap();
        assert_eq!(tagged, output);
    }

    #[test]
    fn sends_full_text_with_simple_aggregation() {
        let model = Canned {
            output: vec![],
            seen: Mutex::new(Vec::new()),
        };
        let text = "z".repeat(9000);

        assert!(tag_entities(&model, &text).unwrap().is_empty());

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].0.len(), 9000);
        assert_eq!(seen[0].1, AggregationStrategy::Simple);
    }

    #[test]
    fn short_text_is_still_tagged() {
        let model = Canned {
            output: vec![EntityAnnotation::new("Age", "5", 0.3)],
            seen: Mutex::new(Vec::new()),
        };
        assert_eq!(tag_entities(&model, "5").unwrap().len(), 1);
    }
}
