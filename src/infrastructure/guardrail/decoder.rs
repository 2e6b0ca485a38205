//! Decoder for the guardrail's findings wire format.
//!
//! The guardrail reports each finding as a single-key tagged union:
//! `{"invalid": {...}}`, `{"satisfiable": {...}}`, and so on. The decoder
//! maps each known tag onto the closed [`ValidationOutput`] sum type and
//! extracts the kind-specific evidence. An unknown tag is a hard
//! [`DecodeError`], never a silent fall-through.

use serde_json::Value;
use thiserror::Error;

use crate::domain::models::{
    Finding, FindingDetails, LogicStatement, LogicWarning, RuleRef, Scenario, TranslationOption,
    ValidationOutput, ValidationResult,
};

/// Errors decoding guardrail output.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Finding is not a JSON object")]
    NotAnObject,

    #[error("Finding has no recognized tag (keys: {0})")]
    UnknownTag(String),

    #[error("Finding has multiple tags: {0}")]
    AmbiguousTag(String),
}

/// Map of wire tags to finding kinds. Order matters only for error text.
const TAGS: [(&str, ValidationOutput); 7] = [
    ("valid", ValidationOutput::Valid),
    ("invalid", ValidationOutput::Invalid),
    ("satisfiable", ValidationOutput::Satisfiable),
    ("impossible", ValidationOutput::Impossible),
    ("translationAmbiguous", ValidationOutput::TranslationAmbiguous),
    ("tooComplex", ValidationOutput::TooComplex),
    ("noTranslations", ValidationOutput::NoTranslations),
];

/// Decode one tagged-union finding.
pub fn decode_finding(raw: &Value) -> Result<Finding, DecodeError> {
    let object = raw.as_object().ok_or(DecodeError::NotAnObject)?;

    let mut matched: Option<(ValidationOutput, &Value)> = None;
    for (tag, output) in TAGS {
        if let Some(body) = object.get(tag) {
            if matched.is_some() {
                return Err(DecodeError::AmbiguousTag(keys_of(object)));
            }
            matched = Some((output, body));
        }
    }

    let (output, body) = matched.ok_or_else(|| DecodeError::UnknownTag(keys_of(object)))?;
    Ok(Finding::with_details(output, decode_details(output, body)))
}

/// Decode the full guardrail response into a classified result.
///
/// Walks `assessments[].automatedReasoningPolicy.findings[]` and runs the
/// standard classification over whatever was found.
pub fn decode_validation_response(response: &Value) -> Result<ValidationResult, DecodeError> {
    let mut findings = Vec::new();

    let assessments = response
        .get("assessments")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for assessment in assessments {
        let raw_findings = assessment
            .get("automatedReasoningPolicy")
            .and_then(|p| p.get("findings"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for raw in raw_findings {
            findings.push(decode_finding(raw)?);
        }
    }

    Ok(ValidationResult::from_findings(findings))
}

fn keys_of(object: &serde_json::Map<String, Value>) -> String {
    object.keys().cloned().collect::<Vec<_>>().join(", ")
}

fn decode_details(output: ValidationOutput, body: &Value) -> FindingDetails {
    let mut details = FindingDetails::default();

    if let Some(translation) = body.get("translation") {
        details.premises = decode_statements(translation.get("premises"));
        details.claims = decode_statements(translation.get("claims"));
        details.untranslated_premises = decode_texts(translation.get("untranslatedPremises"));
        details.untranslated_claims = decode_texts(translation.get("untranslatedClaims"));
        details.confidence = translation.get("confidence").and_then(Value::as_f64);
    }

    match output {
        ValidationOutput::Satisfiable => {
            details.claims_true_scenario = body.get("claimsTrueScenario").map(decode_scenario);
            details.claims_false_scenario = body.get("claimsFalseScenario").map(decode_scenario);
            details.logic_warning = body.get("logicWarning").map(decode_logic_warning);
        }
        ValidationOutput::Invalid | ValidationOutput::Impossible => {
            details.contradicting_rules = decode_rules(body.get("contradictingRules"));
            details.logic_warning = body.get("logicWarning").map(decode_logic_warning);
        }
        ValidationOutput::Valid => {
            details.supporting_rules = decode_rules(body.get("supportingRules"));
            details.claims_true_scenario = body.get("claimsTrueScenario").map(decode_scenario);
            details.logic_warning = body.get("logicWarning").map(decode_logic_warning);
        }
        ValidationOutput::TranslationAmbiguous => {
            details.translation_options = decode_options(body.get("options"));
            details.difference_scenarios = body
                .get("differenceScenarios")
                .and_then(Value::as_array)
                .map(|scenarios| scenarios.iter().map(decode_scenario).collect())
                .unwrap_or_default();
        }
        ValidationOutput::TooComplex | ValidationOutput::NoTranslations => {}
    }

    details
}

fn decode_statements(raw: Option<&Value>) -> Vec<LogicStatement> {
    raw.and_then(Value::as_array)
        .map(|statements| {
            statements
                .iter()
                .map(|s| LogicStatement {
                    logic: string_field(s, "logic"),
                    natural_language: string_field(s, "naturalLanguage"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn decode_texts(raw: Option<&Value>) -> Vec<String> {
    raw.and_then(Value::as_array)
        .map(|entries| entries.iter().map(|e| string_field(e, "text")).collect())
        .unwrap_or_default()
}

fn decode_rules(raw: Option<&Value>) -> Vec<RuleRef> {
    raw.and_then(Value::as_array)
        .map(|rules| {
            rules
                .iter()
                .map(|r| RuleRef {
                    identifier: string_field(r, "identifier"),
                    policy_version_arn: string_field(r, "policyVersionArn"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn decode_scenario(raw: &Value) -> Scenario {
    Scenario {
        statements: decode_statements(raw.get("statements")),
    }
}

fn decode_options(raw: Option<&Value>) -> Vec<TranslationOption> {
    raw.and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .flat_map(|option| {
                    option
                        .get("translations")
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default()
                        .iter()
                        .map(|t| TranslationOption {
                            premises: decode_statements(t.get("premises")),
                            claims: decode_statements(t.get("claims")),
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn decode_logic_warning(raw: &Value) -> LogicWarning {
    LogicWarning {
        warning_type: string_field(raw, "type"),
        premises: decode_statements(raw.get("premises")),
        claims: decode_statements(raw.get("claims")),
    }
}

fn string_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_invalid_finding() {
        let raw = json!({
            "invalid": {
                "translation": {
                    "premises": [{"logic": "(= plan PREMIUM)", "naturalLanguage": "The plan is premium"}],
                    "claims": [{"logic": "(refundable order)", "naturalLanguage": "The order is refundable"}],
                    "confidence": 0.92
                },
                "contradictingRules": [{"identifier": "R7", "policyVersionArn": "arn:v1"}]
            }
        });

        let finding = decode_finding(&raw).unwrap();
        assert_eq!(finding.validation_output, ValidationOutput::Invalid);
        assert_eq!(finding.details.contradicting_rules[0].identifier, "R7");
        assert_eq!(finding.details.claims.len(), 1);
        assert_eq!(finding.details.confidence, Some(0.92));
    }

    #[test]
    fn test_decode_satisfiable_scenarios() {
        let raw = json!({
            "satisfiable": {
                "claimsTrueScenario": {
                    "statements": [{"logic": "(= tier GOLD)", "naturalLanguage": "Tier is gold"}]
                },
                "claimsFalseScenario": {
                    "statements": [{"logic": "(= tier BASIC)", "naturalLanguage": "Tier is basic"}]
                }
            }
        });

        let finding = decode_finding(&raw).unwrap();
        assert_eq!(finding.validation_output, ValidationOutput::Satisfiable);
        assert!(finding.details.claims_true_scenario.is_some());
        assert_eq!(
            finding.details.claims_false_scenario.unwrap().statements[0].natural_language,
            "Tier is basic"
        );
    }

    #[test]
    fn test_decode_translation_ambiguous_options() {
        let raw = json!({
            "translationAmbiguous": {
                "options": [{
                    "translations": [{
                        "premises": [],
                        "claims": [{"logic": "a", "naturalLanguage": "reading one"}]
                    }]
                }],
                "differenceScenarios": [{
                    "statements": [{"logic": "b", "naturalLanguage": "they differ here"}]
                }]
            }
        });

        let finding = decode_finding(&raw).unwrap();
        assert_eq!(
            finding.validation_output,
            ValidationOutput::TranslationAmbiguous
        );
        assert_eq!(finding.details.translation_options.len(), 1);
        assert_eq!(finding.details.difference_scenarios.len(), 1);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let raw = json!({"somethingNew": {}});
        assert!(matches!(
            decode_finding(&raw),
            Err(DecodeError::UnknownTag(_))
        ));
    }

    #[test]
    fn test_multiple_tags_are_rejected() {
        let raw = json!({"valid": {}, "invalid": {}});
        assert!(matches!(
            decode_finding(&raw),
            Err(DecodeError::AmbiguousTag(_))
        ));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(matches!(
            decode_finding(&json!("valid")),
            Err(DecodeError::NotAnObject)
        ));
    }

    #[test]
    fn test_decode_full_response() {
        let response = json!({
            "action": "NONE",
            "assessments": [{
                "automatedReasoningPolicy": {
                    "findings": [
                        {"noTranslations": {}},
                        {"valid": {"supportingRules": [{"identifier": "R1", "policyVersionArn": ""}]}}
                    ]
                }
            }]
        });

        let result = decode_validation_response(&response).unwrap();
        assert_eq!(result.output, ValidationOutput::Valid);
        assert_eq!(result.findings.len(), 2);
        // Sorted by priority: VALID (6) before NO_TRANSLATIONS (99).
        assert_eq!(result.findings[0].validation_output, ValidationOutput::Valid);
    }

    #[test]
    fn test_empty_response_is_valid() {
        let result = decode_validation_response(&json!({"assessments": []})).unwrap();
        assert_eq!(result.output, ValidationOutput::Valid);
        assert!(result.findings.is_empty());
    }
}
