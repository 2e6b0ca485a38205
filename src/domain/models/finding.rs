//! Validation finding domain model.
//!
//! Findings are the categorized evidence returned by the formal-reasoning
//! guardrail for one validation call. The overall result of a call is
//! derived from the highest-priority finding present.

use serde::{Deserialize, Serialize};

/// Outcome kind of a single validation finding.
///
/// This is a closed set: the guardrail reports exactly one of these per
/// finding. Unknown kinds are rejected at the decode boundary, never
/// mapped onto a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationOutput {
    /// Claims are entailed by the policy rules
    Valid,
    /// Claims contradict the policy rules
    Invalid,
    /// Claims could be true or false under the rules
    Satisfiable,
    /// Premises are contradictory; no scenario satisfies them
    Impossible,
    /// The text admits more than one logical translation
    TranslationAmbiguous,
    /// The checker could not analyze the content at all
    TooComplex,
    /// No logical claims could be extracted from the text
    NoTranslations,
}

impl ValidationOutput {
    /// Urgency used to pick the single most pressing finding when a
    /// validation call returns several.
    ///
    /// `NoTranslations` is deliberately 99: in a minimum-priority pick it
    /// loses to every other kind, including `Valid` at 6. Downstream
    /// classification relies on this exact table.
    pub const fn priority(&self) -> u8 {
        match self {
            Self::TooComplex => 0,
            Self::TranslationAmbiguous => 1,
            Self::Impossible => 2,
            Self::Invalid => 3,
            Self::Satisfiable => 4,
            Self::NoTranslations => 99,
            Self::Valid => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Satisfiable => "SATISFIABLE",
            Self::Impossible => "IMPOSSIBLE",
            Self::TranslationAmbiguous => "TRANSLATION_AMBIGUOUS",
            Self::TooComplex => "TOO_COMPLEX",
            Self::NoTranslations => "NO_TRANSLATIONS",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "VALID" => Some(Self::Valid),
            "INVALID" => Some(Self::Invalid),
            "SATISFIABLE" => Some(Self::Satisfiable),
            "IMPOSSIBLE" => Some(Self::Impossible),
            "TRANSLATION_AMBIGUOUS" => Some(Self::TranslationAmbiguous),
            "TOO_COMPLEX" => Some(Self::TooComplex),
            "NO_TRANSLATIONS" => Some(Self::NoTranslations),
            _ => None,
        }
    }

    /// Whether the rewrite loop can act on a finding of this kind.
    ///
    /// `Valid` needs no action, `TooComplex` aborts the thread, and
    /// `NoTranslations` carries nothing to rewrite against.
    pub const fn is_actionable(&self) -> bool {
        matches!(
            self,
            Self::Invalid | Self::Satisfiable | Self::Impossible | Self::TranslationAmbiguous
        )
    }
}

/// One logic statement with both its formal and natural-language forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicStatement {
    pub logic: String,
    pub natural_language: String,
}

/// Reference to a policy rule cited as evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRef {
    pub identifier: String,
    pub policy_version_arn: String,
}

/// A concrete variable assignment demonstrating a claim outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub statements: Vec<LogicStatement>,
}

/// One candidate translation for ambiguous input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOption {
    pub premises: Vec<LogicStatement>,
    pub claims: Vec<LogicStatement>,
}

/// A warning about the logical structure of the translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicWarning {
    #[serde(rename = "type")]
    pub warning_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub premises: Vec<LogicStatement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claims: Vec<LogicStatement>,
}

/// Kind-specific evidence attached to a finding.
///
/// Opaque to the control loop: only priority ordering and prompt-template
/// selection look at findings, and both key off [`ValidationOutput`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingDetails {
    /// Translated premises from the checked text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub premises: Vec<LogicStatement>,
    /// Translated claims from the checked text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub claims: Vec<LogicStatement>,
    /// Premise text the checker could not translate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub untranslated_premises: Vec<String>,
    /// Claim text the checker could not translate
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub untranslated_claims: Vec<String>,
    /// Translation confidence reported by the checker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Rules contradicted by the claims (INVALID / IMPOSSIBLE)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contradicting_rules: Vec<RuleRef>,
    /// Rules supporting the claims (VALID)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supporting_rules: Vec<RuleRef>,
    /// Assignment under which the claims hold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_true_scenario: Option<Scenario>,
    /// Assignment under which the claims fail (SATISFIABLE)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_false_scenario: Option<Scenario>,
    /// Candidate translations (TRANSLATION_AMBIGUOUS)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub translation_options: Vec<TranslationOption>,
    /// Scenarios distinguishing the candidate translations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub difference_scenarios: Vec<Scenario>,
    /// Structural warning attached to the translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_warning: Option<LogicWarning>,
}

/// One structured unit of validation evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Outcome kind of this finding
    pub validation_output: ValidationOutput,
    /// Kind-specific evidence
    #[serde(default)]
    pub details: FindingDetails,
}

impl Finding {
    /// Create a finding with empty details.
    pub const fn new(validation_output: ValidationOutput) -> Self {
        Self {
            validation_output,
            details: FindingDetails {
                premises: Vec::new(),
                claims: Vec::new(),
                untranslated_premises: Vec::new(),
                untranslated_claims: Vec::new(),
                confidence: None,
                contradicting_rules: Vec::new(),
                supporting_rules: Vec::new(),
                claims_true_scenario: None,
                claims_false_scenario: None,
                translation_options: Vec::new(),
                difference_scenarios: Vec::new(),
                logic_warning: None,
            },
        }
    }

    /// Create a finding with the given details.
    pub const fn with_details(validation_output: ValidationOutput, details: FindingDetails) -> Self {
        Self {
            validation_output,
            details,
        }
    }
}

/// Classification of one validation call: the overall outcome plus every
/// finding, sorted by priority for deterministic downstream consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Overall outcome derived from the findings
    pub output: ValidationOutput,
    /// All findings, sorted by [`ValidationOutput::priority`]
    pub findings: Vec<Finding>,
}

impl ValidationResult {
    /// Classify a raw findings list into an overall outcome.
    ///
    /// - no findings at all means there was nothing to flag: `Valid`;
    /// - any `Valid` finding wins outright, even when lower-priority
    ///   findings such as `NoTranslations` co-occur;
    /// - otherwise any `TooComplex` finding wins (terminal, non-retriable);
    /// - otherwise the minimum priority number among the remaining kinds.
    pub fn from_findings(mut findings: Vec<Finding>) -> Self {
        findings.sort_by_key(|f| f.validation_output.priority());

        let output = if findings.is_empty() {
            ValidationOutput::Valid
        } else if findings
            .iter()
            .any(|f| f.validation_output == ValidationOutput::Valid)
        {
            ValidationOutput::Valid
        } else if findings
            .iter()
            .any(|f| f.validation_output == ValidationOutput::TooComplex)
        {
            ValidationOutput::TooComplex
        } else {
            // Sorted ascending by priority, so the head is the most urgent.
            findings[0].validation_output
        };

        Self { output, findings }
    }

    /// Result representing a validation call that found nothing to flag.
    pub const fn valid() -> Self {
        Self {
            output: ValidationOutput::Valid,
            findings: Vec::new(),
        }
    }

    /// Whether the sole finding is `NoTranslations` with no `Valid`
    /// co-occurring: an unverifiable-but-harmless response.
    pub fn is_sole_no_translations(&self) -> bool {
        self.findings.len() == 1
            && self.findings[0].validation_output == ValidationOutput::NoTranslations
            && self.output != ValidationOutput::Valid
    }

    /// Whether the overall outcome is `Valid` while a `NoTranslations`
    /// finding co-occurs: accepted but not fully formally verified.
    pub fn is_valid_with_no_translations(&self) -> bool {
        self.output == ValidationOutput::Valid
            && self
                .findings
                .iter()
                .any(|f| f.validation_output == ValidationOutput::NoTranslations)
    }
}
