//! Clinician-readable interpretation text
//!
//! Static per-diagnosis wording plus generated insight lines describing
//! where the model looked and how much to trust the result. All strings are
//! deterministic functions of the analysis output.

use crate::classifier::Diagnosis;
use crate::config::AnalysisConfig;
use crate::interpret::consensus::{Consensus, ImportanceTier};
use serde::{Deserialize, Serialize};

/// Structured clinical interpretation included in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalInterpretation {
    /// Headline for the diagnosis
    pub title: String,

    /// Standard findings for the diagnosis
    pub findings: Vec<String>,

    /// Recommended next step
    pub recommendation: String,

    /// Generated lines about model focus and confidence
    pub lead_insights: Vec<String>,

    /// Per-lead findings for the leads the consensus flags, falling back to
    /// the standard findings when nothing stands out
    pub key_findings: Vec<String>,
}

/// Headline text per diagnosis
fn title(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::MiPatient => "Active Myocardial Infarction Detected",
        Diagnosis::MiHistory => "Previous Myocardial Infarction History",
        Diagnosis::Abnormal => "Abnormal ECG Pattern Detected",
        Diagnosis::Normal => "Normal ECG Pattern",
    }
}

/// Standard findings per diagnosis
fn findings(diagnosis: Diagnosis) -> Vec<String> {
    let lines: &[&str] = match diagnosis {
        Diagnosis::MiPatient => &[
            "Active myocardial infarction detected",
            "Elevated ST segments in multiple leads",
            "Abnormal Q waves present",
        ],
        Diagnosis::MiHistory => &[
            "ECG patterns consistent with previous myocardial infarction",
            "Pathological Q waves detected",
            "Historical cardiac event indicators present",
        ],
        Diagnosis::Abnormal => &[
            "Irregular cardiac rhythm or morphology detected",
            "Deviations from normal ECG parameters observed",
            "Further clinical correlation recommended",
        ],
        Diagnosis::Normal => &[
            "Regular sinus rhythm detected",
            "ECG parameters within normal limits",
            "No acute abnormalities detected",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

/// Recommendation per diagnosis
fn recommendation(diagnosis: Diagnosis) -> &'static str {
    match diagnosis {
        Diagnosis::MiPatient => {
            "URGENT: Seek immediate emergency medical care. This ECG shows signs of an \
             active heart attack requiring immediate intervention."
        }
        Diagnosis::MiHistory => {
            "Consult with a cardiologist for comprehensive evaluation and management of \
             post-MI care."
        }
        Diagnosis::Abnormal => {
            "Schedule a follow-up appointment with a healthcare provider for detailed \
             cardiac evaluation."
        }
        Diagnosis::Normal => {
            "Continue routine cardiac health monitoring as advised by your healthcare \
             provider."
        }
    }
}

/// Finding attached to a single lead, by diagnosis and importance tier
pub fn lead_finding(diagnosis: Diagnosis, tier: ImportanceTier) -> &'static str {
    match diagnosis {
        Diagnosis::Normal => "Normal sinus rhythm",
        Diagnosis::MiPatient => match tier {
            ImportanceTier::Critical => "Significant abnormality detected",
            _ => "Within normal limits",
        },
        Diagnosis::MiHistory => match tier {
            ImportanceTier::Critical => "Historical changes noted",
            _ => "No acute changes",
        },
        Diagnosis::Abnormal => match tier {
            ImportanceTier::Critical => "Irregular pattern detected",
            _ => "Minor variations",
        },
    }
}

/// Build the full interpretation from classification and consensus output
pub fn interpret(
    diagnosis: Diagnosis,
    confidence: f32,
    consensus: &Consensus,
    config: &AnalysisConfig,
) -> ClinicalInterpretation {
    let mut lead_insights = Vec::new();

    if !consensus.common_leads.is_empty() {
        let names: Vec<&str> = consensus.common_leads.iter().map(|l| l.name()).collect();
        lead_insights.push(format!(
            "All interpretability methods agree on leads: {}",
            names.join(", ")
        ));
    }

    if confidence < config.low_confidence {
        lead_insights
            .push("Low confidence prediction - clinical review strongly recommended".to_string());
    } else if confidence < config.high_certainty {
        lead_insights.push("Moderate confidence - routine clinical correlation advised".to_string());
    } else {
        lead_insights.push("High confidence prediction with consistent patterns".to_string());
    }

    if !consensus.degenerate_methods.is_empty() {
        lead_insights.push(format!(
            "Reduced interpretability: no usable signal from {}",
            consensus.degenerate_methods.join(", ")
        ));
    }

    // Lead-specific findings for flagged leads; keyed by the blended ranking
    // so the most important lead is listed first
    let mut key_findings: Vec<String> = consensus
        .per_lead
        .iter()
        .filter(|entry| {
            entry.tier == ImportanceTier::Critical
                && lead_finding(diagnosis, entry.tier) != "Normal sinus rhythm"
        })
        .map(|entry| {
            format!(
                "Lead {}: {}",
                entry.lead,
                lead_finding(diagnosis, entry.tier)
            )
        })
        .collect();

    if key_findings.is_empty() {
        key_findings = findings(diagnosis);
    }

    ClinicalInterpretation {
        title: title(diagnosis).to_string(),
        findings: findings(diagnosis),
        recommendation: recommendation(diagnosis).to_string(),
        lead_insights,
        key_findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::consensus::{ConsensusLevel, LeadConsensus};
    use crate::leads::Lead;

    fn consensus_with(common: Vec<Lead>, critical: Vec<Lead>) -> Consensus {
        let per_lead = Lead::ALL
            .iter()
            .map(|&lead| {
                let is_critical = critical.contains(&lead);
                LeadConsensus {
                    lead,
                    attention_score: 0.0,
                    gradient_score: 0.0,
                    ablation_impact: 0.0,
                    consensus_score: if is_critical { 90.0 } else { 10.0 },
                    tier: if is_critical {
                        ImportanceTier::Critical
                    } else {
                        ImportanceTier::Minor
                    },
                    stars: if is_critical { 3 } else { 1 },
                }
            })
            .collect();
        Consensus {
            per_lead,
            level: ConsensusLevel::Moderate,
            score: 33.0,
            common_leads: common,
            degenerate_methods: vec![],
        }
    }

    #[test]
    fn test_mi_patient_critical_leads_become_key_findings() {
        let consensus = consensus_with(vec![Lead::V2], vec![Lead::V2, Lead::V3]);
        let config = AnalysisConfig::default();

        let interp = interpret(Diagnosis::MiPatient, 0.9, &consensus, &config);

        assert_eq!(interp.title, "Active Myocardial Infarction Detected");
        assert!(interp
            .key_findings
            .iter()
            .any(|f| f == "Lead V2: Significant abnormality detected"));
        assert!(interp
            .lead_insights
            .iter()
            .any(|i| i.contains("agree on leads: V2")));
        assert!(interp
            .lead_insights
            .iter()
            .any(|i| i.contains("High confidence")));
    }

    #[test]
    fn test_normal_diagnosis_falls_back_to_standard_findings() {
        // "Normal sinus rhythm" per-lead findings are not worth listing, so
        // the standard findings are used instead
        let consensus = consensus_with(vec![], vec![Lead::II]);
        let config = AnalysisConfig::default();

        let interp = interpret(Diagnosis::Normal, 0.95, &consensus, &config);

        assert_eq!(interp.key_findings, interp.findings);
    }

    #[test]
    fn test_low_confidence_insight() {
        let consensus = consensus_with(vec![], vec![]);
        let config = AnalysisConfig::default();

        let interp = interpret(Diagnosis::Abnormal, 0.4, &consensus, &config);

        assert!(interp
            .lead_insights
            .iter()
            .any(|i| i.contains("Low confidence")));
    }

    #[test]
    fn test_degenerate_methods_are_disclosed() {
        let mut consensus = consensus_with(vec![], vec![]);
        consensus.degenerate_methods = vec!["attention_rollout"];
        let config = AnalysisConfig::default();

        let interp = interpret(Diagnosis::Abnormal, 0.7, &consensus, &config);

        assert!(interp
            .lead_insights
            .iter()
            .any(|i| i.contains("attention_rollout")));
    }

    #[test]
    fn test_lead_finding_tiers() {
        assert_eq!(
            lead_finding(Diagnosis::MiPatient, ImportanceTier::Critical),
            "Significant abnormality detected"
        );
        assert_eq!(
            lead_finding(Diagnosis::MiPatient, ImportanceTier::Minor),
            "Within normal limits"
        );
        assert_eq!(
            lead_finding(Diagnosis::Normal, ImportanceTier::Critical),
            "Normal sinus rhythm"
        );
    }
}
