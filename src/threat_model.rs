//! Attack-path threat modeling
//!
//! Final stage: hand the full intelligence package to the language model
//! and ask for attack paths annotated with MITRE ATT&CK techniques and
//! STRIDE classifications. Parse failure degrades to an empty model.

use crate::llm::{recover_json, LanguageModel};
use crate::models::ThreatModel;

const THREAT_MODEL_PROMPT: &str = r#"
You are a senior cybersecurity threat intelligence analyst. Create a
comprehensive threat model from the JSON intelligence summary below.

Identify all plausible attack paths from the threat actors to the key
assets mentioned in the risk assessments. Break each path into steps; for
each step provide the attacker action, the most relevant MITRE ATT&CK
tactic and technique (e.g. "Initial Access (T1566): Phishing"), a STRIDE
classification, and a brief justification.

Respond with a single JSON object:
{
  "attack_paths": [
    {
      "path_description": "...",
      "steps": [
        {"step": 1, "action": "...", "mitre_attack": "...",
         "stride_classification": "...", "justification": "..."}
      ]
    }
  ]
}

Intelligence data:
"#;

/// Generate the attack-path model for one intelligence package. Never
/// fails: an unusable model reply yields an empty set of paths.
pub async fn generate(
    llm: &dyn LanguageModel,
    intelligence: &serde_json::Value,
) -> ThreatModel {
    let prompt = format!(
        "{THREAT_MODEL_PROMPT}{}",
        serde_json::to_string_pretty(intelligence).unwrap_or_default()
    );

    let reply = match llm.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "threat model call failed");
            return ThreatModel::default();
        }
    };

    match recover_json(&reply).and_then(|v| serde_json::from_value(v).ok()) {
        Some(model) => model,
        None => {
            tracing::warn!("threat model reply was not valid JSON");
            ThreatModel::default()
        }
    }
}
