//! Stage 6: per enabled external tool, one usage record per developer for the configured
//! reporting period.

use crate::models::{CopilotUsageRecord, Developer, ExternalUsage, HarveyUsageRecord, QualtricsUsageRecord};
use crate::rng::RootSeed;
use crate::seed::ExternalSourceToggles;
use chrono::{DateTime, Utc};
use rand::Rng;

const SENTIMENTS: &[&str] = &["positive", "neutral", "mixed", "negative"];

pub fn generate(
    developers: &[Developer],
    toggles: &ExternalSourceToggles,
    generation_start: DateTime<Utc>,
    root_seed: RootSeed,
) -> ExternalUsage {
    let mut harvey = Vec::new();
    let mut copilot = Vec::new();
    let mut qualtrics = Vec::new();

    for (dev_index, dev) in developers.iter().enumerate() {
        let mut rng = root_seed.child_rng("external-usage", dev_index as u64);

        if toggles.harvey {
            harvey.push(HarveyUsageRecord {
                user_email: dev.email.clone(),
                date: generation_start,
                queries: rng.gen_range(0..50),
                documents_drafted: rng.gen_range(0..10),
                minutes_active: rng.gen_range(0..240),
            });
        }

        if toggles.copilot {
            let has_activity = rng.gen_bool(0.8);
            copilot.push(CopilotUsageRecord {
                report_refresh_date: generation_start.format("%Y-%m-%d").to_string(),
                user_principal_name: dev.email.clone(),
                last_activity_date: has_activity.then(|| generation_start.format("%Y-%m-%d").to_string()),
                copilot_chat_last_activity_date: has_activity
                    .then(|| generation_start.format("%Y-%m-%d").to_string()),
                report_period: "D30".to_string(),
            });
        }

        if toggles.qualtrics {
            qualtrics.push(QualtricsUsageRecord {
                respondent_email: dev.email.clone(),
                survey_date: generation_start,
                satisfaction_score: rng.gen_range(1..=10),
                ai_tooling_sentiment: SENTIMENTS[rng.gen_range(0..SENTIMENTS.len())].to_string(),
            });
        }
    }

    ExternalUsage { harvey, copilot, qualtrics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::synthesize_default_roster;

    #[test]
    fn disabled_sources_produce_no_records() {
        let devs = crate::generators::developers::generate(synthesize_default_roster(3));
        let toggles = ExternalSourceToggles {
            harvey: false,
            copilot: false,
            qualtrics: false,
        };
        let usage = generate(&devs, &toggles, Utc::now(), RootSeed(1));
        assert!(usage.harvey.is_empty());
        assert!(usage.copilot.is_empty());
        assert!(usage.qualtrics.is_empty());
    }

    #[test]
    fn enabled_sources_produce_one_record_per_developer() {
        let devs = crate::generators::developers::generate(synthesize_default_roster(4));
        let usage = generate(&devs, &ExternalSourceToggles::default(), Utc::now(), RootSeed(1));
        assert_eq!(usage.harvey.len(), 4);
        assert_eq!(usage.copilot.len(), 4);
        assert_eq!(usage.qualtrics.len(), 4);
    }
}
