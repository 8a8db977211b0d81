use bouncer_core::Timestamp;

const READ_VERBS: &[&str] = &["describe", "list", "get"];
const DESTRUCTIVE_VERBS: &[&str] = &["terminate", "delete", "remove", "stop"];
const LOOKBACK_MINUTES: i64 = 10;
const MAX_MODIFIER: f64 = 0.3;

/// One previously recorded command, as kept by the command-history index
/// (spec §4.3: "found via the audit-log / command-history lookup").
#[derive(Debug, Clone)]
pub struct CommandRecord {
    /// Requesting agent identifier.
    pub source: String,
    /// Raw command text.
    pub command: String,
    /// When the command ran.
    pub recorded_at: Timestamp,
}

/// Read access to recent command history, implemented by `bouncer-store` so
/// this crate never depends on a storage backend directly.
#[async_trait::async_trait]
pub trait SequenceHistory: Send + Sync {
    /// Commands by `source` in the last `lookback_minutes` minutes, most
    /// recent first.
    async fn recent_commands(&self, source: &str, lookback_minutes: i64) -> Vec<CommandRecord>;
}

/// Extract AWS resource-id-shaped substrings (`i-…`, `vol-…`, `sg-…`,
/// `arn:aws:…`) from a command, used to correlate a read with a later
/// destructive action on the same resource.
#[must_use]
pub fn extract_resource_ids(cmd: &str) -> Vec<String> {
    cmd.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|tok| {
            tok.starts_with("arn:aws:")
                || (tok.len() > 3
                    && tok.contains('-')
                    && tok.chars().take_while(|c| *c != '-').all(|c| c.is_ascii_lowercase()))
        })
        .map(str::to_owned)
        .collect()
}

/// The `aws <service> <action>`-shaped verb of a command, lower-cased.
#[must_use]
pub fn parse_action_from_command(cmd: &str) -> Option<String> {
    let mut tokens = cmd.split_whitespace();
    if tokens.next()? != "aws" {
        return None;
    }
    tokens.next()?;
    tokens.next().map(str::to_owned)
}

fn verb_of(action: &str) -> &str {
    action.split('-').next().unwrap_or(action)
}

/// `get_sequence_risk_modifier(source, cmd) → (modifier, reason)` (spec
/// §4.3 "optional sequence-analysis modifier"): a recent read query on the
/// same resource lowers risk by up to `0.3`; an unpreceded destructive verb
/// raises it by up to `0.3`.
pub async fn get_sequence_risk_modifier(source: &str, cmd: &str, history: &dyn SequenceHistory) -> (f64, String) {
    let Some(action) = parse_action_from_command(cmd) else {
        return (0.0, "command did not parse; no sequence adjustment".to_owned());
    };
    let verb = verb_of(&action);
    if !DESTRUCTIVE_VERBS.contains(&verb) {
        return (0.0, "not a destructive verb; no sequence adjustment".to_owned());
    }

    let resource_ids = extract_resource_ids(cmd);
    let recent = history.recent_commands(source, LOOKBACK_MINUTES).await;

    let has_prior_read = recent.iter().any(|record| {
        let Some(record_action) = parse_action_from_command(&record.command) else { return false };
        let record_verb = verb_of(&record_action);
        if !READ_VERBS.contains(&record_verb) {
            return false;
        }
        if resource_ids.is_empty() {
            return true;
        }
        let record_ids = extract_resource_ids(&record.command);
        resource_ids.iter().any(|id| record_ids.contains(id))
    });

    if has_prior_read {
        (-MAX_MODIFIER, "recent read query on the same resource lowers risk".to_owned())
    } else {
        (MAX_MODIFIER, "destructive verb with no preceding read query raises risk".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHistory(Vec<CommandRecord>);
    #[async_trait::async_trait]
    impl SequenceHistory for FakeHistory {
        async fn recent_commands(&self, source: &str, _lookback_minutes: i64) -> Vec<CommandRecord> {
            self.0.iter().filter(|r| r.source == source).cloned().collect()
        }
    }

    #[tokio::test]
    async fn prior_describe_lowers_risk() {
        let history = FakeHistory(vec![CommandRecord {
            source: "s1".into(),
            command: "aws ec2 describe-instances --instance-ids i-abc123".into(),
            recorded_at: Timestamp::now(),
        }]);
        let (modifier, _) = get_sequence_risk_modifier("s1", "aws ec2 terminate-instances --instance-ids i-abc123", &history).await;
        assert!(modifier < 0.0);
    }

    #[tokio::test]
    async fn unpreceded_destructive_raises_risk() {
        let history = FakeHistory(vec![]);
        let (modifier, _) = get_sequence_risk_modifier("s1", "aws ec2 terminate-instances --instance-ids i-abc123", &history).await;
        assert!(modifier > 0.0);
    }

    #[tokio::test]
    async fn non_destructive_verb_has_no_modifier() {
        let history = FakeHistory(vec![]);
        let (modifier, _) = get_sequence_risk_modifier("s1", "aws ec2 describe-instances", &history).await;
        assert_eq!(modifier, 0.0);
    }
}
