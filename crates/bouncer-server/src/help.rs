//! `help` tool (spec §6 "AWS-CLI parameter documentation"): a small
//! built-in table, not a live call-out to the CLI's own `help` subsystem.

use crate::wire::HelpEntry;

const ENTRIES: &[(&str, &str, &str, &[&str])] = &[
    ("s3", "Object storage: buckets and objects.", "aws s3 ls s3://my-bucket/", &["s3api", "deploy"]),
    ("s3api", "Low-level S3 operations (ACLs, lifecycle, CORS).", "aws s3api get-bucket-acl --bucket my-bucket", &["s3"]),
    ("ec2", "Virtual machines, security groups, volumes.", "aws ec2 describe-instances", &["autoscaling"]),
    ("autoscaling", "Auto Scaling groups and launch templates.", "aws autoscaling describe-auto-scaling-groups", &["ec2"]),
    ("iam", "Users, roles, and policies.", "aws iam list-roles", &[]),
    ("lambda", "Serverless function management.", "aws lambda list-functions", &["iam"]),
    ("cloudfront", "CDN distributions and invalidations.", "aws cloudfront list-distributions", &["s3"]),
    ("rds", "Managed relational databases.", "aws rds describe-db-instances", &["ec2"]),
    ("logs", "CloudWatch Logs groups and streams.", "aws logs describe-log-groups", &[]),
    ("sts", "Temporary credentials and identity.", "aws sts get-caller-identity", &["iam"]),
    ("deploy", "Bouncer's own build-and-deploy orchestrator action slot.", "deploy --service api --env staging", &["s3", "cloudfront"]),
];

/// Full table, or the entries matching `query` (service/command name or
/// description substring, case-insensitive).
#[must_use]
pub fn lookup(query: Option<&str>) -> Vec<HelpEntry> {
    let query = query.map(str::to_lowercase);
    ENTRIES
        .iter()
        .filter(|(name, description, _, _)| query.as_deref().is_none_or(|q| name.contains(q) || description.to_lowercase().contains(q)))
        .map(|(name, description, example, see_also)| HelpEntry {
            name: (*name).to_owned(),
            description: (*description).to_owned(),
            example: (*example).to_owned(),
            see_also: see_also.iter().map(|s| (*s).to_owned()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_without_query_returns_everything() {
        assert_eq!(lookup(None).len(), ENTRIES.len());
    }

    #[test]
    fn lookup_matches_by_name() {
        let results = lookup(Some("s3"));
        assert!(results.iter().any(|entry| entry.name == "s3"));
        assert!(results.iter().any(|entry| entry.name == "s3api"));
    }

    #[test]
    fn lookup_unknown_service_is_empty() {
        assert!(lookup(Some("not-a-real-service")).is_empty());
    }
}
