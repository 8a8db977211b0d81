use regex::Regex;

/// True iff `pattern` should be matched as a wildcard pattern rather than an
/// exact string (spec §4.7: "recognized by the presence of `*` or `{…}`").
#[must_use]
pub fn is_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('{')
}

/// Compile a grant pattern into a regex. `*` matches any run of characters
/// except `/`; `**` matches across `/`; named placeholders match a
/// shaped substring (spec §4.7).
#[must_use]
pub fn compile_pattern(pattern: &str) -> Option<Regex> {
    let mut out = String::with_capacity(pattern.len() * 2);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '{' => {
                let mut name = String::new();
                for inner in chars.by_ref() {
                    if inner == '}' {
                        break;
                    }
                    name.push(inner);
                }
                out.push_str(placeholder_regex(&name));
            }
            other => {
                if is_regex_meta(other) {
                    out.push('\\');
                }
                out.push(other);
            }
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

fn is_regex_meta(c: char) -> bool {
    matches!(c, '.' | '+' | '?' | '(' | ')' | '[' | ']' | '^' | '$' | '|' | '\\')
}

fn placeholder_regex(name: &str) -> &'static str {
    match name {
        "uuid" => r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        "date" => r"\d{4}-\d{2}-\d{2}",
        "bucket" | "key" | "name" | "any" => r"[^\s]+",
        _ => r"[^\s]+",
    }
}

/// Does `cmd` (already normalized) satisfy `pattern`? Exact strings are
/// checked first by the caller; this is only reached once no exact match
/// exists (spec §4.7).
#[must_use]
pub fn matches_pattern(cmd: &str, pattern: &str) -> bool {
    compile_pattern(pattern).is_some_and(|re| re.is_match(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_wildcard_and_placeholder_as_patterns() {
        assert!(is_pattern("aws s3 cp s3://bucket/*"));
        assert!(is_pattern("aws ec2 describe-instances --instance-ids {any}"));
        assert!(!is_pattern("aws s3 ls"));
    }

    #[test]
    fn single_star_does_not_cross_path_separator() {
        assert!(matches_pattern("aws s3 cp s3://bucket/file.txt", "aws s3 cp s3://bucket/*"));
        assert!(!matches_pattern("aws s3 cp s3://bucket/sub/file.txt", "aws s3 cp s3://bucket/*"));
    }

    #[test]
    fn double_star_crosses_path_separator() {
        assert!(matches_pattern("aws s3 cp s3://bucket/sub/file.txt", "aws s3 cp s3://bucket/**"));
    }

    #[test]
    fn uuid_placeholder_matches_uuid_shape() {
        assert!(matches_pattern(
            "aws ec2 describe-instances --instance-ids 12345678-1234-1234-1234-123456789012",
            "aws ec2 describe-instances --instance-ids {uuid}"
        ));
    }

    #[test]
    fn date_placeholder_matches_date_shape() {
        assert!(matches_pattern(
            "aws logs get-log-events --log-stream-name 2024-03-05",
            "aws logs get-log-events --log-stream-name {date}"
        ));
    }
}
