/// A CLI-aware tokenizer that never invokes a shell (spec §4.1).
///
/// Recognizes single- and double-quoted strings (with backslash-escape of
/// the same quote), back-tick literals (JMESPath), and balanced
/// brace/bracket/parenthesis structures, splitting otherwise on unquoted
/// whitespace. An empty quoted string yields an empty-string token. This is
/// the sole input to the executor (C9) — it is never handed a shell string.
#[must_use]
pub fn tokenize(cmd: &str) -> Vec<String> {
    let chars: Vec<char> = cmd.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_current = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                if has_current {
                    tokens.push(std::mem::take(&mut current));
                    has_current = false;
                }
                i += 1;
            }
            '\'' | '"' | '`' => {
                has_current = true;
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] == c {
                        current.push(c);
                        i += 2;
                    } else {
                        current.push(chars[i]);
                        i += 1;
                    }
                }
                // Skip the closing quote if present; an unterminated quote
                // simply runs to end of input.
                if i < chars.len() {
                    i += 1;
                }
            }
            '{' | '[' | '(' => {
                has_current = true;
                let (closer, depth_open) = match c {
                    '{' => ('}', '{'),
                    '[' => (']', '['),
                    _ => (')', '('),
                };
                let mut depth = 1;
                current.push(c);
                i += 1;
                while i < chars.len() && depth > 0 {
                    if chars[i] == depth_open {
                        depth += 1;
                    } else if chars[i] == closer {
                        depth -= 1;
                    }
                    current.push(chars[i]);
                    i += 1;
                }
            }
            _ => {
                has_current = true;
                current.push(c);
                i += 1;
            }
        }
    }
    if has_current {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_unquoted_space() {
        assert_eq!(tokenize("aws ec2 describe-instances"), vec!["aws", "ec2", "describe-instances"]);
    }

    #[test]
    fn preserves_double_quoted_string_with_spaces() {
        assert_eq!(
            tokenize(r#"aws ec2 run-instances --tag "my cool tag""#),
            vec!["aws", "ec2", "run-instances", "--tag", "my cool tag"]
        );
    }

    #[test]
    fn empty_quoted_string_yields_empty_token() {
        assert_eq!(tokenize(r#"aws s3 cp "" dest"#), vec!["aws", "s3", "cp", "", "dest"]);
    }

    #[test]
    fn handles_backtick_jmespath() {
        let tokens = tokenize("aws ec2 describe --query `Reservations[0]`");
        assert_eq!(tokens.last().unwrap(), "Reservations[0]");
    }

    #[test]
    fn handles_backslash_escaped_quote() {
        assert_eq!(tokenize(r#"echo "say \"hi\"""#), vec!["echo", "say \"hi\""]);
    }

    #[test]
    fn keeps_balanced_brackets_as_one_token() {
        let tokens = tokenize(r#"aws lambda invoke --payload {"key":"value"}"#);
        assert_eq!(tokens.last().unwrap(), r#"{"key":"value"}"#);
    }

    #[test]
    fn tokens_first_is_aws_iff_command_starts_with_aws_space() {
        assert_eq!(tokenize("aws ec2 describe-instances")[0], "aws");
        let tokens = tokenize("awsomecli foo");
        assert_ne!(tokens[0], "aws");
    }
}
