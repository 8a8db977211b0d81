use std::collections::HashMap;

use crate::credentials::TemporaryCredentials;

/// Build the environment mapping passed to a subprocess invocation (spec
/// §4.9, §9 "Global mutable state (credential env)"): a brand-new map,
/// never a mutation of `std::env`, inherited from the current process with
/// only the AWS credential triplet overwritten when `creds` is present, and
/// `AWS_PAGER` unconditionally cleared.
///
/// Two concurrent calls with different `creds` never observe each other's
/// values because each produces its own owned `HashMap` — nothing is
/// written through `std::env::set_var`.
#[must_use]
pub fn build_environment(ambient: &HashMap<String, String>, creds: Option<&TemporaryCredentials>) -> HashMap<String, String> {
    let mut env = ambient.clone();
    env.insert("AWS_PAGER".to_owned(), String::new());
    if let Some(creds) = creds {
        env.insert("AWS_ACCESS_KEY_ID".to_owned(), creds.access_key_id.clone());
        env.insert("AWS_SECRET_ACCESS_KEY".to_owned(), creds.secret_access_key.clone());
        env.insert("AWS_SESSION_TOKEN".to_owned(), creds.session_token.clone());
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_only_clears_pager_without_touching_credentials() {
        let mut ambient = HashMap::new();
        ambient.insert("AWS_ACCESS_KEY_ID".to_owned(), "ambient-key".to_owned());
        let env = build_environment(&ambient, None);
        assert_eq!(env.get("AWS_PAGER"), Some(&String::new()));
        assert_eq!(env.get("AWS_ACCESS_KEY_ID"), Some(&"ambient-key".to_owned()));
    }

    #[test]
    fn assumed_role_overwrites_only_the_credential_triplet() {
        let mut ambient = HashMap::new();
        ambient.insert("PATH".to_owned(), "/usr/bin".to_owned());
        ambient.insert("AWS_ACCESS_KEY_ID".to_owned(), "ambient-key".to_owned());
        let creds = TemporaryCredentials {
            access_key_id: "ASIA-temp".to_owned(),
            secret_access_key: "secret".to_owned(),
            session_token: "token".to_owned(),
        };
        let env = build_environment(&ambient, Some(&creds));
        assert_eq!(env.get("AWS_ACCESS_KEY_ID"), Some(&"ASIA-temp".to_owned()));
        assert_eq!(env.get("AWS_SESSION_TOKEN"), Some(&"token".to_owned()));
        assert_eq!(env.get("PATH"), Some(&"/usr/bin".to_owned()));
    }

    #[test]
    fn two_concurrent_builds_do_not_alias() {
        let ambient = HashMap::new();
        let creds_a = TemporaryCredentials {
            access_key_id: "a".to_owned(),
            secret_access_key: "a".to_owned(),
            session_token: "a".to_owned(),
        };
        let creds_b = TemporaryCredentials {
            access_key_id: "b".to_owned(),
            secret_access_key: "b".to_owned(),
            session_token: "b".to_owned(),
        };
        let env_a = build_environment(&ambient, Some(&creds_a));
        let env_b = build_environment(&ambient, Some(&creds_b));
        assert_ne!(env_a.get("AWS_ACCESS_KEY_ID"), env_b.get("AWS_ACCESS_KEY_ID"));
    }
}
