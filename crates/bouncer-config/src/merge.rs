//! Layered TOML merging (spec §1: workspace → user → env → embedded
//! defaults, highest precedence first).

/// Recursively deep-merge `overlay` into `base`. Tables merge field by
/// field; scalars and arrays from the overlay replace the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Read the value at a dotted path, e.g. `"chat.chat_id"`.
pub fn get_path<'a>(root: &'a toml::Value, path: &str) -> Option<&'a toml::Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_table()?.get(segment)?;
    }
    Some(current)
}

/// Write a scalar at a dotted path, creating intermediate tables as needed.
/// A no-op if `path` is empty.
pub fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let Some((head, rest)) = path.split_once('.') else {
        if !path.is_empty() {
            if !matches!(root, toml::Value::Table(_)) {
                *root = toml::Value::Table(toml::map::Map::new());
            }
            if let toml::Value::Table(table) = root {
                table.insert(path.to_owned(), value);
            }
        }
        return;
    };

    if !matches!(root, toml::Value::Table(_)) {
        *root = toml::Value::Table(toml::map::Map::new());
    }
    if let toml::Value::Table(table) = root {
        let child = table.entry(head.to_owned()).or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        set_path(child, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_merge_replaces_leaves_and_keeps_untouched_siblings() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\nx = 9\n").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(get_path(&base, "a.x").unwrap().as_integer(), Some(9));
        assert_eq!(get_path(&base, "a.y").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn set_path_writes_nested_scalar() {
        let mut root = toml::Value::Table(toml::map::Map::new());
        set_path(&mut root, "chat.chat_id", toml::Value::Integer(42));
        assert_eq!(get_path(&root, "chat.chat_id").unwrap().as_integer(), Some(42));
    }
}
