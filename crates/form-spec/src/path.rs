use serde_json::Value;

/// Resolves a dot-separated field path against a values snapshot.
///
/// A top-level key that matches the whole path wins, so flat snapshots keyed
/// by dotted paths resolve the same way nested ones do. Array segments accept
/// a decimal index. Returns `None` as soon as a segment is missing or the
/// current value cannot be traversed.
pub fn resolve<'a>(values: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    if let Some(value) = values.as_object().and_then(|map| map.get(path)) {
        return Some(value);
    }

    path.split('.').try_fold(values, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Joins a parent path and a child segment.
pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}
