use serde_json::{Map, Value};

/// Decodes a bracket-notation query string into a nested object:
/// `filters[slug][$eq]=home&sort[0]=order:asc` becomes
/// `{ "filters": { "slug": { "$eq": "home" } }, "sort": ["order:asc"] }`.
///
/// Objects whose keys are all indices are turned into arrays, and a
/// repeated plain key keeps its last value.
pub fn parse_query(raw: &str) -> Value {
    let mut root = Map::new();
    let mut push_counter = 0usize;

    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let mut segments = split_key(&key);
        if segments.is_empty() {
            continue;
        }
        for segment in segments.iter_mut() {
            if segment.is_empty() {
                // `tags[]=a&tags[]=b`
                *segment = push_counter.to_string();
                push_counter += 1;
            }
        }
        insert(&mut root, &segments, Value::String(value.into_owned()));
    }

    arrays_from_indices(Value::Object(root))
}

fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 || !key.ends_with(']') {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        match stripped.find(']') {
            Some(close) => {
                segments.push(stripped[..close].to_string());
                rest = &stripped[close + 1..];
            }
            None => return vec![key.to_string()],
        }
    }
    if !rest.is_empty() {
        return vec![key.to_string()];
    }
    segments
}

fn insert(node: &mut Map<String, Value>, segments: &[String], value: Value) {
    let (head, tail) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };

    if tail.is_empty() {
        node.insert(head.clone(), value);
        return;
    }

    let child = node
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        // A scalar was already set at this key; the nested form wins
        *child = Value::Object(Map::new());
    }
    if let Value::Object(child_map) = child {
        insert(child_map, tail, value);
    }
}

fn arrays_from_indices(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let all_indices = !map.is_empty() && map.keys().all(|k| k.parse::<usize>().is_ok());
            if all_indices {
                let mut entries: Vec<(usize, Value)> = map
                    .into_iter()
                    .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, arrays_from_indices(v))))
                    .collect();
                entries.sort_by_key(|(i, _)| *i);
                Value::Array(entries.into_iter().map(|(_, v)| v).collect())
            } else {
                Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, arrays_from_indices(v)))
                        .collect(),
                )
            }
        }
        other => other,
    }
}

/// Reads a single top-level string parameter from a decoded query
pub fn query_param<'a>(query: &'a Value, name: &str) -> Option<&'a str> {
    query.get(name).and_then(Value::as_str)
}
