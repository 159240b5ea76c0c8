//! Structural checks on workload output objects.
use serde_json::Value;

use gantry_model::error_text;

/// Places a diagnostic output may list its devices in.
const DEVICE_LISTS: &[&[&str]] = &[&["gpu_details"], &["devices"], &["gpu_info", "devices"]];

/// Names of the compute devices reported by a diagnostic output.
///
/// The first location holding at least one named device wins.
pub(crate) fn device_names(output: &Value) -> Vec<String> {
    for path in DEVICE_LISTS {
        let node = path.iter().try_fold(output, |node, key| node.get(*key));
        let Some(items) = node.and_then(Value::as_array) else {
            continue;
        };

        let names: Vec<String> = items
            .iter()
            .filter_map(|d| d.get("name").and_then(Value::as_str).or_else(|| d.as_str()))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();
        if !names.is_empty() {
            return names;
        }
    }
    Vec::new()
}

/// Error carried inside an otherwise completed output.
///
/// A populated `error` field fails the output whatever `status` says; a bare
/// `"status": "error"` fails it too.
pub(crate) fn reported_error(output: &Value) -> Option<String> {
    if let Some(msg) = output.get("error").and_then(error_text) {
        return Some(msg);
    }
    (output.get("status").and_then(Value::as_str) == Some("error"))
        .then(|| "workload reported status 'error'".to_string())
}

/// File and directory counts of a listing output.
pub(crate) fn listing(output: &Value) -> Result<(usize, usize), String> {
    if let Some(err) = output.get("error").and_then(error_text) {
        return Err(err);
    }
    let count = |key: &str| {
        output
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| format!("output has no '{key}' array"))
    };
    Ok((count("files")?, count("directories")?))
}
