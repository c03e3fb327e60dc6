use crate::error::Result;
use chrono::Utc;
use serde_json::{Value, json};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Append one observer event as a JSON line.
pub fn mirror_event(path: &Path, event: &str, fields: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    let mut line = json!({
        "ts": Utc::now().to_rfc3339(),
        "event": event,
    });
    if let (Some(obj), Some(extra)) = (line.as_object_mut(), fields.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }
    writeln!(f, "{line}")?;
    Ok(())
}
