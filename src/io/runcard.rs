//! Runcard loading (YAML).

use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::RunCard;
use crate::error::AppError;

/// Turn serde's "missing field" wording into the node/key form users see for
/// every other runcard problem.
fn describe(e: &serde_yaml_ng::Error) -> String {
    let msg = e.to_string();
    let Some((head, tail)) = msg.split_once("missing field `") else {
        return msg;
    };
    let key = tail.split('`').next().unwrap_or_default();
    let node = head.trim().trim_end_matches(':').trim();
    let node = if node.is_empty() { "root" } else { node };
    format!(r#"Error key "{key}" not found in node "{node}""#)
}

pub fn parse_runcard(text: &str) -> Result<RunCard, AppError> {
    let card: RunCard = serde_yaml_ng::from_str(text)
        .map_err(|e| AppError::config(format!("Invalid runcard: {}", describe(&e))))?;
    card.validate()?;
    Ok(card)
}

pub fn load_runcard(path: &Path) -> Result<RunCard, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read runcard '{}': {e}", path.display())))?;
    let card = parse_runcard(&text)
        .map_err(|e| AppError::new(e.kind(), format!("{}: {}", path.display(), e.message())))?;
    info!(
        path = %path.display(),
        params = card.minimizer.bounds.len(),
        "Loaded runcard."
    );
    Ok(card)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;

    pub(crate) const RUNCARD: &str = r#"
input:
  folders: [runs]
  patterns: ["/A/"]
  unpatterns: ["/A/skip"]
  expfiles: [data.yoda]
  weights:
    "/A/y": 2.0
model:
  seed: 0
  scan: false
  noscan_setup:
    epochs: 100
    layers: [8, 8]
minimizer:
  bounds:
    - {name: a, min: 0.0, max: 5.0}
    - {name: b, min: 5.0, max: 25.0}
  restarts: 2
"#;

    #[test]
    fn parses_full_runcard() {
        let card = parse_runcard(RUNCARD).unwrap();
        assert_eq!(card.param_names(), vec!["a", "b"]);
        assert_eq!(card.input.weights.get("/A/y"), Some(&2.0));
        assert!(card.input.selects("/A/x"));
        assert!(!card.input.selects("/A/skip_me"));
        assert!(!card.input.selects("/B/x"));
        assert_eq!(card.minimizer.restarts, 2);
    }

    #[test]
    fn missing_key_names_key_and_node() {
        let text = RUNCARD.replace("  seed: 0\n", "");
        let err = parse_runcard(&text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.message().contains(r#"Error key "seed" not found"#), "{}", err.message());
    }

    #[test]
    fn missing_setup_for_scan_mode() {
        let text = RUNCARD.replace("scan: false", "scan: true");
        let err = parse_runcard(&text).unwrap_err();
        assert!(err.message().contains("scan_setup"));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let text = RUNCARD.replace("{name: a, min: 0.0, max: 5.0}", "{name: a, min: 5.0, max: 0.0}");
        assert!(parse_runcard(&text).is_err());
        let text = RUNCARD.replace("name: b", "name: a");
        assert!(parse_runcard(&text).is_err());
    }

    #[test]
    fn extra_keys_are_ignored() {
        let text = RUNCARD
            .replace("  restarts: 2\n", "  restarts: 2\n  tolerance: 1\n")
            .replace("  seed: 0\n", "  seed: 0\n  backend: keras\n")
            .replace("{name: a, min: 0.0, max: 5.0}", "{name: a, min: 0.0, max: 5.0, unit: GeV}");
        let card = parse_runcard(&format!("{text}output: report/\n")).unwrap();
        assert_eq!(card.param_names(), vec!["a", "b"]);
        assert_eq!(card.minimizer.restarts, 2);
    }
}
