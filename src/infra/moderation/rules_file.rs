// Loads content rules from a JSON rules file.
//
// A missing or invalid rules file never leaves the bot without rules: it
// falls back to the built-in set.

use crate::core::moderation::{compile_rules, default_rules, Rule, RuleDefinition, RuleError};
use std::path::Path;

/// Rules from `path`, or the built-in rules when `path` is `None` or the file
/// can't be used.
pub fn load_rules(path: Option<&Path>) -> Result<Vec<Rule>, RuleError> {
    let Some(path) = path else {
        return default_rules();
    };

    match read_rules(path) {
        Ok(rules) => {
            tracing::info!(path = %path.display(), count = rules.len(), "Loaded content rules");
            Ok(rules)
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Error loading rules file, using built-in rules");
            default_rules()
        }
    }
}

fn read_rules(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| RuleError::InvalidRuleFile(e.to_string()))?;
    let definitions: Vec<RuleDefinition> =
        serde_json::from_str(&raw).map_err(|e| RuleError::InvalidRuleFile(e.to_string()))?;
    compile_rules(definitions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_path_uses_built_in_rules() {
        let rules = load_rules(None).unwrap();
        assert_eq!(rules.len(), 6);
    }

    #[test]
    fn test_loads_rules_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "Opal Scams", "type": "single_regex", "pattern": "free opal",
                 "check": ["title", "body"], "action": "spam"},
                {"name": "No Facebook", "type": "domain_exact", "domains": ["facebook.com"],
                 "check": ["domain"], "action": "remove",
                 "message": "Sorry u/{{author}}, no {{match}} links."}
            ]"#,
        )
        .unwrap();

        let rules = load_rules(Some(&path)).unwrap();
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Opal Scams", "No Facebook"]);
    }

    #[test]
    fn test_invalid_file_falls_back_to_built_in_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");

        std::fs::write(&path, "rules: [oops").unwrap();
        assert_eq!(load_rules(Some(&path)).unwrap().len(), 6);

        std::fs::write(
            &path,
            r#"[{"name": "Bad", "type": "single_regex", "pattern": "(", "check": ["title"], "action": "remove"}]"#,
        )
        .unwrap();
        assert_eq!(load_rules(Some(&path)).unwrap()[0].name, "Disguised Links");

        let missing = dir.path().join("missing.json");
        assert_eq!(load_rules(Some(&missing)).unwrap().len(), 6);
    }
}
