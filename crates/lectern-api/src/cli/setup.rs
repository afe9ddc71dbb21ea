//! Interactive prompts for start-up values not given on the command line.

use std::path::{Path, PathBuf};

use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;

/// Use `given` or ask for a model name, offering the configured default.
pub fn resolve_model(given: Option<String>, default: &str) -> anyhow::Result<String> {
    if let Some(model) = given.filter(|m| !m.trim().is_empty()) {
        return Ok(model);
    }
    let model: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Model name")
        .default(default.to_string())
        .interact_text()?;
    Ok(model.trim().to_string())
}

/// Use `given` or ask for the documents path until an existing one is
/// entered.
pub fn resolve_docs(given: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path) = given {
        return Ok(path);
    }
    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Documents path")
        .validate_with(|input: &String| validate_docs_path(Path::new(input.trim())))
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

fn validate_docs_path(path: &Path) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        Err("enter a file or directory".to_string())
    } else if !path.exists() {
        Err(format!("{} does not exist", path.display()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_given_values_skip_prompts() {
        assert_eq!(resolve_model(Some("phi3".into()), "llama3").unwrap(), "phi3");
        assert_eq!(
            resolve_docs(Some(PathBuf::from("notes"))).unwrap(),
            PathBuf::from("notes")
        );
    }

    #[test]
    fn test_validate_docs_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_docs_path(dir.path()).is_ok());
        assert!(validate_docs_path(&dir.path().join("missing")).is_err());
        assert!(validate_docs_path(Path::new("")).is_err());
    }
}
