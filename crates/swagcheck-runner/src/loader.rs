//! Reading an API description from disk

use std::path::Path;

use swagcheck_core::ApiDescription;

use crate::runner::RunnerError;

/// Read and parse the description at `path`.
///
/// # Errors
///
/// Returns error if the file cannot be read, is neither JSON nor YAML, or
/// does not have the shape of an API description.
pub fn load_description(path: &Path) -> Result<ApiDescription, RunnerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RunnerError::Io(format!("{}: {e}", path.display())))?;
    let root = parse_description(path, &content)?;
    let doc = ApiDescription::from_value(root)?;
    tracing::debug!(
        path = %path.display(),
        routes = doc.paths().len(),
        "loaded description"
    );
    Ok(doc)
}

/// Parse a description from JSON or YAML.
///
/// Detection strategy: try extension first (`.yaml`/`.yml`/`.json`), then
/// fall back to content sniffing (leading `{` → JSON, otherwise YAML).
///
/// # Errors
///
/// Returns error if the content does not parse in the detected format.
pub fn parse_description(path: &Path, content: &str) -> Result<serde_json::Value, RunnerError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => parse_yaml(content),
        "json" => parse_json(content),
        _ => {
            // Content sniffing: trimmed first char
            if content.trim_start().starts_with('{') {
                parse_json(content)
            } else {
                parse_yaml(content)
            }
        }
    }
}

fn parse_json(content: &str) -> Result<serde_json::Value, RunnerError> {
    serde_json::from_str(content).map_err(|e| RunnerError::Parse(format!("Invalid JSON: {e}")))
}

fn parse_yaml(content: &str) -> Result<serde_json::Value, RunnerError> {
    serde_yml::from_str(content).map_err(|e| RunnerError::Parse(format!("Invalid YAML: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use swagcheck_core::{HttpMethod, SpecError};

    const YAML: &str = "\
swagger: '2.0'
host: petstore.swagger.io
paths:
  /pets/{id}:
    delete:
      parameters:
        - name: id
          in: path
      responses:
        '204':
          description: deleted
      x-test:
        - description: Delete a pet
          request:
            parameters:
              id: 101
          response:
            '204': {}
";

    #[test]
    fn parse_json_by_extension() {
        let v = parse_description(Path::new("swagger.json"), r#"{"swagger": "2.0"}"#).unwrap();
        assert_eq!(v["swagger"], "2.0");
    }

    #[test]
    fn parse_yaml_by_extension() {
        let v = parse_description(Path::new("swagger.yaml"), "swagger: '2.0'\n").unwrap();
        assert_eq!(v["swagger"], "2.0");
        let v = parse_description(Path::new("swagger.yml"), "swagger: '2.0'\n").unwrap();
        assert_eq!(v["swagger"], "2.0");
    }

    #[test]
    fn sniff_json_and_yaml() {
        let v = parse_description(Path::new("swagger"), r#"{"swagger": "2.0"}"#).unwrap();
        assert_eq!(v["swagger"], "2.0");
        let v = parse_description(Path::new("swagger.txt"), "swagger: '2.0'\n").unwrap();
        assert_eq!(v["swagger"], "2.0");
    }

    #[test]
    fn invalid_json_error() {
        let err = parse_description(Path::new("swagger.json"), "{ invalid json").unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn invalid_yaml_error() {
        let err = parse_description(Path::new("swagger.yaml"), ":\n  :\n    - [invalid").unwrap_err();
        assert!(err.to_string().contains("Invalid YAML"));
    }

    #[test]
    fn load_yaml_description() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swagger.yaml");
        std::fs::write(&path, YAML).unwrap();

        let doc = load_description(&path).unwrap();
        assert_eq!(doc.host(), Some("petstore.swagger.io"));
        let op = &doc.paths()[0].operations[0];
        assert_eq!(op.method, HttpMethod::Delete);
        assert_eq!(op.examples[0].description.as_deref(), Some("Delete a pet"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_description(Path::new("/nonexistent/swagger.json")).unwrap_err();
        assert!(matches!(err, RunnerError::Io(_)));
    }

    #[test]
    fn malformed_description_is_spec_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swagger.json");
        std::fs::write(&path, r#"{"paths": ["not", "a", "map"]}"#).unwrap();

        let err = load_description(&path).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Spec(SpecError::InvalidDescription(_))
        ));
    }
}
