use std::fmt;
use std::path::Path;

use ariadne::Color;
use ariadne::Label;
use ariadne::Report;
use ariadne::ReportKind;
use ariadne::Source;

/// A single problem found while validating a loaded configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field_path: &str, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.field_path, self.message)
    }
}

/// One line per validation error
pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a TOML parse error against the file it came from using Ariadne
pub fn format_parse_error(path: &Path, content: &str, error: &toml::de::Error) -> String {
    let file_id = path.to_string_lossy().to_string();
    let span = error.span().unwrap_or(0..0);

    let report = Report::build(ReportKind::Error, (file_id.clone(), span.clone()))
        .with_message(format!("Failed to parse '{}'", path.display()))
        .with_label(
            Label::new((file_id.clone(), span))
                .with_message(error.message())
                .with_color(Color::Red),
        )
        .finish();

    let mut output = Vec::new();
    if report
        .write((file_id, Source::from(content)), &mut output)
        .is_err()
    {
        return error.to_string();
    }

    String::from_utf8_lossy(&output).to_string()
}
