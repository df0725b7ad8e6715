use crate::error::{ReleaseFlowError, Result};

/// Annotated tag requested for a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    pub name: String,
    pub message: String,
}

impl TagSpec {
    /// Create a new tag request
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        TagSpec {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Full tag name with the configured prefix applied
    /// Example: prefix="v", name="1.2.0" -> "v1.2.0"
    pub fn prefixed_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name)
    }

    /// Reject names git would refuse as a tag ref
    pub fn validate(&self) -> Result<()> {
        let name = self.name.as_str();
        let invalid = name.is_empty()
            || name.starts_with('-')
            || name.ends_with(".lock")
            || name.ends_with('.')
            || name.contains("..")
            || name.contains("@{")
            || name
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c));

        if invalid {
            return Err(ReleaseFlowError::config(format!(
                "'{}' is not a valid tag name",
                name
            )));
        }

        Ok(())
    }
}
