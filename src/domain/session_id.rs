use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Clone, Debug, Validate)]
pub struct SessionId {
    #[validate(custom(function = "not_blank"))]
    id: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl SessionId {
    pub fn parse(s: String) -> Result<Self, ValidationErrors> {
        let session_id = Self { id: s };
        session_id.validate()?;
        Ok(session_id)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.id.fmt(f)
    }
}
