use scopewatch_core_types::StatusCode;

/// Number of custom field slots in the context store
pub const MAX_CUSTOM_FIELDS: usize = 4;

/// What the caller reports when closing an audit or metric scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeOutcome {
    status: StatusCode,
    response_code: Option<String>,
    response_description: Option<String>,
    custom_fields: Vec<String>,
    message: Option<String>,
    args: Vec<String>,
}

impl ScopeOutcome {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            response_code: None,
            response_description: None,
            custom_fields: Vec::new(),
            message: None,
            args: Vec::new(),
        }
    }

    pub fn complete() -> Self {
        Self::new(StatusCode::Complete)
    }

    pub fn error() -> Self {
        Self::new(StatusCode::Error)
    }

    /// Add response code and description
    pub fn with_response(mut self, code: impl Into<String>, description: impl Into<String>) -> Self {
        self.response_code = Some(code.into());
        self.response_description = Some(description.into());
        self
    }

    /// Fill custom field slots in order; values beyond the fourth are dropped
    pub fn with_custom_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_fields = fields
            .into_iter()
            .take(MAX_CUSTOM_FIELDS)
            .map(Into::into)
            .collect();
        self
    }

    /// Replace the default end-of-scope message id and attach arguments
    pub fn with_message<I, S>(mut self, message: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message = Some(message.into());
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn response_code(&self) -> Option<&str> {
        self.response_code.as_deref()
    }

    pub fn response_description(&self) -> Option<&str> {
        self.response_description.as_deref()
    }

    pub fn custom_fields(&self) -> &[String] {
        &self.custom_fields
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Make an argument safe for pipe-delimited layouts
pub fn normalize_arg(arg: &str) -> String {
    arg.replace('|', "!").replace('\n', " - ")
}
