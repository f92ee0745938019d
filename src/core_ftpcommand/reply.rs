use std::fmt;

/// A single-line FTP reply: three-digit code plus text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    text: String,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The reply as sent on the wire, CRLF-terminated.
    pub fn to_line(&self) -> String {
        format!("{} {}\r\n", self.code, self.text)
    }

    pub fn syntax_error() -> Self {
        Self::new(501, "Syntax error in parameters or arguments.")
    }

    pub fn not_understood() -> Self {
        Self::new(500, "Command not understood")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_is_crlf_terminated() {
        assert_eq!(
            Reply::not_understood().to_line(),
            "500 Command not understood\r\n"
        );
        assert_eq!(Reply::new(213, "42").to_string(), "213 42");
    }
}
