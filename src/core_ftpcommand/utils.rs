// Argument helpers shared by the command handlers. Handlers receive the raw
// line, terminator included, and re-parse it themselves.

/// Everything after the verb, trimmed. Empty if the line has no argument.
pub fn argument(line: &str) -> &str {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.find([' ', '\t']) {
        Some(pos) => line[pos..].trim(),
        None => "",
    }
}

/// The last whitespace-separated token after the verb.
pub fn trailing_token(line: &str) -> Option<&str> {
    argument(line).split_whitespace().last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_keeps_inner_spaces() {
        assert_eq!(argument("RETR my file.txt\r\n"), "my file.txt");
        assert_eq!(argument("STOR\t name \r\n"), "name");
        assert_eq!(argument("PWD\r\n"), "");
        assert_eq!(argument("CWD \r\n"), "");
    }

    #[test]
    fn trailing_token_takes_last_field() {
        assert_eq!(trailing_token("REST 100\r\n"), Some("100"));
        assert_eq!(trailing_token("REST x 200\r\n"), Some("200"));
        assert_eq!(trailing_token("REST\r\n"), None);
    }
}
