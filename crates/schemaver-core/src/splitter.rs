/// Splits a migration script into the statements an executor runs one by one.
pub struct StatementSplitter;

impl StatementSplitter {
    /// Split `script` on `;`, trimming each piece and dropping empty ones.
    ///
    /// This is a lexical split: a `;` inside a string literal or comment
    /// still ends the statement.
    pub fn split(script: &str) -> Vec<&str> {
        script
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}
