//! SQL source units.
//!
//! A [`Transaction`] here is one source of SQL text (an inline query or a
//! script file), not a database transaction. Statements from every source run
//! in autocommit mode, one at a time.

use std::fmt;
use std::path::{Path, PathBuf};

/// One unit of SQL to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// SQL supplied directly on the command line or in the environment.
    Inline(String),
    /// SQL read from a script file.
    ScriptFile(PathBuf),
}

impl Transaction {
    /// Build the ordered transaction list for a run.
    ///
    /// The inline query, when present, always comes first; files follow in
    /// the order they were supplied.
    pub fn collect<I, P>(query: Option<&str>, files: I) -> Vec<Transaction>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        query
            .map(|q| Transaction::Inline(q.to_string()))
            .into_iter()
            .chain(files.into_iter().map(|f| Transaction::ScriptFile(f.into())))
            .collect()
    }

    pub fn as_inline(&self) -> Option<&str> {
        match self {
            Self::Inline(sql) => Some(sql),
            Self::ScriptFile(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Inline(_) => None,
            Self::ScriptFile(path) => Some(path),
        }
    }

    /// Short description used in logs and error messages.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline(_) => write!(f, "inline query"),
            Self::ScriptFile(path) => write!(f, "file {}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inline_first_then_files_in_order() {
        let txs = Transaction::collect(Some("SELECT 1;"), ["b.sql", "a.sql"]);
        assert_eq!(
            txs,
            vec![
                Transaction::Inline("SELECT 1;".to_string()),
                Transaction::ScriptFile(PathBuf::from("b.sql")),
                Transaction::ScriptFile(PathBuf::from("a.sql")),
            ]
        );
    }

    #[test]
    fn test_collect_without_query() {
        let txs = Transaction::collect(None, vec![PathBuf::from("only.sql")]);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].as_path(), Some(Path::new("only.sql")));
        assert!(txs[0].as_inline().is_none());
    }

    #[test]
    fn test_collect_nothing() {
        let txs = Transaction::collect(None, Vec::<PathBuf>::new());
        assert!(txs.is_empty());
    }

    #[test]
    fn test_label() {
        assert_eq!(Transaction::Inline("x".into()).label(), "inline query");
        assert_eq!(
            Transaction::ScriptFile("db/init.sql".into()).label(),
            "file db/init.sql"
        );
    }
}
