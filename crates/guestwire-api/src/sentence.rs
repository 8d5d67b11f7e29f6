// Sentences and reply batches
//
// A sentence is an ordered list of words; on the wire it ends with a
// zero-length word, which is never stored here. Requests start with a
// command path, replies with one of the `!` markers.

use std::fmt;

use strum::{AsRefStr, Display, EnumString};

use crate::error::Error;

/// Reply-type marker carried as the first word of every reply sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
pub enum ReplyKind {
    /// One data row follows.
    #[strum(serialize = "!re")]
    Re,
    /// Successful end of the batch.
    #[strum(serialize = "!done")]
    Done,
    /// One recoverable error. The router still ends the batch with `!done`.
    #[strum(serialize = "!trap")]
    Trap,
    /// Connection-ending error.
    #[strum(serialize = "!fatal")]
    Fatal,
}

impl ReplyKind {
    pub fn from_word(word: &str) -> Option<Self> {
        word.parse().ok()
    }

    /// `!done` and `!fatal` end a reply batch.
    pub fn ends_batch(self) -> bool {
        matches!(self, Self::Done | Self::Fatal)
    }
}

/// One request or reply unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sentence {
    words: Vec<String>,
}

impl Sentence {
    /// Start a sentence with its command path or reply marker.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            words: vec![command.into()],
        }
    }

    pub fn from_words(words: Vec<String>) -> Self {
        Self { words }
    }

    /// Append an attribute word: `=key=value`.
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.words.push(format!("={key}={value}"));
        self
    }

    /// Append a query filter word: `?key=value`.
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.words.push(format!("?{key}={value}"));
        self
    }

    /// Append a word verbatim.
    pub fn with_word(mut self, word: impl Into<String>) -> Self {
        self.words.push(word.into());
        self
    }

    pub fn push_word(&mut self, word: impl Into<String>) {
        self.words.push(word.into());
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn into_words(self) -> Vec<String> {
        self.words
    }

    pub fn command(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    pub fn reply_kind(&self) -> Option<ReplyKind> {
        self.command().and_then(ReplyKind::from_word)
    }

    /// Value of the first `=key=value` word with the given key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.words.iter().skip(1).find_map(|word| {
            let (k, v) = word.strip_prefix('=')?.split_once('=')?;
            (k == key).then_some(v)
        })
    }

    /// Human-readable message of a `!trap` or `!fatal` reply.
    ///
    /// Traps carry `=message=`; fatal replies usually carry a bare word.
    pub fn message(&self) -> Option<&str> {
        self.attribute("message").or_else(|| {
            self.words
                .iter()
                .skip(1)
                .map(String::as_str)
                .find(|w| !w.starts_with('=') && !w.starts_with('.'))
        })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            // Never echo secrets into logs.
            if word.starts_with("=password=") {
                f.write_str("=password=***")?;
            } else {
                f.write_str(word)?;
            }
        }
        Ok(())
    }
}

/// Coarse outcome of a reply batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Ended with `!done` and carried at least one `!re` row.
    Success,
    /// Ended with `!done` and carried no rows.
    Empty,
    /// Contained a `!trap` or ended with `!fatal`.
    Error,
}

/// All sentences received for one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyBatch {
    sentences: Vec<Sentence>,
}

impl ReplyBatch {
    pub fn new(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn into_sentences(self) -> Vec<Sentence> {
        self.sentences
    }

    /// `!re` data rows in arrival order.
    pub fn rows(&self) -> impl Iterator<Item = &Sentence> {
        self.sentences
            .iter()
            .filter(|s| s.reply_kind() == Some(ReplyKind::Re))
    }

    pub fn row_count(&self) -> usize {
        self.rows().count()
    }

    /// The sentence that ended the batch, if one arrived.
    pub fn terminal(&self) -> Option<&Sentence> {
        self.sentences
            .last()
            .filter(|s| s.reply_kind().is_some_and(ReplyKind::ends_batch))
    }

    pub fn trap(&self) -> Option<&Sentence> {
        self.sentences
            .iter()
            .find(|s| s.reply_kind() == Some(ReplyKind::Trap))
    }

    pub fn fatal(&self) -> Option<&Sentence> {
        self.sentences
            .iter()
            .find(|s| s.reply_kind() == Some(ReplyKind::Fatal))
    }

    /// Value returned by the command in `!done =ret=...` (e.g. the id of an added item).
    pub fn ret(&self) -> Option<&str> {
        self.terminal()
            .filter(|s| s.reply_kind() == Some(ReplyKind::Done))
            .and_then(|s| s.attribute("ret"))
    }

    pub fn status(&self) -> BatchStatus {
        if self.fatal().is_some() || self.trap().is_some() {
            BatchStatus::Error
        } else if self.row_count() == 0 {
            BatchStatus::Empty
        } else {
            BatchStatus::Success
        }
    }

    /// Turn a completed batch into its protocol outcome.
    ///
    /// `!fatal` wins over `!trap`; a clean `!done` is success no matter
    /// how many rows preceded it.
    pub fn into_result(self) -> Result<Self, Error> {
        if let Some(fatal) = self.fatal() {
            return Err(Error::RemoteFatal {
                message: fatal.message().unwrap_or("connection closed by router").into(),
            });
        }
        if let Some(trap) = self.trap() {
            return Err(Error::RemoteTrap {
                message: trap.message().unwrap_or("unknown error").into(),
                category: trap.attribute("category").and_then(|c| c.parse().ok()),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn batch(sentences: &[&[&str]]) -> ReplyBatch {
        ReplyBatch::new(
            sentences
                .iter()
                .map(|words| Sentence::from_words(words.iter().map(|w| (*w).to_owned()).collect()))
                .collect(),
        )
    }

    #[test]
    fn builds_request_words() {
        let s = Sentence::new("/ip/hotspot/user/print").with_query("name", "guest-7");
        assert_eq!(s.words(), ["/ip/hotspot/user/print", "?name=guest-7"]);
    }

    #[test]
    fn attribute_lookup_keeps_equals_in_value() {
        let s = Sentence::new("!re").with_attribute("comment", "a=b");
        assert_eq!(s.attribute("comment"), Some("a=b"));
        assert_eq!(s.attribute("missing"), None);
    }

    #[test]
    fn display_masks_password() {
        let s = Sentence::new("/login")
            .with_attribute("name", "api")
            .with_attribute("password", "hunter2");
        assert_eq!(s.to_string(), "/login =name=api =password=***");
    }

    #[test]
    fn done_with_rows_is_success() {
        let b = batch(&[&["!re", "=name=a"], &["!re", "=name=b"], &["!done"]]);
        assert_eq!(b.status(), BatchStatus::Success);
        assert_eq!(b.row_count(), 2);
        assert!(b.into_result().is_ok());
    }

    #[test]
    fn bare_done_is_empty_success() {
        let b = batch(&[&["!done"]]);
        assert_eq!(b.status(), BatchStatus::Empty);
        assert!(b.into_result().is_ok());
    }

    #[test]
    fn trap_becomes_remote_trap() {
        let b = batch(&[
            &["!trap", "=category=1", "=message=no such item"],
            &["!done"],
        ]);
        assert_eq!(b.status(), BatchStatus::Error);
        match b.into_result() {
            Err(Error::RemoteTrap { message, category }) => {
                assert_eq!(message, "no such item");
                assert_eq!(category, Some(1));
            }
            other => panic!("expected RemoteTrap, got {other:?}"),
        }
    }

    #[test]
    fn fatal_becomes_remote_fatal() {
        let b = batch(&[&["!fatal", "session terminated on request"]]);
        match b.into_result() {
            Err(Error::RemoteFatal { message }) => {
                assert_eq!(message, "session terminated on request");
            }
            other => panic!("expected RemoteFatal, got {other:?}"),
        }
    }

    #[test]
    fn ret_comes_from_done() {
        let b = batch(&[&["!done", "=ret=*1A"]]);
        assert_eq!(b.ret(), Some("*1A"));
    }
}
