//! Acquisition strategy selection.

use super::locator::Transport;
use super::options::{OptionMap, READ_STREAMING, WRITE_STREAMING};

/// How the document behind a connection is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Forward-only row reader over the resource bytes
    StreamRead,
    /// Bounded-window writer over a local `.xlsx` file, created when missing
    StreamWrite,
    /// Whole document in memory, local file created when missing
    InMemoryOpenOrCreate,
    /// Whole remote document in memory, read-only
    RemoteDirectOpen,
}

impl Strategy {
    /// Pick a strategy from the transport and the streaming flags.
    pub fn select(transport: Transport, options: &OptionMap) -> Self {
        if options.is_set(READ_STREAMING) {
            return Self::StreamRead;
        }
        match transport {
            Transport::LocalFile if options.is_set(WRITE_STREAMING) => Self::StreamWrite,
            Transport::LocalFile => Self::InMemoryOpenOrCreate,
            Transport::Remote => Self::RemoteDirectOpen,
        }
    }

    /// Strategies that may create or rewrite the local file before opening it.
    pub fn materializes(self) -> bool {
        matches!(self, Self::StreamWrite | Self::InMemoryOpenOrCreate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::options::TRUE;

    #[test]
    fn test_decision_table() {
        let none = OptionMap::new();
        let read = OptionMap::new().with(READ_STREAMING, TRUE);
        let write = OptionMap::new().with(WRITE_STREAMING, TRUE);
        let both = read.clone().with(WRITE_STREAMING, TRUE);

        assert_eq!(Strategy::select(Transport::LocalFile, &read), Strategy::StreamRead);
        assert_eq!(Strategy::select(Transport::Remote, &read), Strategy::StreamRead);
        assert_eq!(Strategy::select(Transport::LocalFile, &both), Strategy::StreamRead);
        assert_eq!(Strategy::select(Transport::LocalFile, &write), Strategy::StreamWrite);
        assert_eq!(Strategy::select(Transport::LocalFile, &none), Strategy::InMemoryOpenOrCreate);
        assert_eq!(Strategy::select(Transport::Remote, &write), Strategy::RemoteDirectOpen);
        assert_eq!(Strategy::select(Transport::Remote, &none), Strategy::RemoteDirectOpen);
    }

    #[test]
    fn test_flag_values_other_than_true_are_ignored() {
        let options = OptionMap::new()
            .with(READ_STREAMING, "yes")
            .with(WRITE_STREAMING, "1");
        assert_eq!(Strategy::select(Transport::LocalFile, &options), Strategy::InMemoryOpenOrCreate);
    }
}
