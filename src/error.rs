//! Errors raised by resources and data sources

use thiserror::Error;

/// A failed remote operation, annotated with the entity it concerned
///
/// The underlying [`runscope::Error`] is kept as the source so callers can
/// still ask whether the entity was missing.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("error creating {kind} \"{name}\"")]
    Create {
        kind: &'static str,
        name: String,
        #[source]
        source: runscope::Error,
    },

    #[error("couldn't find {kind} \"{id}\"")]
    Read {
        kind: &'static str,
        id: String,
        #[source]
        source: runscope::Error,
    },

    #[error("error updating {kind} \"{id}\"")]
    Update {
        kind: &'static str,
        id: String,
        #[source]
        source: runscope::Error,
    },

    #[error("error deleting {kind} \"{id}\"")]
    Delete {
        kind: &'static str,
        id: String,
        #[source]
        source: runscope::Error,
    },

    #[error("error listing {kind}")]
    Lookup {
        kind: &'static str,
        #[source]
        source: runscope::Error,
    },

    #[error("no {kind} matched the given criteria")]
    NoMatch { kind: &'static str },

    #[error("error encoding {kind}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ProviderError {
    /// The remote error behind this one, if any
    pub fn remote(&self) -> Option<&runscope::Error> {
        match self {
            Self::Create { source, .. }
            | Self::Read { source, .. }
            | Self::Update { source, .. }
            | Self::Delete { source, .. }
            | Self::Lookup { source, .. } => Some(source),
            Self::NoMatch { .. } | Self::Encode { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.remote().is_some_and(runscope::Error::is_not_found)
    }
}

/// Whether an error chain ends in a remote 404
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ProviderError>()
            .is_some_and(ProviderError::is_not_found)
            || cause
                .downcast_ref::<runscope::Error>()
                .is_some_and(runscope::Error::is_not_found)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use runscope::Operation;

    fn remote(status: u16) -> runscope::Error {
        runscope::Error::api(Operation::Delete, "test", "t1", status, "nope")
    }

    #[test]
    fn test_display_names_kind_and_id() {
        let err = ProviderError::Delete {
            kind: "test",
            id: "t1".to_string(),
            source: remote(500),
        };
        assert_eq!(err.to_string(), "error deleting test \"t1\"");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_is_not_found_through_anyhow() {
        let err: anyhow::Error = ProviderError::Delete {
            kind: "test",
            id: "t1".to_string(),
            source: remote(404),
        }
        .into();
        assert!(is_not_found(&err));

        let wrapped = err.context("replacing runscope_test.smoke");
        assert!(is_not_found(&wrapped));

        let other: anyhow::Error = ProviderError::NoMatch { kind: "integration" }.into();
        assert!(!is_not_found(&other));
    }
}
