//! Runscope resource types
//!
//! Every resource follows the same shape: build the entity from the
//! declared attributes, call the client, store the returned id, then read
//! the entity back so the stored attributes reflect the remote side.

pub mod bucket;
pub mod environment;
pub mod schedule;
pub mod step;
pub mod step_token;
pub mod test;

use crate::error::ProviderError;
use declarative::ResourceData;

/// Which read errors mean the entity no longer exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GonePolicy {
    NotFound,
    /// Runscope answers 403 for entities under a deleted bucket or test
    NotFoundOrForbidden,
}

impl GonePolicy {
    pub fn is_gone(self, err: &runscope::Error) -> bool {
        match self {
            Self::NotFound => err.is_not_found(),
            Self::NotFoundOrForbidden => err.is_not_found() || err.is_forbidden(),
        }
    }
}

/// Resolve a read result, clearing the id when the entity is gone
///
/// Returns `Ok(None)` for a gone entity. Any other error keeps the id.
pub fn read_or_clear<T>(
    kind: &'static str,
    data: &mut ResourceData,
    policy: GonePolicy,
    result: runscope::Result<T>,
) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(entity) => Ok(Some(entity)),
        Err(e) if policy.is_gone(&e) => {
            log::info!("{kind} {} is gone: {e}", data.id());
            data.clear_id();
            Ok(None)
        }
        Err(source) => Err(ProviderError::Read {
            kind,
            id: data.id().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for resource tests

    use declarative::{Attributes, Value};
    use runscope::{Client, MockBackend};

    pub fn client(mock: &MockBackend) -> Client {
        Client::with_backend(Box::new(mock.clone()), "https://api.runscope.com", "secret")
    }

    pub fn attrs(entries: &[(&str, Value)]) -> Attributes {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }
}
