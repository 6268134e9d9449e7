//! # Job value and identifier.
//!
//! A [`Job`] is an immutable unit of work: an opaque [`JobId`] plus a descriptive name.
//! Both fields are `Arc<str>`, so cloning a job for logging is cheap.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Number of random bytes behind a [`JobId`].
pub const JOB_ID_ENTROPY: usize = 16;

/// Opaque, URL-safe job identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(Arc<str>);

impl JobId {
    /// Encodes raw entropy as an unpadded URL-safe base64 token.
    ///
    /// # Example
    /// ```
    /// use jobvisor::JobId;
    ///
    /// let id = JobId::from_entropy([0u8; 16]);
    /// assert_eq!(id.as_str().len(), 22);
    /// ```
    pub fn from_entropy(bytes: [u8; JOB_ID_ENTROPY]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes).into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One discoverable unit of simulated work.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Job {
    id: JobId,
    name: Arc<str>,
}

impl Job {
    /// Creates a job with the given id and label.
    pub fn new(id: JobId, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job(id={:?}, name={:?})", self.id.as_str(), &*self.name)
    }
}
