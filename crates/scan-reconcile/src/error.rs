use scan_api::UnitKind;

/// Coarse error class used for logging and retry decisions by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// An object is absent.
    NotFound,
    /// Store unavailable or write raced; a fresh pass may succeed.
    Transient,
    /// Misconfiguration; retrying will keep failing until it is fixed.
    FatalForPass,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::NotFound => "not_found",
            ErrorClass::Transient => "transient",
            ErrorClass::FatalForPass => "fatal_for_pass",
        }
    }
}

/// Errors a [`crate::ScanStore`] may return.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// Create of an existing name, or a write with a stale resourceVersion.
    #[error("{kind} {namespace}/{name} conflict: {message}")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },

    /// The store answered with an application-level error.
    #[error("store api error code={code}: {message}")]
    Api { code: u16, message: String },

    /// Network or transport failure.
    #[error("store transport error: {0}")]
    Transport(String),

    /// A payload could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn not_found(kind: impl Into<String>, namespace: &str, name: &str) -> Self {
        StoreError::NotFound {
            kind: kind.into(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn conflict(
        kind: impl Into<String>,
        namespace: &str,
        name: &str,
        message: impl Into<String>,
    ) -> Self {
        StoreError::Conflict {
            kind: kind.into(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::NotFound { .. } => ErrorClass::NotFound,
            StoreError::Conflict { .. } | StoreError::Api { .. } | StoreError::Transport(_) => {
                ErrorClass::Transient
            }
            // A payload the store rejects will be rejected again.
            StoreError::Serialization(_) => ErrorClass::FatalForPass,
        }
    }
}

/// Failure to link a derived unit to its parent scan.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    /// The parent has no name or uid, so no reference can point at it.
    #[error("parent scan has no {0}; cannot build owner reference")]
    MissingParentIdentity(&'static str),

    /// Owner references cannot cross namespaces.
    #[error("child namespace '{child}' differs from parent namespace '{parent}'")]
    CrossNamespace { parent: String, child: String },

    /// The child already names a different controller.
    #[error("object is already controlled by {kind} '{name}'")]
    AlreadyControlled { kind: String, name: String },
}

/// Errors surfaced from one reconciliation pass.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot set owner reference on {kind} {name}: {source}")]
    OwnerReference {
        kind: UnitKind,
        name: String,
        #[source]
        source: OwnershipError,
    },

    #[error("object is missing {0}")]
    MissingObjectKey(&'static str),
}

impl ReconcileError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReconcileError::Store(e) => e.class(),
            ReconcileError::OwnerReference { .. } | ReconcileError::MissingObjectKey(_) => {
                ErrorClass::FatalForPass
            }
        }
    }
}
