// Copyright 2025 Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

/// Failures raised while decoding launch structures or replaying the PCR chain.
///
/// Binary format errors are permanent for a given input, so nothing in the crate retries or
/// recovers from them locally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "{structure}{}: read of {width} bytes at offset {offset:#x} exceeds length {length:#x}",
        .field.map(|field| format!(".{field}")).unwrap_or_default()
    )]
    OutOfRange {
        structure: &'static str,
        field: Option<&'static str>,
        offset: u64,
        width: u64,
        length: u64,
    },

    #[error("{structure}.{field} is malformed: {reason}")]
    Malformed {
        structure: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("{structure} version {version} is not supported")]
    UnsupportedVersion {
        structure: &'static str,
        version: u32,
    },

    #[error("{structure} references unknown hash type {value}")]
    UnknownHashType { structure: &'static str, value: u8 },

    #[error("{structure}.{field} is not implemented")]
    Unimplemented {
        structure: &'static str,
        field: &'static str,
    },

    #[error("PCR{0} is not part of the reconstructed bank")]
    UnsupportedPcr(u8),

    #[error("module {module} violates the launch control policy: {reason}")]
    PolicyViolation { module: usize, reason: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Attach the name of the field being decoded to a bounds failure.
    pub(crate) fn in_field(self, name: &'static str) -> Self {
        match self {
            Error::OutOfRange {
                structure,
                field: None,
                offset,
                width,
                length,
            } => Error::OutOfRange {
                structure,
                field: Some(name),
                offset,
                width,
                length,
            },
            other => other,
        }
    }

    pub(crate) fn malformed(
        structure: &'static str,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Error::Malformed {
            structure,
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
