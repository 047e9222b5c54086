//! Deployment manifest parsing.
//!
//! A manifest is an XML document whose first `assemblyIdentity` element in
//! the `urn:schemas-microsoft-com:asm.v1` namespace carries the deployed
//! version in its `version` attribute.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use thiserror::Error;

use crate::version::{Version, VersionParseError};

pub const ASM_V1_NAMESPACE: &str = "urn:schemas-microsoft-com:asm.v1";

const ASSEMBLY_IDENTITY: &[u8] = b"assemblyIdentity";
const VERSION_ATTRIBUTE: &str = "version";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("manifest is not valid XML: {0}")]
    Xml(String),
    #[error("manifest has no assemblyIdentity element in namespace {ASM_V1_NAMESPACE}")]
    MissingAssemblyIdentity,
    #[error("manifest assemblyIdentity has no version attribute")]
    MissingVersion,
    #[error("manifest version '{value}' is invalid: {source}")]
    InvalidVersion {
        value: String,
        #[source]
        source: VersionParseError,
    },
}

impl ManifestError {
    fn xml(error: impl std::fmt::Display) -> Self {
        Self::Xml(error.to_string())
    }
}

/// Read the deployed version from a manifest stream.
///
/// The stream is consumed up to the first matching `assemblyIdentity`.
///
/// # Errors
/// Returns an error when the document is malformed before a match, when no
/// matching element exists, or when its `version` attribute is missing, empty
/// or not a valid version.
pub fn read_manifest_version<R: BufRead>(reader: R) -> Result<Version, ManifestError> {
    let mut reader = NsReader::from_reader(reader);
    let mut buf = Vec::new();

    loop {
        let (namespace, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(ManifestError::xml)?;

        match event {
            Event::Start(ref element) | Event::Empty(ref element)
                if is_asm_v1(&namespace)
                    && element.local_name().as_ref() == ASSEMBLY_IDENTITY =>
            {
                return version_from_identity(element);
            }
            Event::Eof => return Err(ManifestError::MissingAssemblyIdentity),
            _ => {}
        }

        buf.clear();
    }
}

/// Read the deployed version from an in-memory manifest.
///
/// # Errors
/// See [`read_manifest_version`].
pub fn manifest_version_from_bytes(bytes: &[u8]) -> Result<Version, ManifestError> {
    read_manifest_version(bytes)
}

fn is_asm_v1(namespace: &ResolveResult<'_>) -> bool {
    matches!(namespace, ResolveResult::Bound(Namespace(uri)) if *uri == ASM_V1_NAMESPACE.as_bytes())
}

fn version_from_identity(element: &BytesStart<'_>) -> Result<Version, ManifestError> {
    let attribute = element
        .try_get_attribute(VERSION_ATTRIBUTE)
        .map_err(ManifestError::xml)?
        .ok_or(ManifestError::MissingVersion)?;
    let value = attribute.unescape_value().map_err(ManifestError::xml)?;

    if value.is_empty() {
        return Err(ManifestError::MissingVersion);
    }

    Version::parse(&value).map_err(|source| ManifestError::InvalidVersion {
        value: value.into_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{ManifestError, manifest_version_from_bytes, read_manifest_version};
    use crate::version::{Version, VersionParseError};

    fn manifest(identity: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<asmv1:assembly xsi:schemaLocation="urn:schemas-microsoft-com:asm.v1 assembly.adaptive.xsd"
    manifestVersion="1.0"
    xmlns:asmv1="urn:schemas-microsoft-com:asm.v1"
    xmlns="urn:schemas-microsoft-com:asm.v2"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  {identity}
  <description asmv2:publisher="Contoso" xmlns:asmv2="urn:schemas-microsoft-com:asm.v2" />
</asmv1:assembly>"#
        )
    }

    #[test]
    fn reads_version_from_prefixed_identity() {
        let xml = manifest(
            r#"<asmv1:assemblyIdentity name="Contoso.application" version="1.2.0.0" publicKeyToken="0000000000000000" language="neutral" processorArchitecture="msil" />"#,
        );

        let version = manifest_version_from_bytes(xml.as_bytes()).expect("manifest should parse");
        assert_eq!(version, Version::new(1, 2, 0, 0));
    }

    #[test]
    fn reads_version_from_default_namespace_identity() {
        let xml = r#"<assembly xmlns="urn:schemas-microsoft-com:asm.v1">
  <assemblyIdentity name="App" version="3.4.5.6"></assemblyIdentity>
</assembly>"#;

        let version = read_manifest_version(xml.as_bytes()).expect("manifest should parse");
        assert_eq!(version, Version::new(3, 4, 5, 6));
    }

    #[test]
    fn first_matching_identity_wins() {
        let xml = manifest(
            r#"<assemblyIdentity name="Dependency" version="9.9.9.9" />
  <asmv1:assemblyIdentity name="App" version="2.0.0.1" />
  <asmv1:assemblyIdentity name="Other" version="5.0.0.0" />"#,
        );

        let version = manifest_version_from_bytes(xml.as_bytes()).expect("manifest should parse");
        assert_eq!(version, Version::new(2, 0, 0, 1));
    }

    #[test]
    fn missing_identity_is_a_format_error() {
        let only_v2 = manifest(r#"<assemblyIdentity name="App" version="1.0.0.0" />"#);
        assert_eq!(
            manifest_version_from_bytes(only_v2.as_bytes()),
            Err(ManifestError::MissingAssemblyIdentity)
        );
        assert_eq!(
            manifest_version_from_bytes(b""),
            Err(ManifestError::MissingAssemblyIdentity)
        );
    }

    #[test]
    fn missing_or_empty_version_is_a_format_error() {
        let missing = manifest(r#"<asmv1:assemblyIdentity name="App" />"#);
        assert_eq!(
            manifest_version_from_bytes(missing.as_bytes()),
            Err(ManifestError::MissingVersion)
        );

        let empty = manifest(r#"<asmv1:assemblyIdentity name="App" version="" />"#);
        assert_eq!(
            manifest_version_from_bytes(empty.as_bytes()),
            Err(ManifestError::MissingVersion)
        );
    }

    #[test]
    fn invalid_version_is_a_format_error() {
        let xml = manifest(r#"<asmv1:assemblyIdentity name="App" version="1.0.beta.0" />"#);

        let error = manifest_version_from_bytes(xml.as_bytes()).expect_err("version is invalid");
        assert!(matches!(
            error,
            ManifestError::InvalidVersion {
                ref value,
                source: VersionParseError::InvalidComponent { .. },
            } if value == "1.0.beta.0"
        ));

        let too_many = manifest(r#"<asmv1:assemblyIdentity version="1.0.0.0.0" />"#);
        assert!(matches!(
            manifest_version_from_bytes(too_many.as_bytes()),
            Err(ManifestError::InvalidVersion {
                source: VersionParseError::ComponentCount { .. },
                ..
            })
        ));
    }

    #[test]
    fn malformed_xml_is_reported() {
        let result = manifest_version_from_bytes(b"<assembly><unclosed></assembly>");
        assert!(matches!(result, Err(ManifestError::Xml(_))));
    }
}
