//! Record names and name prefixes recognized in the dotnet-runtime-official
//! pipeline. Lookups go through these constants only.

use super::timeline::RecordType;

/// A record identified by its display name and, optionally, its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub name: &'static str,
    pub record_type: Option<RecordType>,
}

impl RecordKey {
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            record_type: None,
        }
    }

    pub const fn job(name: &'static str) -> Self {
        Self {
            name,
            record_type: Some(RecordType::Job),
        }
    }

    pub const fn stage(name: &'static str) -> Self {
        Self {
            name,
            record_type: Some(RecordType::Stage),
        }
    }

    pub fn type_label(&self) -> &str {
        self.record_type.as_ref().map_or("any", RecordType::as_str)
    }
}

pub const PREPARE_SIGNED_ARTIFACTS: RecordKey = RecordKey::job("Prepare Signed Artifacts");
pub const SIGNING_VALIDATION: RecordKey = RecordKey::job("Signing Validation");
pub const INSTALLER_BUILD_STEP: RecordKey = RecordKey::named("Build");
pub const VALIDATE: RecordKey = RecordKey::named("Validate");
pub const BUILD_STAGE: RecordKey = RecordKey::stage("Build");

/// Either name marks the publishing job, depending on the release branding.
pub const PUBLISHING: [RecordKey; 2] = [
    RecordKey::named(".NET Core 5 Dev Publishing"),
    RecordKey::named(".NET 5 Dev Publishing"),
];

pub const INSTALLER_BUILD_AND_TEST: &str = "Installer Build and Test";
pub const CORECLR_PRODUCT_BUILD: &str = "CoreCLR Product Build";
pub const MONO_PRODUCT_BUILD: &str = "Mono Product Build";
pub const LIBRARIES_BUILD: &str = "Libraries Build";

/// Categories that run together in the runtime + libraries wave.
pub const RUNTIME_LIBRARIES_WAVE: [&str; 3] =
    [CORECLR_PRODUCT_BUILD, MONO_PRODUCT_BUILD, LIBRARIES_BUILD];
