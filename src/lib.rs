pub use crate::{
    field::{
        field_model::{DomNode, FieldContext, PageSnapshot},
        fingerprint::FieldFingerprint,
    },
    guidance::{
        client::{GuidanceClient, HttpGuidanceClient},
        error::GuidanceError,
        guidance_model::{GuidanceParseResult, GuidanceRecord, GuidanceRequest},
        session::{GuidanceOutcome, GuidanceSession, InFlightPolicy, SessionConfig},
    },
    scan::scanner::{PageScanner, ScanReport, ScanSettings},
};

pub mod cli;
pub mod field;
pub mod guidance;
pub mod relay;
pub mod scan;
pub mod trace;
