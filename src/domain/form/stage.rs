//! Form stages and their allowed forward edges.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Position of a session inside the form.
///
/// Stages only move forward along the edges below. Cancel and restart are not
/// transitions: they replace the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ManagerName,
    ContactName,
    Phone,
    Address,
    CadastrNumber,
    HasTransformer,
    TransformerPower,
    FreePower,
    Station,
    Location,
    LocationInfo,
    MediaUpload,
}

impl Stage {
    /// All stages in forward order.
    pub const ALL: [Stage; 12] = [
        Stage::ManagerName,
        Stage::ContactName,
        Stage::Phone,
        Stage::Address,
        Stage::CadastrNumber,
        Stage::HasTransformer,
        Stage::TransformerPower,
        Stage::FreePower,
        Stage::Station,
        Stage::Location,
        Stage::LocationInfo,
        Stage::MediaUpload,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ManagerName => "manager_name",
            Stage::ContactName => "contact_name",
            Stage::Phone => "phone",
            Stage::Address => "address",
            Stage::CadastrNumber => "cadastr_number",
            Stage::HasTransformer => "has_transformer",
            Stage::TransformerPower => "transformer_power",
            Stage::FreePower => "free_power",
            Stage::Station => "station",
            Stage::Location => "location",
            Stage::LocationInfo => "location_info",
            Stage::MediaUpload => "media_upload",
        }
    }

    /// Index in [`Stage::ALL`].
    pub fn ordinal(&self) -> usize {
        Stage::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(Stage::ALL.len())
    }

    /// Finalization is only reachable from here.
    pub fn is_media(&self) -> bool {
        matches!(self, Stage::MediaUpload)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for Stage {
    fn valid_transitions(&self) -> Vec<Self> {
        use Stage::*;
        match self {
            ManagerName => vec![ContactName],
            ContactName => vec![Phone],
            Phone => vec![Address],
            Address => vec![CadastrNumber],
            CadastrNumber => vec![HasTransformer],
            // "no transformer" jumps past the power sub-form
            HasTransformer => vec![TransformerPower, Location],
            TransformerPower => vec![FreePower],
            FreePower => vec![Station],
            Station => vec![Location],
            // location_info is optional per flow
            Location => vec![LocationInfo, MediaUpload],
            LocationInfo => vec![MediaUpload],
            MediaUpload => vec![],
        }
    }
}
