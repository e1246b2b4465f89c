//! Data models shared across pipeline stages

mod assessment;
mod entity;
mod threat;

pub use assessment::{AttackPath, AttackStep, RiskAssessment, ThreatModel};
pub use entity::{Entity, OrganizationContext, Relationship};
pub use threat::{truncate_chars, ThreatItem, ThreatKind, ThreatLandscape};
