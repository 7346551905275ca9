// vlab-domain library entry point
pub mod composition;
pub mod container;
pub mod entity;
pub mod error;
pub mod material;
pub mod quantity;
pub mod sample;

pub use composition::{Component, Composition, CompositionState, FlatComposition, Superposition, Tolerance};
pub use container::{ContainerPurpose, ContainerSpec, OperatingLimits};
pub use entity::Entity;
pub use error::DomainError;
pub use material::{parse_material_format, ChemicalTag, MaterialDescription, MaterialInfo, MaterialLexicon};
pub use quantity::{Dimension, Quantity, Unit};
pub use sample::{OrganizationalInfo, Sample};
