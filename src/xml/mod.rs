//! XML assembly and modular↔official schema mapping (§4.3, §4.4, §4.5).
//!
//! [`assembly::to_modular_xml`] walks a [`crate::core::Document`] into the
//! library's own modular shape; [`mapper`] transforms that shape into the
//! official wire shape SET expects (and back); [`validator::hybrid_validate`]
//! compares modular and official-shape validation and reports where they
//! diverge.

mod assembly;
mod error;
mod mapper;
mod validator;
mod xml_utils;

pub use assembly::to_modular_xml;
pub use error::{MapperError, XmlError};
pub use mapper::{modular_to_official, official_to_modular};
pub use validator::{hybrid_validate, DiffReport};
