//! # k3scdk-template
//!
//! Resource declarations and the template they are collected into.
//!
//! ## Design Principles
//!
//! - Declarations are plain data: a kind, an ordered property mapping, and
//!   explicit dependencies
//! - References between declarations are structural (`Ref`, `Fn::GetAtt`),
//!   never pre-rendered strings
//! - A template only renders once every reference resolves inside it
//! - Rendering is deterministic: the same declarations always produce the
//!   same JSON and the same [`TemplateHash`]

mod error;
mod resource;
mod template;
mod value;

pub use error::TemplateError;
pub use resource::{Properties, ResourceDeclaration, ResourceKind, TemplateParameter};
pub use template::{Template, TemplateHash, TEMPLATE_FORMAT_VERSION};
pub use value::{PropertyValue, PseudoParameter, RefTarget};
