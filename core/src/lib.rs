//! # SMF Core
//!
//! Layout types, the streaming event protocol, the packing engine and the
//! codec contract shared by every SMF encoding.
//!
//! A codec drives the receiver traits in [`protocol`] while it reads a
//! stream, and implements [`protocol::Serializer`] to write one. Consumers
//! such as [`memory::MemoryMeshProducer`] and [`packing::PackedMeshes`] see
//! the same calls whatever the encoding.

pub mod diagnostic;
pub mod error;
pub mod layout;
pub mod logged;
pub mod memory;
pub mod packing;
pub mod protocol;
pub mod provider;
pub mod registry;

pub use diagnostic::{LexicalPosition, ParseError, ParseWarning};
pub use error::{
    LayoutError, MeshError, PackingError, ProtocolViolation, ProviderError, SerializeError,
    SerializeResult,
};
pub use logged::Logged;
pub use provider::{FormatDescription, FormatProvider, SequentialParser};
pub use registry::{FormatRegistry, VersionProbed};
