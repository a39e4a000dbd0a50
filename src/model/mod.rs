// Declaration and source-snapshot model
//
// Declarations live in an arena addressed by stable integer ids, with
// relationships expressed as id-to-id edges. This keeps the inherently
// cyclic declaration graph (types referencing each other, inheritance)
// free of direct cyclic object references.

pub mod declaration;
pub mod snapshot;

pub use declaration::{
    Accessibility, Declaration, DeclarationArena, DeclarationId, DeclarationKind,
};
pub use snapshot::{ProjectId, SourceSnapshot, SourceUnit, SourceUnitId, SourceUnitKind};
