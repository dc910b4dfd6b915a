//! numapin semantic layer: the run-wide declaration index, class profiles,
//! allocation-site scanning and the specialization registry.

pub mod errors;
pub mod index;
pub mod profile;
pub mod registry;
pub mod scan;

pub use errors::{Located, ProfileError, ScanWarning};
pub use index::{CanonicalType, ClassEntry, DeclIndex, ExistingSpecialization, FileId, ParsedFile, Scope};
pub use profile::{
    ClassProfile, ConstructorDescriptor, Constructors, DestructorDescriptor, Dispatch,
    FieldDescriptor, MemInitDescriptor, MemberRef, MethodDescriptor, NewRef, ParamDescriptor,
    Profiler, SourceText, Special,
};
pub use registry::{
    Begin, NodeId, RegistryMark, SpecializationKey, SpecializationRecord, SpecializationRegistry,
};
pub use scan::{AllocationSite, BareAllocation, PinningConfig, ScanResult, scan_unit};
