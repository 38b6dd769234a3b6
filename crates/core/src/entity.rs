//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Products and raw materials are entities: two records with the same id are
/// the same record even if their codes, names or quantities differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
