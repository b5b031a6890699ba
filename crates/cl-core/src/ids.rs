use core::fmt;
use core::num::NonZeroU32;

/// Dense index of a variable or influence in a causal graph.
///
/// Stored as index+1 in a `NonZeroU32` so `Option<Id>` costs nothing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Index as `usize` for slice access.
    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Node (variable) index.
pub type VarId = Id;
/// Edge (influence) index.
pub type EdgeId = Id;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_survives_offset() {
        for i in [0_u32, 7, 10_000] {
            assert_eq!(Id::from_index(i).slot(), i as usize);
        }
        assert_eq!(format!("{:?}", Id::from_index(3)), "Id(3)");
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<Id>(),
            core::mem::size_of::<Option<Id>>()
        );
    }

    #[test]
    fn ids_order_by_index() {
        assert!(Id::from_index(3) < Id::from_index(7));
    }
}
