use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable identifier for arena-allocated engine objects.
///
/// - `u32` keeps port and connection tables small
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based arena index by storing index+1.
    pub fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(1))
            .and_then(NonZeroU32::new)
            .expect("arena index exceeds u32 range");
        Self(raw)
    }

    /// Recover the 0-based arena index.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
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

/// Component arena handle.
pub type CompId = Id;
/// Port table handle (inputs, outputs and dynamic slots share one table).
pub type PortId = Id;
/// Connection handle; ordering equals registration order.
pub type ConnId = Id;

/// Integer grouping/priority key distinguishing instances of one
/// classification (EV #1 vs EV #2). Lower weights are served first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceWeight(pub u32);

impl SourceWeight {
    /// Weight used by sources that do not take part in prioritisation.
    pub const DEFAULT: SourceWeight = SourceWeight(999);

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for SourceWeight {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for SourceWeight {
    fn from(w: u32) -> Self {
        Self(w)
    }
}

impl fmt::Display for SourceWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip_index() {
        for i in [0_usize, 1, 2, 42, 10_000] {
            let id = Id::from_index(i);
            assert_eq!(id.index(), i);
        }
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
        assert!(Id::from_index(3) < Id::from_index(10));
    }

    #[test]
    fn default_weight_is_lowest_priority_marker() {
        assert_eq!(SourceWeight::default(), SourceWeight(999));
        assert!(SourceWeight(1) < SourceWeight::DEFAULT);
    }
}
