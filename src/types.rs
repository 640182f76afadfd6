use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AreaPerilId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VulnerabilityId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntensityBinId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DamageBinId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoverageId(pub i32);

/// Correlation group. Items sharing a group see the same uniform draws
/// for a given event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub i32);

/// Sample index (`sidx`) of a loss record.
///
/// The three negative indices are analytic statistics that travel in the
/// same stream as the Monte-Carlo draws. Their integer values are part of the
/// wire format and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleIndex {
    /// Insured value split evenly across the items sharing a coverage (-3).
    EvenSplit,
    /// Analytic standard deviation of loss (-2).
    StdDev,
    /// Analytic mean loss (-1).
    Mean,
    /// Monte-Carlo draw, 1-based.
    Draw(u32),
}

impl SampleIndex {
    pub const EVEN_SPLIT: i32 = -3;
    pub const STD_DEV: i32 = -2;
    pub const MEAN: i32 = -1;

    /// Every index written for one (event, item) group, in stream order.
    pub fn sequence(number_of_samples: u32) -> impl Iterator<Item = SampleIndex> {
        [SampleIndex::EvenSplit, SampleIndex::StdDev, SampleIndex::Mean]
            .into_iter()
            .chain((1..=number_of_samples).map(SampleIndex::Draw))
    }

    pub fn to_wire(self) -> i32 {
        match self {
            SampleIndex::EvenSplit => Self::EVEN_SPLIT,
            SampleIndex::StdDev => Self::STD_DEV,
            SampleIndex::Mean => Self::MEAN,
            SampleIndex::Draw(k) => k as i32,
        }
    }

    /// `None` for 0 (the group terminator) and for undefined negative values.
    pub fn from_wire(sidx: i32) -> Option<Self> {
        match sidx {
            Self::EVEN_SPLIT => Some(SampleIndex::EvenSplit),
            Self::STD_DEV => Some(SampleIndex::StdDev),
            Self::MEAN => Some(SampleIndex::Mean),
            k if k > 0 => Some(SampleIndex::Draw(k as u32)),
            _ => None,
        }
    }
}
