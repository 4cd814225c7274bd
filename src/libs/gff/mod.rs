//! GFF3 feature trees: the feature model, column 9 codec, stream reconstruction and writer.

pub mod attributes;
pub mod builder;
pub mod feature;
pub mod writer;

pub use attributes::{AttrValue, Attributes};
pub use builder::{FeatureTreeBuilder, GffRow, GffRows};
pub use feature::{Feature, Region, Strand};
pub use writer::GffWriter;
