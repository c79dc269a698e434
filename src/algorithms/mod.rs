/// Branch and Bound search for a changeless selection.
pub mod bnb;
/// Smallest sufficient candidate first, largest-first accumulation otherwise.
pub mod lowestlarger;
/// Random accumulation over an injectable permutation.
pub mod srd;
