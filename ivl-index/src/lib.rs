//! # ivl-index
//!
//! The four interval index structures built on top of `ivl-core`: the
//! dynamic [`ibs::IbsTree`] and [`dlfit::Dlfit`], and the static
//! [`ncl::Ncl`] and [`lcl::Lcl`]. All four implement the shared
//! [`traits::IntervalIndex`] query surface.

pub mod arena;
pub mod dlfit;
pub mod ibs;
pub mod lcl;
pub mod ncl;
pub mod observers;
pub mod traits;

pub use dlfit::Dlfit;
pub use ibs::IbsTree;
pub use lcl::Lcl;
pub use ncl::Ncl;
pub use observers::Observers;
pub use traits::IntervalIndex;
