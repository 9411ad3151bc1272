//! Dependency-ordered diagram composition.
//!
//! A diagram is an ordered list of sections; each section is a base
//! image plus overlays that must wait for the base before pasting.
//!
//! # Architecture
//!
//! ```text
//! DiagramRequest ──► DiagramAssembler ──► SectionComposer (per section)
//!                          │                    │
//!                          │         base load ─┼─► gate ─► overlay pastes
//!                          │                    │              │
//!                          ▼                    ▼              ▼
//!                   stack_vertically ◄── section image ◄── banner passes
//! ```
//!
//! Ordering guarantees: within one section, base-before-overlay always
//! holds (the one-shot [`Gate`]); across sections, none. Any failure
//! fails the whole request; partial diagrams are never emitted.

mod assembler;
mod error;
mod gate;
mod section;
mod spec;

pub use assembler::{encode_png, stack_vertically, DiagramAssembler};
pub use error::ComposeError;
pub use gate::{Gate, GateWaiter};
pub use section::SectionComposer;
pub use spec::{
    BannerSpec, DiagramRequest, OverlaySpec, Point, Region, Rotation, SectionSpec, StackDirection,
};
