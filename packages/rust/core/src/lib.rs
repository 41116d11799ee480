//! Build orchestration and content database reconciliation for JoyBuild.
//!
//! [`pipeline::Orchestrator`] runs build batches over a scanned asset tree,
//! bracketing each batch with a [`session::BuildSession`].
//! [`reconcile::reconcile`] keeps the content database in step with the
//! data root and never touches the tree.

pub mod pipeline;
pub mod reconcile;
pub mod session;
