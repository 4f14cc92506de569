pub mod check;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod plan;
pub mod reconcile;
pub mod report;

pub use error::ReconcileError;
pub use graph::GraphError;
pub use lifecycle::{destroy, import, refresh, RefreshReport};
pub use reconcile::{apply, plan, reconcile};
pub use report::{Action, Change, ReconcileReport, ReconcileRequest};
