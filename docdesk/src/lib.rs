pub mod context;
pub mod controller;
pub mod entity;
pub mod filter;
pub mod notify;
pub mod reconciler;
pub mod remote;
pub mod settings;

pub use controller::{CollectionController, ControllerError, Followup, Messages, MutationOutcome};
pub use reconciler::{FetchTicket, Keyed, ListReconciler, ScopeToken, SnapshotOutcome};
pub use remote::{ProjectFiles, RemoteCollection, UserProjects, save_edit};
