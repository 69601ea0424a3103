//! Boundaries to the external systems rbuild drives.
//!
//! - [`transport`]: HTTP plumbing and the [`Connector`] seam
//! - [`rbuilder`]: the management server
//! - [`poller`]: build and job status watching
//! - [`repository`]: promotion and shadowing through the repository client

pub mod poller;
pub mod rbuilder;
pub mod repository;
pub mod transport;

pub use poller::{JobStatus, StatusCategory, WatchOptions, WatchReport};
pub use rbuilder::RbuilderFacade;
pub use repository::{LabelMap, RepositoryClient, RepositoryFacade, TroveTuple};
pub use transport::{Connector, Endpoint, HttpConnector};
