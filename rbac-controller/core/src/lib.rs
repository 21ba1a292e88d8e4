#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod acl;
mod authority;
mod error;
pub mod events;
pub mod names;
pub mod params;
mod scope;
mod store;

pub use self::{
    authority::{Authority, Gateway},
    error::{BoxError, Error, Result},
    events::{Notify, Reason},
    params::Parameters,
    scope::Scope,
    store::ObjectStore,
};
pub use vault_rbac_controller_k8s_api as k8s;

pub const CONTROLLER_NAME: &str = "vault-rbac-controller";
