pub mod actor;
pub mod password;
pub mod policy;

pub use actor::{actor_middleware, resolve_actor, Actor};
pub use password::{check_password, hash_password, CredentialHasher};
pub use policy::{
    authorize, ensure, ticket_scope, user_scope, Action, Grant, PolicyDecision, ProposedChanges,
    Resource, UserField, ROLE_MATRIX,
};
