//! Role-precedence reverse proxy: authorize, pick exactly one backend,
//! forward once.

pub mod error;
pub mod evidence;
pub mod proxy;
pub mod table;
pub mod token;

pub use error::RouteError;
pub use evidence::Subject;
pub use proxy::{ForwardClient, ForwardIdentity};
pub use table::{RouteTarget, RoutingTable};
pub use token::TokenVerifier;

/// The routing decision for one subject: a single primary role and its
/// backend, plus the normalized role set for the forwarded headers.
#[derive(Clone, Debug)]
pub struct Authorized {
    pub primary_role: String,
    pub target: RouteTarget,
    pub roles: Vec<String>,
}

/// Collapse a subject's role set to one backend by fixed precedence.
///
/// # Errors
///
/// `NoRolesAssigned` for an empty role set; `UnrecognizedRole` when no role
/// appears in the precedence list (deliberately distinct);
/// `RoutingMisconfiguration` when the matched precedence entry has no
/// configured backend — an operator error, not a client error.
pub fn authorize_and_select_target(
    table: &RoutingTable,
    subject: &Subject,
) -> Result<Authorized, RouteError> {
    if subject.roles.is_empty() {
        return Err(RouteError::NoRolesAssigned);
    }

    let Some(primary_role) = table.primary_role(&subject.roles) else {
        return Err(RouteError::UnrecognizedRole);
    };

    let Some(target) = table.by_role(primary_role) else {
        return Err(RouteError::RoutingMisconfiguration(primary_role.to_string()));
    };

    Ok(Authorized {
        primary_role: primary_role.to_string(),
        target: target.clone(),
        roles: subject.roles.iter().cloned().collect(),
    })
}
