//! Effective-permission computation. Pure functions over the role map.

use crate::auth::permissions::Permissions;
use crate::auth::roles::Role;

/// OR of every held role's mask. Empty input yields an empty mask.
pub fn compute_mask<'a, I>(roles: I) -> Permissions
where
    I: IntoIterator<Item = &'a Role>,
{
    roles
        .into_iter()
        .fold(Permissions::empty(), |mask, role| mask | role.permissions())
}

/// Same as [`compute_mask`] for raw role names. Unrecognised names contribute
/// nothing, so a list of only unknown names fails closed with an empty mask.
pub fn compute_mask_from_names<S: AsRef<str>>(names: &[S]) -> Permissions {
    names
        .iter()
        .filter_map(|n| Role::parse(n.as_ref()))
        .fold(Permissions::empty(), |mask, role| mask | role.permissions())
}

/// `(mask & required) == required`, except that an empty requirement is
/// never satisfied.
pub fn has_permission(mask: Permissions, required: Permissions) -> bool {
    !required.is_empty() && mask.contains(required)
}

/// [`has_permission`] for a raw integer. Values with bits outside the
/// catalogue, and zero, are never satisfied.
pub fn has_permission_bits(mask: Permissions, required: u32) -> bool {
    Permissions::from_bits(required).is_some_and(|p| has_permission(mask, p))
}
